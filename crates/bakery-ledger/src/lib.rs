//! 烘焙 ERP 交易層
//!
//! 交易式儲存區、庫存異動帳，以及建立在其上的訂單、工單與生產回報服務。

pub mod engine;
pub mod ledger;
pub mod orders;
pub mod store;
pub mod work_orders;

// 重新導出常用類型
pub use engine::BakeryEngine;
pub use ledger::{AdjustStockRequest, BalanceDrift, MovementLedger, ReconciliationReport};
pub use store::{FaultPoint, InMemoryStore, StoreState, Transaction};
pub use work_orders::ReportProductionRequest;
