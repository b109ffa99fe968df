//! 烘焙 ERP：庫存異動帳與生產計劃引擎
//!
//! - `bakery-core`：領域模型、狀態機、權限、配置
//! - `bakery-calc`：BOM 展開、需求彙總、生產計劃、補貨建議（純計算）
//! - `bakery-ledger`：交易式儲存區、異動帳、訂單與工單服務

pub use bakery_calc as calc;
pub use bakery_core as domain;
pub use bakery_ledger as ledger;

pub use bakery_calc::{
    BomExplosionResult, MaterialNeed, PlanAlert, ProductDemand, ProductionPlan, ReorderSuggestion,
};
pub use bakery_core::{
    Actor, BakeryError, Bom, BomLine, EngineConfig, FixedClock, ItemRef, MovementType, Order,
    OrderItem, OrderStatus, Product, RawMaterial, Result, Role, SystemClock, UnitOfMeasure,
    WorkOrder, WorkOrderStatus,
};
pub use bakery_ledger::{AdjustStockRequest, BakeryEngine, FaultPoint, ReportProductionRequest};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化日誌（`RUST_LOG` 優先，否則使用 `default_filter`）
///
/// 重複呼叫時保留第一次安裝的 subscriber。
pub fn init_tracing(default_filter: &str) {
    let installed = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("日誌初始化完成：預設 {}", default_filter);
    }
}
