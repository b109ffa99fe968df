//! # Bakery Core
//!
//! 核心資料模型與類型定義

pub mod access;
pub mod bom;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod inventory;
pub mod numbering;
pub mod order;
pub mod work_order;

// Re-export 主要類型
pub use access::{authorize, Action, Actor, ResourceState, Role};
pub use bom::{Bom, BomLine};
pub use catalog::{ItemRef, ItemType, Product, RawMaterial, UnitOfMeasure};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use inventory::{InventoryMovement, InventoryStock, MovementType, ReferenceType};
pub use order::{Order, OrderItem, OrderStatus};
pub use work_order::{
    ConsumedMaterial, ProductionReport, WorkOrder, WorkOrderItem, WorkOrderStatus,
};

/// 烘焙 ERP 錯誤類型
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BakeryError {
    #[error("找不到{entity}: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} 狀態無法由 {from} 轉換為 {to}，允許的狀態: [{}]", .allowed.join(", "))]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
        allowed: Vec<String>,
    },

    #[error("資源已鎖定: {0}")]
    LockedResource(String),

    #[error("產品沒有啟用中的 BOM: {0}")]
    NoActiveBom(String),

    #[error("資料不足: {0}")]
    InsufficientData(String),

    #[error("交易失敗: {0}")]
    Transaction(String),

    #[error("角色 {role} 無權執行 {action}")]
    Forbidden { role: String, action: String },

    #[error("配置錯誤: {0}")]
    InvalidConfig(String),
}

impl BakeryError {
    /// 建立找不到資源的錯誤
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BakeryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message_lists_allowed() {
        let err = BakeryError::InvalidTransition {
            entity: "訂單",
            from: "DRAFT".to_string(),
            to: "READY".to_string(),
            allowed: vec!["PENDING".to_string(), "CANCELLED".to_string()],
        };

        let message = err.to_string();
        assert!(message.contains("PENDING, CANCELLED"));
        assert!(message.contains("DRAFT"));
    }

    #[test]
    fn test_not_found_helper() {
        let err = BakeryError::not_found("原料", "FLOUR-T55");
        assert_eq!(
            err,
            BakeryError::NotFound {
                entity: "原料",
                id: "FLOUR-T55".to_string()
            }
        );
    }
}
