//! # Bakery Calculation Engine
//!
//! 生產計劃與補貨建議計算引擎（純計算，不修改任何狀態）

pub mod aggregation;
pub mod explosion;
pub mod netting;
pub mod planner;
pub mod reorder;
pub mod snapshot;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Re-export 主要類型
pub use aggregation::{AggregatedDemand, DemandAggregator};
pub use explosion::{BomExplosion, BomExplosionResult, MaterialRequirement};
pub use netting::{MaterialNeed, NettingCalculator};
pub use planner::{ProductDemand, ProductionPlan, ProductionPlanner};
pub use reorder::{ReorderEngine, ReorderSuggestion};
pub use snapshot::PlanningSnapshot;

/// 無條件進位到指定小數位數（需求量不得低估）
pub fn ceil_dp(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::ToPositiveInfinity)
}

/// 計劃警示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanAlert {
    pub component_id: Uuid,
    pub component_code: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub shortage: Decimal,
}

impl PlanAlert {
    pub fn new(
        component_id: Uuid,
        component_code: String,
        message: String,
        severity: AlertSeverity,
        shortage: Decimal,
    ) -> Self {
        Self {
            component_id,
            component_code,
            message,
            severity,
            shortage,
        }
    }

    /// 原料短缺警示（完全無可用量時為 `Error`）
    pub fn shortage(need: &MaterialNeed) -> Self {
        let message = format!(
            "原料 {} 短缺 {} {}：需要 {}，可用 {}",
            need.material_code, need.shortage, need.unit, need.needed, need.available
        );
        let severity = if need.available <= Decimal::ZERO {
            AlertSeverity::Error
        } else {
            AlertSeverity::Warning
        };
        Self::new(
            need.material_id,
            need.material_code.clone(),
            message,
            severity,
            need.shortage,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    /// 部分短缺
    Warning,
    /// 完全缺料
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceil_dp_never_understates() {
        assert_eq!(ceil_dp(Decimal::new(48451, 3), 2), Decimal::new(4846, 2));
        assert_eq!(ceil_dp(Decimal::new(5100, 2), 2), Decimal::from(51));
        assert_eq!(ceil_dp(Decimal::new(1201, 2), 0), Decimal::from(13));
    }
}
