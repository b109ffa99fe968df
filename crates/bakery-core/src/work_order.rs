//! 生產工單與生產回報模型

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::catalog::UnitOfMeasure;
use crate::{BakeryError, Result};

/// 工單狀態（單向：planned → in_progress → completed，可取消）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

impl WorkOrderStatus {
    pub const ALL: [WorkOrderStatus; 4] = [
        WorkOrderStatus::Planned,
        WorkOrderStatus::InProgress,
        WorkOrderStatus::Completed,
        WorkOrderStatus::Cancelled,
    ];

    /// 允許的下一個狀態（in_progress → in_progress 為冪等轉換）
    pub fn allowed_transitions(&self) -> &'static [WorkOrderStatus] {
        use WorkOrderStatus::*;
        match self {
            Planned => &[InProgress, Cancelled],
            InProgress => &[InProgress, Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: WorkOrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, WorkOrderStatus::Completed | WorkOrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderStatus::Planned => "planned",
            WorkOrderStatus::InProgress => "in_progress",
            WorkOrderStatus::Completed => "completed",
            WorkOrderStatus::Cancelled => "cancelled",
        }
    }

    fn invalid(&self, entity: &'static str, next: WorkOrderStatus) -> BakeryError {
        BakeryError::InvalidTransition {
            entity,
            from: self.to_string(),
            to: next.to_string(),
            allowed: self
                .allowed_transitions()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 工單明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub planned_quantity: Decimal,
    pub produced_quantity: Decimal,
    pub waste_quantity: Decimal,
    pub status: WorkOrderStatus,
}

impl WorkOrderItem {
    pub fn new(product_id: Uuid, planned_quantity: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            planned_quantity,
            produced_quantity: Decimal::ZERO,
            waste_quantity: Decimal::ZERO,
            status: WorkOrderStatus::Planned,
        }
    }

    /// 累計生產回報；累計產量達到計劃量時明細完成
    pub fn record_output(&mut self, produced: Decimal, waste: Decimal) -> Result<()> {
        let next = if self.produced_quantity + produced >= self.planned_quantity {
            WorkOrderStatus::Completed
        } else {
            WorkOrderStatus::InProgress
        };

        // 明細允許 planned → completed（單筆回報即達成計劃量）
        let legal = match self.status {
            WorkOrderStatus::Planned => true,
            other => other.can_transition_to(next),
        };
        if !legal {
            return Err(self.status.invalid("工單明細", next));
        }

        self.produced_quantity += produced;
        self.waste_quantity += waste;
        self.status = next;
        Ok(())
    }

    /// 剩餘待生產數量
    pub fn remaining(&self) -> Decimal {
        (self.planned_quantity - self.produced_quantity).max(Decimal::ZERO)
    }
}

/// 生產工單（一條生產線、一個日期）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    /// 工單ID
    pub id: Uuid,

    /// 工單編號（WO-YYYYMMDD-NNNN）
    pub work_order_number: String,

    /// 生產線代碼
    pub production_line: String,

    /// 排程日期
    pub scheduled_date: NaiveDate,

    /// 狀態
    pub status: WorkOrderStatus,

    /// 明細
    pub items: Vec<WorkOrderItem>,

    /// 實際開工時間
    pub actual_start: Option<DateTime<Utc>>,

    /// 實際完工時間
    pub actual_end: Option<DateTime<Utc>>,

    /// 建立人
    pub created_by: String,
}

impl WorkOrder {
    pub fn new(
        work_order_number: String,
        production_line: impl Into<String>,
        scheduled_date: NaiveDate,
        items: Vec<WorkOrderItem>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            work_order_number,
            production_line: production_line.into(),
            scheduled_date,
            status: WorkOrderStatus::Planned,
            items,
            actual_start: None,
            actual_end: None,
            created_by: created_by.into(),
        }
    }

    /// 狀態轉換並蓋上開工/完工時間戳
    ///
    /// `actual_start` 只蓋一次，重複進入 in_progress 不會重設。
    pub fn transition(&mut self, next: WorkOrderStatus, at: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(self.status.invalid("工單", next));
        }

        match next {
            WorkOrderStatus::InProgress => {
                if self.actual_start.is_none() {
                    self.actual_start = Some(at);
                }
            }
            WorkOrderStatus::Completed => {
                self.actual_end = Some(at);
            }
            WorkOrderStatus::Cancelled => {
                for item in self.items.iter_mut().filter(|i| !i.status.is_closed()) {
                    item.status = WorkOrderStatus::Cancelled;
                }
            }
            WorkOrderStatus::Planned => {}
        }

        self.status = next;
        Ok(())
    }

    pub fn item(&self, item_id: Uuid) -> Option<&WorkOrderItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn item_mut(&mut self, item_id: Uuid) -> Option<&mut WorkOrderItem> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }

    /// 所有明細皆已完成
    pub fn all_items_completed(&self) -> bool {
        !self.items.is_empty()
            && self
                .items
                .iter()
                .all(|i| i.status == WorkOrderStatus::Completed)
    }
}

/// 生產回報時實際耗用的原料（快照，不隨 BOM 變動）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumedMaterial {
    pub material_id: Uuid,
    pub material_code: String,
    pub quantity: Decimal,
    pub unit: UnitOfMeasure,
    pub movement_id: Uuid,
}

/// 生產回報（不可變）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionReport {
    pub id: Uuid,
    pub work_order_id: Uuid,
    pub work_order_item_id: Uuid,
    pub product_id: Uuid,
    pub produced_quantity: Decimal,
    pub waste_quantity: Decimal,
    pub waste_reason: Option<String>,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub bom_id: Option<Uuid>,
    pub consumed_materials: Vec<ConsumedMaterial>,
    pub reported_by: String,
    pub reported_at: DateTime<Utc>,
}

impl ProductionReport {
    /// 稽核用 JSON 表示
    pub fn to_audit_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| BakeryError::InvalidConfig(e.to_string()))
    }
}
