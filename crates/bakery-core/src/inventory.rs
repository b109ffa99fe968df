//! 庫存模型

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::catalog::{ItemRef, UnitOfMeasure};
use crate::{BakeryError, Result};

/// 庫存餘額（每個項目一筆，為異動帳的快取）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryStock {
    /// 項目參照
    pub item: ItemRef,

    /// 現有庫存
    pub quantity_on_hand: Decimal,

    /// 已保留數量
    pub quantity_reserved: Decimal,

    /// 最後更新時間
    pub updated_at: DateTime<Utc>,
}

impl InventoryStock {
    /// 創建新的庫存記錄
    pub fn new(item: ItemRef, quantity_on_hand: Decimal, updated_at: DateTime<Utc>) -> Self {
        Self {
            item,
            quantity_on_hand,
            quantity_reserved: Decimal::ZERO,
            updated_at,
        }
    }

    /// 可用庫存（現有 - 已保留）
    pub fn available(&self) -> Decimal {
        self.quantity_on_hand - self.quantity_reserved
    }

    /// 保留庫存
    pub fn reserve(&mut self, quantity: Decimal) -> Result<()> {
        if quantity <= Decimal::ZERO {
            return Err(BakeryError::InsufficientData(
                "保留數量必須大於 0".to_string(),
            ));
        }
        if quantity > self.available() {
            return Err(BakeryError::InsufficientData(format!(
                "庫存不足：需要 {}, 可用 {}",
                quantity,
                self.available()
            )));
        }
        self.quantity_reserved += quantity;
        Ok(())
    }

    /// 釋放已保留的庫存
    pub fn release(&mut self, quantity: Decimal) -> Result<()> {
        if quantity <= Decimal::ZERO || quantity > self.quantity_reserved {
            return Err(BakeryError::InsufficientData(format!(
                "釋放數量超過已保留數量：釋放 {}, 已保留 {}",
                quantity, self.quantity_reserved
            )));
        }
        self.quantity_reserved -= quantity;
        Ok(())
    }
}

/// 異動類型（封閉集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    PurchaseReceipt,
    ProductionInput,
    ProductionOutput,
    AdjustmentPlus,
    AdjustmentMinus,
    Waste,
    Count,
    ReturnToSupplier,
    Damaged,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::PurchaseReceipt => "PURCHASE_RECEIPT",
            MovementType::ProductionInput => "PRODUCTION_INPUT",
            MovementType::ProductionOutput => "PRODUCTION_OUTPUT",
            MovementType::AdjustmentPlus => "ADJUSTMENT_PLUS",
            MovementType::AdjustmentMinus => "ADJUSTMENT_MINUS",
            MovementType::Waste => "WASTE",
            MovementType::Count => "COUNT",
            MovementType::ReturnToSupplier => "RETURN_TO_SUPPLIER",
            MovementType::Damaged => "DAMAGED",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 異動來源單據類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    WorkOrder,
    PurchaseOrder,
    StockCount,
    Adjustment,
}

/// 庫存異動（僅追加）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryMovement {
    /// 異動ID
    pub id: Uuid,

    /// 項目參照
    pub item: ItemRef,

    /// 帶正負號的數量
    pub quantity: Decimal,

    /// 異動類型
    pub movement_type: MovementType,

    /// 計量單位
    pub unit: UnitOfMeasure,

    /// 批號
    pub batch_number: Option<String>,

    /// 到期日
    pub expiry_date: Option<NaiveDate>,

    /// 來源單據類型
    pub reference_type: Option<ReferenceType>,

    /// 來源單據ID
    pub reference_id: Option<Uuid>,

    /// 原因說明
    pub reason: Option<String>,

    /// 回報人
    pub reported_by: Option<String>,

    /// 建立時間
    pub created_at: DateTime<Utc>,
}
