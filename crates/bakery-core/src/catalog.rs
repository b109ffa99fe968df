//! 物料與產品目錄

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 計量單位（固定四種）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitOfMeasure {
    /// 公斤
    Kg,
    /// 公克
    G,
    /// 公升
    L,
    /// 個
    Pcs,
}

impl fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UnitOfMeasure::Kg => "kg",
            UnitOfMeasure::G => "g",
            UnitOfMeasure::L => "l",
            UnitOfMeasure::Pcs => "pcs",
        };
        f.write_str(label)
    }
}

/// 庫存項目類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemType {
    /// 原料
    RawMaterial,
    /// 成品
    Product,
}

/// 庫存項目參照（類型 + ID）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemRef {
    pub item_type: ItemType,
    pub id: Uuid,
}

impl ItemRef {
    pub fn raw_material(id: Uuid) -> Self {
        Self {
            item_type: ItemType::RawMaterial,
            id,
        }
    }

    pub fn product(id: Uuid) -> Self {
        Self {
            item_type: ItemType::Product,
            id,
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.item_type {
            ItemType::RawMaterial => write!(f, "raw_material:{}", self.id),
            ItemType::Product => write!(f, "product:{}", self.id),
        }
    }
}

/// 原料
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMaterial {
    /// 原料ID
    pub id: Uuid,

    /// 原料代碼
    pub code: String,

    /// 名稱
    pub name: String,

    /// 計量單位
    pub unit: UnitOfMeasure,

    /// 最低庫存
    pub min_stock_level: Decimal,

    /// 再訂購點
    pub reorder_point: Option<Decimal>,

    /// 再訂購量
    pub reorder_quantity: Option<Decimal>,

    /// 採購提前期（天）
    pub lead_time_days: u32,

    /// 最近一次採購單價
    pub last_purchase_price: Option<Decimal>,
}

impl RawMaterial {
    /// 創建新的原料
    pub fn new(code: impl Into<String>, name: impl Into<String>, unit: UnitOfMeasure) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            unit,
            min_stock_level: Decimal::ZERO,
            reorder_point: None,
            reorder_quantity: None,
            lead_time_days: 0,
            last_purchase_price: None,
        }
    }

    /// 建構器模式：設置最低庫存
    pub fn with_min_stock_level(mut self, level: Decimal) -> Self {
        self.min_stock_level = level;
        self
    }

    /// 建構器模式：設置再訂購點與再訂購量
    pub fn with_reorder(mut self, point: Decimal, quantity: Option<Decimal>) -> Self {
        self.reorder_point = Some(point);
        self.reorder_quantity = quantity;
        self
    }

    /// 建構器模式：設置提前期
    pub fn with_lead_time_days(mut self, days: u32) -> Self {
        self.lead_time_days = days;
        self
    }

    /// 建構器模式：設置採購單價
    pub fn with_last_purchase_price(mut self, price: Decimal) -> Self {
        self.last_purchase_price = Some(price);
        self
    }

    pub fn item_ref(&self) -> ItemRef {
        ItemRef::raw_material(self.id)
    }
}

/// 產品（成品）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// 產品ID
    pub id: Uuid,

    /// 產品代碼
    pub code: String,

    /// 名稱
    pub name: String,

    /// 計量單位
    pub unit: UnitOfMeasure,

    /// 最低庫存
    pub min_stock_level: Decimal,

    /// 再訂購點
    pub reorder_point: Option<Decimal>,

    /// 再訂購量
    pub reorder_quantity: Option<Decimal>,

    /// 生產線代碼（三碼，例如 BRD）
    pub production_line: String,

    /// 保存期限（天）
    pub shelf_life_days: Option<u32>,
}

impl Product {
    /// 創建新的產品
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        unit: UnitOfMeasure,
        production_line: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            unit,
            min_stock_level: Decimal::ZERO,
            reorder_point: None,
            reorder_quantity: None,
            production_line: production_line.into(),
            shelf_life_days: None,
        }
    }

    /// 建構器模式：設置保存期限
    pub fn with_shelf_life_days(mut self, days: u32) -> Self {
        self.shelf_life_days = Some(days);
        self
    }

    /// 建構器模式：設置最低庫存
    pub fn with_min_stock_level(mut self, level: Decimal) -> Self {
        self.min_stock_level = level;
        self
    }

    pub fn item_ref(&self) -> ItemRef {
        ItemRef::product(self.id)
    }
}
