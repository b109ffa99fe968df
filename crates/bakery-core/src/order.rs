//! 客戶訂單模型與狀態機

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{BakeryError, Result};

/// 訂單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Draft,
    Pending,
    Confirmed,
    Locked,
    InProduction,
    Ready,
    Dispatched,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 9] = [
        OrderStatus::Draft,
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Locked,
        OrderStatus::InProduction,
        OrderStatus::Ready,
        OrderStatus::Dispatched,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// 允許的下一個狀態
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Draft => &[Pending, Cancelled],
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Locked, InProduction, Cancelled],
            Locked => &[InProduction, Confirmed, Cancelled],
            InProduction => &[Ready, Cancelled],
            Ready => &[Dispatched],
            Dispatched => &[Delivered],
            Delivered | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// 是否為終止狀態
    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// 是否允許修改訂單內容（鎖定狀態另需權限檢查）
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            OrderStatus::Draft | OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Locked
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "DRAFT",
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Locked => "LOCKED",
            OrderStatus::InProduction => "IN_PRODUCTION",
            OrderStatus::Ready => "READY",
            OrderStatus::Dispatched => "DISPATCHED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 訂單明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
}

impl OrderItem {
    pub fn new(product_id: Uuid, quantity: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            quantity,
        }
    }
}

/// 客戶訂單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// 訂單ID
    pub id: Uuid,

    /// 訂單編號（ORD-YYYYMMDD-NNNN）
    pub order_number: String,

    /// 客戶參照
    pub customer_ref: String,

    /// 要求交貨日期
    pub delivery_date: NaiveDate,

    /// 狀態
    pub status: OrderStatus,

    /// 明細
    pub items: Vec<OrderItem>,

    /// 鎖定時間
    pub locked_at: Option<DateTime<Utc>>,

    /// 鎖定人
    pub locked_by: Option<String>,
}

impl Order {
    /// 創建新的草稿訂單
    pub fn new(
        order_number: String,
        customer_ref: impl Into<String>,
        delivery_date: NaiveDate,
        items: Vec<OrderItem>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_number,
            customer_ref: customer_ref.into(),
            delivery_date,
            status: OrderStatus::Draft,
            items,
            locked_at: None,
            locked_by: None,
        }
    }

    /// 建構器模式：設置狀態
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// 是否處於鎖定中（鎖定戳記在離開 `LOCKED` 後保留作為紀錄）
    pub fn is_locked(&self) -> bool {
        self.status == OrderStatus::Locked
    }

    /// 依狀態機執行轉換（不含權限檢查）
    ///
    /// 進入 `LOCKED` 時蓋上鎖定戳記，解鎖（`LOCKED` 回到 `CONFIRMED`）時清除；
    /// 由 `LOCKED` 進入生產或取消時保留戳記。
    pub fn transition(&mut self, next: OrderStatus, actor: &str, at: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(BakeryError::InvalidTransition {
                entity: "訂單",
                from: self.status.to_string(),
                to: next.to_string(),
                allowed: self
                    .status
                    .allowed_transitions()
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            });
        }

        match (self.status, next) {
            (_, OrderStatus::Locked) => {
                self.locked_at = Some(at);
                self.locked_by = Some(actor.to_string());
            }
            (OrderStatus::Locked, OrderStatus::Confirmed) => {
                self.locked_at = None;
                self.locked_by = None;
            }
            _ => {}
        }

        self.status = next;
        Ok(())
    }

    /// 某產品的訂購總量
    pub fn quantity_for(&self, product_id: Uuid) -> Decimal {
        self.items
            .iter()
            .filter(|i| i.product_id == product_id)
            .map(|i| i.quantity)
            .sum()
    }
}
