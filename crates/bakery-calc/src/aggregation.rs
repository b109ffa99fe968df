//! 需求彙總

use bakery_core::{Order, OrderStatus};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

/// 單一產品的彙總需求
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedDemand {
    /// 訂購總量
    pub quantity: Decimal,
    /// 來源訂單（不重複）
    pub order_ids: Vec<Uuid>,
}

impl AggregatedDemand {
    fn add(&mut self, order_id: Uuid, quantity: Decimal) {
        self.quantity += quantity;
        if !self.order_ids.contains(&order_id) {
            self.order_ids.push(order_id);
        }
    }
}

/// 需求彙總器
pub struct DemandAggregator;

impl DemandAggregator {
    /// 彙總指定交貨日的需求（依產品分組）
    pub fn for_date(
        orders: &[Order],
        statuses: &[OrderStatus],
        target_date: NaiveDate,
    ) -> HashMap<Uuid, AggregatedDemand> {
        Self::aggregate(orders, statuses, |date| date == target_date)
    }

    /// 彙總交貨日落在 [start, end] 區間內的需求
    pub fn within_window(
        orders: &[Order],
        statuses: &[OrderStatus],
        start: NaiveDate,
        end: NaiveDate,
    ) -> HashMap<Uuid, AggregatedDemand> {
        Self::aggregate(orders, statuses, |date| date >= start && date <= end)
    }

    fn aggregate(
        orders: &[Order],
        statuses: &[OrderStatus],
        date_filter: impl Fn(NaiveDate) -> bool,
    ) -> HashMap<Uuid, AggregatedDemand> {
        let mut grouped: HashMap<Uuid, AggregatedDemand> = HashMap::new();

        for order in orders
            .iter()
            .filter(|o| statuses.contains(&o.status) && date_filter(o.delivery_date))
        {
            for item in &order.items {
                grouped
                    .entry(item.product_id)
                    .or_default()
                    .add(order.id, item.quantity);
            }
        }

        grouped
    }
}
