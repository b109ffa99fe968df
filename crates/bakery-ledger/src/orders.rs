//! 訂單服務：建立、狀態轉換、鎖定/解鎖、內容修改

use bakery_core::{
    authorize, numbering, Action, Actor, BakeryError, Order, OrderItem, OrderStatus,
    ResourceState, Result,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::engine::BakeryEngine;
use crate::store::Transaction;

impl BakeryEngine {
    /// 建立草稿訂單，編號 `ORD-YYYYMMDD-NNNN`（以今天為範圍）
    pub fn create_order(
        &self,
        customer_ref: &str,
        delivery_date: NaiveDate,
        items: Vec<OrderItem>,
        actor: &Actor,
    ) -> Result<Order> {
        authorize(actor, Action::CreateOrder, ResourceState::None)?;
        let today = self.clock().today();

        self.store().transaction(|tx| {
            validate_items(tx, &items)?;

            let seq = tx.next_sequence(&numbering::order_scope(today));
            let number =
                numbering::order_number(today, seq, self.config().document_sequence_width);
            let order = Order::new(number, customer_ref, delivery_date, items);

            tracing::info!(
                "建立訂單 {}：客戶 {}，交貨日 {}，明細 {} 筆",
                order.order_number,
                order.customer_ref,
                order.delivery_date,
                order.items.len()
            );
            tx.put_order(order.clone());
            Ok(order)
        })
    }

    pub fn order(&self, order_id: Uuid) -> Result<Order> {
        self.store().read(|s| {
            s.orders
                .get(&order_id)
                .cloned()
                .ok_or_else(|| BakeryError::not_found("訂單", order_id))
        })
    }

    /// 依狀態機轉換訂單狀態
    ///
    /// 進入 `LOCKED` 需要鎖定權限；`LOCKED → CONFIRMED` 即解鎖，僅限最高權限角色。
    /// 檢查與寫入在同一交易內完成，兩個並行的鎖定請求只會有一個成功。
    pub fn transition_order_status(
        &self,
        order_id: Uuid,
        next: OrderStatus,
        actor: &Actor,
    ) -> Result<Order> {
        let now = self.clock().now();

        self.store().transaction(|tx| {
            let mut order = tx.order(order_id)?.clone();

            let action = match (order.status, next) {
                (_, OrderStatus::Locked) => Action::LockOrder,
                (OrderStatus::Locked, OrderStatus::Confirmed) => Action::UnlockOrder,
                _ => Action::TransitionOrder,
            };
            authorize(actor, action, ResourceState::Order { locked: order.is_locked() })?;

            // 僅在 LOCKED 狀態重複鎖定時回報已鎖定，其餘非法來源交由狀態機回報
            if next == OrderStatus::Locked && order.is_locked() {
                return Err(BakeryError::LockedResource(format!(
                    "訂單 {} 已由 {} 鎖定",
                    order.order_number,
                    order.locked_by.as_deref().unwrap_or("-")
                )));
            }

            let from = order.status;
            order.transition(next, &actor.name, now)?;
            tracing::info!(
                "訂單 {}: {} → {} (by {})",
                order.order_number,
                from,
                next,
                actor.name
            );

            tx.put_order(order.clone());
            Ok(order)
        })
    }

    pub fn lock_order(&self, order_id: Uuid, actor: &Actor) -> Result<Order> {
        self.transition_order_status(order_id, OrderStatus::Locked, actor)
    }

    pub fn unlock_order(&self, order_id: Uuid, actor: &Actor) -> Result<Order> {
        self.transition_order_status(order_id, OrderStatus::Confirmed, actor)
    }

    /// 修改訂單明細（鎖定中僅限最高權限角色）
    pub fn update_order_items(
        &self,
        order_id: Uuid,
        items: Vec<OrderItem>,
        actor: &Actor,
    ) -> Result<Order> {
        self.store().transaction(|tx| {
            let mut order = tx.order(order_id)?.clone();
            authorize(
                actor,
                Action::EditOrder,
                ResourceState::Order {
                    locked: order.is_locked(),
                },
            )?;

            if !order.status.is_editable() {
                return Err(BakeryError::LockedResource(format!(
                    "訂單 {} 狀態為 {}，不可修改內容",
                    order.order_number, order.status
                )));
            }
            validate_items(tx, &items)?;

            if order.is_locked() {
                tracing::warn!(
                    "鎖定中的訂單 {} 由 {} 修改內容",
                    order.order_number,
                    actor.name
                );
            }
            order.items = items;
            tx.put_order(order.clone());
            Ok(order)
        })
    }
}

fn validate_items(tx: &Transaction<'_>, items: &[OrderItem]) -> Result<()> {
    if items.is_empty() {
        return Err(BakeryError::InsufficientData("訂單至少需要一筆明細".to_string()));
    }
    for item in items {
        tx.product(item.product_id)?;
        if item.quantity <= Decimal::ZERO {
            return Err(BakeryError::InsufficientData(format!(
                "訂購數量必須大於 0，收到 {}",
                item.quantity
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, engine, manager, today};
    use bakery_core::{Product, Role, UnitOfMeasure};

    fn sales() -> Actor {
        Actor::new("sales", Role::Sales)
    }

    fn confirmed_order(engine: &BakeryEngine) -> Order {
        let bread = engine
            .register_product(
                Product::new("BREAD", "吐司", UnitOfMeasure::Pcs, "BRD"),
                &manager(),
            )
            .unwrap();
        let order = engine
            .create_order(
                "CAFE",
                today(),
                vec![OrderItem::new(bread.id, Decimal::from(24))],
                &sales(),
            )
            .unwrap();
        engine
            .transition_order_status(order.id, OrderStatus::Pending, &sales())
            .unwrap();
        engine
            .transition_order_status(order.id, OrderStatus::Confirmed, &sales())
            .unwrap()
    }

    #[test]
    fn test_order_numbers_are_sequential_per_day() {
        let engine = engine();
        let first = confirmed_order(&engine);
        let bread_id = first.items[0].product_id;
        let second = engine
            .create_order("HOTEL", today(), vec![OrderItem::new(bread_id, Decimal::ONE)], &sales())
            .unwrap();

        assert_eq!(first.order_number, "ORD-20251103-0001");
        assert_eq!(second.order_number, "ORD-20251103-0002");
        assert_eq!(second.status, OrderStatus::Draft);
    }

    #[test]
    fn test_empty_or_non_positive_items_rejected() {
        let engine = engine();
        let order = confirmed_order(&engine);
        let bread_id = order.items[0].product_id;

        assert!(engine.create_order("X", today(), vec![], &sales()).is_err());
        assert!(engine
            .create_order("X", today(), vec![OrderItem::new(bread_id, Decimal::ZERO)], &sales())
            .is_err());
        assert!(engine
            .create_order("X", today(), vec![OrderItem::new(Uuid::new_v4(), Decimal::ONE)], &sales())
            .is_err());
    }

    #[test]
    fn test_illegal_transition_names_allowed_set() {
        let engine = engine();
        let order = confirmed_order(&engine);

        let err = engine
            .transition_order_status(order.id, OrderStatus::Delivered, &sales())
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("LOCKED"));
        assert!(message.contains("IN_PRODUCTION"));
        assert_eq!(engine.order(order.id).unwrap().status, OrderStatus::Confirmed);
    }

    #[test]
    fn test_lock_then_edit_requires_admin() {
        let engine = engine();
        let order = confirmed_order(&engine);
        let bread_id = order.items[0].product_id;

        let locked = engine.lock_order(order.id, &manager()).unwrap();
        assert!(locked.is_locked());
        assert_eq!(locked.locked_by.as_deref(), Some("manager"));

        let edit = vec![OrderItem::new(bread_id, Decimal::from(30))];
        assert!(matches!(
            engine.update_order_items(order.id, edit.clone(), &manager()),
            Err(BakeryError::LockedResource(_))
        ));
        let updated = engine.update_order_items(order.id, edit, &admin()).unwrap();
        assert_eq!(updated.quantity_for(bread_id), Decimal::from(30));
    }

    #[test]
    fn test_second_lock_is_rejected() {
        let engine = engine();
        let order = confirmed_order(&engine);

        engine.lock_order(order.id, &manager()).unwrap();
        assert!(matches!(
            engine.lock_order(order.id, &admin()),
            Err(BakeryError::LockedResource(_))
        ));
    }

    #[test]
    fn test_lock_after_production_start_is_invalid_transition() {
        let engine = engine();
        let order = confirmed_order(&engine);
        engine.lock_order(order.id, &manager()).unwrap();
        let started = engine
            .transition_order_status(order.id, OrderStatus::InProduction, &manager())
            .unwrap();
        assert!(!started.is_locked());

        match engine.lock_order(order.id, &admin()) {
            Err(BakeryError::InvalidTransition { from, allowed, .. }) => {
                assert_eq!(from, "IN_PRODUCTION");
                assert_eq!(allowed, vec!["READY".to_string(), "CANCELLED".to_string()]);
            }
            other => panic!("預期 InvalidTransition，得到 {other:?}"),
        }
        assert_eq!(engine.order(order.id).unwrap().status, OrderStatus::InProduction);
    }

    #[test]
    fn test_cancelled_locked_order_reports_terminal_state() {
        let engine = engine();
        let order = confirmed_order(&engine);
        engine.lock_order(order.id, &manager()).unwrap();
        engine
            .transition_order_status(order.id, OrderStatus::Cancelled, &manager())
            .unwrap();

        assert!(matches!(
            engine.lock_order(order.id, &manager()),
            Err(BakeryError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_unlock_is_admin_only_and_reverts_to_confirmed() {
        let engine = engine();
        let order = confirmed_order(&engine);
        engine.lock_order(order.id, &manager()).unwrap();

        assert!(matches!(
            engine.unlock_order(order.id, &manager()),
            Err(BakeryError::Forbidden { .. })
        ));

        let unlocked = engine.unlock_order(order.id, &admin()).unwrap();
        assert_eq!(unlocked.status, OrderStatus::Confirmed);
        assert!(!unlocked.is_locked());
    }

    #[test]
    fn test_sales_cannot_lock() {
        let engine = engine();
        let order = confirmed_order(&engine);

        assert!(matches!(
            engine.lock_order(order.id, &sales()),
            Err(BakeryError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_dispatched_order_is_not_editable() {
        let engine = engine();
        let order = confirmed_order(&engine);
        let bread_id = order.items[0].product_id;
        for next in [OrderStatus::InProduction, OrderStatus::Ready, OrderStatus::Dispatched] {
            engine.transition_order_status(order.id, next, &sales()).unwrap();
        }

        assert!(matches!(
            engine.update_order_items(order.id, vec![OrderItem::new(bread_id, Decimal::ONE)], &admin()),
            Err(BakeryError::LockedResource(_))
        ));
    }
}
