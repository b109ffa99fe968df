//! 生產工單：由計劃建立工單、狀態轉換、生產回報

use bakery_calc::ProductionPlan;
use bakery_core::{
    authorize, numbering, Action, Actor, BakeryError, ConsumedMaterial, ItemRef, MovementType,
    ProductionReport, ReferenceType, ResourceState, Result, WorkOrder, WorkOrderItem,
    WorkOrderStatus,
};
use chrono::Duration;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::engine::BakeryEngine;
use crate::ledger::{AdjustStockRequest, MovementLedger};

/// 生產回報請求
#[derive(Debug, Clone)]
pub struct ReportProductionRequest {
    pub work_order_id: Uuid,
    pub work_order_item_id: Uuid,
    pub produced_quantity: Decimal,
    pub waste_quantity: Decimal,
    pub waste_reason: Option<String>,
}

impl ReportProductionRequest {
    pub fn new(work_order_id: Uuid, work_order_item_id: Uuid, produced_quantity: Decimal) -> Self {
        Self {
            work_order_id,
            work_order_item_id,
            produced_quantity,
            waste_quantity: Decimal::ZERO,
            waste_reason: None,
        }
    }

    /// 建構器模式：設置損耗
    pub fn with_waste(mut self, quantity: Decimal, reason: impl Into<String>) -> Self {
        self.waste_quantity = quantity;
        self.waste_reason = Some(reason.into());
        self
    }
}

impl BakeryEngine {
    /// 依計劃建立工單：淨需求 > 0 的產品依生產線分組，每條線一張工單
    pub fn create_work_orders(&self, plan: &ProductionPlan, actor: &Actor) -> Result<Vec<WorkOrder>> {
        authorize(actor, Action::CreateWorkOrders, ResourceState::None)?;
        let today = self.clock().today();

        let mut by_line: BTreeMap<&str, Vec<WorkOrderItem>> = BTreeMap::new();
        for demand in plan.production_demands() {
            by_line
                .entry(demand.production_line.as_str())
                .or_default()
                .push(WorkOrderItem::new(demand.product_id, demand.net_to_produce));
        }

        if by_line.is_empty() {
            tracing::info!("計劃 {} 沒有需要生產的產品", plan.target_date);
            return Ok(Vec::new());
        }

        self.store().transaction(|tx| {
            let mut created = Vec::with_capacity(by_line.len());
            for (line, items) in by_line {
                for item in &items {
                    tx.product(item.product_id)?;
                }

                let seq = tx.next_sequence(&numbering::work_order_scope(today));
                let number =
                    numbering::work_order_number(today, seq, self.config().document_sequence_width);
                let work_order =
                    WorkOrder::new(number, line, plan.target_date, items, actor.name.clone());

                tracing::info!(
                    "建立工單 {}：生產線 {}，排程 {}，產品 {} 項",
                    work_order.work_order_number,
                    line,
                    work_order.scheduled_date,
                    work_order.items.len()
                );
                tx.put_work_order(work_order.clone());
                created.push(work_order);
            }
            Ok(created)
        })
    }

    pub fn work_order(&self, work_order_id: Uuid) -> Result<WorkOrder> {
        self.store().read(|s| {
            s.work_orders
                .get(&work_order_id)
                .cloned()
                .ok_or_else(|| BakeryError::not_found("工單", work_order_id))
        })
    }

    /// 工單狀態轉換（含取消）
    pub fn transition_work_order(
        &self,
        work_order_id: Uuid,
        next: WorkOrderStatus,
        actor: &Actor,
    ) -> Result<WorkOrder> {
        authorize(actor, Action::TransitionWorkOrder, ResourceState::None)?;
        let now = self.clock().now();

        self.store().transaction(|tx| {
            let mut work_order = tx.work_order(work_order_id)?.clone();
            let from = work_order.status;
            work_order.transition(next, now)?;

            tracing::info!(
                "工單 {}: {} → {} (by {})",
                work_order.work_order_number,
                from,
                next,
                actor.name
            );
            tx.put_work_order(work_order.clone());
            Ok(work_order)
        })
    }

    /// 工單的生產回報（依回報順序）
    pub fn reports_for(&self, work_order_id: Uuid) -> Vec<ProductionReport> {
        self.store().read(|s| {
            s.reports
                .iter()
                .filter(|r| r.work_order_id == work_order_id)
                .cloned()
                .collect()
        })
    }

    /// 生產回報
    ///
    /// 單一交易內：更新明細累計、寫入成品產出、依啟用 BOM 扣減原料、
    /// 保存耗用快照、必要時完成工單。任何一步失敗則全部復原。
    pub fn report_production(
        &self,
        request: ReportProductionRequest,
        actor: &Actor,
    ) -> Result<ProductionReport> {
        authorize(actor, Action::ReportProduction, ResourceState::None)?;
        if request.produced_quantity <= Decimal::ZERO {
            return Err(BakeryError::InsufficientData(format!(
                "生產數量必須大於 0，收到 {}",
                request.produced_quantity
            )));
        }
        if request.waste_quantity < Decimal::ZERO {
            return Err(BakeryError::InsufficientData(format!(
                "損耗數量不可為負，收到 {}",
                request.waste_quantity
            )));
        }

        let now = self.clock().now();
        let today = self.clock().today();
        let config = self.config();

        self.store().transaction(|tx| {
            let mut work_order = tx.work_order(request.work_order_id)?.clone();
            // planned → in_progress；已在進行中則為冪等轉換；已結束則拒絕
            work_order.transition(WorkOrderStatus::InProgress, now)?;

            let item = work_order
                .item_mut(request.work_order_item_id)
                .ok_or_else(|| BakeryError::not_found("工單明細", request.work_order_item_id))?;
            item.record_output(request.produced_quantity, request.waste_quantity)?;
            let product_id = item.product_id;

            let product = tx.product(product_id)?.clone();
            let bom = tx.state().active_bom(product_id).cloned();

            let seq = tx.next_sequence(&numbering::batch_scope(today, &work_order.production_line));
            let batch_number = numbering::batch_number(
                today,
                &work_order.production_line,
                seq,
                config.batch_sequence_width,
            );
            let expiry_date = match product.shelf_life_days {
                Some(days) => Some(
                    today
                        .checked_add_signed(Duration::days(i64::from(days)))
                        .ok_or_else(|| {
                            BakeryError::InsufficientData(format!(
                                "產品 {} 的保存天數 {} 超出可表示的日期範圍",
                                product.code, days
                            ))
                        })?,
                ),
                None => None,
            };

            MovementLedger::adjust_stock(
                tx,
                config,
                AdjustStockRequest::new(
                    product.item_ref(),
                    request.produced_quantity,
                    MovementType::ProductionOutput,
                    product.unit,
                )
                .with_reference(ReferenceType::WorkOrder, work_order.id)
                .with_batch(batch_number.clone(), expiry_date)
                .with_actor(actor.name.clone()),
                now,
            )?;

            let mut consumed_materials = Vec::new();
            if let Some(bom) = &bom {
                let batches = bom.scale_factor(request.produced_quantity);
                for line in &bom.lines {
                    let material = tx.material(line.material_id)?.clone();
                    let quantity =
                        bakery_calc::ceil_dp(line.quantity * batches, config.quantity_scale);

                    let (_, movement) = MovementLedger::adjust_stock(
                        tx,
                        config,
                        AdjustStockRequest::new(
                            ItemRef::raw_material(material.id),
                            -quantity,
                            MovementType::ProductionInput,
                            material.unit,
                        )
                        .with_reference(ReferenceType::WorkOrder, work_order.id)
                        .with_batch(batch_number.clone(), None)
                        .with_actor(actor.name.clone()),
                        now,
                    )?;

                    consumed_materials.push(ConsumedMaterial {
                        material_id: material.id,
                        material_code: material.code,
                        quantity,
                        unit: material.unit,
                        movement_id: movement.id,
                    });
                }
            } else {
                tracing::warn!("產品 {} 沒有啟用中的 BOM，不扣減原料", product.code);
            }

            let report = ProductionReport {
                id: Uuid::new_v4(),
                work_order_id: work_order.id,
                work_order_item_id: request.work_order_item_id,
                product_id,
                produced_quantity: request.produced_quantity,
                waste_quantity: request.waste_quantity,
                waste_reason: request.waste_reason.clone(),
                batch_number,
                expiry_date,
                bom_id: bom.as_ref().map(|b| b.id),
                consumed_materials,
                reported_by: actor.name.clone(),
                reported_at: now,
            };
            tx.push_report(report.clone());

            if work_order.all_items_completed() {
                work_order.transition(WorkOrderStatus::Completed, now)?;
                tracing::info!("工單 {} 所有明細完成", work_order.work_order_number);
            }
            tx.put_work_order(work_order);

            tracing::info!(
                "生產回報 {}：{} 產出 {}，損耗 {}，耗用原料 {} 項",
                report.batch_number,
                product.code,
                report.produced_quantity,
                report.waste_quantity,
                report.consumed_materials.len()
            );
            Ok(report)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FaultPoint;
    use crate::test_support::{engine, manager, today};
    use bakery_core::{Bom, BomLine, OrderItem, OrderStatus, Product, RawMaterial, Role, UnitOfMeasure};

    struct Bakery {
        engine: BakeryEngine,
        bread: Product,
        flour: RawMaterial,
        butter: RawMaterial,
    }

    /// 吐司（BRD 線，保存 3 天）：批量 100，麵粉 50、奶油 5
    fn bakery() -> Bakery {
        let engine = engine();
        let bread = engine
            .register_product(
                Product::new("BREAD", "吐司", UnitOfMeasure::Pcs, "BRD").with_shelf_life_days(3),
                &manager(),
            )
            .unwrap();
        let flour = engine
            .register_material(RawMaterial::new("FLOUR", "麵粉", UnitOfMeasure::Kg), &manager())
            .unwrap();
        let butter = engine
            .register_material(RawMaterial::new("BUTTER", "奶油", UnitOfMeasure::Kg), &manager())
            .unwrap();
        let bom = engine
            .create_bom_version(
                Bom::new(bread.id, Decimal::from(100))
                    .with_line(BomLine::new(flour.id, Decimal::from(50)).with_waste_percentage(Decimal::from(2)))
                    .with_line(BomLine::new(butter.id, Decimal::from(5))),
                &manager(),
            )
            .unwrap();
        engine.activate_bom(bom.id, &manager()).unwrap();
        engine
            .adjust_manual(flour.item_ref(), Decimal::from(200), "期初", &manager())
            .unwrap();
        engine
            .adjust_manual(butter.item_ref(), Decimal::from(20), "期初", &manager())
            .unwrap();

        Bakery {
            engine,
            bread,
            flour,
            butter,
        }
    }

    fn planned_work_order(b: &Bakery, quantity: i64) -> WorkOrder {
        let sales = Actor::new("sales", Role::Sales);
        let order = b
            .engine
            .create_order("CAFE", today(), vec![OrderItem::new(b.bread.id, Decimal::from(quantity))], &sales)
            .unwrap();
        for next in [OrderStatus::Pending, OrderStatus::Confirmed] {
            b.engine.transition_order_status(order.id, next, &sales).unwrap();
        }
        let plan = b.engine.generate_plan(today()).unwrap();
        b.engine
            .create_work_orders(&plan, &manager())
            .unwrap()
            .remove(0)
    }

    fn on_hand(engine: &BakeryEngine, item: ItemRef) -> Decimal {
        engine.stock(item).map(|s| s.quantity_on_hand).unwrap_or(Decimal::ZERO)
    }

    #[test]
    fn test_work_orders_grouped_by_line() {
        let b = bakery();
        let cake = b
            .engine
            .register_product(Product::new("CAKE", "蛋糕", UnitOfMeasure::Pcs, "PAS"), &manager())
            .unwrap();
        let roll = b
            .engine
            .register_product(Product::new("ROLL", "餐包", UnitOfMeasure::Pcs, "BRD"), &manager())
            .unwrap();
        let sales = Actor::new("sales", Role::Sales);
        let order = b
            .engine
            .create_order(
                "CAFE",
                today(),
                vec![
                    OrderItem::new(b.bread.id, Decimal::from(10)),
                    OrderItem::new(cake.id, Decimal::from(4)),
                    OrderItem::new(roll.id, Decimal::from(30)),
                ],
                &sales,
            )
            .unwrap();
        for next in [OrderStatus::Pending, OrderStatus::Confirmed] {
            b.engine.transition_order_status(order.id, next, &sales).unwrap();
        }

        let plan = b.engine.generate_plan(today()).unwrap();
        let work_orders = b.engine.create_work_orders(&plan, &manager()).unwrap();

        assert_eq!(work_orders.len(), 2);
        assert_eq!(work_orders[0].production_line, "BRD");
        assert_eq!(work_orders[0].items.len(), 2);
        assert_eq!(work_orders[0].work_order_number, "WO-20251103-0001");
        assert_eq!(work_orders[1].production_line, "PAS");
        assert_eq!(work_orders[1].work_order_number, "WO-20251103-0002");
        assert!(work_orders.iter().all(|w| w.status == WorkOrderStatus::Planned));
    }

    #[test]
    fn test_report_deducts_per_bom_line() {
        let b = bakery();
        let wo = planned_work_order(&b, 100);
        let item_id = wo.items[0].id;

        let report = b
            .engine
            .report_production(
                ReportProductionRequest::new(wo.id, item_id, Decimal::from(50))
                    .with_waste(Decimal::from(2), "燒焦"),
                &manager(),
            )
            .unwrap();

        assert_eq!(report.batch_number, "20251103-BRD-001");
        assert_eq!(report.expiry_date, Some(today() + Duration::days(3)));
        assert_eq!(report.consumed_materials.len(), 2);
        // 50 / 100 × 50 = 25（扣減不含損耗率）
        assert_eq!(on_hand(&b.engine, b.flour.item_ref()), Decimal::from(175));
        assert_eq!(on_hand(&b.engine, b.butter.item_ref()), Decimal::new(175, 1));
        assert_eq!(on_hand(&b.engine, b.bread.item_ref()), Decimal::from(50));

        let wo = b.engine.work_order(wo.id).unwrap();
        assert_eq!(wo.status, WorkOrderStatus::InProgress);
        assert!(wo.actual_start.is_some());
        assert_eq!(wo.items[0].produced_quantity, Decimal::from(50));
        assert_eq!(wo.items[0].waste_quantity, Decimal::from(2));
    }

    #[test]
    fn test_final_report_completes_work_order() {
        let b = bakery();
        let wo = planned_work_order(&b, 100);
        let item_id = wo.items[0].id;

        b.engine
            .report_production(ReportProductionRequest::new(wo.id, item_id, Decimal::from(60)), &manager())
            .unwrap();
        let second = b
            .engine
            .report_production(ReportProductionRequest::new(wo.id, item_id, Decimal::from(40)), &manager())
            .unwrap();

        assert_eq!(second.batch_number, "20251103-BRD-002");
        let wo = b.engine.work_order(wo.id).unwrap();
        assert_eq!(wo.status, WorkOrderStatus::Completed);
        assert!(wo.actual_end.is_some());
        assert_eq!(b.engine.reports_for(wo.id).len(), 2);

        // 已完成的工單不再接受回報
        assert!(matches!(
            b.engine.report_production(
                ReportProductionRequest::new(wo.id, item_id, Decimal::ONE),
                &manager()
            ),
            Err(BakeryError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_failed_report_rolls_back_everything() {
        let b = bakery();
        let wo = planned_work_order(&b, 100);
        let item_id = wo.items[0].id;

        // 成品產出成功，第一筆原料扣減後失敗
        b.engine.store().arm_fault(FaultPoint::AfterMovementWrite, 1);
        let result = b.engine.report_production(
            ReportProductionRequest::new(wo.id, item_id, Decimal::from(50)),
            &manager(),
        );
        assert!(matches!(result, Err(BakeryError::Transaction(_))));

        assert_eq!(on_hand(&b.engine, b.flour.item_ref()), Decimal::from(200));
        assert_eq!(on_hand(&b.engine, b.bread.item_ref()), Decimal::ZERO);
        assert!(b.engine.reports_for(wo.id).is_empty());
        let wo = b.engine.work_order(wo.id).unwrap();
        assert_eq!(wo.status, WorkOrderStatus::Planned);
        assert_eq!(wo.items[0].produced_quantity, Decimal::ZERO);
        assert!(b.engine.reconcile().is_consistent());

        // 批號序號也一併復原
        let report = b
            .engine
            .report_production(ReportProductionRequest::new(wo.id, item_id, Decimal::from(50)), &manager())
            .unwrap();
        assert_eq!(report.batch_number, "20251103-BRD-001");
    }

    #[test]
    fn test_unrepresentable_expiry_rejects_report() {
        let b = bakery();
        let loaf = b
            .engine
            .register_product(
                Product::new("LOAF", "長效麵包", UnitOfMeasure::Pcs, "BRD").with_shelf_life_days(u32::MAX),
                &manager(),
            )
            .unwrap();
        let bom = b
            .engine
            .create_bom_version(
                Bom::new(loaf.id, Decimal::from(10)).with_line(BomLine::new(b.flour.id, Decimal::from(5))),
                &manager(),
            )
            .unwrap();
        b.engine.activate_bom(bom.id, &manager()).unwrap();

        let sales = Actor::new("sales", Role::Sales);
        let order = b
            .engine
            .create_order("CAFE", today(), vec![OrderItem::new(loaf.id, Decimal::from(10))], &sales)
            .unwrap();
        for next in [OrderStatus::Pending, OrderStatus::Confirmed] {
            b.engine.transition_order_status(order.id, next, &sales).unwrap();
        }
        let plan = b.engine.generate_plan(today()).unwrap();
        let wo = b.engine.create_work_orders(&plan, &manager()).unwrap().remove(0);
        let item_id = wo.items[0].id;

        let result = b.engine.report_production(
            ReportProductionRequest::new(wo.id, item_id, Decimal::from(10)),
            &manager(),
        );
        assert!(matches!(result, Err(BakeryError::InsufficientData(_))));

        assert_eq!(on_hand(&b.engine, b.flour.item_ref()), Decimal::from(200));
        assert_eq!(on_hand(&b.engine, loaf.item_ref()), Decimal::ZERO);
        assert!(b.engine.reports_for(wo.id).is_empty());
        assert_eq!(b.engine.work_order(wo.id).unwrap().status, WorkOrderStatus::Planned);
        assert!(b.engine.reconcile().is_consistent());
    }

    #[test]
    fn test_report_validation() {
        let b = bakery();
        let wo = planned_work_order(&b, 100);
        let item_id = wo.items[0].id;

        assert!(b
            .engine
            .report_production(ReportProductionRequest::new(wo.id, item_id, Decimal::ZERO), &manager())
            .is_err());
        assert!(b
            .engine
            .report_production(
                ReportProductionRequest::new(wo.id, item_id, Decimal::ONE).with_waste(Decimal::NEGATIVE_ONE, "?"),
                &manager()
            )
            .is_err());
        assert!(matches!(
            b.engine.report_production(
                ReportProductionRequest::new(wo.id, Uuid::new_v4(), Decimal::ONE),
                &manager()
            ),
            Err(BakeryError::NotFound { .. })
        ));
        assert!(matches!(
            b.engine.report_production(
                ReportProductionRequest::new(wo.id, item_id, Decimal::ONE),
                &Actor::new("viewer", Role::Viewer)
            ),
            Err(BakeryError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_cancel_work_order() {
        let b = bakery();
        let wo = planned_work_order(&b, 100);

        let cancelled = b
            .engine
            .transition_work_order(wo.id, WorkOrderStatus::Cancelled, &manager())
            .unwrap();
        assert_eq!(cancelled.status, WorkOrderStatus::Cancelled);
        assert!(cancelled.items.iter().all(|i| i.status == WorkOrderStatus::Cancelled));

        assert!(b
            .engine
            .transition_work_order(wo.id, WorkOrderStatus::InProgress, &manager())
            .is_err());
    }

    #[test]
    fn test_consumed_snapshot_survives_bom_change() {
        let b = bakery();
        let wo = planned_work_order(&b, 100);
        let report = b
            .engine
            .report_production(
                ReportProductionRequest::new(wo.id, wo.items[0].id, Decimal::from(100)),
                &manager(),
            )
            .unwrap();

        let v2 = b
            .engine
            .create_bom_version(
                Bom::new(b.bread.id, Decimal::from(100)).with_line(BomLine::new(b.flour.id, Decimal::from(70))),
                &manager(),
            )
            .unwrap();
        b.engine.activate_bom(v2.id, &manager()).unwrap();

        let stored = &b.engine.reports_for(wo.id)[0];
        assert_eq!(stored.consumed_materials, report.consumed_materials);
        assert_eq!(stored.consumed_materials[0].quantity, Decimal::from(50));
    }
}
