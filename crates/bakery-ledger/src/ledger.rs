//! 庫存異動帳
//!
//! 所有影響庫存的操作（手動調整、損壞、進貨、生產投入/產出、盤點）
//! 都建立在 [`MovementLedger::adjust_stock`] 這個原語之上。

use bakery_core::{
    authorize, Action, Actor, BakeryError, EngineConfig, InventoryMovement, InventoryStock,
    ItemRef, MovementType, ReferenceType, ResourceState, Result, UnitOfMeasure,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::engine::BakeryEngine;
use crate::store::{FaultPoint, StoreState, Transaction};

/// 庫存調整請求
#[derive(Debug, Clone)]
pub struct AdjustStockRequest {
    pub item: ItemRef,
    pub quantity: Decimal,
    pub movement_type: MovementType,
    pub unit: UnitOfMeasure,
    pub reference_type: Option<ReferenceType>,
    pub reference_id: Option<Uuid>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub actor: Option<String>,
}

impl AdjustStockRequest {
    pub fn new(
        item: ItemRef,
        quantity: Decimal,
        movement_type: MovementType,
        unit: UnitOfMeasure,
    ) -> Self {
        Self {
            item,
            quantity,
            movement_type,
            unit,
            reference_type: None,
            reference_id: None,
            batch_number: None,
            expiry_date: None,
            reason: None,
            actor: None,
        }
    }

    /// 建構器模式：設置來源單據
    pub fn with_reference(mut self, reference_type: ReferenceType, reference_id: Uuid) -> Self {
        self.reference_type = Some(reference_type);
        self.reference_id = Some(reference_id);
        self
    }

    /// 建構器模式：設置批號與到期日
    pub fn with_batch(mut self, batch_number: String, expiry_date: Option<NaiveDate>) -> Self {
        self.batch_number = Some(batch_number);
        self.expiry_date = expiry_date;
        self
    }

    /// 建構器模式：設置原因
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// 建構器模式：設置回報人
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

/// 快取餘額與異動帳總和的差異
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceDrift {
    pub item: ItemRef,
    pub cached_on_hand: Decimal,
    pub ledger_sum: Decimal,
}

impl BalanceDrift {
    pub fn difference(&self) -> Decimal {
        self.cached_on_hand - self.ledger_sum
    }
}

/// 對帳結果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconciliationReport {
    pub items_checked: usize,
    pub drifts: Vec<BalanceDrift>,
}

impl ReconciliationReport {
    pub fn is_consistent(&self) -> bool {
        self.drifts.is_empty()
    }
}

/// 異動帳
pub struct MovementLedger;

impl MovementLedger {
    /// 調整庫存：更新餘額並寫入一筆異動（在呼叫端的交易內）
    ///
    /// 無庫存記錄時建立新記錄；`clamp_opening_balance` 開啟時期初餘額為 max(0, 數量)，
    /// 後續調整直接加上帶號數量，不做截斷。
    pub fn adjust_stock(
        tx: &mut Transaction<'_>,
        config: &EngineConfig,
        request: AdjustStockRequest,
        now: DateTime<Utc>,
    ) -> Result<(InventoryStock, InventoryMovement)> {
        if !tx.state().item_exists(&request.item) {
            return Err(BakeryError::not_found("庫存項目", request.item));
        }

        let stock = match tx.state().stock.get(&request.item) {
            Some(existing) => {
                let mut updated = existing.clone();
                updated.quantity_on_hand += request.quantity;
                updated.updated_at = now;
                updated
            }
            None => {
                let opening = if config.clamp_opening_balance {
                    request.quantity.max(Decimal::ZERO)
                } else {
                    request.quantity
                };
                if opening != request.quantity {
                    tracing::warn!(
                        "項目 {} 首筆異動 {} 為負，期初餘額截為 0",
                        request.item,
                        request.quantity
                    );
                }
                InventoryStock::new(request.item, opening, now)
            }
        };
        tx.put_stock(stock.clone());
        tx.checkpoint(FaultPoint::AfterBalanceUpdate)?;

        let movement = InventoryMovement {
            id: Uuid::new_v4(),
            item: request.item,
            quantity: request.quantity,
            movement_type: request.movement_type,
            unit: request.unit,
            batch_number: request.batch_number,
            expiry_date: request.expiry_date,
            reference_type: request.reference_type,
            reference_id: request.reference_id,
            reason: request.reason,
            reported_by: request.actor,
            created_at: now,
        };
        tx.push_movement(movement.clone());
        tx.checkpoint(FaultPoint::AfterMovementWrite)?;

        tracing::debug!(
            "庫存異動 {}: {} {} {} → 現有 {}",
            movement.movement_type,
            movement.item,
            movement.quantity,
            movement.unit,
            stock.quantity_on_hand
        );

        Ok((stock, movement))
    }

    /// 各項目異動總和
    pub fn ledger_sums(state: &StoreState) -> HashMap<ItemRef, Decimal> {
        let mut sums: HashMap<ItemRef, Decimal> = HashMap::new();
        for movement in &state.movements {
            *sums.entry(movement.item).or_insert(Decimal::ZERO) += movement.quantity;
        }
        sums
    }

    /// 對帳：比較快取餘額與異動帳總和
    pub fn reconcile(state: &StoreState) -> ReconciliationReport {
        let sums = Self::ledger_sums(state);

        let mut drifts: Vec<BalanceDrift> = state
            .stock
            .values()
            .filter_map(|stock| {
                let ledger_sum = sums.get(&stock.item).copied().unwrap_or(Decimal::ZERO);
                (ledger_sum != stock.quantity_on_hand).then_some(BalanceDrift {
                    item: stock.item,
                    cached_on_hand: stock.quantity_on_hand,
                    ledger_sum,
                })
            })
            .collect();
        drifts.sort_by_key(|d| d.item);

        ReconciliationReport {
            items_checked: state.stock.len(),
            drifts,
        }
    }
}

impl BakeryEngine {
    /// 直接呼叫異動帳原語（單一交易）
    pub fn adjust_stock(
        &self,
        request: AdjustStockRequest,
        actor: &Actor,
    ) -> Result<(InventoryStock, InventoryMovement)> {
        authorize(actor, Action::AdjustStock, ResourceState::None)?;
        let now = self.clock().now();
        let request = match request.actor {
            Some(_) => request,
            None => request.with_actor(actor.name.clone()),
        };
        self.store()
            .transaction(|tx| MovementLedger::adjust_stock(tx, self.config(), request, now))
    }

    /// 手動調整（正數為 ADJUSTMENT_PLUS，負數為 ADJUSTMENT_MINUS）
    pub fn adjust_manual(
        &self,
        item: ItemRef,
        quantity: Decimal,
        reason: &str,
        actor: &Actor,
    ) -> Result<(InventoryStock, InventoryMovement)> {
        authorize(actor, Action::AdjustStock, ResourceState::None)?;
        require_non_zero(quantity)?;
        let movement_type = if quantity > Decimal::ZERO {
            MovementType::AdjustmentPlus
        } else {
            MovementType::AdjustmentMinus
        };
        let adjustment_id = Uuid::new_v4();
        self.signed_movement(item, quantity, movement_type, actor, |req| {
            req.with_reference(ReferenceType::Adjustment, adjustment_id)
                .with_reason(reason)
        })
    }

    /// 損壞回報（扣減）
    pub fn report_damage(
        &self,
        item: ItemRef,
        quantity: Decimal,
        reason: &str,
        actor: &Actor,
    ) -> Result<(InventoryStock, InventoryMovement)> {
        authorize(actor, Action::ReportDamage, ResourceState::None)?;
        require_positive(quantity)?;
        self.signed_movement(item, -quantity, MovementType::Damaged, actor, |req| {
            req.with_reason(reason)
        })
    }

    /// 報廢（扣減）
    pub fn record_waste(
        &self,
        item: ItemRef,
        quantity: Decimal,
        reason: &str,
        actor: &Actor,
    ) -> Result<(InventoryStock, InventoryMovement)> {
        authorize(actor, Action::ReportDamage, ResourceState::None)?;
        require_positive(quantity)?;
        self.signed_movement(item, -quantity, MovementType::Waste, actor, |req| {
            req.with_reason(reason)
        })
    }

    /// 進貨入庫，並更新原料的最近採購單價
    #[allow(clippy::too_many_arguments)]
    pub fn receive_purchase(
        &self,
        material_id: Uuid,
        quantity: Decimal,
        unit_price: Option<Decimal>,
        purchase_order_id: Uuid,
        batch_number: Option<String>,
        expiry_date: Option<NaiveDate>,
        actor: &Actor,
    ) -> Result<(InventoryStock, InventoryMovement)> {
        authorize(actor, Action::ReceivePurchase, ResourceState::None)?;
        require_positive(quantity)?;
        let now = self.clock().now();

        self.store().transaction(|tx| {
            let mut material = tx.material(material_id)?.clone();
            let mut request = AdjustStockRequest::new(
                material.item_ref(),
                quantity,
                MovementType::PurchaseReceipt,
                material.unit,
            )
            .with_reference(ReferenceType::PurchaseOrder, purchase_order_id)
            .with_actor(actor.name.clone());
            if let Some(batch) = batch_number {
                request = request.with_batch(batch, expiry_date);
            }

            let result = MovementLedger::adjust_stock(tx, self.config(), request, now)?;

            if let Some(price) = unit_price {
                material.last_purchase_price = Some(price);
                tx.put_material(material);
            }
            Ok(result)
        })
    }

    /// 退貨給供應商（扣減）
    pub fn return_to_supplier(
        &self,
        material_id: Uuid,
        quantity: Decimal,
        purchase_order_id: Uuid,
        reason: &str,
        actor: &Actor,
    ) -> Result<(InventoryStock, InventoryMovement)> {
        authorize(actor, Action::ReturnToSupplier, ResourceState::None)?;
        require_positive(quantity)?;
        self.signed_movement(
            ItemRef::raw_material(material_id),
            -quantity,
            MovementType::ReturnToSupplier,
            actor,
            |req| {
                req.with_reference(ReferenceType::PurchaseOrder, purchase_order_id)
                    .with_reason(reason)
            },
        )
    }

    /// 核准盤點：寫入 (盤點數 - 現有) 的 COUNT 異動；數量一致時不寫入
    pub fn approve_stock_count(
        &self,
        item: ItemRef,
        counted: Decimal,
        count_id: Uuid,
        actor: &Actor,
    ) -> Result<Option<(InventoryStock, InventoryMovement)>> {
        authorize(actor, Action::ApproveCount, ResourceState::None)?;
        if counted < Decimal::ZERO {
            return Err(BakeryError::InsufficientData(format!(
                "盤點數量不可為負: {}",
                counted
            )));
        }
        let now = self.clock().now();

        self.store().transaction(|tx| {
            let unit = unit_of(tx, &item)?;
            let on_hand = tx
                .state()
                .stock
                .get(&item)
                .map(|s| s.quantity_on_hand)
                .unwrap_or(Decimal::ZERO);
            let delta = counted - on_hand;
            if delta.is_zero() {
                return Ok(None);
            }

            let request = AdjustStockRequest::new(item, delta, MovementType::Count, unit)
                .with_reference(ReferenceType::StockCount, count_id)
                .with_reason(format!("盤點 {} → {}", on_hand, counted))
                .with_actor(actor.name.clone());
            MovementLedger::adjust_stock(tx, self.config(), request, now).map(Some)
        })
    }

    /// 保留庫存（不產生異動）
    pub fn reserve(&self, item: ItemRef, quantity: Decimal, actor: &Actor) -> Result<InventoryStock> {
        authorize(actor, Action::AdjustStock, ResourceState::None)?;
        self.store().transaction(|tx| {
            let mut stock = tx
                .state()
                .stock
                .get(&item)
                .cloned()
                .ok_or_else(|| BakeryError::not_found("庫存", item))?;
            stock.reserve(quantity)?;
            tx.put_stock(stock.clone());
            Ok(stock)
        })
    }

    /// 釋放保留
    pub fn release(&self, item: ItemRef, quantity: Decimal, actor: &Actor) -> Result<InventoryStock> {
        authorize(actor, Action::AdjustStock, ResourceState::None)?;
        self.store().transaction(|tx| {
            let mut stock = tx
                .state()
                .stock
                .get(&item)
                .cloned()
                .ok_or_else(|| BakeryError::not_found("庫存", item))?;
            stock.release(quantity)?;
            tx.put_stock(stock.clone());
            Ok(stock)
        })
    }

    pub fn stock(&self, item: ItemRef) -> Option<InventoryStock> {
        self.store().read(|s| s.stock.get(&item).cloned())
    }

    /// 項目的異動歷史（依寫入順序）
    pub fn movements_for(&self, item: ItemRef) -> Vec<InventoryMovement> {
        self.store().read(|s| {
            s.movements
                .iter()
                .filter(|m| m.item == item)
                .cloned()
                .collect()
        })
    }

    pub fn reconcile(&self) -> ReconciliationReport {
        self.store().read(MovementLedger::reconcile)
    }

    /// 以異動帳重建所有快取餘額，回傳被修正的項目
    pub fn rebuild_balances(&self, actor: &Actor) -> Result<Vec<BalanceDrift>> {
        authorize(actor, Action::AdjustStock, ResourceState::None)?;
        let now = self.clock().now();

        self.store().transaction(|tx| {
            let report = MovementLedger::reconcile(tx.state());
            for drift in &report.drifts {
                if let Some(stock) = tx.state().stock.get(&drift.item) {
                    let mut fixed = stock.clone();
                    fixed.quantity_on_hand = drift.ledger_sum;
                    fixed.updated_at = now;
                    tx.put_stock(fixed);
                }
            }
            if !report.drifts.is_empty() {
                tracing::warn!("重建餘額：修正 {} 個項目", report.drifts.len());
            }
            Ok(report.drifts)
        })
    }

    fn signed_movement(
        &self,
        item: ItemRef,
        quantity: Decimal,
        movement_type: MovementType,
        actor: &Actor,
        decorate: impl FnOnce(AdjustStockRequest) -> AdjustStockRequest,
    ) -> Result<(InventoryStock, InventoryMovement)> {
        let now = self.clock().now();
        self.store().transaction(|tx| {
            let unit = unit_of(tx, &item)?;
            let request = decorate(
                AdjustStockRequest::new(item, quantity, movement_type, unit)
                    .with_actor(actor.name.clone()),
            );
            MovementLedger::adjust_stock(tx, self.config(), request, now)
        })
    }
}

fn unit_of(tx: &Transaction<'_>, item: &ItemRef) -> Result<UnitOfMeasure> {
    match item.item_type {
        bakery_core::ItemType::RawMaterial => tx.material(item.id).map(|m| m.unit),
        bakery_core::ItemType::Product => tx.product(item.id).map(|p| p.unit),
    }
}

fn require_non_zero(quantity: Decimal) -> Result<()> {
    if quantity.is_zero() {
        return Err(BakeryError::InsufficientData(
            "調整數量不可為 0".to_string(),
        ));
    }
    Ok(())
}

fn require_positive(quantity: Decimal) -> Result<()> {
    if quantity <= Decimal::ZERO {
        return Err(BakeryError::InsufficientData(format!(
            "數量必須大於 0，收到 {}",
            quantity
        )));
    }
    Ok(())
}
