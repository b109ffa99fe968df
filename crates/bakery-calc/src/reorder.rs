//! 補貨建議
//!
//! 依提前期視窗內的確認需求展開 BOM，建議足以回補最低庫存的採購量。
//! 僅供參考，不會修改庫存或建立採購單。

use bakery_core::{EngineConfig, ItemRef, RawMaterial, Result};
use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregation::DemandAggregator;
use crate::netting::NettingCalculator;
use crate::snapshot::PlanningSnapshot;

/// 補貨建議
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderSuggestion {
    pub material_id: Uuid,
    pub material_code: String,
    pub current_available: Decimal,
    pub min_level: Decimal,
    pub reorder_point: Decimal,
    /// 提前期內的預計耗用
    pub upcoming_need: Decimal,
    /// 建議採購量（整數單位）
    pub suggested_quantity: Decimal,
    pub estimated_cost: Decimal,
    pub lead_time_days: u32,
}

/// 補貨建議引擎
pub struct ReorderEngine {
    config: EngineConfig,
}

impl ReorderEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// 產生補貨建議（依原料代碼排序）
    pub fn generate_suggestions(
        &self,
        snapshot: &PlanningSnapshot,
        today: NaiveDate,
    ) -> Result<Vec<ReorderSuggestion>> {
        tracing::info!("開始產生補貨建議：原料 {} 項", snapshot.materials.len());

        // 只考慮有設定再訂購點且可用量 ≤ 再訂購點的原料
        let eligible: Vec<(&RawMaterial, Decimal, Decimal)> = snapshot
            .materials
            .values()
            .filter_map(|m| {
                let reorder_point = m.reorder_point?;
                let available = snapshot.available(&ItemRef::raw_material(m.id));
                (available <= reorder_point).then_some((m, reorder_point, available))
            })
            .collect();

        tracing::debug!("低於再訂購點的原料: {} 項", eligible.len());

        let mut suggestions: Vec<ReorderSuggestion> = eligible
            .par_iter()
            .filter_map(|&(material, reorder_point, available)| {
                self.suggest(snapshot, today, material, reorder_point, available)
            })
            .collect();

        suggestions.sort_by(|a, b| a.material_code.cmp(&b.material_code));

        tracing::info!("補貨建議完成：{} 項", suggestions.len());
        Ok(suggestions)
    }

    fn suggest(
        &self,
        snapshot: &PlanningSnapshot,
        today: NaiveDate,
        material: &RawMaterial,
        reorder_point: Decimal,
        available: Decimal,
    ) -> Option<ReorderSuggestion> {
        let upcoming_need = self.upcoming_need(snapshot, today, material);

        let shortfall = upcoming_need + material.min_stock_level - available;
        let floor = material.reorder_quantity.unwrap_or(Decimal::ZERO);
        let suggested_quantity = crate::ceil_dp(shortfall.max(floor), 0);

        if suggested_quantity <= Decimal::ZERO {
            tracing::debug!("原料 {} 無需補貨", material.code);
            return None;
        }

        let estimated_cost = material
            .last_purchase_price
            .map(|price| suggested_quantity * price)
            .unwrap_or(Decimal::ZERO);

        Some(ReorderSuggestion {
            material_id: material.id,
            material_code: material.code.clone(),
            current_available: available,
            min_level: material.min_stock_level,
            reorder_point,
            upcoming_need,
            suggested_quantity,
            estimated_cost,
            lead_time_days: material.lead_time_days,
        })
    }

    /// 提前期視窗 [today, today + 提前期] 內使用此原料的預計耗用
    fn upcoming_need(
        &self,
        snapshot: &PlanningSnapshot,
        today: NaiveDate,
        material: &RawMaterial,
    ) -> Decimal {
        let window_end = today
            .checked_add_signed(Duration::days(i64::from(material.lead_time_days)))
            .unwrap_or(NaiveDate::MAX);
        let demand = DemandAggregator::within_window(
            &snapshot.orders,
            &self.config.reorder_statuses,
            today,
            window_end,
        );

        let need: Decimal = demand
            .iter()
            .filter_map(|(product_id, d)| {
                let bom = snapshot.active_boms.get(product_id)?;
                bom.uses_material(material.id).then(|| {
                    NettingCalculator::material_need_for(bom, material.id, d.quantity)
                })
            })
            .sum();

        crate::ceil_dp(need, self.config.quantity_scale)
    }
}
