//! 生產計劃產生器

use bakery_core::{EngineConfig, ItemRef, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::aggregation::DemandAggregator;
use crate::netting::{MaterialNeed, NettingCalculator};
use crate::snapshot::PlanningSnapshot;
use crate::PlanAlert;

/// 產品需求（彙總 + 淨需求）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDemand {
    pub product_id: Uuid,
    pub product_code: String,
    pub production_line: String,
    /// 訂購總量
    pub ordered_quantity: Decimal,
    /// 成品現有庫存
    pub on_hand: Decimal,
    /// 淨生產量
    pub net_to_produce: Decimal,
    /// 來源訂單
    pub order_ids: Vec<Uuid>,
    /// 是否有啟用中的 BOM（無 BOM 時不計入原料需求）
    pub has_active_bom: bool,
}

/// 生產計劃
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionPlan {
    pub target_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub demands: Vec<ProductDemand>,
    pub material_needs: Vec<MaterialNeed>,
    pub alerts: Vec<PlanAlert>,
}

impl ProductionPlan {
    /// 需要生產的產品（淨需求 > 0）
    pub fn production_demands(&self) -> impl Iterator<Item = &ProductDemand> {
        self.demands
            .iter()
            .filter(|d| d.net_to_produce > Decimal::ZERO)
    }

    pub fn has_shortages(&self) -> bool {
        !self.alerts.is_empty()
    }

    pub fn demand_for(&self, product_id: Uuid) -> Option<&ProductDemand> {
        self.demands.iter().find(|d| d.product_id == product_id)
    }

    pub fn need_for(&self, material_id: Uuid) -> Option<&MaterialNeed> {
        self.material_needs
            .iter()
            .find(|n| n.material_id == material_id)
    }
}

/// 生產計劃產生器
pub struct ProductionPlanner {
    config: EngineConfig,
}

impl ProductionPlanner {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// 產生指定日期的生產計劃（純計算，無副作用）
    pub fn generate_plan(
        &self,
        snapshot: &PlanningSnapshot,
        target_date: NaiveDate,
    ) -> Result<ProductionPlan> {
        tracing::info!(
            "開始產生生產計劃：日期 {}，訂單 {} 筆",
            target_date,
            snapshot.orders.len()
        );
        let start_time = std::time::Instant::now();

        // Step 1: 需求彙總
        tracing::debug!("Step 1: 需求彙總");
        let aggregated = DemandAggregator::for_date(
            &snapshot.orders,
            &self.config.planning_statuses,
            target_date,
        );

        // Step 2: 淨需求
        tracing::debug!("Step 2: 成品淨需求");
        let mut demands = Vec::with_capacity(aggregated.len());
        for (product_id, demand) in aggregated {
            let product = snapshot.product(product_id)?;
            let on_hand = snapshot.on_hand(&ItemRef::product(product_id));
            let net_to_produce = NettingCalculator::net_to_produce(demand.quantity, on_hand);

            demands.push(ProductDemand {
                product_id,
                product_code: product.code.clone(),
                production_line: product.production_line.clone(),
                ordered_quantity: demand.quantity,
                on_hand,
                net_to_produce,
                order_ids: demand.order_ids,
                has_active_bom: snapshot.active_boms.contains_key(&product_id),
            });
        }
        demands.sort_by(|a, b| a.product_code.cmp(&b.product_code));

        // Step 3: 依 BOM 展開淨需求
        tracing::debug!("Step 3: BOM 展開");
        let mut raw_needs: HashMap<Uuid, Decimal> = HashMap::new();
        for demand in demands.iter().filter(|d| d.net_to_produce > Decimal::ZERO) {
            match snapshot.active_boms.get(&demand.product_id) {
                Some(bom) => NettingCalculator::accumulate_material_needs(
                    &mut raw_needs,
                    bom,
                    demand.net_to_produce,
                ),
                None => tracing::warn!(
                    "產品 {} 有需求 {} 但沒有啟用中的 BOM，不計入原料需求",
                    demand.product_code,
                    demand.net_to_produce
                ),
            }
        }

        // Step 4: 可用量檢查
        tracing::debug!("Step 4: 可用量檢查");
        let mut material_needs = Vec::with_capacity(raw_needs.len());
        for (material_id, needed) in raw_needs {
            let material = snapshot.material(material_id)?;
            let needed = crate::ceil_dp(needed, self.config.quantity_scale);
            let available = snapshot.available(&ItemRef::raw_material(material_id));

            material_needs.push(MaterialNeed {
                material_id,
                material_code: material.code.clone(),
                unit: material.unit,
                needed,
                available,
                shortage: NettingCalculator::shortage(needed, available),
            });
        }
        material_needs.sort_by(|a, b| a.material_code.cmp(&b.material_code));

        let alerts: Vec<PlanAlert> = material_needs
            .iter()
            .filter(|n| n.is_short())
            .map(PlanAlert::shortage)
            .collect();

        tracing::info!(
            "生產計劃完成，耗時 {:?}：產品 {} 項，原料 {} 項，短缺 {} 項",
            start_time.elapsed(),
            demands.len(),
            material_needs.len(),
            alerts.len()
        );

        Ok(ProductionPlan {
            target_date,
            generated_at: snapshot.taken_at,
            demands,
            material_needs,
            alerts,
        })
    }
}
