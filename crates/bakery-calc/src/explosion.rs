//! BOM 展開與成本計算

use bakery_core::{BakeryError, Bom, ItemRef, Result, UnitOfMeasure};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::snapshot::PlanningSnapshot;

/// 單一原料的需求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRequirement {
    pub material_id: Uuid,
    pub material_code: String,
    /// 需求量（含損耗，無條件進位）
    pub required_quantity: Decimal,
    pub unit: UnitOfMeasure,
    /// 需求量 × 最近採購單價
    pub cost: Decimal,
    pub available: Decimal,
    pub shortage: Decimal,
    pub sufficient: bool,
    pub is_optional: bool,
}

/// BOM 展開結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomExplosionResult {
    pub product_id: Uuid,
    pub bom_id: Uuid,
    pub requested_quantity: Decimal,
    pub scale_factor: Decimal,
    pub requirements: Vec<MaterialRequirement>,
    /// 總成本（不含選用料）
    pub total_cost: Decimal,
    /// 每可售單位成本
    pub cost_per_unit: Decimal,
}

impl BomExplosionResult {
    /// 是否所有原料皆足夠
    pub fn is_feasible(&self) -> bool {
        self.requirements.iter().all(|r| r.sufficient)
    }

    pub fn requirement(&self, material_id: Uuid) -> Option<&MaterialRequirement> {
        self.requirements.iter().find(|r| r.material_id == material_id)
    }
}

/// BOM 展開計算器
pub struct BomExplosion;

impl BomExplosion {
    /// 展開 BOM
    ///
    /// - 批次倍數 = 數量 / 標準批量
    /// - 需求量 = 用量 × 倍數 × (1 + 損耗率/100)，進位到 `scale` 位
    /// - 每單位成本 = 總成本 / (數量 × 良率)
    ///
    /// 良率只用於成本換算，不放大原料需求。
    pub fn explode(
        bom: &Bom,
        requested_quantity: Decimal,
        snapshot: &PlanningSnapshot,
        scale: u32,
    ) -> Result<BomExplosionResult> {
        bom.validate()?;
        if requested_quantity <= Decimal::ZERO {
            return Err(BakeryError::InsufficientData(format!(
                "展開數量必須大於 0，收到 {}",
                requested_quantity
            )));
        }

        let scale_factor = bom.scale_factor(requested_quantity);
        let mut requirements = Vec::with_capacity(bom.lines.len());

        for line in &bom.lines {
            let material = snapshot.material(line.material_id)?;

            let base_quantity = line.quantity * scale_factor;
            let required_quantity = crate::ceil_dp(base_quantity * line.waste_factor(), scale);

            let available = snapshot.available(&ItemRef::raw_material(material.id));
            let shortage = (required_quantity - available).max(Decimal::ZERO);
            let cost = material
                .last_purchase_price
                .map(|price| required_quantity * price)
                .unwrap_or(Decimal::ZERO);

            tracing::debug!(
                "BOM 展開: {} 需求 {} {} (可用 {})",
                material.code,
                required_quantity,
                material.unit,
                available
            );

            requirements.push(MaterialRequirement {
                material_id: material.id,
                material_code: material.code.clone(),
                required_quantity,
                unit: material.unit,
                cost,
                available,
                shortage,
                sufficient: available >= required_quantity,
                is_optional: line.is_optional,
            });
        }

        let total_cost: Decimal = requirements
            .iter()
            .filter(|r| !r.is_optional)
            .map(|r| r.cost)
            .sum();
        let saleable_units = requested_quantity * bom.yield_factor();
        let cost_per_unit = if saleable_units.is_zero() {
            Decimal::ZERO
        } else {
            total_cost / saleable_units
        };

        Ok(BomExplosionResult {
            product_id: bom.product_id,
            bom_id: bom.id,
            requested_quantity,
            scale_factor,
            requirements,
            total_cost,
            cost_per_unit,
        })
    }

    /// 以可售數量展開：先依良率換算為投產毛量再展開
    pub fn explode_for_net_output(
        bom: &Bom,
        net_output: Decimal,
        snapshot: &PlanningSnapshot,
        scale: u32,
    ) -> Result<BomExplosionResult> {
        bom.validate()?;
        Self::explode(bom, bom.gross_output_for(net_output), snapshot, scale)
    }

    /// 以產品ID展開其啟用中的 BOM
    pub fn explode_product(
        product_id: Uuid,
        requested_quantity: Decimal,
        snapshot: &PlanningSnapshot,
        scale: u32,
    ) -> Result<BomExplosionResult> {
        let bom = snapshot.active_bom(product_id)?;
        Self::explode(bom, requested_quantity, snapshot, scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bakery_core::{BomLine, Product, RawMaterial};
    use chrono::Utc;
    use proptest::prelude::*;

    struct Fixture {
        snapshot: PlanningSnapshot,
        bom: Bom,
        flour: Uuid,
        sugar: Uuid,
    }

    /// 產品 P：每 100 單位批次用麵粉 50 kg（損耗 2%），良率 95%
    fn fixture(flour_on_hand: i64) -> Fixture {
        let product = Product::new("BAGUETTE", "法國長棍", UnitOfMeasure::Pcs, "BRD");
        let flour = RawMaterial::new("FLOUR", "麵粉", UnitOfMeasure::Kg)
            .with_last_purchase_price(Decimal::new(120, 2));
        let sugar = RawMaterial::new("SUGAR", "糖", UnitOfMeasure::Kg)
            .with_last_purchase_price(Decimal::from(2));

        let bom = Bom::new(product.id, Decimal::from(100))
            .with_yield_percentage(Decimal::from(95))
            .with_line(BomLine::new(flour.id, Decimal::from(50)).with_waste_percentage(Decimal::from(2)))
            .with_line(BomLine::new(sugar.id, Decimal::from(5)).as_optional());

        let (flour_id, sugar_id) = (flour.id, sugar.id);
        let snapshot = PlanningSnapshot::new(Utc::now())
            .with_stock(flour.item_ref(), Decimal::from(flour_on_hand))
            .with_product(product)
            .with_material(flour)
            .with_material(sugar)
            .with_active_bom(bom.clone());

        Fixture {
            snapshot,
            bom,
            flour: flour_id,
            sugar: sugar_id,
        }
    }

    #[test]
    fn test_net_output_with_yield_matches_reference_fixture() {
        let f = fixture(100);

        let result =
            BomExplosion::explode_for_net_output(&f.bom, Decimal::from(95), &f.snapshot, 2).unwrap();

        // ceil(50 × 1 × 1.02) = 51
        let flour = result.requirement(f.flour).unwrap();
        assert_eq!(result.scale_factor, Decimal::ONE);
        assert_eq!(flour.required_quantity, Decimal::from(51));
        assert!(flour.sufficient);
        assert_eq!(flour.shortage, Decimal::ZERO);
    }

    #[test]
    fn test_required_quantity_rounds_up() {
        let f = fixture(100);

        // 50 × 0.95 × 1.02 = 48.45
        let result = BomExplosion::explode(&f.bom, Decimal::from(95), &f.snapshot, 2).unwrap();
        assert_eq!(
            result.requirement(f.flour).unwrap().required_quantity,
            Decimal::new(4845, 2)
        );

        // 50 × 0.333 × 1.02 = 16.983 → 16.99
        let result = BomExplosion::explode(&f.bom, Decimal::new(333, 1), &f.snapshot, 2).unwrap();
        assert_eq!(
            result.requirement(f.flour).unwrap().required_quantity,
            Decimal::new(1699, 2)
        );
    }

    #[test]
    fn test_shortage_and_sufficiency() {
        let f = fixture(30);

        let result = BomExplosion::explode(&f.bom, Decimal::from(100), &f.snapshot, 2).unwrap();
        let flour = result.requirement(f.flour).unwrap();

        assert_eq!(flour.required_quantity, Decimal::from(51));
        assert_eq!(flour.shortage, Decimal::from(21));
        assert!(!flour.sufficient);
        assert!(!result.is_feasible());
    }

    #[test]
    fn test_costing_excludes_optional_lines() {
        let f = fixture(100);

        let result = BomExplosion::explode(&f.bom, Decimal::from(100), &f.snapshot, 2).unwrap();

        // 麵粉 51 × 1.20 = 61.20；糖為選用料不計入總成本
        assert_eq!(result.requirement(f.flour).unwrap().cost, Decimal::new(6120, 2));
        assert_eq!(result.requirement(f.sugar).unwrap().cost, Decimal::from(10));
        assert_eq!(result.total_cost, Decimal::new(6120, 2));

        let expected = Decimal::new(6120, 2) / (Decimal::from(100) * Decimal::new(95, 2));
        assert_eq!(result.cost_per_unit, expected);
    }

    #[test]
    fn test_missing_price_costs_zero() {
        let product = Product::new("ROLL", "餐包", UnitOfMeasure::Pcs, "BRD");
        let yeast = RawMaterial::new("YEAST", "酵母", UnitOfMeasure::G);
        let bom = Bom::new(product.id, Decimal::from(10)).with_line(BomLine::new(yeast.id, Decimal::from(30)));
        let snapshot = PlanningSnapshot::new(Utc::now()).with_material(yeast);

        let result = BomExplosion::explode(&bom, Decimal::from(10), &snapshot, 2).unwrap();
        assert_eq!(result.total_cost, Decimal::ZERO);
        assert_eq!(result.cost_per_unit, Decimal::ZERO);
    }

    #[test]
    fn test_explode_product_without_active_bom() {
        let product = Product::new("SCONE", "司康", UnitOfMeasure::Pcs, "PAS");
        let product_id = product.id;
        let snapshot = PlanningSnapshot::new(Utc::now()).with_product(product);

        let err =
            BomExplosion::explode_product(product_id, Decimal::from(10), &snapshot, 2).unwrap_err();
        assert_eq!(err, BakeryError::NoActiveBom("SCONE".to_string()));
    }

    #[test]
    fn test_zero_quantity_is_rejected() {
        let f = fixture(100);
        assert!(matches!(
            BomExplosion::explode(&f.bom, Decimal::ZERO, &f.snapshot, 2),
            Err(BakeryError::InsufficientData(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_scaling_is_linear_within_rounding(units in 1i64..5_000) {
            let f = fixture(0);
            let q = Decimal::from(units);

            let single = BomExplosion::explode(&f.bom, q, &f.snapshot, 2).unwrap();
            let double = BomExplosion::explode(&f.bom, q * Decimal::TWO, &f.snapshot, 2).unwrap();

            for (one, two) in single.requirements.iter().zip(double.requirements.iter()) {
                let diff = (two.required_quantity - one.required_quantity * Decimal::TWO).abs();
                // 兩次進位最多各偏差 0.01
                prop_assert!(diff <= Decimal::new(2, 2), "diff = {}", diff);
            }
        }
    }
}
