//! 淨需求計算

use bakery_core::{Bom, UnitOfMeasure};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 彙總後的原料需求與可用量比較
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialNeed {
    pub material_id: Uuid,
    pub material_code: String,
    pub unit: UnitOfMeasure,
    /// 需求量（含損耗）
    pub needed: Decimal,
    /// 可用量
    pub available: Decimal,
    /// 短缺量
    pub shortage: Decimal,
}

impl MaterialNeed {
    pub fn is_short(&self) -> bool {
        self.shortage > Decimal::ZERO
    }
}

/// 淨需求計算器
pub struct NettingCalculator;

impl NettingCalculator {
    /// 成品淨需求 = max(0, 訂購量 - 現有庫存)
    pub fn net_to_produce(ordered: Decimal, on_hand: Decimal) -> Decimal {
        (ordered - on_hand).max(Decimal::ZERO)
    }

    /// 短缺量 = max(0, 需求 - 可用)
    pub fn shortage(needed: Decimal, available: Decimal) -> Decimal {
        (needed - available).max(Decimal::ZERO)
    }

    /// 將一個產品的數量依 BOM 展開並累加至各原料總需求
    ///
    /// 需求 += (數量 / 標準批量) × 用量 × (1 + 損耗率/100)
    /// 多個產品共用的原料會被加總，而非各自計算。
    pub fn accumulate_material_needs(
        needs: &mut HashMap<Uuid, Decimal>,
        bom: &Bom,
        quantity: Decimal,
    ) {
        if bom.batch_size <= Decimal::ZERO {
            return;
        }
        let batches = bom.scale_factor(quantity);

        for line in &bom.lines {
            *needs.entry(line.material_id).or_insert(Decimal::ZERO) +=
                batches * line.quantity * line.waste_factor();
        }
    }

    /// 單一原料在一個 BOM 中的需求（同一原料多行時加總）
    pub fn material_need_for(bom: &Bom, material_id: Uuid, quantity: Decimal) -> Decimal {
        if bom.batch_size <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let batches = bom.scale_factor(quantity);

        bom.lines
            .iter()
            .filter(|l| l.material_id == material_id)
            .map(|l| batches * l.quantity * l.waste_factor())
            .sum()
    }
}
