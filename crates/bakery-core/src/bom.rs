//! 物料清單（BOM）模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{BakeryError, Result};

/// BOM 明細行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomLine {
    /// 原料ID
    pub material_id: Uuid,

    /// 每批用量
    pub quantity: Decimal,

    /// 損耗率（百分比，例如 2 表示 2%）
    pub waste_percentage: Decimal,

    /// 是否為選用料（不計入總成本）
    pub is_optional: bool,
}

impl BomLine {
    /// 創建新的 BOM 明細行
    pub fn new(material_id: Uuid, quantity: Decimal) -> Self {
        Self {
            material_id,
            quantity,
            waste_percentage: Decimal::ZERO,
            is_optional: false,
        }
    }

    /// 建構器模式：設置損耗率
    pub fn with_waste_percentage(mut self, waste_percentage: Decimal) -> Self {
        self.waste_percentage = waste_percentage;
        self
    }

    /// 建構器模式：設置為選用料
    pub fn as_optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    /// 損耗放大係數 (1 + 損耗率/100)
    pub fn waste_factor(&self) -> Decimal {
        Decimal::ONE + self.waste_percentage / Decimal::ONE_HUNDRED
    }
}

/// 物料清單（版本化，建立後不可修改）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bom {
    /// BOM ID
    pub id: Uuid,

    /// 產品ID
    pub product_id: Uuid,

    /// 版本號
    pub version: u32,

    /// 標準批量
    pub batch_size: Decimal,

    /// 良率（百分比）
    pub yield_percentage: Decimal,

    /// 明細行（有序）
    pub lines: Vec<BomLine>,

    /// 是否啟用
    pub is_active: bool,
}

impl Bom {
    /// 創建新的 BOM（預設良率 100%，未啟用）
    pub fn new(product_id: Uuid, batch_size: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            version: 1,
            batch_size,
            yield_percentage: Decimal::ONE_HUNDRED,
            lines: Vec::new(),
            is_active: false,
        }
    }

    /// 建構器模式：設置良率
    pub fn with_yield_percentage(mut self, yield_percentage: Decimal) -> Self {
        self.yield_percentage = yield_percentage;
        self
    }

    /// 建構器模式：添加明細行
    pub fn with_line(mut self, line: BomLine) -> Self {
        self.lines.push(line);
        self
    }

    /// 驗證批量與良率
    pub fn validate(&self) -> Result<()> {
        if self.batch_size <= Decimal::ZERO {
            return Err(BakeryError::InsufficientData(format!(
                "BOM {} 的標準批量必須大於 0",
                self.id
            )));
        }
        if self.yield_percentage <= Decimal::ZERO || self.yield_percentage > Decimal::ONE_HUNDRED
        {
            return Err(BakeryError::InsufficientData(format!(
                "BOM {} 的良率必須介於 0 與 100 之間",
                self.id
            )));
        }
        if self.lines.iter().any(|l| l.quantity <= Decimal::ZERO) {
            return Err(BakeryError::InsufficientData(format!(
                "BOM {} 含有非正數用量",
                self.id
            )));
        }
        Ok(())
    }

    /// 批次倍數 = 數量 / 標準批量
    pub fn scale_factor(&self, quantity: Decimal) -> Decimal {
        quantity / self.batch_size
    }

    /// 良率係數 (良率/100)
    pub fn yield_factor(&self) -> Decimal {
        self.yield_percentage / Decimal::ONE_HUNDRED
    }

    /// 將可售數量換算為投產毛量
    pub fn gross_output_for(&self, net_output: Decimal) -> Decimal {
        net_output / self.yield_factor()
    }

    /// 是否使用指定原料
    pub fn uses_material(&self, material_id: Uuid) -> bool {
        self.lines.iter().any(|l| l.material_id == material_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bom_scaling_helpers() {
        let flour = Uuid::new_v4();
        let bom = Bom::new(Uuid::new_v4(), Decimal::from(100))
            .with_yield_percentage(Decimal::from(95))
            .with_line(BomLine::new(flour, Decimal::from(50)).with_waste_percentage(Decimal::from(2)));

        assert_eq!(bom.scale_factor(Decimal::from(200)), Decimal::from(2));
        assert_eq!(bom.gross_output_for(Decimal::from(95)), Decimal::from(100));
        assert_eq!(bom.lines[0].waste_factor(), Decimal::new(102, 2));
        assert!(bom.uses_material(flour));
        assert!(bom.validate().is_ok());
    }

    #[test]
    fn test_bom_validation_rejects_zero_batch() {
        let bom = Bom::new(Uuid::new_v4(), Decimal::ZERO);
        assert!(matches!(bom.validate(), Err(BakeryError::InsufficientData(_))));

        let bom = Bom::new(Uuid::new_v4(), Decimal::from(10)).with_yield_percentage(Decimal::from(120));
        assert!(bom.validate().is_err());
    }
}
