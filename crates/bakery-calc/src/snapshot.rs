//! 計劃快照：計算時刻的一致性唯讀視圖

use bakery_core::{
    BakeryError, Bom, InventoryStock, ItemRef, Order, Product, RawMaterial, Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

/// 計劃快照
#[derive(Debug, Clone)]
pub struct PlanningSnapshot {
    /// 快照時間
    pub taken_at: DateTime<Utc>,

    /// 產品目錄
    pub products: HashMap<Uuid, Product>,

    /// 原料目錄
    pub materials: HashMap<Uuid, RawMaterial>,

    /// 各產品啟用中的 BOM（以產品ID為鍵）
    pub active_boms: HashMap<Uuid, Bom>,

    /// 庫存餘額
    pub stock: HashMap<ItemRef, InventoryStock>,

    /// 訂單
    pub orders: Vec<Order>,
}

impl PlanningSnapshot {
    /// 創建空的快照
    pub fn new(taken_at: DateTime<Utc>) -> Self {
        Self {
            taken_at,
            products: HashMap::new(),
            materials: HashMap::new(),
            active_boms: HashMap::new(),
            stock: HashMap::new(),
            orders: Vec::new(),
        }
    }

    /// 建構器模式：添加產品
    pub fn with_product(mut self, product: Product) -> Self {
        self.products.insert(product.id, product);
        self
    }

    /// 建構器模式：添加原料
    pub fn with_material(mut self, material: RawMaterial) -> Self {
        self.materials.insert(material.id, material);
        self
    }

    /// 建構器模式：設置啟用中的 BOM
    pub fn with_active_bom(mut self, bom: Bom) -> Self {
        self.active_boms.insert(bom.product_id, bom);
        self
    }

    /// 建構器模式：設置庫存
    pub fn with_stock(mut self, item: ItemRef, on_hand: Decimal) -> Self {
        self.stock
            .insert(item, InventoryStock::new(item, on_hand, self.taken_at));
        self
    }

    /// 建構器模式：添加訂單
    pub fn with_order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    /// 現有庫存（無庫存記錄視為 0）
    pub fn on_hand(&self, item: &ItemRef) -> Decimal {
        self.stock
            .get(item)
            .map(|s| s.quantity_on_hand)
            .unwrap_or(Decimal::ZERO)
    }

    /// 可用庫存（現有 - 已保留）
    pub fn available(&self, item: &ItemRef) -> Decimal {
        self.stock
            .get(item)
            .map(|s| s.available())
            .unwrap_or(Decimal::ZERO)
    }

    pub fn product(&self, product_id: Uuid) -> Result<&Product> {
        self.products
            .get(&product_id)
            .ok_or_else(|| BakeryError::not_found("產品", product_id))
    }

    pub fn material(&self, material_id: Uuid) -> Result<&RawMaterial> {
        self.materials
            .get(&material_id)
            .ok_or_else(|| BakeryError::not_found("原料", material_id))
    }

    /// 取得啟用中的 BOM
    pub fn active_bom(&self, product_id: Uuid) -> Result<&Bom> {
        match self.active_boms.get(&product_id) {
            Some(bom) => Ok(bom),
            None => {
                let label = self
                    .products
                    .get(&product_id)
                    .map(|p| p.code.clone())
                    .unwrap_or_else(|| product_id.to_string());
                Err(BakeryError::NoActiveBom(label))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bakery_core::UnitOfMeasure;

    #[test]
    fn test_missing_stock_is_zero() {
        let snapshot = PlanningSnapshot::new(Utc::now());
        let item = ItemRef::raw_material(Uuid::new_v4());

        assert_eq!(snapshot.on_hand(&item), Decimal::ZERO);
        assert_eq!(snapshot.available(&item), Decimal::ZERO);
    }

    #[test]
    fn test_active_bom_lookup_names_product() {
        let product = Product::new("CROISSANT", "可頌", UnitOfMeasure::Pcs, "PAS");
        let product_id = product.id;
        let snapshot = PlanningSnapshot::new(Utc::now()).with_product(product);

        assert_eq!(
            snapshot.active_bom(product_id).unwrap_err(),
            BakeryError::NoActiveBom("CROISSANT".to_string())
        );
    }
}
