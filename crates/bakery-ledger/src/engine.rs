//! 烘焙 ERP 引擎
//!
//! 將儲存區、配置與時鐘組合在一起，對外提供目錄、BOM、計劃與補貨操作。
//! 庫存、訂單與工單操作分別定義在 `ledger`、`orders`、`work_orders` 模組。

use bakery_calc::{
    BomExplosion, BomExplosionResult, PlanningSnapshot, ProductionPlan, ProductionPlanner,
    ReorderEngine, ReorderSuggestion,
};
use bakery_core::{
    authorize, Action, Actor, BakeryError, Bom, Clock, EngineConfig, Product, RawMaterial,
    ResourceState, Result, SystemClock,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::store::InMemoryStore;

/// 引擎
pub struct BakeryEngine {
    store: InMemoryStore,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl BakeryEngine {
    /// 創建引擎（配置不合法時回傳 `InvalidConfig`）
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            "初始化引擎：計劃狀態 {:?}，數量精度 {}",
            config.planning_statuses,
            config.quantity_scale
        );
        Ok(Self {
            store: InMemoryStore::new(),
            config,
            clock,
        })
    }

    pub fn with_system_clock(config: EngineConfig) -> Result<Self> {
        Self::new(config, Arc::new(SystemClock))
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    // ========== 目錄 ==========

    /// 登錄原料（代碼唯一）
    pub fn register_material(&self, material: RawMaterial, actor: &Actor) -> Result<RawMaterial> {
        authorize(actor, Action::ManageCatalog, ResourceState::None)?;
        self.store.transaction(|tx| {
            if tx.state().materials.values().any(|m| m.code == material.code) {
                return Err(BakeryError::InsufficientData(format!(
                    "原料代碼已存在: {}",
                    material.code
                )));
            }
            tracing::info!("登錄原料 {} ({})", material.code, material.name);
            tx.put_material(material.clone());
            Ok(material)
        })
    }

    /// 登錄產品（代碼唯一）
    pub fn register_product(&self, product: Product, actor: &Actor) -> Result<Product> {
        authorize(actor, Action::ManageCatalog, ResourceState::None)?;
        // 生產線代碼會組成批號，不可為空白
        if product.production_line.trim().is_empty() {
            return Err(BakeryError::InsufficientData(format!(
                "產品 {} 缺少生產線",
                product.code
            )));
        }
        self.store.transaction(|tx| {
            if tx.state().products.values().any(|p| p.code == product.code) {
                return Err(BakeryError::InsufficientData(format!(
                    "產品代碼已存在: {}",
                    product.code
                )));
            }
            tracing::info!(
                "登錄產品 {} ({})，生產線 {}",
                product.code,
                product.name,
                product.production_line
            );
            tx.put_product(product.clone());
            Ok(product)
        })
    }

    pub fn material(&self, id: Uuid) -> Result<RawMaterial> {
        self.store.read(|s| {
            s.materials
                .get(&id)
                .cloned()
                .ok_or_else(|| BakeryError::not_found("原料", id))
        })
    }

    pub fn product(&self, id: Uuid) -> Result<Product> {
        self.store.read(|s| {
            s.products
                .get(&id)
                .cloned()
                .ok_or_else(|| BakeryError::not_found("產品", id))
        })
    }

    // ========== BOM ==========

    /// 建立新的 BOM 版本（版本號自動遞增，建立後為未啟用）
    pub fn create_bom_version(&self, bom: Bom, actor: &Actor) -> Result<Bom> {
        authorize(actor, Action::ManageBom, ResourceState::None)?;
        bom.validate()?;

        self.store.transaction(|tx| {
            tx.product(bom.product_id)?;
            for line in &bom.lines {
                tx.material(line.material_id)?;
            }

            let version = tx
                .state()
                .boms
                .values()
                .filter(|b| b.product_id == bom.product_id)
                .map(|b| b.version)
                .max()
                .unwrap_or(0)
                + 1;

            let mut bom = bom;
            bom.version = version;
            bom.is_active = false;

            tracing::info!("建立 BOM 版本 v{}，原料 {} 項", version, bom.lines.len());
            tx.put_bom(bom.clone());
            Ok(bom)
        })
    }

    /// 啟用指定 BOM 版本；同一交易內先停用目前啟用中的版本
    pub fn activate_bom(&self, bom_id: Uuid, actor: &Actor) -> Result<Bom> {
        authorize(actor, Action::ManageBom, ResourceState::None)?;

        self.store.transaction(|tx| {
            let mut target = tx.bom(bom_id)?.clone();

            let previous: Vec<Bom> = tx
                .state()
                .boms
                .values()
                .filter(|b| b.product_id == target.product_id && b.is_active && b.id != bom_id)
                .cloned()
                .collect();
            for mut old in previous {
                tracing::debug!("停用 BOM v{}", old.version);
                old.is_active = false;
                tx.put_bom(old);
            }

            target.is_active = true;
            tracing::info!("啟用 BOM v{} ({})", target.version, target.id);
            tx.put_bom(target.clone());
            Ok(target)
        })
    }

    /// 產品目前啟用中的 BOM
    pub fn active_bom(&self, product_id: Uuid) -> Result<Bom> {
        self.store.read(|s| {
            let product = s
                .products
                .get(&product_id)
                .ok_or_else(|| BakeryError::not_found("產品", product_id))?;
            s.active_bom(product_id)
                .cloned()
                .ok_or_else(|| BakeryError::NoActiveBom(product.code.clone()))
        })
    }

    // ========== 計劃 ==========

    /// 在單一鎖內擷取計劃快照
    pub fn snapshot(&self) -> PlanningSnapshot {
        let taken_at = self.clock.now();
        self.store.read(|s| PlanningSnapshot {
            taken_at,
            products: s.products.clone(),
            materials: s.materials.clone(),
            active_boms: s
                .boms
                .values()
                .filter(|b| b.is_active)
                .map(|b| (b.product_id, b.clone()))
                .collect(),
            stock: s.stock.clone(),
            orders: s.orders.values().cloned().collect(),
        })
    }

    /// 展開產品的啟用 BOM
    pub fn explode_bom(&self, product_id: Uuid, quantity: Decimal) -> Result<BomExplosionResult> {
        let snapshot = self.snapshot();
        BomExplosion::explode_product(product_id, quantity, &snapshot, self.config.quantity_scale)
    }

    /// 以可售數量展開（先依良率換算投產毛量）
    pub fn explode_bom_for_net_output(
        &self,
        product_id: Uuid,
        net_output: Decimal,
    ) -> Result<BomExplosionResult> {
        let snapshot = self.snapshot();
        let bom = snapshot.active_bom(product_id)?;
        BomExplosion::explode_for_net_output(bom, net_output, &snapshot, self.config.quantity_scale)
    }

    /// 產生指定日期的生產計劃（唯讀）
    pub fn generate_plan(&self, target_date: NaiveDate) -> Result<ProductionPlan> {
        let snapshot = self.snapshot();
        ProductionPlanner::new(self.config.clone()).generate_plan(&snapshot, target_date)
    }

    /// 產生補貨建議（唯讀）
    pub fn generate_reorder_suggestions(&self) -> Result<Vec<ReorderSuggestion>> {
        let snapshot = self.snapshot();
        ReorderEngine::new(self.config.clone()).generate_suggestions(&snapshot, self.clock.today())
    }
}
