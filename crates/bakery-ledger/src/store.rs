//! 交易式記憶體儲存區
//!
//! 所有寫入都在 [`Transaction`] 內進行：每次變更先記錄復原紀錄，
//! 閉包回傳 `Err`（或發生 panic）時依相反順序復原，成功才提交。
//! 單一互斥鎖保證同一項目的並行調整不會遺失更新。

use bakery_core::{
    BakeryError, Bom, InventoryMovement, InventoryStock, ItemRef, Order, Product,
    ProductionReport, RawMaterial, Result, WorkOrder,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// 儲存區狀態（邏輯資料表）
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub materials: HashMap<Uuid, RawMaterial>,
    pub products: HashMap<Uuid, Product>,
    pub boms: HashMap<Uuid, Bom>,
    pub stock: HashMap<ItemRef, InventoryStock>,
    pub movements: Vec<InventoryMovement>,
    pub orders: HashMap<Uuid, Order>,
    pub work_orders: HashMap<Uuid, WorkOrder>,
    pub reports: Vec<ProductionReport>,
    pub sequences: HashMap<String, u32>,
}

impl StoreState {
    /// 產品目前啟用中的 BOM
    pub fn active_bom(&self, product_id: Uuid) -> Option<&Bom> {
        self.boms
            .values()
            .find(|b| b.product_id == product_id && b.is_active)
    }

    pub fn item_exists(&self, item: &ItemRef) -> bool {
        match item.item_type {
            bakery_core::ItemType::RawMaterial => self.materials.contains_key(&item.id),
            bakery_core::ItemType::Product => self.products.contains_key(&item.id),
        }
    }
}

/// 故障注入點（用於驗證原子性）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// 餘額已更新、異動尚未寫入
    AfterBalanceUpdate,
    /// 異動已寫入、交易尚未提交
    AfterMovementWrite,
}

#[derive(Debug, Clone, Copy)]
struct ArmedFault {
    point: FaultPoint,
    skip: usize,
}

#[derive(Debug, Default)]
struct StoreInner {
    state: StoreState,
    fault: Option<ArmedFault>,
}

/// 復原紀錄
#[derive(Debug)]
enum Undo {
    Material(Uuid, Option<RawMaterial>),
    Product(Uuid, Option<Product>),
    Bom(Uuid, Option<Bom>),
    Stock(ItemRef, Option<InventoryStock>),
    MovementPushed,
    Order(Uuid, Option<Order>),
    WorkOrder(Uuid, Option<WorkOrder>),
    ReportPushed,
    Sequence(String, Option<u32>),
}

/// 記憶體儲存區
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // 交易在 unwind 時已復原，被毒化的鎖內狀態仍一致
    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 在單一原子交易中執行閉包
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut tx = Transaction {
            inner: self.lock(),
            undo: Vec::new(),
            committed: false,
        };

        match f(&mut tx) {
            Ok(value) => {
                tx.commit();
                Ok(value)
            }
            Err(err) => {
                tracing::debug!("交易復原：{} 筆變更，原因 {}", tx.undo.len(), err);
                Err(err)
            }
        }
    }

    /// 唯讀存取（讀取當下的一致狀態）
    pub fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> T {
        f(&self.lock().state)
    }

    /// 設置一次性故障：略過前 `skip` 次到達後觸發
    pub fn arm_fault(&self, point: FaultPoint, skip: usize) {
        self.lock().fault = Some(ArmedFault { point, skip });
    }

    /// 取消尚未觸發的故障
    pub fn disarm_fault(&self) {
        self.lock().fault = None;
    }
}

/// 交易（持有儲存區鎖直到結束）
pub struct Transaction<'a> {
    inner: MutexGuard<'a, StoreInner>,
    undo: Vec<Undo>,
    committed: bool,
}

impl<'a> Transaction<'a> {
    pub fn state(&self) -> &StoreState {
        &self.inner.state
    }

    fn commit(&mut self) {
        self.undo.clear();
        self.committed = true;
    }

    fn rollback(&mut self) {
        let state = &mut self.inner.state;
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::Material(id, old) => restore(&mut state.materials, id, old),
                Undo::Product(id, old) => restore(&mut state.products, id, old),
                Undo::Bom(id, old) => restore(&mut state.boms, id, old),
                Undo::Stock(item, old) => restore(&mut state.stock, item, old),
                Undo::MovementPushed => {
                    state.movements.pop();
                }
                Undo::Order(id, old) => restore(&mut state.orders, id, old),
                Undo::WorkOrder(id, old) => restore(&mut state.work_orders, id, old),
                Undo::ReportPushed => {
                    state.reports.pop();
                }
                Undo::Sequence(scope, old) => restore(&mut state.sequences, scope, old),
            }
        }
    }

    /// 故障檢查點
    pub fn checkpoint(&mut self, point: FaultPoint) -> Result<()> {
        let Some(fault) = self.inner.fault.as_mut() else {
            return Ok(());
        };
        if fault.point != point {
            return Ok(());
        }
        if fault.skip > 0 {
            fault.skip -= 1;
            return Ok(());
        }
        self.inner.fault = None;
        Err(BakeryError::Transaction(format!("注入故障於 {:?}", point)))
    }

    pub fn put_material(&mut self, material: RawMaterial) {
        let id = material.id;
        let old = self.inner.state.materials.insert(id, material);
        self.undo.push(Undo::Material(id, old));
    }

    pub fn put_product(&mut self, product: Product) {
        let id = product.id;
        let old = self.inner.state.products.insert(id, product);
        self.undo.push(Undo::Product(id, old));
    }

    pub fn put_bom(&mut self, bom: Bom) {
        let id = bom.id;
        let old = self.inner.state.boms.insert(id, bom);
        self.undo.push(Undo::Bom(id, old));
    }

    pub fn put_stock(&mut self, stock: InventoryStock) {
        let item = stock.item;
        let old = self.inner.state.stock.insert(item, stock);
        self.undo.push(Undo::Stock(item, old));
    }

    pub fn push_movement(&mut self, movement: InventoryMovement) {
        self.inner.state.movements.push(movement);
        self.undo.push(Undo::MovementPushed);
    }

    pub fn put_order(&mut self, order: Order) {
        let id = order.id;
        let old = self.inner.state.orders.insert(id, order);
        self.undo.push(Undo::Order(id, old));
    }

    pub fn put_work_order(&mut self, work_order: WorkOrder) {
        let id = work_order.id;
        let old = self.inner.state.work_orders.insert(id, work_order);
        self.undo.push(Undo::WorkOrder(id, old));
    }

    pub fn push_report(&mut self, report: ProductionReport) {
        self.inner.state.reports.push(report);
        self.undo.push(Undo::ReportPushed);
    }

    /// 取得範圍內下一個序號（從 1 開始）
    pub fn next_sequence(&mut self, scope: &str) -> u32 {
        let old = self.inner.state.sequences.get(scope).copied();
        let next = old.unwrap_or(0) + 1;
        self.inner.state.sequences.insert(scope.to_string(), next);
        self.undo.push(Undo::Sequence(scope.to_string(), old));
        next
    }

    pub fn material(&self, id: Uuid) -> Result<&RawMaterial> {
        self.state()
            .materials
            .get(&id)
            .ok_or_else(|| BakeryError::not_found("原料", id))
    }

    pub fn product(&self, id: Uuid) -> Result<&Product> {
        self.state()
            .products
            .get(&id)
            .ok_or_else(|| BakeryError::not_found("產品", id))
    }

    pub fn bom(&self, id: Uuid) -> Result<&Bom> {
        self.state()
            .boms
            .get(&id)
            .ok_or_else(|| BakeryError::not_found("BOM", id))
    }

    pub fn order(&self, id: Uuid) -> Result<&Order> {
        self.state()
            .orders
            .get(&id)
            .ok_or_else(|| BakeryError::not_found("訂單", id))
    }

    pub fn work_order(&self, id: Uuid) -> Result<&WorkOrder> {
        self.state()
            .work_orders
            .get(&id)
            .ok_or_else(|| BakeryError::not_found("工單", id))
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}

fn restore<K: std::hash::Hash + Eq, V>(map: &mut HashMap<K, V>, key: K, old: Option<V>) {
    match old {
        Some(value) => {
            map.insert(key, value);
        }
        None => {
            map.remove(&key);
        }
    }
}
