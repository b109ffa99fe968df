//! 引擎配置模型

use serde::{Deserialize, Serialize};

use crate::order::OrderStatus;
use crate::{BakeryError, Result};

/// 引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 計入生產計劃的訂單狀態
    pub planning_statuses: Vec<OrderStatus>,

    /// 計入補貨建議的訂單狀態
    pub reorder_statuses: Vec<OrderStatus>,

    /// 需求數量無條件進位的小數位數
    pub quantity_scale: u32,

    /// 首筆異動建立庫存時是否將期初餘額截為非負
    /// - true: 期初 = max(0, 數量)，後續異動不截斷（保留既有行為）
    /// - false: 期初 = 數量，異動帳總和恆等於現有庫存
    pub clamp_opening_balance: bool,

    /// 批號序號寬度
    pub batch_sequence_width: usize,

    /// 訂單/工單序號寬度
    pub document_sequence_width: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            planning_statuses: vec![OrderStatus::Confirmed, OrderStatus::Locked],
            reorder_statuses: vec![
                OrderStatus::Confirmed,
                OrderStatus::Locked,
                OrderStatus::InProduction,
            ],
            quantity_scale: 2,
            clamp_opening_balance: true,
            batch_sequence_width: 3,
            document_sequence_width: 4,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 從 JSON 文件載入（缺少的欄位使用預設值）
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| BakeryError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 建構器模式：設置計劃訂單狀態
    pub fn with_planning_statuses(mut self, statuses: Vec<OrderStatus>) -> Self {
        self.planning_statuses = statuses;
        self
    }

    /// 建構器模式：設置補貨訂單狀態
    pub fn with_reorder_statuses(mut self, statuses: Vec<OrderStatus>) -> Self {
        self.reorder_statuses = statuses;
        self
    }

    /// 建構器模式：設置數量精度
    pub fn with_quantity_scale(mut self, scale: u32) -> Self {
        self.quantity_scale = scale;
        self
    }

    /// 建構器模式：設置是否截斷期初餘額
    pub fn with_clamp_opening_balance(mut self, clamp: bool) -> Self {
        self.clamp_opening_balance = clamp;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.quantity_scale > 10 {
            return Err(BakeryError::InvalidConfig(format!(
                "quantity_scale 過大: {}",
                self.quantity_scale
            )));
        }
        if self.batch_sequence_width == 0 || self.document_sequence_width == 0 {
            return Err(BakeryError::InvalidConfig("序號寬度必須大於 0".to_string()));
        }
        Ok(())
    }

    pub fn is_planning_status(&self, status: OrderStatus) -> bool {
        self.planning_statuses.contains(&status)
    }

    pub fn is_reorder_status(&self, status: OrderStatus) -> bool {
        self.reorder_statuses.contains(&status)
    }
}
