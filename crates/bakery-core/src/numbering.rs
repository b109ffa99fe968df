//! 單據編號格式
//!
//! - 訂單：`ORD-YYYYMMDD-NNNN`
//! - 工單：`WO-YYYYMMDD-NNNN`
//! - 批號：`YYYYMMDD-LIN-SEQ`（序號以日期 + 生產線為範圍）

use chrono::NaiveDate;

/// 序號範圍鍵（同一鍵內序號單調遞增）
pub fn order_scope(date: NaiveDate) -> String {
    format!("ORD-{}", date.format("%Y%m%d"))
}

pub fn work_order_scope(date: NaiveDate) -> String {
    format!("WO-{}", date.format("%Y%m%d"))
}

pub fn batch_scope(date: NaiveDate, line: &str) -> String {
    format!("BATCH-{}-{}", date.format("%Y%m%d"), line_code(line))
}

pub fn order_number(date: NaiveDate, seq: u32, width: usize) -> String {
    format!("ORD-{}-{:0width$}", date.format("%Y%m%d"), seq, width = width)
}

pub fn work_order_number(date: NaiveDate, seq: u32, width: usize) -> String {
    format!("WO-{}-{:0width$}", date.format("%Y%m%d"), seq, width = width)
}

pub fn batch_number(date: NaiveDate, line: &str, seq: u32, width: usize) -> String {
    format!(
        "{}-{}-{:0width$}",
        date.format("%Y%m%d"),
        line_code(line),
        seq,
        width = width
    )
}

/// 生產線代碼：大寫、取前三碼
fn line_code(line: &str) -> String {
    line.trim().to_uppercase().chars().take(3).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 7).unwrap()
    }

    #[test]
    fn test_document_numbers() {
        assert_eq!(order_number(date(), 12, 4), "ORD-20251107-0012");
        assert_eq!(work_order_number(date(), 1, 4), "WO-20251107-0001");
    }

    #[test]
    fn test_batch_number_uses_line_code() {
        assert_eq!(batch_number(date(), "brd", 3, 3), "20251107-BRD-003");
        assert_eq!(batch_number(date(), "pastry", 10, 3), "20251107-PAS-010");
        assert_eq!(batch_scope(date(), "pastry"), "BATCH-20251107-PAS");
    }
}
