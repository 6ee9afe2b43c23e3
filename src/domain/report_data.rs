// ==========================================
// MES 報表與分析子系統 - 統一報表記錄
// ==========================================
// 職責: 核准後填報記錄投影成的去正規化報表列
// 紅線: 同步時不計算時間維度欄位（週/月/季/年留 0 佔位）
// ==========================================

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// 統一報表記錄
///
/// 身份五元組 (workorder_id, company, work_date, operator_name, start_time)
/// 是去重的自然鍵，資料庫以唯一索引保證。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrderReportData {
    pub id: Option<i64>,
    pub workorder_id: String,
    pub company: String,
    pub operator_name: String,
    pub product_code: Option<String>,
    pub process_name: Option<String>,
    pub work_date: NaiveDate,
    /// HH:MM，缺失以空字串儲存（唯一索引需要非 NULL）
    pub start_time: String,
    pub end_time: Option<String>,
    // 時間維度佔位欄位，同步時一律為 0，讀取方按需計算
    pub work_week: i32,
    pub work_month: i32,
    pub work_quarter: i32,
    pub work_year: i32,
    pub work_hours: f64,
    pub overtime_hours: f64,
    pub work_quantity: i64,
    pub defect_quantity: i64,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// 按需計算的時間維度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDimensions {
    pub year: i32,
    pub month: u32,
    pub week: u32,
    pub quarter: u32,
}

impl WorkOrderReportData {
    /// 身份五元組
    pub fn identity(&self) -> (&str, &str, NaiveDate, &str, &str) {
        (
            &self.workorder_id,
            &self.company,
            self.work_date,
            &self.operator_name,
            &self.start_time,
        )
    }

    /// 由 work_date 推導時間維度（ISO 週序）
    pub fn time_dimensions(&self) -> TimeDimensions {
        let d = self.work_date;
        TimeDimensions {
            year: d.year(),
            month: d.month(),
            week: d.iso_week().week(),
            quarter: (d.month() - 1) / 3 + 1,
        }
    }

    /// 正常時數加加班時數
    pub fn total_hours(&self) -> f64 {
        self.work_hours + self.overtime_hours
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(date: NaiveDate) -> WorkOrderReportData {
        WorkOrderReportData {
            id: None,
            workorder_id: "WO1".to_string(),
            company: "C1".to_string(),
            operator_name: "OP1".to_string(),
            product_code: Some("P1".to_string()),
            process_name: Some("SMT".to_string()),
            work_date: date,
            start_time: "08:00".to_string(),
            end_time: Some("17:00".to_string()),
            work_week: 0,
            work_month: 0,
            work_quarter: 0,
            work_year: 0,
            work_hours: 7.5,
            overtime_hours: 0.5,
            work_quantity: 100,
            defect_quantity: 2,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_time_dimensions() {
        let r = sample(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        let dims = r.time_dimensions();
        assert_eq!(dims.year, 2025);
        assert_eq!(dims.month, 3);
        assert_eq!(dims.quarter, 1);
        assert_eq!(dims.week, 10);
    }

    #[test]
    fn test_quarter_boundaries() {
        let q4 = sample(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
        assert_eq!(q4.time_dimensions().quarter, 4);
        let q1 = sample(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(q1.time_dimensions().quarter, 1);
    }
}
