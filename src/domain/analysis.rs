// ==========================================
// MES 報表與分析子系統 - 已完工工單分析實體
// ==========================================
// 職責: 工單執行時間線重建結果（分析引擎的持久化輸出）
// 紅線: 效率比率封頂 999.99（儲存精度上限，非業務門檻）
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 效率比率儲存上限（對齊 DECIMAL(5,2)）
pub const EFFICIENCY_RATE_CAP: f64 = 999.99;

/// 工序明細內保留的樣本記錄上限
pub const SAMPLE_RECORD_LIMIT: usize = 5;

/// 已完工工單分析結果
///
/// 每個 (workorder_id, company_code, product_code) 一列，
/// 由分析引擎建立或覆寫（force 重新分析）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedWorkOrderAnalysis {
    pub id: Option<i64>,
    pub workorder_id: String,
    pub company_code: String,
    pub company_name: Option<String>,
    pub product_code: String,
    pub product_name: Option<String>,
    pub ordered_quantity: i64,
    pub first_record_date: NaiveDate,
    pub last_record_date: NaiveDate,
    /// 出貨包裝工序最後一筆的日期；無包裝記錄時退回 last_record_date
    pub completion_date: NaiveDate,
    pub total_execution_days: i64,
    pub total_work_hours: f64,
    pub total_overtime_hours: f64,
    pub average_daily_hours: f64,
    /// min(999.99, total_work_hours / (days × 8) × 100)
    pub efficiency_rate: f64,
    pub total_processes: i64,
    pub unique_processes: i64,
    pub total_operators: i64,
    /// 工序名稱 → 明細（JSON 欄位持久化）
    pub process_details: BTreeMap<String, ProcessDetail>,
    /// 作業員名稱 → 明細（JSON 欄位持久化）
    pub operator_details: BTreeMap<String, OperatorDetail>,
    /// 固定為 "completed"
    pub completion_status: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// 單一工序的彙總明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDetail {
    pub total_hours: f64,
    pub overtime_hours: f64,
    pub total_quantity: i64,
    /// total_quantity / (total_hours + overtime_hours)，時數非正時為 0
    pub hourly_capacity: f64,
    pub first_record_date: NaiveDate,
    /// 此工序首次出現的時間順位（1 起算），為 UI 排序鍵
    pub first_appearance_order: usize,
    /// 最多 5 筆樣本，按 (work_date, start_time) 升冪
    pub records: Vec<SampleRecord>,
    pub operators: Vec<String>,
}

/// 單一作業員的彙總明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorDetail {
    pub total_hours: f64,
    pub overtime_hours: f64,
    pub processes: Vec<String>,
    pub work_days_count: usize,
}

/// 工序明細中的樣本記錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub work_date: NaiveDate,
    pub start_time: Option<String>,
    pub operator: String,
    pub work_hours: f64,
    pub work_quantity: i64,
}

impl CompletedWorkOrderAnalysis {
    /// 效率比率公式，帶儲存上限
    pub fn efficiency_rate_for(total_work_hours: f64, execution_days: i64) -> f64 {
        if execution_days <= 0 {
            return 0.0;
        }
        let rate = total_work_hours / (execution_days as f64 * 8.0) * 100.0;
        rate.min(EFFICIENCY_RATE_CAP)
    }

    /// 工序時產能公式
    pub fn hourly_capacity_for(total_quantity: i64, hours: f64) -> f64 {
        if hours > 0.0 {
            total_quantity as f64 / hours
        } else {
            0.0
        }
    }
}
