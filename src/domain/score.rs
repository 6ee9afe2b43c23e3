// ==========================================
// MES 報表與分析子系統 - 作業員工序產能評分實體
// ==========================================
// 職責: 每 (作業員, 公司, 產品, 工序, 工單, 日期) 一列的評分記錄
// 紅線: 期間結案 (is_period_closed) 後不得靜默重算
// ==========================================

use crate::domain::types::{Grade, ScorePeriod};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// 儲存安全上限（對齊資料庫 DECIMAL 精度，非業務門檻）
pub const MAX_CAPACITY_PER_HOUR: f64 = 50.0;
pub const MAX_CAPACITY_RATIO: f64 = 5.0;
pub const MAX_SCORE: f64 = 500.0;
pub const MAX_EFFICIENCY_FACTOR: f64 = 1.20;
pub const MAX_LEARNING_CURVE_FACTOR: f64 = 1.10;

/// 主管評分預設值
pub const DEFAULT_SUPERVISOR_SCORE: f64 = 80.0;

/// 作業員工序產能評分記錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorProcessCapacityScore {
    pub id: Option<i64>,
    pub operator_name: String,
    pub operator_id: String,
    pub company_code: String,
    pub product_code: String,
    pub process_name: String,
    pub workorder_id: String,
    pub work_date: NaiveDate,
    pub work_hours: f64,
    pub standard_capacity_per_hour: f64,
    pub actual_capacity_per_hour: f64,
    pub completed_quantity: i64,
    pub capacity_ratio: f64,
    pub efficiency_factor: f64,
    pub learning_curve_factor: f64,
    pub defect_quantity: i64,
    pub defect_rate: f64,
    pub capacity_score: f64,
    pub supervisor_score: f64,
    pub supervisor_comment: String,
    pub supervisor_name: String,
    pub supervisor_date: Option<NaiveDateTime>,
    pub is_supervisor_scored: bool,
    pub total_score: f64,
    pub grade: Grade,
    pub overall_grade: Grade,
    pub score_period: ScorePeriod,
    pub period_start_date: Option<NaiveDate>,
    pub period_end_date: Option<NaiveDate>,
    pub is_period_closed: bool,
    pub period_closed_date: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl OperatorProcessCapacityScore {
    /// 產能評分分段函數
    ///
    /// - ratio ≥ 1.0 → 100
    /// - ratio ≥ 0.8 → 80 + (ratio − 0.8) × 100
    /// - ratio ≥ 0.6 → 60 + (ratio − 0.6) × 100
    /// - 其餘       → ratio × 100
    pub fn capacity_score_for(capacity_ratio: f64) -> f64 {
        let score = if capacity_ratio >= 1.0 {
            100.0
        } else if capacity_ratio >= 0.8 {
            80.0 + (capacity_ratio - 0.8) * 100.0
        } else if capacity_ratio >= 0.6 {
            60.0 + (capacity_ratio - 0.6) * 100.0
        } else {
            capacity_ratio * 100.0
        };
        score.min(MAX_SCORE)
    }

    /// 總評分 = 產能評分 × 0.80 + 主管評分 × 0.20
    pub fn total_score_for(capacity_score: f64, supervisor_score: f64) -> f64 {
        (capacity_score * 0.80 + supervisor_score * 0.20).min(MAX_SCORE)
    }

    /// 重算評分與等級（不動主管評分欄位）
    pub fn recompute(&mut self) {
        self.capacity_score = Self::capacity_score_for(self.capacity_ratio);
        self.total_score = Self::total_score_for(self.capacity_score, self.supervisor_score);
        self.grade = Grade::from_score(self.capacity_score);
        self.overall_grade = Grade::from_score(self.total_score);
    }
}
