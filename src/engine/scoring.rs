// ==========================================
// MES 報表與分析子系統 - 產能評分服務
// ==========================================
// 職責: 按標準產能計算作業員工序評分，支援主管評分覆寫
// 紅線: 期間已結案的記錄不得重算
// 紅線: 衍生數值寫入前一律夾限（儲存精度保護）
// ==========================================

use crate::domain::score::{
    OperatorProcessCapacityScore, DEFAULT_SUPERVISOR_SCORE, MAX_CAPACITY_PER_HOUR,
    MAX_CAPACITY_RATIO, MAX_EFFICIENCY_FACTOR, MAX_LEARNING_CURVE_FACTOR,
};
use crate::domain::types::{Grade, ScorePeriod};
use crate::repository::score_repo::ScoreRepository;
use crate::repository::source_repo::SourceRepository;
use crate::repository::RepositoryResult;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// 標準產能缺失時的預設值（件/小時）
pub const DEFAULT_STANDARD_CAPACITY: f64 = 1.00;

/// 評分輸入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreInput {
    pub operator_name: String,
    pub operator_id: String,
    pub company_code: String,
    pub product_code: String,
    pub process_name: String,
    pub workorder_id: String,
    pub work_date: NaiveDate,
    pub work_hours: f64,
    pub completed_quantity: i64,
    pub defect_quantity: i64,
    pub score_period: ScorePeriod,
    pub period_start_date: NaiveDate,
    pub period_end_date: NaiveDate,
}

/// 主管評分覆寫
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorReview {
    pub supervisor_name: String,
    pub score: f64,
    pub comment: String,
}

/// 評分結果
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    /// 已建立或更新
    Scored(Box<OperatorProcessCapacityScore>),
    /// 期間已結案，保持原記錄不動
    SkippedClosed,
}

// ==========================================
// CapacityScoringService - 產能評分服務
// ==========================================

/// 產能評分服務
pub struct CapacityScoringService {
    source_repo: SourceRepository,
    score_repo: ScoreRepository,
}

impl CapacityScoringService {
    pub fn new(source_repo: SourceRepository, score_repo: ScoreRepository) -> Self {
        Self {
            source_repo,
            score_repo,
        }
    }

    /// 計算並寫入單筆評分
    ///
    /// 已存在記錄時保留主管評分欄位，除非本次帶入覆寫。
    #[instrument(skip(self, input, supervisor), fields(
        operator = %input.operator_name,
        workorder = %input.workorder_id,
        process = %input.process_name,
    ))]
    pub fn score(
        &self,
        input: &ScoreInput,
        supervisor: Option<&SupervisorReview>,
    ) -> RepositoryResult<ScoreOutcome> {
        let existing = self.score_repo.find_by_key(
            &input.operator_id,
            &input.company_code,
            &input.product_code,
            &input.process_name,
            &input.workorder_id,
            input.work_date,
        )?;

        if let Some(ref record) = existing {
            if record.is_period_closed {
                info!(
                    "評分期間已結案，不重算: operator={} work_date={}",
                    input.operator_name, input.work_date
                );
                return Ok(ScoreOutcome::SkippedClosed);
            }
        }

        // 標準產能查詢，缺目錄時用預設值
        let standard = self
            .source_repo
            .find_standard_capacity(&input.company_code, &input.product_code, &input.process_name)?
            .map(|c| c.standard_capacity_per_hour)
            .unwrap_or(DEFAULT_STANDARD_CAPACITY);

        let actual = if input.work_hours > 0.0 {
            (input.completed_quantity as f64 / input.work_hours).min(MAX_CAPACITY_PER_HOUR)
        } else {
            0.0
        };
        let ratio = if standard > 0.0 {
            (actual / standard).min(MAX_CAPACITY_RATIO)
        } else {
            0.0
        };
        let efficiency_factor = ratio.min(MAX_EFFICIENCY_FACTOR);
        let learning_curve_factor = ratio.min(MAX_LEARNING_CURVE_FACTOR);
        let defect_rate = if input.completed_quantity > 0 {
            input.defect_quantity as f64 / input.completed_quantity as f64
        } else {
            0.0
        };

        // 主管評分欄位：覆寫 > 既有 > 預設
        let (supervisor_score, supervisor_comment, supervisor_name, supervisor_date, is_scored) =
            match (supervisor, &existing) {
                (Some(review), _) => (
                    review.score,
                    review.comment.clone(),
                    review.supervisor_name.clone(),
                    Some(Utc::now().naive_utc()),
                    true,
                ),
                (None, Some(record)) => (
                    record.supervisor_score,
                    record.supervisor_comment.clone(),
                    record.supervisor_name.clone(),
                    record.supervisor_date,
                    record.is_supervisor_scored,
                ),
                (None, None) => (DEFAULT_SUPERVISOR_SCORE, String::new(), String::new(), None, false),
            };

        let capacity_score = OperatorProcessCapacityScore::capacity_score_for(ratio);
        let total_score =
            OperatorProcessCapacityScore::total_score_for(capacity_score, supervisor_score);

        let score = OperatorProcessCapacityScore {
            id: existing.as_ref().and_then(|r| r.id),
            operator_name: input.operator_name.clone(),
            operator_id: input.operator_id.clone(),
            company_code: input.company_code.clone(),
            product_code: input.product_code.clone(),
            process_name: input.process_name.clone(),
            workorder_id: input.workorder_id.clone(),
            work_date: input.work_date,
            work_hours: input.work_hours,
            standard_capacity_per_hour: standard,
            actual_capacity_per_hour: actual,
            completed_quantity: input.completed_quantity,
            capacity_ratio: ratio,
            efficiency_factor,
            learning_curve_factor,
            defect_quantity: input.defect_quantity,
            defect_rate,
            capacity_score,
            supervisor_score,
            supervisor_comment,
            supervisor_name,
            supervisor_date,
            is_supervisor_scored: is_scored,
            total_score,
            grade: Grade::from_score(capacity_score),
            overall_grade: Grade::from_score(total_score),
            score_period: input.score_period,
            period_start_date: Some(input.period_start_date),
            period_end_date: Some(input.period_end_date),
            is_period_closed: false,
            period_closed_date: None,
            created_at: None,
            updated_at: None,
        };

        self.score_repo.upsert(&score)?;
        Ok(ScoreOutcome::Scored(Box::new(score)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps_are_ordered() {
        // 夾限常數之間的關係不可顛倒
        assert!(MAX_LEARNING_CURVE_FACTOR < MAX_EFFICIENCY_FACTOR);
        assert!(MAX_EFFICIENCY_FACTOR < MAX_CAPACITY_RATIO);
    }
}
