// ==========================================
// MES 報表與分析子系統 - 評分期間管理
// ==========================================
// 職責: 期間日期計算 / 期間評分建立 / 期間結案 / 期間摘要
// 紅線: 結案後的記錄不得重算（由評分服務把關）
// ==========================================

use crate::domain::types::{Grade, ScorePeriod};
use crate::engine::scoring::{CapacityScoringService, ScoreInput, ScoreOutcome};
use crate::repository::score_repo::ScoreRepository;
use crate::repository::source_repo::SourceRepository;
use crate::repository::RepositoryResult;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

/// 期間評分建立結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodScoreOutcome {
    pub created: usize,
    pub skipped_closed: usize,
    pub failed: usize,
}

/// 期間摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub period_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_records: usize,
    pub avg_capacity_score: f64,
    pub avg_total_score: f64,
    /// 整體等級 → 筆數
    pub grade_distribution: BTreeMap<String, usize>,
    pub supervisor_scored_count: usize,
    /// 主管評分完成率（0.0–1.0）
    pub supervisor_score_rate: f64,
    /// 全部記錄皆已結案時為 true
    pub is_closed: bool,
}

// ==========================================
// ScorePeriodService - 評分期間管理
// ==========================================

/// 評分期間管理服務
pub struct ScorePeriodService {
    source_repo: SourceRepository,
    score_repo: ScoreRepository,
}

impl ScorePeriodService {
    pub fn new(source_repo: SourceRepository, score_repo: ScoreRepository) -> Self {
        Self {
            source_repo,
            score_repo,
        }
    }

    /// 指定期間類型在 today 所屬的完整日曆區間（含首尾）
    pub fn period_dates(period: ScorePeriod, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match period {
            ScorePeriod::Monthly => {
                let start = first_of_month(today.year(), today.month());
                (start, last_of_month(today.year(), today.month()))
            }
            ScorePeriod::Quarterly => {
                let quarter_start_month = ((today.month() - 1) / 3) * 3 + 1;
                let start = first_of_month(today.year(), quarter_start_month);
                let end_month = quarter_start_month + 2;
                (start, last_of_month(today.year(), end_month))
            }
            ScorePeriod::Yearly => (
                first_of_month(today.year(), 1),
                last_of_month(today.year(), 12),
            ),
        }
    }

    /// 期間顯示名稱
    pub fn period_name(period: ScorePeriod, today: NaiveDate) -> String {
        match period {
            ScorePeriod::Monthly => format!("{}年{}月評分", today.year(), today.month()),
            ScorePeriod::Quarterly => {
                let quarter = (today.month() - 1) / 3 + 1;
                format!("{}年第{}季評分", today.year(), quarter)
            }
            ScorePeriod::Yearly => format!("{}年度評分", today.year()),
        }
    }

    /// 依期間內的填報與現場報工記錄建立評分
    ///
    /// 單列失敗隔離；期間已結案的鍵跳過。
    #[instrument(skip(self, scoring))]
    pub fn create_period_scores(
        &self,
        scoring: &CapacityScoringService,
        company: &str,
        period: ScorePeriod,
        today: NaiveDate,
    ) -> RepositoryResult<PeriodScoreOutcome> {
        let (start_date, end_date) = Self::period_dates(period, today);

        let mut inputs: Vec<ScoreInput> = Vec::new();

        for entry in self
            .source_repo
            .list_approved_fill_work_in_range(company, start_date, end_date)?
        {
            let (Some(operator), Some(workorder), Some(work_date)) = (
                entry.operator.as_deref().filter(|s| !s.is_empty()),
                entry.workorder.as_deref().filter(|s| !s.is_empty()),
                entry.work_date,
            ) else {
                continue;
            };
            let Some(process) = entry.effective_process().filter(|s| !s.is_empty()) else {
                continue;
            };
            inputs.push(ScoreInput {
                operator_name: operator.to_string(),
                operator_id: operator.to_string(),
                company_code: company.to_string(),
                product_code: entry.product_id.clone().unwrap_or_default(),
                process_name: process.to_string(),
                workorder_id: workorder.to_string(),
                work_date,
                work_hours: entry.work_hours_calculated + entry.overtime_hours_calculated,
                completed_quantity: entry.work_quantity,
                defect_quantity: entry.defect_quantity,
                score_period: period,
                period_start_date: start_date,
                period_end_date: end_date,
            });
        }

        for entry in self
            .source_repo
            .list_onsite_in_range(company, start_date, end_date)?
        {
            let (Some(operator), Some(workorder), Some(work_date)) = (
                entry.operator.as_deref().filter(|s| !s.is_empty()),
                entry.workorder.as_deref().filter(|s| !s.is_empty()),
                entry.work_date,
            ) else {
                continue;
            };
            let Some(process) = entry.process_name.as_deref().filter(|s| !s.is_empty()) else {
                continue;
            };
            inputs.push(ScoreInput {
                operator_name: operator.to_string(),
                operator_id: operator.to_string(),
                company_code: company.to_string(),
                product_code: entry.product_id.clone().unwrap_or_default(),
                process_name: process.to_string(),
                workorder_id: workorder.to_string(),
                work_date,
                work_hours: entry.work_hours_calculated + entry.overtime_hours_calculated,
                completed_quantity: entry.work_quantity,
                defect_quantity: entry.defect_quantity,
                score_period: period,
                period_start_date: start_date,
                period_end_date: end_date,
            });
        }

        let mut created = 0usize;
        let mut skipped_closed = 0usize;
        let mut failed = 0usize;
        for input in &inputs {
            match scoring.score(input, None) {
                Ok(ScoreOutcome::Scored(_)) => created += 1,
                Ok(ScoreOutcome::SkippedClosed) => skipped_closed += 1,
                Err(e) => {
                    warn!(
                        "期間評分失敗: operator={} workorder={} error={}",
                        input.operator_name, input.workorder_id, e
                    );
                    failed += 1;
                }
            }
        }

        info!(
            "期間評分完成: company={} period={} created={} skipped_closed={} failed={}",
            company, period, created, skipped_closed, failed
        );
        Ok(PeriodScoreOutcome {
            created,
            skipped_closed,
            failed,
        })
    }

    /// 結案指定期間，回傳受影響筆數
    #[instrument(skip(self))]
    pub fn close_period(
        &self,
        company: &str,
        period: ScorePeriod,
        today: NaiveDate,
    ) -> RepositoryResult<usize> {
        let (start_date, end_date) = Self::period_dates(period, today);
        let updated = self
            .score_repo
            .close_period(company, period, start_date, end_date)?;
        info!(
            "評分期間結案: company={} period={} updated={}",
            company, period, updated
        );
        Ok(updated)
    }

    /// 期間摘要（平均分、等級分布、主管評分完成率）
    pub fn get_period_summary(
        &self,
        company: &str,
        period: ScorePeriod,
        today: NaiveDate,
    ) -> RepositoryResult<PeriodSummary> {
        let (start_date, end_date) = Self::period_dates(period, today);
        let scores = self.score_repo.list_by_period(company, start_date, end_date)?;

        let total = scores.len();
        let avg_capacity_score = if total > 0 {
            scores.iter().map(|s| s.capacity_score).sum::<f64>() / total as f64
        } else {
            0.0
        };
        let avg_total_score = if total > 0 {
            scores.iter().map(|s| s.total_score).sum::<f64>() / total as f64
        } else {
            0.0
        };

        let mut grade_distribution: BTreeMap<String, usize> = BTreeMap::new();
        for grade in [Grade::A, Grade::B, Grade::C, Grade::D] {
            grade_distribution.insert(grade.label().to_string(), 0);
        }
        for s in &scores {
            *grade_distribution
                .entry(s.overall_grade.label().to_string())
                .or_insert(0) += 1;
        }

        let supervisor_scored_count = scores.iter().filter(|s| s.is_supervisor_scored).count();
        let supervisor_score_rate = if total > 0 {
            supervisor_scored_count as f64 / total as f64
        } else {
            0.0
        };
        let is_closed = total > 0 && scores.iter().all(|s| s.is_period_closed);

        Ok(PeriodSummary {
            period_name: Self::period_name(period, today),
            start_date,
            end_date,
            total_records: total,
            avg_capacity_score,
            avg_total_score,
            grade_distribution,
            supervisor_scored_count,
            supervisor_score_rate,
            is_closed,
        })
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
}

fn last_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    first_of_month(next_year, next_month) - chrono::Duration::days(1)
}
