// ==========================================
// MES 報表與分析子系統 - 已完工工單分析引擎
// ==========================================
// 職責: 從填報記錄重建工單執行時間線，產出持久化分析結果
// 紅線: 工單編號含「RD樣品」者一律不分析
// 紅線: 批次中單一工單失敗不中止批次，錯誤彙總回報
// ==========================================

use crate::domain::analysis::{
    CompletedWorkOrderAnalysis, OperatorDetail, ProcessDetail, SampleRecord, SAMPLE_RECORD_LIMIT,
};
use crate::domain::source::FillWork;
use crate::repository::analysis_repo::AnalysisRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::source_repo::SourceRepository;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

/// 排除分析的工單編號子字串（研發樣品）
pub const RD_SAMPLE_MARKER: &str = "RD樣品";

/// 批次錯誤訊息列舉上限，超出以「還有 N 個錯誤」收尾
const ERROR_DISPLAY_LIMIT: usize = 10;

/// 單一工單分析結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalyzeOutcome {
    /// 已建立或覆寫分析列
    Created,
    /// 跳過（已存在且未 force，或為 RD樣品）
    Skipped(String),
}

/// 批次分析結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub success_count: usize,
    pub error_count: usize,
    pub skipped_count: usize,
    pub errors: Vec<String>,
}

impl BatchOutcome {
    /// 使用者可見訊息；錯誤只列舉前十筆
    pub fn message(&self) -> String {
        let mut msg = format!(
            "分析完成：成功 {} 筆，跳過 {} 筆，失敗 {} 筆",
            self.success_count, self.skipped_count, self.error_count
        );
        if !self.errors.is_empty() {
            let shown: Vec<&str> = self
                .errors
                .iter()
                .take(ERROR_DISPLAY_LIMIT)
                .map(|s| s.as_str())
                .collect();
            msg.push_str("\n");
            msg.push_str(&shown.join("\n"));
            if self.errors.len() > ERROR_DISPLAY_LIMIT {
                msg.push_str(&format!(
                    "\n... 還有 {} 個錯誤",
                    self.errors.len() - ERROR_DISPLAY_LIMIT
                ));
            }
        }
        msg
    }
}

// ==========================================
// WorkOrderAnalyzer - 工單分析引擎
// ==========================================

/// 已完工工單分析引擎
pub struct WorkOrderAnalyzer {
    source_repo: SourceRepository,
    analysis_repo: AnalysisRepository,
    /// 完工日期判定用的包裝工序名稱（來自配置）
    packaging_process_name: String,
}

impl WorkOrderAnalyzer {
    pub fn new(
        source_repo: SourceRepository,
        analysis_repo: AnalysisRepository,
        packaging_process_name: String,
    ) -> Self {
        Self {
            source_repo,
            analysis_repo,
            packaging_process_name,
        }
    }

    /// 分析單一工單
    ///
    /// # 參數
    /// - force: 已存在分析列時是否重新分析
    #[instrument(skip(self))]
    pub fn analyze(
        &self,
        workorder_id: &str,
        company_code: &str,
        product_code: &str,
        force: bool,
    ) -> RepositoryResult<AnalyzeOutcome> {
        if workorder_id.contains(RD_SAMPLE_MARKER) {
            return Ok(AnalyzeOutcome::Skipped(format!(
                "工單 {} 為研發樣品，不納入分析",
                workorder_id
            )));
        }

        if !force && self.analysis_repo.exists(workorder_id, company_code, product_code)? {
            return Ok(AnalyzeOutcome::Skipped(format!(
                "工單 {} 已有分析結果",
                workorder_id
            )));
        }

        let header = self
            .source_repo
            .find_completed_workorder(workorder_id, company_code)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "completed_workorder".to_string(),
                id: workorder_id.to_string(),
            })?;

        let mut entries = self
            .source_repo
            .list_fill_work_for_order(workorder_id, product_code)?;
        if entries.is_empty() {
            return Err(RepositoryError::ValidationError(format!(
                "工單 {} 無填報記錄，無法分析",
                workorder_id
            )));
        }

        // 缺失開始時間視為 00:00 排序
        entries.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

        let analysis = self.build_analysis(
            workorder_id,
            company_code,
            product_code,
            header.company_name,
            header.product_name,
            header.completed_quantity,
            &entries,
        )?;

        self.analysis_repo.upsert(&analysis)?;
        info!(
            "工單分析完成: workorder={} completion_date={} efficiency_rate={:.2}",
            workorder_id, analysis.completion_date, analysis.efficiency_rate
        );
        Ok(AnalyzeOutcome::Created)
    }

    /// 批次分析完工工單
    ///
    /// 可選按日期範圍（工單須有落在範圍內的填報記錄）與公司過濾。
    #[instrument(skip(self))]
    pub fn analyze_batch(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        company_code: Option<&str>,
        force: bool,
    ) -> RepositoryResult<BatchOutcome> {
        let orders = self.source_repo.list_completed_workorders(company_code)?;

        let mut success_count = 0usize;
        let mut error_count = 0usize;
        let mut skipped_count = 0usize;
        let mut errors = Vec::new();

        for order in &orders {
            let product_code = order.product_code.clone().unwrap_or_default();

            // 日期範圍過濾：無任何記錄落在範圍內則跳過
            if start_date.is_some() || end_date.is_some() {
                match self.order_in_range(&order.order_number, &product_code, start_date, end_date) {
                    Ok(true) => {}
                    Ok(false) => {
                        skipped_count += 1;
                        continue;
                    }
                    Err(e) => {
                        error_count += 1;
                        errors.push(format!("工單 {} 分析失敗: {}", order.order_number, e));
                        continue;
                    }
                }
            }

            match self.analyze(&order.order_number, &order.company_code, &product_code, force) {
                Ok(AnalyzeOutcome::Created) => success_count += 1,
                Ok(AnalyzeOutcome::Skipped(_)) => skipped_count += 1,
                Err(e) => {
                    warn!("工單分析失敗: workorder={} error={}", order.order_number, e);
                    error_count += 1;
                    errors.push(format!("工單 {} 分析失敗: {}", order.order_number, e));
                }
            }
        }

        Ok(BatchOutcome {
            success_count,
            error_count,
            skipped_count,
            errors,
        })
    }

    fn order_in_range(
        &self,
        workorder_id: &str,
        product_code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> RepositoryResult<bool> {
        let entries = self
            .source_repo
            .list_fill_work_for_order(workorder_id, product_code)?;
        Ok(entries.iter().any(|e| {
            e.work_date.map_or(false, |d| {
                start_date.map_or(true, |s| d >= s) && end_date.map_or(true, |t| d <= t)
            })
        }))
    }

    #[allow(clippy::too_many_arguments)]
    fn build_analysis(
        &self,
        workorder_id: &str,
        company_code: &str,
        product_code: &str,
        company_name: Option<String>,
        product_name: Option<String>,
        ordered_quantity: i64,
        entries: &[FillWork],
    ) -> RepositoryResult<CompletedWorkOrderAnalysis> {
        let dates: Vec<NaiveDate> = entries.iter().filter_map(|e| e.work_date).collect();
        let first_date = dates.iter().min().copied().ok_or_else(|| {
            RepositoryError::ValidationError(format!("工單 {} 填報記錄缺少日期", workorder_id))
        })?;
        let last_date = dates.iter().max().copied().unwrap_or(first_date);
        let total_execution_days = (last_date - first_date).num_days() + 1;

        // 完工日期：包裝工序最後一筆的日期；無包裝記錄退回 last_date
        let completion_date = entries
            .iter()
            .filter(|e| e.effective_process() == Some(self.packaging_process_name.as_str()))
            .filter_map(|e| e.work_date)
            .max()
            .unwrap_or(last_date);

        let total_work_hours: f64 = entries.iter().map(|e| e.work_hours_calculated).sum();
        let total_overtime_hours: f64 =
            entries.iter().map(|e| e.overtime_hours_calculated).sum();
        let average_daily_hours = if total_execution_days > 0 {
            total_work_hours / total_execution_days as f64
        } else {
            0.0
        };
        let efficiency_rate =
            CompletedWorkOrderAnalysis::efficiency_rate_for(total_work_hours, total_execution_days);

        // 按工序分組，記錄首次出現順位
        let mut process_details: BTreeMap<String, ProcessDetail> = BTreeMap::new();
        let mut appearance_order = 0usize;
        for entry in entries {
            let process = entry
                .effective_process()
                .unwrap_or("未指定")
                .to_string();
            let operator = entry.operator.clone().unwrap_or_default();
            let work_date = match entry.work_date {
                Some(d) => d,
                None => continue,
            };

            let detail = process_details.entry(process).or_insert_with(|| {
                appearance_order += 1;
                ProcessDetail {
                    total_hours: 0.0,
                    overtime_hours: 0.0,
                    total_quantity: 0,
                    hourly_capacity: 0.0,
                    first_record_date: work_date,
                    first_appearance_order: appearance_order,
                    records: Vec::new(),
                    operators: Vec::new(),
                }
            });
            detail.total_hours += entry.work_hours_calculated;
            detail.overtime_hours += entry.overtime_hours_calculated;
            detail.total_quantity += entry.work_quantity;
            if work_date < detail.first_record_date {
                detail.first_record_date = work_date;
            }
            if detail.records.len() < SAMPLE_RECORD_LIMIT {
                detail.records.push(SampleRecord {
                    work_date,
                    start_time: entry.start_time.clone(),
                    operator: operator.clone(),
                    work_hours: entry.work_hours_calculated,
                    work_quantity: entry.work_quantity,
                });
            }
            if !operator.is_empty() && !detail.operators.contains(&operator) {
                detail.operators.push(operator);
            }
        }
        for detail in process_details.values_mut() {
            detail.hourly_capacity = CompletedWorkOrderAnalysis::hourly_capacity_for(
                detail.total_quantity,
                detail.total_hours + detail.overtime_hours,
            );
        }

        // 按作業員分組
        let mut operator_details: BTreeMap<String, OperatorDetail> = BTreeMap::new();
        let mut operator_days: BTreeMap<String, std::collections::BTreeSet<NaiveDate>> =
            BTreeMap::new();
        for entry in entries {
            let operator = match entry.operator.as_deref().filter(|s| !s.is_empty()) {
                Some(o) => o.to_string(),
                None => continue,
            };
            let detail = operator_details
                .entry(operator.clone())
                .or_insert_with(|| OperatorDetail {
                    total_hours: 0.0,
                    overtime_hours: 0.0,
                    processes: Vec::new(),
                    work_days_count: 0,
                });
            detail.total_hours += entry.work_hours_calculated;
            detail.overtime_hours += entry.overtime_hours_calculated;
            if let Some(process) = entry.effective_process() {
                if !detail.processes.contains(&process.to_string()) {
                    detail.processes.push(process.to_string());
                }
            }
            if let Some(d) = entry.work_date {
                operator_days.entry(operator).or_default().insert(d);
            }
        }
        for (operator, days) in &operator_days {
            if let Some(detail) = operator_details.get_mut(operator) {
                detail.work_days_count = days.len();
            }
        }

        Ok(CompletedWorkOrderAnalysis {
            id: None,
            workorder_id: workorder_id.to_string(),
            company_code: company_code.to_string(),
            company_name,
            product_code: product_code.to_string(),
            product_name,
            ordered_quantity,
            first_record_date: first_date,
            last_record_date: last_date,
            completion_date,
            total_execution_days,
            total_work_hours,
            total_overtime_hours,
            average_daily_hours,
            efficiency_rate,
            total_processes: entries.len() as i64,
            unique_processes: process_details.len() as i64,
            total_operators: operator_details.len() as i64,
            process_details,
            operator_details,
            completion_status: "completed".to_string(),
            created_at: None,
            updated_at: None,
        })
    }
}

/// 排序鍵：(work_date, start_time)，缺失開始時間視為 00:00
fn sort_key(entry: &FillWork) -> (NaiveDate, String) {
    (
        entry
            .work_date
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()),
        entry.start_time.clone().unwrap_or_else(|| "00:00".to_string()),
    )
}
