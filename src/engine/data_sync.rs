// ==========================================
// MES 報表與分析子系統 - 資料同步管線
// ==========================================
// 職責: 將已核准填報記錄單向投影到統一報表表
// 紅線: 只新增不更新不刪除；單列失敗隔離，不中止批次
// 紅線: 不計算時間維度欄位（週/月/季/年留 0）
// ==========================================

use crate::domain::report_data::WorkOrderReportData;
use crate::domain::source::FillWork;
use crate::repository::report_data_repo::ReportDataRepository;
use crate::repository::source_repo::SourceRepository;
use crate::repository::RepositoryResult;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// 同步結果統計
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total: usize,
}

impl SyncOutcome {
    /// 使用者可見的結果訊息
    pub fn message(&self) -> String {
        format!("資料同步完成：同步 {} 筆，跳過 {} 筆", self.synced, self.skipped)
    }
}

// ==========================================
// DataSynchronizer - 資料同步管線
// ==========================================

/// 資料同步管線
///
/// 目前只同步填報記錄；現場報工為規劃中的第二來源，尚未納入。
pub struct DataSynchronizer {
    source_repo: SourceRepository,
    report_data_repo: ReportDataRepository,
}

impl DataSynchronizer {
    pub fn new(source_repo: SourceRepository, report_data_repo: ReportDataRepository) -> Self {
        Self {
            source_repo,
            report_data_repo,
        }
    }

    /// 執行一次同步
    ///
    /// 冪等：上游未變時重跑新增 0 筆。
    /// 只有資料庫不可用等基礎設施錯誤才中止整批。
    #[instrument(skip(self))]
    pub fn sync_data(&self) -> RepositoryResult<SyncOutcome> {
        let entries = self.source_repo.list_approved_fill_work()?;
        let total = entries.len();

        let mut synced = 0usize;
        let mut skipped = 0usize;
        let mut failed = 0usize;

        for entry in &entries {
            match self.sync_entry(entry) {
                Ok(true) => synced += 1,
                Ok(false) => skipped += 1,
                Err(e) => {
                    // 單列失敗隔離：記錄後繼續
                    warn!("填報記錄同步失敗: fill_work_id={} error={}", entry.id, e);
                    failed += 1;
                }
            }
        }

        let outcome = SyncOutcome {
            synced,
            skipped,
            failed,
            total,
        };
        info!(
            "資料同步完成: total={} synced={} skipped={} failed={}",
            total, synced, skipped, failed
        );
        Ok(outcome)
    }

    /// 同步單筆記錄；Ok(true) 表示新增，Ok(false) 表示跳過
    fn sync_entry(&self, entry: &FillWork) -> RepositoryResult<bool> {
        // 必要欄位缺失 → 跳過
        let (work_date, workorder, company) = match (
            entry.work_date,
            entry.workorder.as_deref().filter(|s| !s.is_empty()),
            entry.company_name.as_deref().filter(|s| !s.is_empty()),
        ) {
            (Some(d), Some(w), Some(c)) => (d, w, c),
            _ => return Ok(false),
        };

        let operator = entry.operator.as_deref().unwrap_or("");
        let start_time = entry.start_time.as_deref().unwrap_or("");

        // 身份五元組已存在 → 靜默跳過
        if self
            .report_data_repo
            .exists_by_identity(workorder, company, work_date, operator, start_time)?
        {
            return Ok(false);
        }

        let record = WorkOrderReportData {
            id: None,
            workorder_id: workorder.to_string(),
            company: company.to_string(),
            operator_name: operator.to_string(),
            product_code: entry.product_id.clone(),
            process_name: entry.effective_process().map(|s| s.to_string()),
            work_date,
            start_time: start_time.to_string(),
            end_time: entry.end_time.clone(),
            // 時間維度留 0 佔位，讀取方按需計算
            work_week: 0,
            work_month: 0,
            work_quarter: 0,
            work_year: 0,
            work_hours: entry.work_hours_calculated,
            overtime_hours: entry.overtime_hours_calculated,
            work_quantity: entry.work_quantity,
            defect_quantity: entry.defect_quantity,
            created_at: None,
            updated_at: None,
        };

        match self.report_data_repo.insert(&record) {
            Ok(_) => Ok(true),
            // 併發同步競爭同一五元組時由唯一索引擋下，視為跳過
            Err(e) if e.is_unique_violation() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
