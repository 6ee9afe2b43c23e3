// ==========================================
// MES 報表與分析子系統 - 統一報表執行器
// ==========================================
// 職責: 日期範圍推導 → 收集 → 落地 → 寄送 → 記帳，單一入口
// 紅線: 報表檔已落地後，寄信失敗只影響郵件步驟，不回滾檔案
// 紅線: 無論成敗，每次執行都要在 report_execution_log 留一列
// ==========================================

use crate::config::AppConfig;
use crate::domain::schedule::ReportSchedule;
use crate::domain::types::{ExecutionStatus, ReportType};
use crate::engine::calendar::WorkdayCalendar;
use crate::engine::collector::{DataCollector, Summary};
use crate::engine::data_sync::DataSynchronizer;
use crate::formatter::{ReportContext, ReportFormatter};
use crate::mailer::ReportMailer;
use crate::repository::report_data_repo::ReportDataRepository;
use crate::repository::schedule_repo::ScheduleRepository;
use crate::repository::{RepositoryError, RepositoryResult};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

/// 公司欄位的「不過濾」哨兵值
pub const COMPANY_ALL: &str = "ALL";

/// 單次執行結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub message: String,
    pub filename: Option<String>,
    pub file_path: Option<String>,
    pub excel_path: Option<String>,
    pub html_path: Option<String>,
    pub data_summary: Option<Summary>,
}

impl ExecutionResult {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            filename: None,
            file_path: None,
            excel_path: None,
            html_path: None,
            data_summary: None,
        }
    }
}

// ==========================================
// UnifiedReportExecutor - 統一報表執行器
// ==========================================

/// 統一報表執行器
pub struct UnifiedReportExecutor {
    collector: DataCollector,
    formatter: ReportFormatter,
    mailer: ReportMailer,
    synchronizer: DataSynchronizer,
    schedule_repo: ScheduleRepository,
    report_data_repo: ReportDataRepository,
    calendar: WorkdayCalendar,
    allow_sparse_fallback: bool,
}

impl UnifiedReportExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        collector: DataCollector,
        formatter: ReportFormatter,
        mailer: ReportMailer,
        synchronizer: DataSynchronizer,
        schedule_repo: ScheduleRepository,
        report_data_repo: ReportDataRepository,
        calendar: WorkdayCalendar,
        config: &AppConfig,
    ) -> Self {
        Self {
            collector,
            formatter,
            mailer,
            synchronizer,
            schedule_repo,
            report_data_repo,
            calendar,
            allow_sparse_fallback: config.allow_sparse_fallback,
        }
    }

    /// 執行排程（依類型分派），結果一律記入執行日誌
    #[instrument(skip(self, schedule), fields(schedule = %schedule.name, report_type = %schedule.report_type))]
    pub fn execute(
        &self,
        schedule: &ReportSchedule,
        now: NaiveDateTime,
    ) -> RepositoryResult<ExecutionResult> {
        let result = match schedule.report_type {
            ReportType::DataSync => self.run_data_sync(schedule),
            _ => self.run_report(schedule, now),
        };

        let result = match result {
            Ok(r) => r,
            Err(e) => {
                error!("排程執行失敗: schedule={} error={}", schedule.name, e);
                ExecutionResult::failed(format!("執行失敗: {e}"))
            }
        };

        self.append_log(schedule, &result, now)?;
        Ok(result)
    }

    /// 報表類型排程: 範圍推導 → 收集 → 落地 → 寄送
    fn run_report(
        &self,
        schedule: &ReportSchedule,
        now: NaiveDateTime,
    ) -> RepositoryResult<ExecutionResult> {
        let today = now.date();
        let (start_date, end_date) = self.date_range_for(schedule.report_type, today)?;
        let title = report_title(schedule.report_type, start_date, end_date, today);

        let company = match schedule.company.as_str() {
            COMPANY_ALL | "" => None,
            other => Some(other),
        };
        let dataset = self.collector.collect(start_date, end_date, company)?;
        info!(
            "資料收集完成: title={} records={}",
            title, dataset.summary.total_records
        );

        let context = ReportContext {
            title: &title,
            schedule_name: &schedule.name,
            generated_at: now,
            dataset: &dataset,
        };

        let mut html_path = None;
        let mut excel_path = None;
        if schedule.file_format.wants_html() {
            let path = self
                .formatter
                .write_html(&context)
                .map_err(|e| RepositoryError::InternalError(e.to_string()))?;
            html_path = Some(path);
        }
        if schedule.file_format.wants_excel() {
            let path = self
                .formatter
                .write_excel(&context)
                .map_err(|e| RepositoryError::InternalError(e.to_string()))?;
            excel_path = Some(path);
        }

        // 主要檔案路徑: Excel 優先，次之 HTML
        let primary = excel_path.as_ref().or(html_path.as_ref()).cloned();
        let filename = primary
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned());

        let mut message = format!("{} 生成成功，共 {} 筆資料", title, dataset.summary.total_records);

        // 寄信失敗不推翻已落地的報表檔
        let attachments: Vec<_> = [html_path.clone(), excel_path.clone()]
            .into_iter()
            .flatten()
            .collect();
        if let Err(e) = self.mailer.send_report_email(schedule, &message, &attachments) {
            warn!("報表郵件寄送失敗: schedule={} error={}", schedule.name, e);
            message.push_str(&format!("，但郵件寄送失敗: {e}"));
        }

        Ok(ExecutionResult {
            success: true,
            message,
            filename,
            file_path: primary.map(|p| p.display().to_string()),
            excel_path: excel_path.map(|p| p.display().to_string()),
            html_path: html_path.map(|p| p.display().to_string()),
            data_summary: Some(dataset.summary),
        })
    }

    /// data_sync 排程: 同步填報與現場記錄後寄出通知
    fn run_data_sync(&self, schedule: &ReportSchedule) -> RepositoryResult<ExecutionResult> {
        let outcome = self.synchronizer.sync_data()?;
        let mut message = outcome.message();

        if let Err(e) = self.mailer.send_sync_notification(schedule) {
            warn!("同步通知寄送失敗: schedule={} error={}", schedule.name, e);
            message.push_str(&format!("，但郵件寄送失敗: {e}"));
        }

        Ok(ExecutionResult {
            success: true,
            message,
            filename: None,
            file_path: None,
            excel_path: None,
            html_path: None,
            data_summary: None,
        })
    }

    /// 報表類型對應的資料日期範圍（含首尾）
    fn date_range_for(
        &self,
        report_type: ReportType,
        today: NaiveDate,
    ) -> RepositoryResult<(NaiveDate, NaiveDate)> {
        match report_type {
            ReportType::PreviousWorkday => {
                let workday = self.calendar.get_previous_workday(today);
                if self.allow_sparse_fallback
                    && self.report_data_repo.count_on_date(workday)? == 0
                {
                    // 前一工作日無資料時退回最近有資料的日期
                    if let Some(latest) = self.report_data_repo.latest_date_with_data()? {
                        warn!(
                            "前一工作日 {} 無資料，改用最近有資料日 {}",
                            workday, latest
                        );
                        return Ok((latest, latest));
                    }
                }
                Ok((workday, workday))
            }
            ReportType::PreviousWeek => {
                let days_back = today.weekday().num_days_from_monday() as i64 + 7;
                let start = today - Duration::days(days_back);
                Ok((start, start + Duration::days(6)))
            }
            ReportType::PreviousMonth => {
                let (year, month) = previous_month(today.year(), today.month());
                Ok((month_start(year, month), month_end(year, month)))
            }
            ReportType::PreviousQuarter => {
                let quarter_start_month = ((today.month() - 1) / 3) * 3 + 1;
                let (year, start_month) = if quarter_start_month == 1 {
                    (today.year() - 1, 10)
                } else {
                    (today.year(), quarter_start_month - 3)
                };
                Ok((month_start(year, start_month), month_end(year, start_month + 2)))
            }
            ReportType::PreviousYear => {
                let year = today.year() - 1;
                Ok((month_start(year, 1), month_end(year, 12)))
            }
            ReportType::DataSync => Ok((today, today)),
        }
    }

    fn append_log(
        &self,
        schedule: &ReportSchedule,
        result: &ExecutionResult,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let status = if result.success {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failed
        };
        self.schedule_repo.append_log(
            schedule.id.unwrap_or(0),
            &schedule.name,
            status,
            &result.message,
            result.file_path.as_deref(),
            now,
        )?;
        Ok(())
    }
}

/// 報表標題（日期一律 %Y-%m-%d）
pub fn report_title(
    report_type: ReportType,
    start_date: NaiveDate,
    end_date: NaiveDate,
    today: NaiveDate,
) -> String {
    let fmt = "%Y-%m-%d";
    match report_type {
        ReportType::PreviousWorkday => format!("前一個工作日報表 ({})", start_date.format(fmt)),
        ReportType::PreviousWeek => format!(
            "上週報表 ({} 至 {})",
            start_date.format(fmt),
            end_date.format(fmt)
        ),
        ReportType::PreviousMonth => format!(
            "上月報表 ({} 至 {})",
            start_date.format(fmt),
            end_date.format(fmt)
        ),
        ReportType::PreviousQuarter => format!(
            "上季報表 ({} 至 {})",
            start_date.format(fmt),
            end_date.format(fmt)
        ),
        ReportType::PreviousYear => format!(
            "去年報表 ({} 至 {})",
            start_date.format(fmt),
            end_date.format(fmt)
        ),
        ReportType::DataSync => format!("資料同步報表 ({})", today.format(fmt)),
    }
}

fn month_start(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
}

fn month_end(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    month_start(next_year, next_month) - Duration::days(1)
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_titles() {
        assert_eq!(
            report_title(ReportType::PreviousWorkday, d(2025, 3, 3), d(2025, 3, 3), d(2025, 3, 4)),
            "前一個工作日報表 (2025-03-03)"
        );
        assert_eq!(
            report_title(ReportType::PreviousWeek, d(2025, 2, 24), d(2025, 3, 2), d(2025, 3, 4)),
            "上週報表 (2025-02-24 至 2025-03-02)"
        );
        assert_eq!(
            report_title(ReportType::DataSync, d(2025, 3, 4), d(2025, 3, 4), d(2025, 3, 4)),
            "資料同步報表 (2025-03-04)"
        );
    }

    #[test]
    fn test_month_boundaries() {
        assert_eq!(month_end(2025, 2), d(2025, 2, 28));
        assert_eq!(month_end(2024, 2), d(2024, 2, 29));
        assert_eq!(month_end(2025, 12), d(2025, 12, 31));
        assert_eq!(previous_month(2025, 1), (2024, 12));
    }
}
