// ==========================================
// MES 報表與分析子系統 - 排程定義與執行日誌
// ==========================================
// 職責: 報表排程規格、執行歷史帳本、Cron 合成輸出列
// ==========================================

use crate::domain::types::{ExecutionStatus, FileFormat, ReportType, ScheduleStatus, SyncMode};
use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// 報表排程定義
///
/// 每列描述一個週期性報表或資料同步。報表類型用 schedule_time +
/// schedule_day；data_sync 用 sync_interval_minutes 或 sync_fixed_time
/// （二選一）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSchedule {
    pub id: Option<i64>,
    pub name: String,
    pub report_type: ReportType,
    /// 公司代碼，哨兵值 "ALL" 表示不過濾
    pub company: String,
    /// HH:MM（報表類型使用）
    pub schedule_time: Option<NaiveTime>,
    /// 週報: 星期 1-7；月/季/年報: 每月第幾天 1-30
    pub schedule_day: Option<i64>,
    pub sync_interval_minutes: Option<i64>,
    pub sync_fixed_time: Option<NaiveTime>,
    pub file_format: FileFormat,
    /// 以逗號/分號/換行分隔的收件人清單；空字串表示只產檔不寄信
    pub email_recipients: String,
    pub status: ScheduleStatus,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl ReportSchedule {
    /// data_sync 排程的觸發模式；間隔優先於固定時刻
    pub fn sync_mode(&self) -> Option<SyncMode> {
        if self.report_type != ReportType::DataSync {
            return None;
        }
        if let Some(minutes) = self.sync_interval_minutes {
            return Some(SyncMode::Interval(minutes));
        }
        self.sync_fixed_time.map(SyncMode::FixedTime)
    }

    /// 拆分收件人（分隔符: 逗號/分號/換行），去空白、濾空項
    pub fn recipient_list(&self) -> Vec<String> {
        self.email_recipients
            .split(|c| c == ',' || c == ';' || c == '\n')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }

    pub fn is_active(&self) -> bool {
        self.status == ScheduleStatus::Active
    }

    /// schedule_time 缺失時的預設觸發時刻
    pub fn effective_time(&self) -> NaiveTime {
        self.schedule_time
            .unwrap_or_else(|| NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default())
    }
}

/// 排程執行日誌列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportExecutionLog {
    pub id: Option<i64>,
    pub schedule_id: i64,
    pub schedule_name: String,
    pub status: ExecutionStatus,
    pub message: String,
    pub file_path: Option<String>,
    pub executed_at: NaiveDateTime,
}

/// Cron 合成輸出列
///
/// 名稱固定為 `report_schedule_<id>`，合成前先刪除同字首的舊列。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodicTask {
    pub name: String,
    pub schedule_id: i64,
    /// 五欄位 crontab 表達式: 分 時 日 月 週
    pub crontab: String,
    pub enabled: bool,
}

impl PeriodicTask {
    pub const NAME_PREFIX: &'static str = "report_schedule_";

    pub fn task_name(schedule_id: i64) -> String {
        format!("{}{}", Self::NAME_PREFIX, schedule_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schedule() -> ReportSchedule {
        ReportSchedule {
            id: Some(1),
            name: "每日報表".to_string(),
            report_type: ReportType::PreviousWorkday,
            company: "ALL".to_string(),
            schedule_time: NaiveTime::from_hms_opt(10, 30, 0),
            schedule_day: None,
            sync_interval_minutes: None,
            sync_fixed_time: None,
            file_format: FileFormat::Both,
            email_recipients: "a@x.com, b@x.com;c@x.com\nd@x.com".to_string(),
            status: ScheduleStatus::Active,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_recipient_splitting() {
        let s = sample_schedule();
        assert_eq!(
            s.recipient_list(),
            vec!["a@x.com", "b@x.com", "c@x.com", "d@x.com"]
        );
    }

    #[test]
    fn test_empty_recipients() {
        let mut s = sample_schedule();
        s.email_recipients = "  ;\n, ".to_string();
        assert!(s.recipient_list().is_empty());
    }

    #[test]
    fn test_sync_mode_precedence() {
        let mut s = sample_schedule();
        s.report_type = ReportType::DataSync;
        s.sync_interval_minutes = Some(30);
        s.sync_fixed_time = NaiveTime::from_hms_opt(2, 0, 0);
        assert_eq!(s.sync_mode(), Some(SyncMode::Interval(30)));
        s.sync_interval_minutes = None;
        assert!(matches!(s.sync_mode(), Some(SyncMode::FixedTime(_))));
    }

    #[test]
    fn test_task_name() {
        assert_eq!(PeriodicTask::task_name(7), "report_schedule_7");
    }
}
