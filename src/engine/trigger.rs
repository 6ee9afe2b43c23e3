// ==========================================
// MES 報表與分析子系統 - 觸發判定與 Cron 合成
// ==========================================
// 職責: 判定排程當下是否落在觸發窗口；把啟用排程合成為 periodic_task 列
// 約定: 報表類型靠執行日誌做每窗口至多一次；間隔同步靠最近成功時間防重複
// ==========================================

use crate::domain::schedule::{PeriodicTask, ReportSchedule};
use crate::domain::types::{ReportType, SyncMode};
use crate::repository::schedule_repo::ScheduleRepository;
use crate::repository::RepositoryResult;
use chrono::{Datelike, NaiveDateTime, Timelike};
use tracing::{info, instrument};

/// 前一工作日報表的固定觸發時刻（每日 10 點後）
const PREVIOUS_WORKDAY_FIRE_HOUR: u32 = 10;

// ==========================================
// TriggerEvaluator - 觸發判定器
// ==========================================

/// 觸發判定器
pub struct TriggerEvaluator {
    schedule_repo: ScheduleRepository,
}

impl TriggerEvaluator {
    pub fn new(schedule_repo: ScheduleRepository) -> Self {
        Self { schedule_repo }
    }

    /// 判定排程此刻是否應觸發（含執行日誌查詢）
    pub fn should_execute_now(
        &self,
        schedule: &ReportSchedule,
        now: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let last_success = match schedule.id {
            Some(id) => self.schedule_repo.latest_success_time(id)?,
            None => None,
        };
        Ok(Self::should_execute(schedule, now, last_success))
    }

    /// 純觸發窗口判定
    ///
    /// # 參數
    /// - last_success: 最近一次成功執行時間（帳本查詢結果）
    pub fn should_execute(
        schedule: &ReportSchedule,
        now: NaiveDateTime,
        last_success: Option<NaiveDateTime>,
    ) -> bool {
        if !schedule.is_active() {
            return false;
        }

        // 當日已成功執行過 → 不再觸發（data_sync 另有自己的規則）
        let fired_today = last_success.map_or(false, |t| t.date() == now.date());

        match schedule.report_type {
            ReportType::PreviousWorkday => now.hour() >= PREVIOUS_WORKDAY_FIRE_HOUR && !fired_today,
            ReportType::PreviousWeek => {
                // schedule_day: 1=週一 … 7=週日
                let target_day = schedule.schedule_day.unwrap_or(1);
                now.weekday().number_from_monday() as i64 == target_day
                    && now.time() >= schedule.effective_time()
                    && !fired_today
            }
            ReportType::PreviousMonth => {
                Self::day_time_match(schedule, now) && !fired_today
            }
            ReportType::PreviousQuarter => {
                matches!(now.month(), 1 | 4 | 7 | 10)
                    && Self::day_time_match(schedule, now)
                    && !fired_today
            }
            ReportType::PreviousYear => {
                now.month() == 1 && Self::day_time_match(schedule, now) && !fired_today
            }
            ReportType::DataSync => match schedule.sync_mode() {
                Some(SyncMode::Interval(minutes)) => match last_success {
                    Some(last) => (now - last).num_minutes() >= minutes,
                    None => true,
                },
                Some(SyncMode::FixedTime(t)) => {
                    now.hour() == t.hour() && now.minute() == t.minute()
                }
                None => false,
            },
        }
    }

    fn day_time_match(schedule: &ReportSchedule, now: NaiveDateTime) -> bool {
        let target_day = schedule.schedule_day.unwrap_or(1);
        now.day() as i64 == target_day && now.time() >= schedule.effective_time()
    }

    // ==========================================
    // Cron 合成
    // ==========================================

    /// 把全部啟用排程合成為 periodic_task 列
    ///
    /// 先刪除舊的 report_schedule_* 列再重發，停用排程合成後為零列。
    #[instrument(skip(self))]
    pub fn sync_schedules_to_tasks(&self) -> RepositoryResult<usize> {
        let removed = self.schedule_repo.delete_all_tasks()?;
        let schedules = self.schedule_repo.list_active_schedules()?;

        let mut emitted = 0usize;
        for schedule in &schedules {
            let Some(id) = schedule.id else { continue };
            let task = PeriodicTask {
                name: PeriodicTask::task_name(id),
                schedule_id: id,
                crontab: Self::crontab_for(schedule),
                enabled: true,
            };
            self.schedule_repo.insert_task(&task)?;
            emitted += 1;
        }

        info!("Cron 合成完成: removed={} emitted={}", removed, emitted);
        Ok(emitted)
    }

    /// 移除單一排程的任務列（排程停用/刪除時）
    pub fn remove_schedule_task(&self, schedule_id: i64) -> RepositoryResult<usize> {
        self.schedule_repo.delete_task(schedule_id)
    }

    /// 排程對應的五欄位 crontab 表達式
    pub fn crontab_for(schedule: &ReportSchedule) -> String {
        let time = schedule.effective_time();
        let (minute, hour) = (time.minute(), time.hour());
        match schedule.report_type {
            ReportType::PreviousWorkday => format!("{minute} {hour} * * *"),
            ReportType::PreviousWeek => {
                // crontab 週欄位 0=週日；schedule_day 7（週日）折回 0
                let day_of_week = schedule.schedule_day.unwrap_or(1) % 7;
                format!("{minute} {hour} * * {day_of_week}")
            }
            ReportType::PreviousMonth => {
                let day = schedule.schedule_day.unwrap_or(1);
                format!("{minute} {hour} {day} * *")
            }
            ReportType::PreviousQuarter => {
                let day = schedule.schedule_day.unwrap_or(1);
                format!("{minute} {hour} {day} 1,4,7,10 *")
            }
            ReportType::PreviousYear => {
                let day = schedule.schedule_day.unwrap_or(1);
                format!("{minute} {hour} {day} 1 *")
            }
            ReportType::DataSync => match schedule.sync_mode() {
                Some(SyncMode::FixedTime(t)) => {
                    format!("{} {} * * *", t.minute(), t.hour())
                }
                // 間隔模式以每小時整點輪詢，實際間隔由觸發判定控制
                _ => "0 * * * *".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{FileFormat, ScheduleStatus};
    use chrono::{NaiveDate, NaiveTime};

    fn schedule(report_type: ReportType) -> ReportSchedule {
        ReportSchedule {
            id: Some(1),
            name: "測試排程".to_string(),
            report_type,
            company: "ALL".to_string(),
            schedule_time: NaiveTime::from_hms_opt(9, 0, 0),
            schedule_day: Some(1),
            sync_interval_minutes: None,
            sync_fixed_time: None,
            file_format: FileFormat::Both,
            email_recipients: String::new(),
            status: ScheduleStatus::Active,
            created_at: None,
            updated_at: None,
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_previous_workday_fires_after_ten() {
        let s = schedule(ReportType::PreviousWorkday);
        assert!(!TriggerEvaluator::should_execute(&s, at(2025, 3, 4, 9, 59), None));
        assert!(TriggerEvaluator::should_execute(&s, at(2025, 3, 4, 10, 31), None));
        // 當日已成功 → 不再觸發
        assert!(!TriggerEvaluator::should_execute(
            &s,
            at(2025, 3, 4, 11, 0),
            Some(at(2025, 3, 4, 10, 31)),
        ));
    }

    #[test]
    fn test_weekly_fires_on_monday() {
        let s = schedule(ReportType::PreviousWeek);
        // 2025-03-10 是週一
        assert!(TriggerEvaluator::should_execute(&s, at(2025, 3, 10, 9, 0), None));
        assert!(!TriggerEvaluator::should_execute(&s, at(2025, 3, 10, 8, 59), None));
        // 2025-03-11 是週二
        assert!(!TriggerEvaluator::should_execute(&s, at(2025, 3, 11, 9, 0), None));
    }

    #[test]
    fn test_quarterly_month_gate() {
        let s = schedule(ReportType::PreviousQuarter);
        assert!(TriggerEvaluator::should_execute(&s, at(2025, 4, 1, 9, 0), None));
        assert!(!TriggerEvaluator::should_execute(&s, at(2025, 5, 1, 9, 0), None));
    }

    #[test]
    fn test_yearly_january_only() {
        let s = schedule(ReportType::PreviousYear);
        assert!(TriggerEvaluator::should_execute(&s, at(2025, 1, 1, 9, 0), None));
        assert!(!TriggerEvaluator::should_execute(&s, at(2025, 2, 1, 9, 0), None));
    }

    #[test]
    fn test_sync_interval() {
        let mut s = schedule(ReportType::DataSync);
        s.sync_interval_minutes = Some(30);
        // 沒有成功紀錄 → 立即觸發
        assert!(TriggerEvaluator::should_execute(&s, at(2025, 3, 4, 10, 0), None));
        // 未滿間隔 → 不觸發
        assert!(!TriggerEvaluator::should_execute(
            &s,
            at(2025, 3, 4, 10, 0),
            Some(at(2025, 3, 4, 9, 45)),
        ));
        // 滿間隔 → 觸發
        assert!(TriggerEvaluator::should_execute(
            &s,
            at(2025, 3, 4, 10, 15),
            Some(at(2025, 3, 4, 9, 45)),
        ));
    }

    #[test]
    fn test_sync_fixed_time_minute_match() {
        let mut s = schedule(ReportType::DataSync);
        s.sync_fixed_time = NaiveTime::from_hms_opt(2, 30, 0);
        assert!(TriggerEvaluator::should_execute(&s, at(2025, 3, 4, 2, 30), None));
        assert!(!TriggerEvaluator::should_execute(&s, at(2025, 3, 4, 2, 31), None));
    }

    #[test]
    fn test_inactive_never_fires() {
        let mut s = schedule(ReportType::PreviousWorkday);
        s.status = ScheduleStatus::Inactive;
        assert!(!TriggerEvaluator::should_execute(&s, at(2025, 3, 4, 10, 30), None));
    }

    #[test]
    fn test_crontab_synthesis() {
        let s = schedule(ReportType::PreviousWeek);
        assert_eq!(TriggerEvaluator::crontab_for(&s), "0 9 * * 1");

        let mut sunday = schedule(ReportType::PreviousWeek);
        sunday.schedule_day = Some(7);
        assert_eq!(TriggerEvaluator::crontab_for(&sunday), "0 9 * * 0");

        let q = schedule(ReportType::PreviousQuarter);
        assert_eq!(TriggerEvaluator::crontab_for(&q), "0 9 1 1,4,7,10 *");

        let mut sync = schedule(ReportType::DataSync);
        sync.sync_interval_minutes = Some(60);
        assert_eq!(TriggerEvaluator::crontab_for(&sync), "0 * * * *");
    }
}
