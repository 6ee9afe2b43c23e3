// ==========================================
// MES 報表與分析子系統 - 工作日行事曆
// ==========================================
// 職責: 判定工作日 / 推算前後工作日 / 列舉範圍內工作日
// 判定順序: workday 事件 > holiday 事件 > 週末 > 固定假日表 > 工作日
// 紅線: 行事曆查詢失敗時退化為「僅週末判定」並記警告，不得阻斷呼叫方
// ==========================================

use crate::repository::calendar_repo::CalendarRepository;
use crate::domain::types::CalendarEventType;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use tracing::warn;

/// 固定國定假日（月, 日）
const FIXED_HOLIDAYS: &[(u32, u32)] = &[
    (1, 1),   // 開國紀念日
    (2, 28),  // 和平紀念日
    (4, 4),   // 兒童節/清明
    (5, 1),   // 勞動節
    (6, 10),  // 端午（簡化固定日）
    (9, 17),  // 中秋（簡化固定日）
    (10, 10), // 國慶日
];

/// 簡化春節連假區間（年, 起月, 起日, 迄月, 迄日）
const LUNAR_NEW_YEAR_WINDOWS: &[(i32, u32, u32, u32, u32)] = &[
    (2024, 2, 10, 2, 17),
    (2025, 1, 29, 2, 4),
];

/// 推算工作日時的迭代上限（防止病態行事曆造成無窮迴圈）
const MAX_WORKDAY_SCAN: usize = 366;

// ==========================================
// WorkdayCalendar - 工作日行事曆
// ==========================================

/// 工作日行事曆服務
pub struct WorkdayCalendar {
    calendar_repo: CalendarRepository,
}

impl WorkdayCalendar {
    pub fn new(calendar_repo: CalendarRepository) -> Self {
        Self { calendar_repo }
    }

    /// 判定指定日期是否為工作日
    ///
    /// 決策順序:
    /// 1. workday 事件覆蓋 → 是
    /// 2. holiday 事件覆蓋 → 否
    /// 3. 週六/週日 → 否
    /// 4. 固定假日表（含簡化春節區間）→ 否
    /// 5. 其餘 → 是
    pub fn is_workday(&self, date: NaiveDate) -> bool {
        match self.is_workday_checked(date) {
            Ok(result) => result,
            Err(e) => {
                // 退化為僅週末判定
                warn!("行事曆查詢失敗，退化為週末判定: date={} error={}", date, e);
                !is_weekend(date)
            }
        }
    }

    fn is_workday_checked(
        &self,
        date: NaiveDate,
    ) -> Result<bool, crate::repository::RepositoryError> {
        if self
            .calendar_repo
            .find_covering(date, CalendarEventType::Workday)?
            .is_some()
        {
            return Ok(true);
        }
        if self
            .calendar_repo
            .find_covering(date, CalendarEventType::Holiday)?
            .is_some()
        {
            return Ok(false);
        }
        if is_weekend(date) {
            return Ok(false);
        }
        if is_fixed_holiday(date) {
            return Ok(false);
        }
        Ok(true)
    }

    /// 取得 date 之前最近的工作日
    pub fn get_previous_workday(&self, date: NaiveDate) -> NaiveDate {
        let mut candidate = date - Duration::days(1);
        for _ in 0..MAX_WORKDAY_SCAN {
            if self.is_workday(candidate) {
                return candidate;
            }
            candidate -= Duration::days(1);
        }
        candidate
    }

    /// 取得 date 之後最近的工作日
    pub fn get_next_workday(&self, date: NaiveDate) -> NaiveDate {
        let mut candidate = date + Duration::days(1);
        for _ in 0..MAX_WORKDAY_SCAN {
            if self.is_workday(candidate) {
                return candidate;
            }
            candidate += Duration::days(1);
        }
        candidate
    }

    /// 列舉範圍內（含首尾）的工作日，升冪
    pub fn get_workdays_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut workdays = Vec::new();
        let mut current = start;
        while current <= end {
            if self.is_workday(current) {
                workdays.push(current);
            }
            current += Duration::days(1);
        }
        workdays
    }

    /// 範圍內工作日數
    pub fn get_workdays_count(&self, start: NaiveDate, end: NaiveDate) -> usize {
        self.get_workdays_in_range(start, end).len()
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn is_fixed_holiday(date: NaiveDate) -> bool {
    if FIXED_HOLIDAYS
        .iter()
        .any(|&(m, d)| date.month() == m && date.day() == d)
    {
        return true;
    }
    LUNAR_NEW_YEAR_WINDOWS.iter().any(|&(y, sm, sd, em, ed)| {
        if date.year() != y {
            return false;
        }
        let start = NaiveDate::from_ymd_opt(y, sm, sd);
        let end = NaiveDate::from_ymd_opt(y, em, ed);
        match (start, end) {
            (Some(s), Some(e)) => s <= date && date <= e,
            _ => false,
        }
    })
}
