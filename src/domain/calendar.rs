// ==========================================
// MES 報表與分析子系統 - 行事曆事件
// ==========================================
// 職責: workday/holiday 覆寫事件（日期區間）
// ==========================================

use crate::domain::types::CalendarEventType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 行事曆事件
///
/// workday 事件把預設非工作日（週末/固定假日）覆寫為工作日；
/// holiday 事件反之。判定順序見 WorkdayCalendar。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: Option<i64>,
    pub name: String,
    pub event_type: CalendarEventType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: String,
    pub created_by: String,
}

impl CalendarEvent {
    /// 事件是否覆蓋指定日期（含首尾）
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// 單日假期（CSV 匯入用）
    pub fn single_day_holiday(date: NaiveDate, name: &str, description: &str, created_by: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            event_type: CalendarEventType::Holiday,
            start_date: date,
            end_date: date,
            description: description.to_string(),
            created_by: created_by.to_string(),
        }
    }
}
