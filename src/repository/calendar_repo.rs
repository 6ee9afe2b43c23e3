// ==========================================
// MES 報表與分析子系統 - 行事曆事件倉儲
// ==========================================
// 紅線: Repository 不含業務邏輯
// 職責: 管理 calendar_event 表的存取
// ==========================================

use crate::domain::calendar::CalendarEvent;
use crate::domain::types::CalendarEventType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// CalendarRepository - 行事曆事件倉儲
// ==========================================

/// 行事曆事件倉儲
pub struct CalendarRepository {
    conn: Arc<Mutex<Connection>>,
}

fn map_event(row: &Row<'_>) -> rusqlite::Result<CalendarEvent> {
    let type_str: String = row.get(2)?;
    Ok(CalendarEvent {
        id: row.get(0)?,
        name: row.get(1)?,
        event_type: CalendarEventType::parse(&type_str).unwrap_or(CalendarEventType::Holiday),
        start_date: NaiveDate::parse_from_str(&row.get::<_, String>(3)?, "%Y-%m-%d")
            .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()),
        end_date: NaiveDate::parse_from_str(&row.get::<_, String>(4)?, "%Y-%m-%d")
            .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()),
        description: row.get(5)?,
        created_by: row.get(6)?,
    })
}

impl CalendarRepository {
    /// 建立新的倉儲實例
    pub fn new(db_path: String) -> RepositoryResult<Self> {
        let conn = Connection::open(&db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 從已有連線建立倉儲實例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 取得資料庫連線
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查詢覆蓋指定日期的指定類型事件
    pub fn find_covering(
        &self,
        date: NaiveDate,
        event_type: CalendarEventType,
    ) -> RepositoryResult<Option<CalendarEvent>> {
        let conn = self.get_conn()?;
        let date_str = date.format("%Y-%m-%d").to_string();

        let event = conn
            .query_row(
                r#"
                SELECT id, name, event_type, start_date, end_date, description, created_by
                FROM calendar_event
                WHERE event_type = ?1 AND start_date <= ?2 AND end_date >= ?2
                LIMIT 1
                "#,
                params![event_type.as_str(), date_str],
                map_event,
            )
            .optional()?;

        Ok(event)
    }

    /// 檢查指定日期是否已有假期事件（CSV 匯入去重用）
    pub fn holiday_exists_on(&self, date: NaiveDate) -> RepositoryResult<bool> {
        Ok(self
            .find_covering(date, CalendarEventType::Holiday)?
            .is_some())
    }

    /// 新增事件，回傳事件 id
    pub fn insert(&self, event: &CalendarEvent) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO calendar_event (
                name, event_type, start_date, end_date, description, created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                event.name,
                event.event_type.as_str(),
                event.start_date.format("%Y-%m-%d").to_string(),
                event.end_date.format("%Y-%m-%d").to_string(),
                event.description,
                event.created_by,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// 列出日期範圍內的全部事件
    pub fn list_in_range(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<CalendarEvent>> {
        let conn = self.get_conn()?;
        let start_str = start_date.format("%Y-%m-%d").to_string();
        let end_str = end_date.format("%Y-%m-%d").to_string();

        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, event_type, start_date, end_date, description, created_by
            FROM calendar_event
            WHERE start_date <= ?2 AND end_date >= ?1
            ORDER BY start_date
            "#,
        )?;

        let events = stmt
            .query_map(params![start_str, end_str], map_event)?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(events)
    }
}
