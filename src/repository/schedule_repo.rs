// ==========================================
// MES 報表與分析子系統 - 排程與執行日誌倉儲
// ==========================================
// 紅線: Repository 不含業務邏輯
// 職責: 管理 report_schedule / report_execution_log / periodic_task 表
// ==========================================

use crate::domain::schedule::{PeriodicTask, ReportExecutionLog, ReportSchedule};
use crate::domain::types::{ExecutionStatus, FileFormat, ReportType, ScheduleStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ScheduleRepository - 排程倉儲
// ==========================================

/// 排程與執行日誌倉儲
pub struct ScheduleRepository {
    conn: Arc<Mutex<Connection>>,
}

const SCHEDULE_COLUMNS: &str = r#"
    id, name, report_type, company, schedule_time, schedule_day,
    sync_interval_minutes, sync_fixed_time, file_format, email_recipients, status
"#;

fn parse_opt_time(s: Option<String>) -> Option<NaiveTime> {
    s.and_then(|v| {
        NaiveTime::parse_from_str(&v, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&v, "%H:%M:%S"))
            .ok()
    })
}

fn map_schedule(row: &Row<'_>) -> rusqlite::Result<ReportSchedule> {
    let report_type_str: String = row.get(2)?;
    let format_str: String = row.get(8)?;
    let status_str: String = row.get(10)?;
    Ok(ReportSchedule {
        id: row.get(0)?,
        name: row.get(1)?,
        report_type: ReportType::parse(&report_type_str).unwrap_or(ReportType::PreviousWorkday),
        company: row.get(3)?,
        schedule_time: parse_opt_time(row.get::<_, Option<String>>(4)?),
        schedule_day: row.get(5)?,
        sync_interval_minutes: row.get(6)?,
        sync_fixed_time: parse_opt_time(row.get::<_, Option<String>>(7)?),
        file_format: FileFormat::parse(&format_str).unwrap_or(FileFormat::Both),
        email_recipients: row.get(9)?,
        status: ScheduleStatus::parse(&status_str).unwrap_or(ScheduleStatus::Inactive),
        created_at: None,
        updated_at: None,
    })
}

fn map_log(row: &Row<'_>) -> rusqlite::Result<ReportExecutionLog> {
    let status_str: String = row.get(3)?;
    let executed_str: String = row.get(6)?;
    Ok(ReportExecutionLog {
        id: row.get(0)?,
        schedule_id: row.get(1)?,
        schedule_name: row.get(2)?,
        status: ExecutionStatus::parse(&status_str).unwrap_or(ExecutionStatus::Failed),
        message: row.get(4)?,
        file_path: row.get(5)?,
        executed_at: NaiveDateTime::parse_from_str(&executed_str, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default(),
    })
}

impl ScheduleRepository {
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

    // ==========================================
    // 排程定義
    // ==========================================

    /// 新增排程，回傳排程 id
    pub fn insert_schedule(&self, schedule: &ReportSchedule) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO report_schedule (
                name, report_type, company, schedule_time, schedule_day,
                sync_interval_minutes, sync_fixed_time, file_format,
                email_recipients, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                schedule.name,
                schedule.report_type.as_str(),
                schedule.company,
                schedule.schedule_time.map(|t| t.format("%H:%M").to_string()),
                schedule.schedule_day,
                schedule.sync_interval_minutes,
                schedule.sync_fixed_time.map(|t| t.format("%H:%M").to_string()),
                schedule.file_format.as_str(),
                schedule.email_recipients,
                schedule.status.as_str(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// 按 id 查詢排程
    pub fn find_schedule(&self, id: i64) -> RepositoryResult<Option<ReportSchedule>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM report_schedule WHERE id = ?1");
        let schedule = conn.query_row(&sql, params![id], map_schedule).optional()?;
        Ok(schedule)
    }

    /// 列出全部排程
    pub fn list_schedules(&self) -> RepositoryResult<Vec<ReportSchedule>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM report_schedule ORDER BY id");
        let mut stmt = conn.prepare(&sql)?;
        let schedules = stmt
            .query_map([], map_schedule)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(schedules)
    }

    /// 列出啟用中的排程
    pub fn list_active_schedules(&self) -> RepositoryResult<Vec<ReportSchedule>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM report_schedule WHERE status = 'active' ORDER BY id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let schedules = stmt
            .query_map([], map_schedule)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(schedules)
    }

    /// 更新排程狀態
    pub fn set_schedule_status(&self, id: i64, status: ScheduleStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE report_schedule SET status = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(())
    }

    // ==========================================
    // 執行日誌（執行歷史帳本）
    // ==========================================

    /// 追加一筆執行日誌
    pub fn append_log(
        &self,
        schedule_id: i64,
        schedule_name: &str,
        status: ExecutionStatus,
        message: &str,
        file_path: Option<&str>,
        executed_at: NaiveDateTime,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO report_execution_log (
                schedule_id, schedule_name, status, message, file_path, executed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                schedule_id,
                schedule_name,
                status.as_str(),
                message,
                file_path,
                executed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 指定排程最近一次成功執行的時間（間隔模式防重複觸發依據）
    pub fn latest_success_time(&self, schedule_id: i64) -> RepositoryResult<Option<NaiveDateTime>> {
        let conn = self.get_conn()?;
        let ts: Option<String> = conn.query_row(
            r#"
            SELECT MAX(executed_at) FROM report_execution_log
            WHERE schedule_id = ?1 AND status = 'success'
            "#,
            params![schedule_id],
            |row| row.get(0),
        )?;
        Ok(ts.and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok()))
    }

    /// 按排程列出執行日誌（新在前）
    pub fn list_logs(&self, schedule_id: i64) -> RepositoryResult<Vec<ReportExecutionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, schedule_id, schedule_name, status, message, file_path, executed_at
            FROM report_execution_log
            WHERE schedule_id = ?1
            ORDER BY executed_at DESC, id DESC
            "#,
        )?;
        let logs = stmt
            .query_map(params![schedule_id], map_log)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 刪除指定時間之前的執行日誌（維護作業）
    pub fn delete_logs_before(&self, cutoff: NaiveDateTime) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let deleted = conn.execute(
            "DELETE FROM report_execution_log WHERE executed_at < ?1",
            params![cutoff.format("%Y-%m-%d %H:%M:%S").to_string()],
        )?;
        Ok(deleted)
    }

    // ==========================================
    // Cron 合成輸出
    // ==========================================

    /// 刪除所有 report_schedule_* 任務列（合成前清場）
    pub fn delete_all_tasks(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let deleted = conn.execute(
            "DELETE FROM periodic_task WHERE name LIKE ?1",
            params![format!("{}%", PeriodicTask::NAME_PREFIX)],
        )?;
        Ok(deleted)
    }

    /// 寫入一筆任務列
    pub fn insert_task(&self, task: &PeriodicTask) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO periodic_task (name, schedule_id, crontab, enabled, updated_at)
            VALUES (?1, ?2, ?3, ?4, datetime('now'))
            "#,
            params![task.name, task.schedule_id, task.crontab, task.enabled as i64],
        )?;
        Ok(())
    }

    /// 移除單一排程的任務列
    pub fn delete_task(&self, schedule_id: i64) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let deleted = conn.execute(
            "DELETE FROM periodic_task WHERE name = ?1",
            params![PeriodicTask::task_name(schedule_id)],
        )?;
        Ok(deleted)
    }

    /// 列出全部任務列
    pub fn list_tasks(&self) -> RepositoryResult<Vec<PeriodicTask>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, schedule_id, crontab, enabled FROM periodic_task ORDER BY schedule_id",
        )?;
        let tasks = stmt
            .query_map([], |row| {
                Ok(PeriodicTask {
                    name: row.get(0)?,
                    schedule_id: row.get(1)?,
                    crontab: row.get(2)?,
                    enabled: row.get::<_, i64>(3)? != 0,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(tasks)
    }
}
