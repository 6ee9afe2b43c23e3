// ==========================================
// MES 報表與分析子系統 - 統一報表資料倉儲
// ==========================================
// 紅線: Repository 不含業務邏輯
// 職責: 管理 workorder_report_data 表的存取
// ==========================================

use crate::domain::report_data::WorkOrderReportData;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ReportDataRepository - 統一報表資料倉儲
// ==========================================

/// 統一報表資料倉儲
pub struct ReportDataRepository {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_COLUMNS: &str = r#"
    id, workorder_id, company, operator_name, product_code, process_name,
    work_date, start_time, end_time,
    work_week, work_month, work_quarter, work_year,
    work_hours, overtime_hours, work_quantity, defect_quantity
"#;

fn map_row(row: &Row<'_>) -> rusqlite::Result<WorkOrderReportData> {
    Ok(WorkOrderReportData {
        id: row.get(0)?,
        workorder_id: row.get(1)?,
        company: row.get(2)?,
        operator_name: row.get(3)?,
        product_code: row.get(4)?,
        process_name: row.get(5)?,
        work_date: NaiveDate::parse_from_str(&row.get::<_, String>(6)?, "%Y-%m-%d")
            .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()),
        start_time: row.get(7)?,
        end_time: row.get(8)?,
        work_week: row.get(9)?,
        work_month: row.get(10)?,
        work_quarter: row.get(11)?,
        work_year: row.get(12)?,
        work_hours: row.get(13)?,
        overtime_hours: row.get(14)?,
        work_quantity: row.get(15)?,
        defect_quantity: row.get(16)?,
        created_at: None,
        updated_at: None,
    })
}

impl ReportDataRepository {
    /// 建立新的倉儲實例
    ///
    /// # 參數
    /// - db_path: 資料庫檔案路徑
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

    /// 插入一筆統一報表記錄
    ///
    /// 身份五元組重複時回傳 UniqueConstraintViolation，
    /// 由同步管線視為靜默跳過。
    pub fn insert(&self, record: &WorkOrderReportData) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let work_date_str = record.work_date.format("%Y-%m-%d").to_string();

        conn.execute(
            r#"
            INSERT INTO workorder_report_data (
                workorder_id, company, operator_name, product_code, process_name,
                work_date, start_time, end_time,
                work_week, work_month, work_quarter, work_year,
                work_hours, overtime_hours, work_quantity, defect_quantity
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            params![
                record.workorder_id,
                record.company,
                record.operator_name,
                record.product_code,
                record.process_name,
                work_date_str,
                record.start_time,
                record.end_time,
                record.work_week,
                record.work_month,
                record.work_quarter,
                record.work_year,
                record.work_hours,
                record.overtime_hours,
                record.work_quantity,
                record.defect_quantity,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// 檢查身份五元組是否已存在
    pub fn exists_by_identity(
        &self,
        workorder_id: &str,
        company: &str,
        work_date: NaiveDate,
        operator_name: &str,
        start_time: &str,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let work_date_str = work_date.format("%Y-%m-%d").to_string();

        let found: Option<i64> = conn
            .query_row(
                r#"
                SELECT id FROM workorder_report_data
                WHERE workorder_id = ?1 AND company = ?2 AND work_date = ?3
                  AND operator_name = ?4 AND start_time = ?5
                LIMIT 1
                "#,
                params![workorder_id, company, work_date_str, operator_name, start_time],
                |row| row.get(0),
            )
            .optional()?;

        Ok(found.is_some())
    }

    /// 按日期範圍（含首尾）查詢，company 為 None 時不過濾公司
    ///
    /// # 返回
    /// - Ok(Vec<WorkOrderReportData>): 按 (work_date, start_time) 升冪
    pub fn find_by_date_range(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        company: Option<&str>,
    ) -> RepositoryResult<Vec<WorkOrderReportData>> {
        let conn = self.get_conn()?;
        let start_str = start_date.format("%Y-%m-%d").to_string();
        let end_str = end_date.format("%Y-%m-%d").to_string();

        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM workorder_report_data
            WHERE work_date BETWEEN ?1 AND ?2
              AND (?3 IS NULL OR company = ?3)
            ORDER BY work_date, start_time, id
            "#
        );
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map(params![start_str, end_str, company], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(records)
    }

    /// 指定日期的記錄筆數
    pub fn count_on_date(&self, date: NaiveDate) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let date_str = date.format("%Y-%m-%d").to_string();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM workorder_report_data WHERE work_date = ?1",
            params![date_str],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// 全表筆數
    pub fn count_all(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM workorder_report_data", [], |row| row.get(0))?;
        Ok(count)
    }

    /// 最近一個有資料的日期（前一工作日稀疏回退用）
    pub fn latest_date_with_data(&self) -> RepositoryResult<Option<NaiveDate>> {
        let conn = self.get_conn()?;

        let date_str: Option<String> = conn.query_row(
            "SELECT MAX(work_date) FROM workorder_report_data",
            [],
            |row| row.get(0),
        )?;

        Ok(date_str
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()))
    }
}
