// ==========================================
// MES 報表與分析子系統 - 上游資料倉儲（唯讀）
// ==========================================
// 紅線: 對 fill_work / onsite_report / completed_workorder /
//       product_process_standard_capacity 只讀不寫
// 職責: 供同步、分析、評分引擎讀取上游 MES 資料
// ==========================================

use crate::domain::source::{CompletedWorkOrder, FillWork, OnsiteReport, StandardCapacity};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// SourceRepository - 上游資料倉儲
// ==========================================

/// 上游資料倉儲
pub struct SourceRepository {
    conn: Arc<Mutex<Connection>>,
}

const FILL_WORK_COLUMNS: &str = r#"
    id, workorder, company_name, operator, product_id, operation, process_name,
    work_date, start_time, end_time, work_hours_calculated,
    overtime_hours_calculated, work_quantity, defect_quantity, approval_status
"#;

fn parse_opt_date(s: Option<String>) -> Option<NaiveDate> {
    s.and_then(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d").ok())
}

fn map_fill_work(row: &Row<'_>) -> rusqlite::Result<FillWork> {
    Ok(FillWork {
        id: row.get(0)?,
        workorder: row.get(1)?,
        company_name: row.get(2)?,
        operator: row.get(3)?,
        product_id: row.get(4)?,
        operation: row.get(5)?,
        process_name: row.get(6)?,
        work_date: parse_opt_date(row.get::<_, Option<String>>(7)?),
        start_time: row.get(8)?,
        end_time: row.get(9)?,
        work_hours_calculated: row.get(10)?,
        overtime_hours_calculated: row.get(11)?,
        work_quantity: row.get(12)?,
        defect_quantity: row.get(13)?,
        approval_status: row.get(14)?,
    })
}

fn map_onsite(row: &Row<'_>) -> rusqlite::Result<OnsiteReport> {
    Ok(OnsiteReport {
        id: row.get(0)?,
        workorder: row.get(1)?,
        company_name: row.get(2)?,
        operator: row.get(3)?,
        product_id: row.get(4)?,
        process_name: row.get(5)?,
        work_date: parse_opt_date(row.get::<_, Option<String>>(6)?),
        start_time: row.get(7)?,
        end_time: row.get(8)?,
        work_hours_calculated: row.get(9)?,
        overtime_hours_calculated: row.get(10)?,
        work_quantity: row.get(11)?,
        defect_quantity: row.get(12)?,
    })
}

fn map_completed(row: &Row<'_>) -> rusqlite::Result<CompletedWorkOrder> {
    Ok(CompletedWorkOrder {
        id: row.get(0)?,
        order_number: row.get(1)?,
        company_code: row.get(2)?,
        company_name: row.get(3)?,
        product_code: row.get(4)?,
        product_name: row.get(5)?,
        completed_quantity: row.get(6)?,
    })
}

impl SourceRepository {
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
    // 填報記錄
    // ==========================================

    /// 列出全部已核准的填報記錄（同步管線的輸入）
    pub fn list_approved_fill_work(&self) -> RepositoryResult<Vec<FillWork>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {FILL_WORK_COLUMNS}
            FROM fill_work
            WHERE approval_status = 'approved'
            ORDER BY work_date, start_time, id
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], map_fill_work)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(records)
    }

    /// 列出指定工單＋產品的填報記錄，按 (work_date, start_time) 升冪
    pub fn list_fill_work_for_order(
        &self,
        workorder: &str,
        product_id: &str,
    ) -> RepositoryResult<Vec<FillWork>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {FILL_WORK_COLUMNS}
            FROM fill_work
            WHERE workorder = ?1 AND product_id = ?2
            ORDER BY work_date, start_time, id
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![workorder, product_id], map_fill_work)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(records)
    }

    /// 列出公司＋日期範圍內的已核准填報記錄（期間評分輸入）
    pub fn list_approved_fill_work_in_range(
        &self,
        company_name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<FillWork>> {
        let conn = self.get_conn()?;
        let start_str = start_date.format("%Y-%m-%d").to_string();
        let end_str = end_date.format("%Y-%m-%d").to_string();
        let sql = format!(
            r#"
            SELECT {FILL_WORK_COLUMNS}
            FROM fill_work
            WHERE approval_status = 'approved'
              AND company_name = ?1
              AND work_date BETWEEN ?2 AND ?3
            ORDER BY work_date, start_time, id
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![company_name, start_str, end_str], map_fill_work)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(records)
    }

    // ==========================================
    // 現場報工記錄
    // ==========================================

    /// 列出公司＋日期範圍內的現場報工記錄
    pub fn list_onsite_in_range(
        &self,
        company_name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<OnsiteReport>> {
        let conn = self.get_conn()?;
        let start_str = start_date.format("%Y-%m-%d").to_string();
        let end_str = end_date.format("%Y-%m-%d").to_string();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, workorder, company_name, operator, product_id, process_name,
                   work_date, start_time, end_time, work_hours_calculated,
                   overtime_hours_calculated, work_quantity, defect_quantity
            FROM onsite_report
            WHERE company_name = ?1 AND work_date BETWEEN ?2 AND ?3
            ORDER BY work_date, start_time, id
            "#,
        )?;
        let records = stmt
            .query_map(params![company_name, start_str, end_str], map_onsite)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(records)
    }

    // ==========================================
    // 已完工工單
    // ==========================================

    /// 查詢單筆完工工單表頭
    pub fn find_completed_workorder(
        &self,
        order_number: &str,
        company_code: &str,
    ) -> RepositoryResult<Option<CompletedWorkOrder>> {
        let conn = self.get_conn()?;
        let order = conn
            .query_row(
                r#"
                SELECT id, order_number, company_code, company_name, product_code,
                       product_name, completed_quantity
                FROM completed_workorder
                WHERE order_number = ?1 AND company_code = ?2
                LIMIT 1
                "#,
                params![order_number, company_code],
                map_completed,
            )
            .optional()?;
        Ok(order)
    }

    /// 列出完工工單（排除 RD樣品；company 為 None 時不過濾公司）
    pub fn list_completed_workorders(
        &self,
        company_code: Option<&str>,
    ) -> RepositoryResult<Vec<CompletedWorkOrder>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, order_number, company_code, company_name, product_code,
                   product_name, completed_quantity
            FROM completed_workorder
            WHERE order_number NOT LIKE '%RD樣品%'
              AND (?1 IS NULL OR company_code = ?1)
            ORDER BY order_number
            "#,
        )?;
        let orders = stmt
            .query_map(params![company_code], map_completed)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(orders)
    }

    // ==========================================
    // 標準產能
    // ==========================================

    /// 查詢產品工序標準產能
    pub fn find_standard_capacity(
        &self,
        company_code: &str,
        product_code: &str,
        process_name: &str,
    ) -> RepositoryResult<Option<StandardCapacity>> {
        let conn = self.get_conn()?;
        let capacity = conn
            .query_row(
                r#"
                SELECT company_code, product_code, process_name, standard_capacity_per_hour
                FROM product_process_standard_capacity
                WHERE company_code = ?1 AND product_code = ?2 AND process_name = ?3
                LIMIT 1
                "#,
                params![company_code, product_code, process_name],
                |row| {
                    Ok(StandardCapacity {
                        company_code: row.get(0)?,
                        product_code: row.get(1)?,
                        process_name: row.get(2)?,
                        standard_capacity_per_hour: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(capacity)
    }
}
