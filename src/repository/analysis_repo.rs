// ==========================================
// MES 報表與分析子系統 - 工單分析結果倉儲
// ==========================================
// 紅線: Repository 不含業務邏輯
// 職責: 管理 completed_workorder_analysis 表；巢狀明細以 JSON 欄位儲存
// ==========================================

use crate::domain::analysis::{CompletedWorkOrderAnalysis, OperatorDetail, ProcessDetail};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// AnalysisRepository - 工單分析結果倉儲
// ==========================================

/// 工單分析結果倉儲
pub struct AnalysisRepository {
    conn: Arc<Mutex<Connection>>,
}

fn parse_date(s: String) -> NaiveDate {
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<(CompletedWorkOrderAnalysis, String, String)> {
    let process_json: String = row.get(17)?;
    let operator_json: String = row.get(18)?;
    Ok((
        CompletedWorkOrderAnalysis {
            id: row.get(0)?,
            workorder_id: row.get(1)?,
            company_code: row.get(2)?,
            company_name: row.get(3)?,
            product_code: row.get(4)?,
            product_name: row.get(5)?,
            ordered_quantity: row.get(6)?,
            first_record_date: parse_date(row.get::<_, String>(7)?),
            last_record_date: parse_date(row.get::<_, String>(8)?),
            completion_date: parse_date(row.get::<_, String>(9)?),
            total_execution_days: row.get(10)?,
            total_work_hours: row.get(11)?,
            total_overtime_hours: row.get(12)?,
            average_daily_hours: row.get(13)?,
            efficiency_rate: row.get(14)?,
            total_processes: row.get(15)?,
            unique_processes: row.get(16)?,
            total_operators: row.get(19)?,
            process_details: BTreeMap::new(),
            operator_details: BTreeMap::new(),
            completion_status: row.get(20)?,
            created_at: None,
            updated_at: None,
        },
        process_json,
        operator_json,
    ))
}

const SELECT_COLUMNS: &str = r#"
    id, workorder_id, company_code, company_name, product_code, product_name,
    ordered_quantity, first_record_date, last_record_date, completion_date,
    total_execution_days, total_work_hours, total_overtime_hours,
    average_daily_hours, efficiency_rate, total_processes, unique_processes,
    process_details, operator_details, total_operators, completion_status
"#;

impl AnalysisRepository {
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

    /// 檢查分析結果是否已存在
    pub fn exists(
        &self,
        workorder_id: &str,
        company_code: &str,
        product_code: &str,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found: Option<i64> = conn
            .query_row(
                r#"
                SELECT id FROM completed_workorder_analysis
                WHERE workorder_id = ?1 AND company_code = ?2 AND product_code = ?3
                LIMIT 1
                "#,
                params![workorder_id, company_code, product_code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// 插入或覆寫分析結果（以 (workorder_id, company_code, product_code) 為鍵）
    pub fn upsert(&self, analysis: &CompletedWorkOrderAnalysis) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let process_json = serde_json::to_string(&analysis.process_details)?;
        let operator_json = serde_json::to_string(&analysis.operator_details)?;

        conn.execute(
            r#"
            INSERT INTO completed_workorder_analysis (
                workorder_id, company_code, company_name, product_code, product_name,
                ordered_quantity, first_record_date, last_record_date, completion_date,
                total_execution_days, total_work_hours, total_overtime_hours,
                average_daily_hours, efficiency_rate, total_processes, unique_processes,
                total_operators, process_details, operator_details, completion_status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                      ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
            ON CONFLICT (workorder_id, company_code, product_code) DO UPDATE SET
                company_name = excluded.company_name,
                product_name = excluded.product_name,
                ordered_quantity = excluded.ordered_quantity,
                first_record_date = excluded.first_record_date,
                last_record_date = excluded.last_record_date,
                completion_date = excluded.completion_date,
                total_execution_days = excluded.total_execution_days,
                total_work_hours = excluded.total_work_hours,
                total_overtime_hours = excluded.total_overtime_hours,
                average_daily_hours = excluded.average_daily_hours,
                efficiency_rate = excluded.efficiency_rate,
                total_processes = excluded.total_processes,
                unique_processes = excluded.unique_processes,
                total_operators = excluded.total_operators,
                process_details = excluded.process_details,
                operator_details = excluded.operator_details,
                completion_status = excluded.completion_status,
                updated_at = datetime('now')
            "#,
            params![
                analysis.workorder_id,
                analysis.company_code,
                analysis.company_name,
                analysis.product_code,
                analysis.product_name,
                analysis.ordered_quantity,
                analysis.first_record_date.format("%Y-%m-%d").to_string(),
                analysis.last_record_date.format("%Y-%m-%d").to_string(),
                analysis.completion_date.format("%Y-%m-%d").to_string(),
                analysis.total_execution_days,
                analysis.total_work_hours,
                analysis.total_overtime_hours,
                analysis.average_daily_hours,
                analysis.efficiency_rate,
                analysis.total_processes,
                analysis.unique_processes,
                analysis.total_operators,
                process_json,
                operator_json,
                analysis.completion_status,
            ],
        )?;

        Ok(())
    }

    /// 查詢單筆分析結果
    pub fn find(
        &self,
        workorder_id: &str,
        company_code: &str,
        product_code: &str,
    ) -> RepositoryResult<Option<CompletedWorkOrderAnalysis>> {
        let conn = self.get_conn()?;

        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM completed_workorder_analysis
            WHERE workorder_id = ?1 AND company_code = ?2 AND product_code = ?3
            "#
        );

        let row = conn
            .query_row(&sql, params![workorder_id, company_code, product_code], map_row)
            .optional()?;

        match row {
            Some((mut analysis, process_json, operator_json)) => {
                analysis.process_details =
                    serde_json::from_str::<BTreeMap<String, ProcessDetail>>(&process_json)?;
                analysis.operator_details =
                    serde_json::from_str::<BTreeMap<String, OperatorDetail>>(&operator_json)?;
                Ok(Some(analysis))
            }
            None => Ok(None),
        }
    }

    /// 按公司列出分析結果（巢狀明細一併反序列化）
    pub fn list_by_company(
        &self,
        company_code: &str,
    ) -> RepositoryResult<Vec<CompletedWorkOrderAnalysis>> {
        let conn = self.get_conn()?;

        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM completed_workorder_analysis
            WHERE company_code = ?1
            ORDER BY completion_date DESC, workorder_id
            "#
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(params![company_code], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        let mut result = Vec::with_capacity(rows.len());
        for (mut analysis, process_json, operator_json) in rows {
            analysis.process_details = serde_json::from_str(&process_json)?;
            analysis.operator_details = serde_json::from_str(&operator_json)?;
            result.push(analysis);
        }

        Ok(result)
    }
}
