// ==========================================
// MES 報表與分析子系統 - 產能評分倉儲
// ==========================================
// 紅線: Repository 不含業務邏輯
// 職責: 管理 operator_process_capacity_score 表；
//       六欄位自然鍵 (operator_id, company_code, product_code,
//       process_name, workorder_id, work_date) 唯一
// ==========================================

use crate::domain::score::OperatorProcessCapacityScore;
use crate::domain::types::{Grade, ScorePeriod};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ScoreRepository - 產能評分倉儲
// ==========================================

/// 產能評分倉儲
pub struct ScoreRepository {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_COLUMNS: &str = r#"
    id, operator_name, operator_id, company_code, product_code, process_name,
    workorder_id, work_date, work_hours, standard_capacity_per_hour,
    actual_capacity_per_hour, completed_quantity, capacity_ratio,
    efficiency_factor, learning_curve_factor, defect_quantity, defect_rate,
    capacity_score, supervisor_score, supervisor_comment, supervisor_name,
    supervisor_date, is_supervisor_scored, total_score, grade, overall_grade,
    score_period, period_start_date, period_end_date, is_period_closed,
    period_closed_date
"#;

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
}

fn parse_opt_date(s: Option<String>) -> Option<NaiveDate> {
    s.and_then(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d").ok())
}

fn parse_opt_datetime(s: Option<String>) -> Option<NaiveDateTime> {
    s.and_then(|v| NaiveDateTime::parse_from_str(&v, "%Y-%m-%d %H:%M:%S").ok())
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<OperatorProcessCapacityScore> {
    Ok(OperatorProcessCapacityScore {
        id: row.get(0)?,
        operator_name: row.get(1)?,
        operator_id: row.get(2)?,
        company_code: row.get(3)?,
        product_code: row.get(4)?,
        process_name: row.get(5)?,
        workorder_id: row.get(6)?,
        work_date: parse_date(&row.get::<_, String>(7)?),
        work_hours: row.get(8)?,
        standard_capacity_per_hour: row.get(9)?,
        actual_capacity_per_hour: row.get(10)?,
        completed_quantity: row.get(11)?,
        capacity_ratio: row.get(12)?,
        efficiency_factor: row.get(13)?,
        learning_curve_factor: row.get(14)?,
        defect_quantity: row.get(15)?,
        defect_rate: row.get(16)?,
        capacity_score: row.get(17)?,
        supervisor_score: row.get(18)?,
        supervisor_comment: row.get(19)?,
        supervisor_name: row.get(20)?,
        supervisor_date: parse_opt_datetime(row.get::<_, Option<String>>(21)?),
        is_supervisor_scored: row.get::<_, i64>(22)? != 0,
        total_score: row.get(23)?,
        grade: Grade::parse(&row.get::<_, String>(24)?).unwrap_or(Grade::D),
        overall_grade: Grade::parse(&row.get::<_, String>(25)?).unwrap_or(Grade::D),
        score_period: ScorePeriod::parse(&row.get::<_, String>(26)?)
            .unwrap_or(ScorePeriod::Monthly),
        period_start_date: parse_opt_date(row.get::<_, Option<String>>(27)?),
        period_end_date: parse_opt_date(row.get::<_, Option<String>>(28)?),
        is_period_closed: row.get::<_, i64>(29)? != 0,
        period_closed_date: parse_opt_datetime(row.get::<_, Option<String>>(30)?),
        created_at: None,
        updated_at: None,
    })
}

impl ScoreRepository {
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

    /// 按六欄位自然鍵查詢單筆評分
    pub fn find_by_key(
        &self,
        operator_id: &str,
        company_code: &str,
        product_code: &str,
        process_name: &str,
        workorder_id: &str,
        work_date: NaiveDate,
    ) -> RepositoryResult<Option<OperatorProcessCapacityScore>> {
        let conn = self.get_conn()?;
        let date_str = work_date.format("%Y-%m-%d").to_string();

        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM operator_process_capacity_score
            WHERE operator_id = ?1 AND company_code = ?2 AND product_code = ?3
              AND process_name = ?4 AND workorder_id = ?5 AND work_date = ?6
            "#
        );

        let score = conn
            .query_row(
                &sql,
                params![operator_id, company_code, product_code, process_name, workorder_id, date_str],
                map_row,
            )
            .optional()?;

        Ok(score)
    }

    /// 插入或覆寫評分記錄
    pub fn upsert(&self, score: &OperatorProcessCapacityScore) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO operator_process_capacity_score (
                operator_name, operator_id, company_code, product_code, process_name,
                workorder_id, work_date, work_hours, standard_capacity_per_hour,
                actual_capacity_per_hour, completed_quantity, capacity_ratio,
                efficiency_factor, learning_curve_factor, defect_quantity, defect_rate,
                capacity_score, supervisor_score, supervisor_comment, supervisor_name,
                supervisor_date, is_supervisor_scored, total_score, grade, overall_grade,
                score_period, period_start_date, period_end_date, is_period_closed,
                period_closed_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                      ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20,
                      ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30)
            ON CONFLICT (operator_id, company_code, product_code, process_name, workorder_id, work_date)
            DO UPDATE SET
                operator_name = excluded.operator_name,
                work_hours = excluded.work_hours,
                standard_capacity_per_hour = excluded.standard_capacity_per_hour,
                actual_capacity_per_hour = excluded.actual_capacity_per_hour,
                completed_quantity = excluded.completed_quantity,
                capacity_ratio = excluded.capacity_ratio,
                efficiency_factor = excluded.efficiency_factor,
                learning_curve_factor = excluded.learning_curve_factor,
                defect_quantity = excluded.defect_quantity,
                defect_rate = excluded.defect_rate,
                capacity_score = excluded.capacity_score,
                supervisor_score = excluded.supervisor_score,
                supervisor_comment = excluded.supervisor_comment,
                supervisor_name = excluded.supervisor_name,
                supervisor_date = excluded.supervisor_date,
                is_supervisor_scored = excluded.is_supervisor_scored,
                total_score = excluded.total_score,
                grade = excluded.grade,
                overall_grade = excluded.overall_grade,
                score_period = excluded.score_period,
                period_start_date = excluded.period_start_date,
                period_end_date = excluded.period_end_date,
                updated_at = datetime('now')
            "#,
            params![
                score.operator_name,
                score.operator_id,
                score.company_code,
                score.product_code,
                score.process_name,
                score.workorder_id,
                score.work_date.format("%Y-%m-%d").to_string(),
                score.work_hours,
                score.standard_capacity_per_hour,
                score.actual_capacity_per_hour,
                score.completed_quantity,
                score.capacity_ratio,
                score.efficiency_factor,
                score.learning_curve_factor,
                score.defect_quantity,
                score.defect_rate,
                score.capacity_score,
                score.supervisor_score,
                score.supervisor_comment,
                score.supervisor_name,
                score
                    .supervisor_date
                    .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string()),
                score.is_supervisor_scored as i64,
                score.total_score,
                score.grade.as_str(),
                score.overall_grade.as_str(),
                score.score_period.as_str(),
                score.period_start_date.map(|d| d.format("%Y-%m-%d").to_string()),
                score.period_end_date.map(|d| d.format("%Y-%m-%d").to_string()),
                score.is_period_closed as i64,
                score
                    .period_closed_date
                    .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string()),
            ],
        )?;

        Ok(())
    }

    /// 按公司與工作日期範圍列出評分記錄
    pub fn list_by_period(
        &self,
        company_code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<OperatorProcessCapacityScore>> {
        let conn = self.get_conn()?;
        let start_str = start_date.format("%Y-%m-%d").to_string();
        let end_str = end_date.format("%Y-%m-%d").to_string();

        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM operator_process_capacity_score
            WHERE company_code = ?1 AND work_date BETWEEN ?2 AND ?3
            ORDER BY work_date, operator_name, process_name
            "#
        );
        let mut stmt = conn.prepare(&sql)?;

        let scores = stmt
            .query_map(params![company_code, start_str, end_str], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(scores)
    }

    /// 結案指定期間內尚未結案的評分記錄
    ///
    /// # 返回
    /// - Ok(usize): 受影響筆數
    pub fn close_period(
        &self,
        company_code: &str,
        period: ScorePeriod,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let start_str = start_date.format("%Y-%m-%d").to_string();
        let end_str = end_date.format("%Y-%m-%d").to_string();

        let updated = conn.execute(
            r#"
            UPDATE operator_process_capacity_score
            SET is_period_closed = 1,
                period_closed_date = datetime('now'),
                updated_at = datetime('now')
            WHERE company_code = ?1
              AND score_period = ?2
              AND work_date BETWEEN ?3 AND ?4
              AND is_period_closed = 0
            "#,
            params![company_code, period.as_str(), start_str, end_str],
        )?;

        Ok(updated)
    }
}
