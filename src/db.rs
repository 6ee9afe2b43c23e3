// ==========================================
// MES 報表與分析子系統 - SQLite 連線初始化
// ==========================================
// 目標:
// - 統一所有 Connection::open 的 PRAGMA 行為，避免「部分模組外鍵開啟/部分不開啟」
// - 統一 busy_timeout，減少併發寫入時的偶發 busy 錯誤
// - 統一 schema 初始化（CREATE TABLE IF NOT EXISTS，可重複執行）
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 預設 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 連線的統一 PRAGMA
///
/// 說明：
/// - foreign_keys 需要「每個連線」單獨開啟
/// - busy_timeout 需要「每個連線」單獨配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打開 SQLite 連線並套用統一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化資料庫 schema
///
/// 全部使用 CREATE TABLE IF NOT EXISTS，重複執行安全。
/// 上游 MES 表（fill_work / onsite_report / completed_workorder /
/// product_process_standard_capacity / email_config / calendar_event）
/// 與本子系統自有表共用同一個資料庫檔案。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- 統一報表資料表（同步管線的唯一寫入目標）
        CREATE TABLE IF NOT EXISTS workorder_report_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workorder_id TEXT NOT NULL,
            company TEXT NOT NULL,
            operator_name TEXT NOT NULL DEFAULT '',
            product_code TEXT,
            process_name TEXT,
            work_date TEXT NOT NULL,
            start_time TEXT NOT NULL DEFAULT '',
            end_time TEXT,
            work_week INTEGER NOT NULL DEFAULT 0,
            work_month INTEGER NOT NULL DEFAULT 0,
            work_quarter INTEGER NOT NULL DEFAULT 0,
            work_year INTEGER NOT NULL DEFAULT 0,
            work_hours REAL NOT NULL DEFAULT 0,
            overtime_hours REAL NOT NULL DEFAULT 0,
            work_quantity INTEGER NOT NULL DEFAULT 0,
            defect_quantity INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        -- 身份五元組唯一索引（去重守門）
        CREATE UNIQUE INDEX IF NOT EXISTS idx_report_data_identity
            ON workorder_report_data (workorder_id, company, work_date, operator_name, start_time);
        CREATE INDEX IF NOT EXISTS idx_report_data_date
            ON workorder_report_data (work_date);

        -- 已完工工單分析結果
        CREATE TABLE IF NOT EXISTS completed_workorder_analysis (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workorder_id TEXT NOT NULL,
            company_code TEXT NOT NULL,
            company_name TEXT,
            product_code TEXT NOT NULL,
            product_name TEXT,
            ordered_quantity INTEGER NOT NULL DEFAULT 0,
            first_record_date TEXT,
            last_record_date TEXT,
            completion_date TEXT,
            total_execution_days INTEGER NOT NULL DEFAULT 0,
            total_work_hours REAL NOT NULL DEFAULT 0,
            total_overtime_hours REAL NOT NULL DEFAULT 0,
            average_daily_hours REAL NOT NULL DEFAULT 0,
            efficiency_rate REAL NOT NULL DEFAULT 0,
            total_processes INTEGER NOT NULL DEFAULT 0,
            unique_processes INTEGER NOT NULL DEFAULT 0,
            total_operators INTEGER NOT NULL DEFAULT 0,
            process_details TEXT NOT NULL DEFAULT '{}',
            operator_details TEXT NOT NULL DEFAULT '{}',
            completion_status TEXT NOT NULL DEFAULT 'completed',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (workorder_id, company_code, product_code)
        );

        -- 作業員工序產能評分
        CREATE TABLE IF NOT EXISTS operator_process_capacity_score (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            operator_name TEXT NOT NULL,
            operator_id TEXT NOT NULL,
            company_code TEXT NOT NULL,
            product_code TEXT NOT NULL,
            process_name TEXT NOT NULL,
            workorder_id TEXT NOT NULL,
            work_date TEXT NOT NULL,
            work_hours REAL NOT NULL DEFAULT 0,
            standard_capacity_per_hour REAL NOT NULL DEFAULT 1.0,
            actual_capacity_per_hour REAL NOT NULL DEFAULT 0,
            completed_quantity INTEGER NOT NULL DEFAULT 0,
            capacity_ratio REAL NOT NULL DEFAULT 0,
            efficiency_factor REAL NOT NULL DEFAULT 0,
            learning_curve_factor REAL NOT NULL DEFAULT 0,
            defect_quantity INTEGER NOT NULL DEFAULT 0,
            defect_rate REAL NOT NULL DEFAULT 0,
            capacity_score REAL NOT NULL DEFAULT 0,
            supervisor_score REAL NOT NULL DEFAULT 80,
            supervisor_comment TEXT NOT NULL DEFAULT '',
            supervisor_name TEXT NOT NULL DEFAULT '',
            supervisor_date TEXT,
            is_supervisor_scored INTEGER NOT NULL DEFAULT 0,
            total_score REAL NOT NULL DEFAULT 0,
            grade TEXT NOT NULL DEFAULT '',
            overall_grade TEXT NOT NULL DEFAULT '',
            score_period TEXT NOT NULL DEFAULT 'monthly',
            period_start_date TEXT,
            period_end_date TEXT,
            is_period_closed INTEGER NOT NULL DEFAULT 0,
            period_closed_date TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (operator_id, company_code, product_code, process_name, workorder_id, work_date)
        );

        -- 報表排程定義
        CREATE TABLE IF NOT EXISTS report_schedule (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            report_type TEXT NOT NULL,
            company TEXT NOT NULL DEFAULT 'ALL',
            schedule_time TEXT,
            schedule_day INTEGER,
            sync_interval_minutes INTEGER,
            sync_fixed_time TEXT,
            file_format TEXT NOT NULL DEFAULT 'both',
            email_recipients TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- 排程執行日誌（執行歷史帳本，間隔模式同步據此防止過度觸發）
        CREATE TABLE IF NOT EXISTS report_execution_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            schedule_id INTEGER NOT NULL,
            schedule_name TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL,
            message TEXT NOT NULL DEFAULT '',
            file_path TEXT,
            executed_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_execution_log_schedule
            ON report_execution_log (schedule_id, executed_at);

        -- Cron 合成輸出（每個啟用排程一列）
        CREATE TABLE IF NOT EXISTS periodic_task (
            name TEXT PRIMARY KEY,
            schedule_id INTEGER NOT NULL,
            crontab TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- 行事曆事件（workday/holiday 覆寫）
        CREATE TABLE IF NOT EXISTS calendar_event (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            event_type TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_by TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_calendar_event_range
            ON calendar_event (start_date, end_date);

        -- 上游：填報記錄
        CREATE TABLE IF NOT EXISTS fill_work (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workorder TEXT,
            company_name TEXT,
            operator TEXT,
            product_id TEXT,
            operation TEXT,
            process_name TEXT,
            work_date TEXT,
            start_time TEXT,
            end_time TEXT,
            work_hours_calculated REAL NOT NULL DEFAULT 0,
            overtime_hours_calculated REAL NOT NULL DEFAULT 0,
            work_quantity INTEGER NOT NULL DEFAULT 0,
            defect_quantity INTEGER NOT NULL DEFAULT 0,
            approval_status TEXT NOT NULL DEFAULT 'pending'
        );

        -- 上游：現場報工記錄
        CREATE TABLE IF NOT EXISTS onsite_report (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workorder TEXT,
            company_name TEXT,
            operator TEXT,
            product_id TEXT,
            process_name TEXT,
            work_date TEXT,
            start_time TEXT,
            end_time TEXT,
            work_hours_calculated REAL NOT NULL DEFAULT 0,
            overtime_hours_calculated REAL NOT NULL DEFAULT 0,
            work_quantity INTEGER NOT NULL DEFAULT 0,
            defect_quantity INTEGER NOT NULL DEFAULT 0
        );

        -- 上游：已完工工單表頭
        CREATE TABLE IF NOT EXISTS completed_workorder (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_number TEXT NOT NULL,
            company_code TEXT NOT NULL,
            company_name TEXT,
            product_code TEXT,
            product_name TEXT,
            completed_quantity INTEGER NOT NULL DEFAULT 0
        );

        -- 上游：產品工序標準產能
        CREATE TABLE IF NOT EXISTS product_process_standard_capacity (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_code TEXT NOT NULL,
            product_code TEXT NOT NULL,
            process_name TEXT NOT NULL,
            standard_capacity_per_hour REAL NOT NULL DEFAULT 1.0,
            UNIQUE (company_code, product_code, process_name)
        );

        -- 郵件伺服器配置（單列）
        CREATE TABLE IF NOT EXISTS email_config (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            host TEXT NOT NULL,
            port INTEGER NOT NULL DEFAULT 25,
            username TEXT NOT NULL DEFAULT '',
            password TEXT NOT NULL DEFAULT '',
            use_tls INTEGER NOT NULL DEFAULT 0,
            default_from TEXT NOT NULL DEFAULT ''
        );
        "#,
    )?;

    Ok(())
}

/// 打開連線、套用 PRAGMA 並確保 schema 存在
pub fn open_and_init(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}
