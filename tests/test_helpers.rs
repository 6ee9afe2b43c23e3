// ==========================================
// 測試輔助函數
// ==========================================
// 職責: 臨時測試資料庫初始化與上游資料播種
// ==========================================

#![allow(dead_code)]

use mes_reporting::db;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 建立臨時測試資料庫並初始化 schema
///
/// # 返回
/// - NamedTempFile: 臨時資料庫檔案（需保持存活）
/// - Arc<Mutex<Connection>>: 共用連線
pub fn create_test_db() -> Result<(NamedTempFile, Arc<Mutex<Connection>>), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("臨時檔路徑非 UTF-8")?
        .to_string();

    let conn = db::open_and_init(&db_path)?;
    Ok((temp_file, Arc::new(Mutex::new(conn))))
}

/// 播種一筆填報記錄
#[allow(clippy::too_many_arguments)]
pub fn seed_fill_work(
    conn: &Arc<Mutex<Connection>>,
    workorder: Option<&str>,
    company: Option<&str>,
    operator: Option<&str>,
    product: Option<&str>,
    process: Option<&str>,
    work_date: Option<&str>,
    start_time: Option<&str>,
    hours: f64,
    overtime: f64,
    quantity: i64,
    defect: i64,
    approval_status: &str,
) -> Result<(), Box<dyn Error>> {
    let conn = conn.lock().map_err(|e| e.to_string())?;
    conn.execute(
        r#"
        INSERT INTO fill_work (
            workorder, company_name, operator, product_id, process_name,
            work_date, start_time, work_hours_calculated,
            overtime_hours_calculated, work_quantity, defect_quantity, approval_status
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
        params![
            workorder,
            company,
            operator,
            product,
            process,
            work_date,
            start_time,
            hours,
            overtime,
            quantity,
            defect,
            approval_status,
        ],
    )?;
    Ok(())
}

/// 播種一筆現場報工記錄
#[allow(clippy::too_many_arguments)]
pub fn seed_onsite_report(
    conn: &Arc<Mutex<Connection>>,
    workorder: &str,
    company: &str,
    operator: &str,
    product: &str,
    process: &str,
    work_date: &str,
    hours: f64,
    quantity: i64,
    defect: i64,
) -> Result<(), Box<dyn Error>> {
    let conn = conn.lock().map_err(|e| e.to_string())?;
    conn.execute(
        r#"
        INSERT INTO onsite_report (
            workorder, company_name, operator, product_id, process_name,
            work_date, work_hours_calculated, work_quantity, defect_quantity
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![workorder, company, operator, product, process, work_date, hours, quantity, defect],
    )?;
    Ok(())
}

/// 播種完工工單表頭
pub fn seed_completed_workorder(
    conn: &Arc<Mutex<Connection>>,
    order_number: &str,
    company_code: &str,
    product_code: &str,
    completed_quantity: i64,
) -> Result<(), Box<dyn Error>> {
    let conn = conn.lock().map_err(|e| e.to_string())?;
    conn.execute(
        r#"
        INSERT INTO completed_workorder (
            order_number, company_code, company_name, product_code, product_name,
            completed_quantity
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            order_number,
            company_code,
            format!("{company_code} 公司"),
            product_code,
            format!("{product_code} 產品"),
            completed_quantity,
        ],
    )?;
    Ok(())
}

/// 播種產品工序標準產能
pub fn seed_standard_capacity(
    conn: &Arc<Mutex<Connection>>,
    company_code: &str,
    product_code: &str,
    process_name: &str,
    capacity: f64,
) -> Result<(), Box<dyn Error>> {
    let conn = conn.lock().map_err(|e| e.to_string())?;
    conn.execute(
        r#"
        INSERT INTO product_process_standard_capacity (
            company_code, product_code, process_name, standard_capacity_per_hour
        ) VALUES (?1, ?2, ?3, ?4)
        "#,
        params![company_code, product_code, process_name, capacity],
    )?;
    Ok(())
}
