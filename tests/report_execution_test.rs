// ==========================================
// 報表執行端到端整合測試（不含 SMTP 寄送）
// ==========================================

mod test_helpers;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use mes_reporting::config::AppConfig;
use mes_reporting::domain::schedule::{PeriodicTask, ReportSchedule};
use mes_reporting::domain::types::{
    ExecutionStatus, FileFormat, ReportType, ScheduleStatus,
};
use mes_reporting::domain::WorkOrderReportData;
use mes_reporting::engine::{
    DataCollector, DataSynchronizer, TriggerEvaluator, UnifiedReportExecutor, WorkdayCalendar,
};
use mes_reporting::formatter::ReportFormatter;
use mes_reporting::mailer::ReportMailer;
use mes_reporting::repository::calendar_repo::CalendarRepository;
use mes_reporting::repository::mail_config_repo::MailConfigRepository;
use mes_reporting::repository::report_data_repo::ReportDataRepository;
use mes_reporting::repository::schedule_repo::ScheduleRepository;
use mes_reporting::repository::source_repo::SourceRepository;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use test_helpers::{create_test_db, seed_fill_work};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn at(y: i32, m: u32, day: u32, h: u32, min: u32) -> NaiveDateTime {
    d(y, m, day).and_hms_opt(h, min, 0).unwrap()
}

fn build_executor(conn: &Arc<Mutex<Connection>>, media_root: &Path) -> UnifiedReportExecutor {
    let config = AppConfig {
        media_root: media_root.to_path_buf(),
        ..AppConfig::default()
    };
    UnifiedReportExecutor::new(
        DataCollector::new(ReportDataRepository::from_connection(conn.clone())),
        ReportFormatter::new(config.reports_dir()),
        ReportMailer::new(MailConfigRepository::from_connection(conn.clone())),
        DataSynchronizer::new(
            SourceRepository::from_connection(conn.clone()),
            ReportDataRepository::from_connection(conn.clone()),
        ),
        ScheduleRepository::from_connection(conn.clone()),
        ReportDataRepository::from_connection(conn.clone()),
        WorkdayCalendar::new(CalendarRepository::from_connection(conn.clone())),
        &config,
    )
}

fn report_schedule(report_type: ReportType, name: &str) -> ReportSchedule {
    ReportSchedule {
        id: None,
        name: name.to_string(),
        report_type,
        company: "ALL".to_string(),
        schedule_time: NaiveTime::from_hms_opt(9, 0, 0),
        schedule_day: Some(1),
        sync_interval_minutes: None,
        sync_fixed_time: None,
        file_format: FileFormat::Both,
        // 不設收件人：寄送步驟直接略過
        email_recipients: String::new(),
        status: ScheduleStatus::Active,
        created_at: None,
        updated_at: None,
    }
}

fn seed_report_data(conn: &Arc<Mutex<Connection>>, work_date: NaiveDate, workorder: &str) {
    let repo = ReportDataRepository::from_connection(conn.clone());
    repo.insert(&WorkOrderReportData {
        id: None,
        workorder_id: workorder.to_string(),
        company: "台北廠".to_string(),
        operator_name: "王小明".to_string(),
        product_code: Some("P100".to_string()),
        process_name: Some("SMT".to_string()),
        work_date,
        start_time: "08:00".to_string(),
        end_time: Some("17:00".to_string()),
        work_week: 0,
        work_month: 0,
        work_quarter: 0,
        work_year: 0,
        work_hours: 8.0,
        overtime_hours: 1.0,
        work_quantity: 100,
        defect_quantity: 2,
        created_at: None,
        updated_at: None,
    })
    .unwrap();
}

#[test]
fn test_previous_workday_report_end_to_end() {
    let (_tmp, conn) = create_test_db().unwrap();
    let media = tempfile::tempdir().unwrap();

    // 2025-03-04 是週二，前一工作日 03-03
    seed_report_data(&conn, d(2025, 3, 3), "WO-001");

    let schedule_repo = ScheduleRepository::from_connection(conn.clone());
    let mut schedule = report_schedule(ReportType::PreviousWorkday, "每日報表");
    schedule.id = Some(schedule_repo.insert_schedule(&schedule).unwrap());

    let executor = build_executor(&conn, media.path());
    let now = at(2025, 3, 4, 10, 30);
    let result = executor.execute(&schedule, now).unwrap();

    assert!(result.success, "執行應成功: {}", result.message);
    assert!(result.message.contains("前一個工作日報表 (2025-03-03)"));
    assert_eq!(result.data_summary.as_ref().unwrap().total_records, 1);

    // 兩種格式都落地，檔名帶資料起始日
    let reports_dir = media.path().join("reports");
    assert!(reports_dir.join("前一個工作日報表_2025-03-03_20250303.html").is_file());
    assert!(reports_dir.join("前一個工作日報表_2025-03-03_20250303.xlsx").is_file());

    // 執行日誌留痕
    let logs = schedule_repo.list_logs(schedule.id.unwrap()).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, ExecutionStatus::Success);
    assert!(logs[0].file_path.is_some());

    // 當日已成功執行 → 觸發器不再觸發
    let trigger = TriggerEvaluator::new(ScheduleRepository::from_connection(conn));
    assert!(!trigger.should_execute_now(&schedule, at(2025, 3, 4, 11, 0)).unwrap());
}

#[test]
fn test_sparse_fallback_uses_latest_data_date() {
    let (_tmp, conn) = create_test_db().unwrap();
    let media = tempfile::tempdir().unwrap();

    // 前一工作日（03-03）無資料，最近有資料的日期是 02-25
    seed_report_data(&conn, d(2025, 2, 25), "WO-001");

    let schedule_repo = ScheduleRepository::from_connection(conn.clone());
    let mut schedule = report_schedule(ReportType::PreviousWorkday, "每日報表");
    schedule.id = Some(schedule_repo.insert_schedule(&schedule).unwrap());

    let executor = build_executor(&conn, media.path());
    let result = executor.execute(&schedule, at(2025, 3, 4, 10, 30)).unwrap();

    assert!(result.success);
    assert!(result.message.contains("2025-02-25"));
    assert_eq!(result.data_summary.as_ref().unwrap().total_records, 1);
    assert!(media
        .path()
        .join("reports")
        .join("前一個工作日報表_2025-02-25_20250225.html")
        .is_file());
}

#[test]
fn test_weekly_report_range() {
    let (_tmp, conn) = create_test_db().unwrap();
    let media = tempfile::tempdir().unwrap();

    // 上週一到週日 2025-02-24 ~ 03-02
    seed_report_data(&conn, d(2025, 2, 24), "WO-001");
    seed_report_data(&conn, d(2025, 3, 2), "WO-002");
    // 本週資料不得入選
    seed_report_data(&conn, d(2025, 3, 3), "WO-003");

    let schedule_repo = ScheduleRepository::from_connection(conn.clone());
    let mut schedule = report_schedule(ReportType::PreviousWeek, "週報");
    schedule.id = Some(schedule_repo.insert_schedule(&schedule).unwrap());

    let executor = build_executor(&conn, media.path());
    // 2025-03-04 為週二
    let result = executor.execute(&schedule, at(2025, 3, 4, 9, 0)).unwrap();

    assert!(result.success);
    assert!(result.message.contains("上週報表 (2025-02-24 至 2025-03-02)"));
    assert_eq!(result.data_summary.as_ref().unwrap().total_records, 2);
}

#[test]
fn test_data_sync_schedule_execution() {
    let (_tmp, conn) = create_test_db().unwrap();
    let media = tempfile::tempdir().unwrap();

    seed_fill_work(
        &conn, Some("WO-001"), Some("台北廠"), Some("王小明"), Some("P100"),
        Some("SMT"), Some("2025-03-03"), Some("08:00"), 8.0, 0.0, 100, 0, "approved",
    )
    .unwrap();

    let schedule_repo = ScheduleRepository::from_connection(conn.clone());
    let mut schedule = report_schedule(ReportType::DataSync, "資料同步");
    schedule.sync_interval_minutes = Some(30);
    schedule.id = Some(schedule_repo.insert_schedule(&schedule).unwrap());

    let executor = build_executor(&conn, media.path());
    let result = executor.execute(&schedule, at(2025, 3, 4, 2, 0)).unwrap();

    assert!(result.success);
    assert!(result.message.contains("資料同步完成"));
    assert!(result.message.contains("同步 1 筆"));

    let repo = ReportDataRepository::from_connection(conn.clone());
    assert_eq!(repo.count_all().unwrap(), 1);

    // 間隔未滿不再觸發，滿間隔再次觸發
    let trigger = TriggerEvaluator::new(ScheduleRepository::from_connection(conn));
    assert!(!trigger.should_execute_now(&schedule, at(2025, 3, 4, 2, 10)).unwrap());
    assert!(trigger.should_execute_now(&schedule, at(2025, 3, 4, 2, 30)).unwrap());
}

#[test]
fn test_cron_synthesis_tracks_schedule_status() {
    let (_tmp, conn) = create_test_db().unwrap();

    let schedule_repo = ScheduleRepository::from_connection(conn.clone());
    let weekly = report_schedule(ReportType::PreviousWeek, "週報");
    let weekly_id = schedule_repo.insert_schedule(&weekly).unwrap();

    let mut monthly = report_schedule(ReportType::PreviousMonth, "月報");
    monthly.status = ScheduleStatus::Inactive;
    schedule_repo.insert_schedule(&monthly).unwrap();

    let trigger = TriggerEvaluator::new(ScheduleRepository::from_connection(conn.clone()));
    let emitted = trigger.sync_schedules_to_tasks().unwrap();
    assert_eq!(emitted, 1);

    let tasks = schedule_repo.list_tasks().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, PeriodicTask::task_name(weekly_id));
    assert_eq!(tasks[0].crontab, "0 9 * * 1");

    // 排程停用後重新合成 → 任務列消失
    schedule_repo
        .set_schedule_status(weekly_id, ScheduleStatus::Inactive)
        .unwrap();
    let emitted = trigger.sync_schedules_to_tasks().unwrap();
    assert_eq!(emitted, 0);
    assert!(schedule_repo.list_tasks().unwrap().is_empty());
}

#[test]
fn test_empty_dataset_still_produces_report() {
    let (_tmp, conn) = create_test_db().unwrap();
    let media = tempfile::tempdir().unwrap();

    let schedule_repo = ScheduleRepository::from_connection(conn.clone());
    let mut schedule = report_schedule(ReportType::PreviousMonth, "月報");
    schedule.file_format = FileFormat::Html;
    schedule.id = Some(schedule_repo.insert_schedule(&schedule).unwrap());

    let executor = build_executor(&conn, media.path());
    let result = executor.execute(&schedule, at(2025, 3, 1, 9, 0)).unwrap();

    assert!(result.success);
    assert_eq!(result.data_summary.as_ref().unwrap().total_records, 0);
    let html = std::fs::read_to_string(
        media
            .path()
            .join("reports")
            .join("上月報表_2025-02-01_至_2025-02-28_20250201.html"),
    )
    .unwrap();
    assert!(html.contains("無資料"));
    // 只要 HTML 格式 → 不產生 Excel
    assert!(result.excel_path.is_none());
}
