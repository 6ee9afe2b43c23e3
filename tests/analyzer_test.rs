// ==========================================
// 已完工工單分析引擎整合測試
// ==========================================

mod test_helpers;

use chrono::NaiveDate;
use mes_reporting::engine::analyzer::{AnalyzeOutcome, WorkOrderAnalyzer};
use mes_reporting::repository::analysis_repo::AnalysisRepository;
use mes_reporting::repository::source_repo::SourceRepository;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use test_helpers::{create_test_db, seed_completed_workorder, seed_fill_work};

const PACKAGING: &str = "出貨包裝";

fn analyzer(conn: &Arc<Mutex<Connection>>) -> WorkOrderAnalyzer {
    WorkOrderAnalyzer::new(
        SourceRepository::from_connection(conn.clone()),
        AnalysisRepository::from_connection(conn.clone()),
        PACKAGING.to_string(),
    )
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// 三天執行期：組裝兩天，包裝最後出現在第二天
fn seed_standard_order(conn: &Arc<Mutex<Connection>>) {
    seed_completed_workorder(conn, "WO-100", "C1", "P100", 500).unwrap();
    seed_fill_work(
        conn, Some("WO-100"), Some("C1"), Some("王小明"), Some("P100"),
        Some("組裝"), Some("2025-03-01"), Some("08:00"), 8.0, 0.0, 200, 3, "approved",
    )
    .unwrap();
    seed_fill_work(
        conn, Some("WO-100"), Some("C1"), Some("李小華"), Some("P100"),
        Some(PACKAGING), Some("2025-03-02"), Some("08:00"), 6.0, 1.0, 300, 0, "approved",
    )
    .unwrap();
    seed_fill_work(
        conn, Some("WO-100"), Some("C1"), Some("王小明"), Some("P100"),
        Some("檢驗"), Some("2025-03-03"), Some("08:00"), 4.0, 0.0, 500, 0, "approved",
    )
    .unwrap();
}

#[test]
fn test_completion_date_follows_packaging_process() {
    let (_tmp, conn) = create_test_db().unwrap();
    seed_standard_order(&conn);

    let outcome = analyzer(&conn).analyze("WO-100", "C1", "P100", false).unwrap();
    assert_eq!(outcome, AnalyzeOutcome::Created);

    let analysis = AnalysisRepository::from_connection(conn)
        .find("WO-100", "C1", "P100")
        .unwrap()
        .expect("分析結果應已寫入");

    // 完工日期取包裝工序最後一筆的日期，不是最後填報日
    assert_eq!(analysis.completion_date, d(2025, 3, 2));
    assert_eq!(analysis.first_record_date, d(2025, 3, 1));
    assert_eq!(analysis.last_record_date, d(2025, 3, 3));
    assert_eq!(analysis.total_execution_days, 3);
    assert!((analysis.total_work_hours - 18.0).abs() < 1e-9);
    assert!((analysis.total_overtime_hours - 1.0).abs() < 1e-9);
    assert_eq!(analysis.unique_processes, 3);
    assert_eq!(analysis.total_operators, 2);
}

#[test]
fn test_completion_date_falls_back_without_packaging() {
    let (_tmp, conn) = create_test_db().unwrap();
    seed_completed_workorder(&conn, "WO-200", "C1", "P200", 100).unwrap();
    seed_fill_work(
        &conn, Some("WO-200"), Some("C1"), Some("王小明"), Some("P200"),
        Some("組裝"), Some("2025-03-05"), Some("08:00"), 8.0, 0.0, 100, 0, "approved",
    )
    .unwrap();

    analyzer(&conn).analyze("WO-200", "C1", "P200", false).unwrap();

    let analysis = AnalysisRepository::from_connection(conn)
        .find("WO-200", "C1", "P200")
        .unwrap()
        .unwrap();
    assert_eq!(analysis.completion_date, d(2025, 3, 5));
}

#[test]
fn test_rd_sample_orders_are_never_analyzed() {
    let (_tmp, conn) = create_test_db().unwrap();

    let outcome = analyzer(&conn)
        .analyze("WO-300-RD樣品", "C1", "P300", true)
        .unwrap();
    assert!(matches!(outcome, AnalyzeOutcome::Skipped(_)));
}

#[test]
fn test_existing_analysis_skipped_unless_forced() {
    let (_tmp, conn) = create_test_db().unwrap();
    seed_standard_order(&conn);

    let a = analyzer(&conn);
    assert_eq!(a.analyze("WO-100", "C1", "P100", false).unwrap(), AnalyzeOutcome::Created);
    assert!(matches!(
        a.analyze("WO-100", "C1", "P100", false).unwrap(),
        AnalyzeOutcome::Skipped(_)
    ));
    // force 重新分析覆寫既有列
    assert_eq!(a.analyze("WO-100", "C1", "P100", true).unwrap(), AnalyzeOutcome::Created);
}

#[test]
fn test_analyze_without_records_is_an_error() {
    let (_tmp, conn) = create_test_db().unwrap();
    seed_completed_workorder(&conn, "WO-400", "C1", "P400", 50).unwrap();

    let result = analyzer(&conn).analyze("WO-400", "C1", "P400", false);
    assert!(result.is_err());
}

#[test]
fn test_batch_isolates_failures() {
    let (_tmp, conn) = create_test_db().unwrap();
    seed_standard_order(&conn);
    // 無填報記錄的工單，批次中應失敗但不中止
    seed_completed_workorder(&conn, "WO-500", "C1", "P500", 10).unwrap();

    let outcome = analyzer(&conn).analyze_batch(None, None, None, false).unwrap();
    assert_eq!(outcome.success_count, 1);
    assert_eq!(outcome.error_count, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].contains("WO-500"));
}

#[test]
fn test_batch_date_range_filter() {
    let (_tmp, conn) = create_test_db().unwrap();
    seed_standard_order(&conn);

    let a = analyzer(&conn);
    // 範圍完全落在記錄之前 → 跳過
    let outcome = a
        .analyze_batch(Some(d(2025, 1, 1)), Some(d(2025, 1, 31)), None, false)
        .unwrap();
    assert_eq!(outcome.success_count, 0);
    assert_eq!(outcome.skipped_count, 1);

    // 涵蓋記錄日期 → 分析
    let outcome = a
        .analyze_batch(Some(d(2025, 3, 1)), Some(d(2025, 3, 31)), None, false)
        .unwrap();
    assert_eq!(outcome.success_count, 1);
}
