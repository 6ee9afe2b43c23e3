// ==========================================
// 資料同步管線整合測試
// ==========================================

mod test_helpers;

use chrono::NaiveDate;
use mes_reporting::engine::{DataCollector, DataSynchronizer};
use mes_reporting::repository::report_data_repo::ReportDataRepository;
use mes_reporting::repository::source_repo::SourceRepository;
use test_helpers::{create_test_db, seed_fill_work};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn test_sync_only_approved_records() {
    let (_tmp, conn) = create_test_db().unwrap();

    seed_fill_work(
        &conn, Some("WO-001"), Some("台北廠"), Some("王小明"), Some("P100"),
        Some("SMT"), Some("2025-03-03"), Some("08:00"), 8.0, 0.0, 100, 2, "approved",
    )
    .unwrap();
    seed_fill_work(
        &conn, Some("WO-002"), Some("台北廠"), Some("李小華"), Some("P100"),
        Some("DIP"), Some("2025-03-03"), Some("08:00"), 6.0, 1.5, 80, 0, "pending",
    )
    .unwrap();

    let synchronizer = DataSynchronizer::new(
        SourceRepository::from_connection(conn.clone()),
        ReportDataRepository::from_connection(conn.clone()),
    );
    let outcome = synchronizer.sync_data().unwrap();
    assert_eq!(outcome.total, 1);
    assert_eq!(outcome.synced, 1);
    assert_eq!(outcome.failed, 0);

    let repo = ReportDataRepository::from_connection(conn);
    assert_eq!(repo.count_all().unwrap(), 1);
}

#[test]
fn test_sync_skips_records_missing_required_fields() {
    let (_tmp, conn) = create_test_db().unwrap();

    // 缺工單編號
    seed_fill_work(
        &conn, None, Some("台北廠"), Some("王小明"), Some("P100"),
        Some("SMT"), Some("2025-03-03"), Some("08:00"), 8.0, 0.0, 100, 0, "approved",
    )
    .unwrap();
    // 缺工作日期
    seed_fill_work(
        &conn, Some("WO-003"), Some("台北廠"), Some("王小明"), Some("P100"),
        Some("SMT"), None, Some("08:00"), 8.0, 0.0, 100, 0, "approved",
    )
    .unwrap();
    // 完整記錄
    seed_fill_work(
        &conn, Some("WO-004"), Some("台北廠"), Some("王小明"), Some("P100"),
        Some("SMT"), Some("2025-03-03"), Some("09:00"), 4.0, 0.0, 50, 0, "approved",
    )
    .unwrap();

    let synchronizer = DataSynchronizer::new(
        SourceRepository::from_connection(conn.clone()),
        ReportDataRepository::from_connection(conn),
    );
    let outcome = synchronizer.sync_data().unwrap();
    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.synced, 1);
    assert_eq!(outcome.skipped, 2);
    assert_eq!(outcome.failed, 0);
}

#[test]
fn test_sync_is_idempotent() {
    let (_tmp, conn) = create_test_db().unwrap();

    seed_fill_work(
        &conn, Some("WO-001"), Some("台北廠"), Some("王小明"), Some("P100"),
        Some("SMT"), Some("2025-03-03"), Some("08:00"), 8.0, 0.0, 100, 0, "approved",
    )
    .unwrap();
    seed_fill_work(
        &conn, Some("WO-001"), Some("台北廠"), Some("王小明"), Some("P100"),
        Some("SMT"), Some("2025-03-03"), Some("13:00"), 4.0, 0.0, 60, 0, "approved",
    )
    .unwrap();

    let synchronizer = DataSynchronizer::new(
        SourceRepository::from_connection(conn.clone()),
        ReportDataRepository::from_connection(conn.clone()),
    );

    let first = synchronizer.sync_data().unwrap();
    assert_eq!(first.synced, 2);

    // 上游未變，重跑一律跳過
    let second = synchronizer.sync_data().unwrap();
    assert_eq!(second.synced, 0);
    assert_eq!(second.skipped, 2);

    let repo = ReportDataRepository::from_connection(conn);
    assert_eq!(repo.count_all().unwrap(), 2);
}

#[test]
fn test_synced_data_flows_into_collector() {
    let (_tmp, conn) = create_test_db().unwrap();

    seed_fill_work(
        &conn, Some("WO-001"), Some("台北廠"), Some("王小明"), Some("P100"),
        Some("SMT"), Some("2025-03-03"), Some("08:00"), 8.0, 2.0, 100, 2, "approved",
    )
    .unwrap();
    seed_fill_work(
        &conn, Some("WO-002"), Some("高雄廠"), Some("李小華"), Some("P200"),
        Some("DIP"), Some("2025-03-04"), Some("08:00"), 6.0, 0.0, 50, 0, "approved",
    )
    .unwrap();

    let synchronizer = DataSynchronizer::new(
        SourceRepository::from_connection(conn.clone()),
        ReportDataRepository::from_connection(conn.clone()),
    );
    synchronizer.sync_data().unwrap();

    let collector = DataCollector::new(ReportDataRepository::from_connection(conn));

    // 全範圍不過濾公司
    let dataset = collector.collect(d(2025, 3, 3), d(2025, 3, 4), None).unwrap();
    assert_eq!(dataset.summary.total_records, 2);
    assert_eq!(dataset.company_stats.len(), 2);
    assert!((dataset.summary.total_work_hours - 16.0).abs() < 1e-9);

    // 按公司過濾
    let taipei = collector
        .collect(d(2025, 3, 3), d(2025, 3, 4), Some("台北廠"))
        .unwrap();
    assert_eq!(taipei.summary.total_records, 1);
    assert_eq!(taipei.company_stats[0].company_name, "台北廠");
}
