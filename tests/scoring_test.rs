// ==========================================
// 產能評分與期間管理整合測試
// ==========================================

mod test_helpers;

use chrono::NaiveDate;
use mes_reporting::domain::types::{Grade, ScorePeriod};
use mes_reporting::engine::{
    CapacityScoringService, ScoreInput, ScoreOutcome, ScorePeriodService, SupervisorReview,
};
use mes_reporting::repository::score_repo::ScoreRepository;
use mes_reporting::repository::source_repo::SourceRepository;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use test_helpers::{create_test_db, seed_fill_work, seed_onsite_report, seed_standard_capacity};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn scoring(conn: &Arc<Mutex<Connection>>) -> CapacityScoringService {
    CapacityScoringService::new(
        SourceRepository::from_connection(conn.clone()),
        ScoreRepository::from_connection(conn.clone()),
    )
}

fn period_service(conn: &Arc<Mutex<Connection>>) -> ScorePeriodService {
    ScorePeriodService::new(
        SourceRepository::from_connection(conn.clone()),
        ScoreRepository::from_connection(conn.clone()),
    )
}

fn input(operator: &str, workorder: &str, hours: f64, quantity: i64) -> ScoreInput {
    ScoreInput {
        operator_name: operator.to_string(),
        operator_id: operator.to_string(),
        company_code: "C1".to_string(),
        product_code: "P100".to_string(),
        process_name: "SMT".to_string(),
        workorder_id: workorder.to_string(),
        work_date: d(2025, 3, 10),
        work_hours: hours,
        completed_quantity: quantity,
        defect_quantity: 0,
        score_period: ScorePeriod::Monthly,
        period_start_date: d(2025, 3, 1),
        period_end_date: d(2025, 3, 31),
    }
}

#[test]
fn test_score_meets_standard() {
    let (_tmp, conn) = create_test_db().unwrap();
    seed_standard_capacity(&conn, "C1", "P100", "SMT", 10.0).unwrap();

    // 8 小時 80 件 = 10 件/小時，恰好達標
    let outcome = scoring(&conn).score(&input("王小明", "WO-1", 8.0, 80), None).unwrap();
    let ScoreOutcome::Scored(score) = outcome else {
        panic!("應建立評分");
    };
    assert!((score.capacity_ratio - 1.0).abs() < 1e-9);
    assert!((score.capacity_score - 100.0).abs() < 1e-9);
    // 總分 = 100×0.8 + 預設主管分 80×0.2 = 96
    assert!((score.total_score - 96.0).abs() < 1e-9);
    assert_eq!(score.grade, Grade::A);
    assert!(!score.is_supervisor_scored);
}

#[test]
fn test_score_below_standard() {
    let (_tmp, conn) = create_test_db().unwrap();
    seed_standard_capacity(&conn, "C1", "P100", "SMT", 10.0).unwrap();

    // 8 小時 40 件 = 5 件/小時，比率 0.5 → 產能分 50
    let ScoreOutcome::Scored(score) =
        scoring(&conn).score(&input("王小明", "WO-1", 8.0, 40), None).unwrap()
    else {
        panic!("應建立評分");
    };
    assert!((score.capacity_score - 50.0).abs() < 1e-9);
    assert_eq!(score.grade, Grade::D);
}

#[test]
fn test_missing_standard_capacity_defaults_to_one() {
    let (_tmp, conn) = create_test_db().unwrap();

    // 未建標準產能目錄 → 標準 1 件/小時
    let ScoreOutcome::Scored(score) =
        scoring(&conn).score(&input("王小明", "WO-1", 8.0, 8), None).unwrap()
    else {
        panic!("應建立評分");
    };
    assert!((score.standard_capacity_per_hour - 1.0).abs() < 1e-9);
    assert!((score.capacity_ratio - 1.0).abs() < 1e-9);
}

#[test]
fn test_supervisor_review_overrides_default() {
    let (_tmp, conn) = create_test_db().unwrap();
    seed_standard_capacity(&conn, "C1", "P100", "SMT", 10.0).unwrap();

    let review = SupervisorReview {
        supervisor_name: "張主管".to_string(),
        score: 95.0,
        comment: "表現優異".to_string(),
    };
    let ScoreOutcome::Scored(score) = scoring(&conn)
        .score(&input("王小明", "WO-1", 8.0, 80), Some(&review))
        .unwrap()
    else {
        panic!("應建立評分");
    };
    assert!(score.is_supervisor_scored);
    assert!((score.total_score - 99.0).abs() < 1e-9);

    // 無覆寫的重算保留既有主管評分
    let ScoreOutcome::Scored(rescored) =
        scoring(&conn).score(&input("王小明", "WO-1", 8.0, 80), None).unwrap()
    else {
        panic!("應建立評分");
    };
    assert!(rescored.is_supervisor_scored);
    assert_eq!(rescored.supervisor_name, "張主管");
    assert!((rescored.supervisor_score - 95.0).abs() < 1e-9);
}

#[test]
fn test_closed_period_blocks_rescoring() {
    let (_tmp, conn) = create_test_db().unwrap();
    seed_standard_capacity(&conn, "C1", "P100", "SMT", 10.0).unwrap();

    let svc = scoring(&conn);
    svc.score(&input("王小明", "WO-1", 8.0, 80), None).unwrap();

    let closed = period_service(&conn)
        .close_period("C1", ScorePeriod::Monthly, d(2025, 3, 15))
        .unwrap();
    assert_eq!(closed, 1);

    // 結案後重算被拒
    let outcome = svc.score(&input("王小明", "WO-1", 8.0, 100), None).unwrap();
    assert_eq!(outcome, ScoreOutcome::SkippedClosed);

    // 原評分維持不動
    let record = ScoreRepository::from_connection(conn)
        .find_by_key("王小明", "C1", "P100", "SMT", "WO-1", d(2025, 3, 10))
        .unwrap()
        .unwrap();
    assert!((record.capacity_score - 100.0).abs() < 1e-9);
    assert!(record.is_period_closed);
}

#[test]
fn test_period_scores_from_both_sources() {
    let (_tmp, conn) = create_test_db().unwrap();
    seed_standard_capacity(&conn, "C1", "P100", "SMT", 10.0).unwrap();

    seed_fill_work(
        &conn, Some("WO-1"), Some("C1"), Some("王小明"), Some("P100"),
        Some("SMT"), Some("2025-03-10"), Some("08:00"), 8.0, 0.0, 80, 0, "approved",
    )
    .unwrap();
    seed_onsite_report(
        &conn, "WO-2", "C1", "李小華", "P100", "SMT", "2025-03-11", 8.0, 40, 0,
    )
    .unwrap();
    // 未核准填報不納入
    seed_fill_work(
        &conn, Some("WO-3"), Some("C1"), Some("陳大同"), Some("P100"),
        Some("SMT"), Some("2025-03-12"), Some("08:00"), 8.0, 0.0, 80, 0, "pending",
    )
    .unwrap();

    let svc = period_service(&conn);
    let outcome = svc
        .create_period_scores(&scoring(&conn), "C1", ScorePeriod::Monthly, d(2025, 3, 15))
        .unwrap();
    assert_eq!(outcome.created, 2);
    assert_eq!(outcome.failed, 0);

    let summary = svc
        .get_period_summary("C1", ScorePeriod::Monthly, d(2025, 3, 15))
        .unwrap();
    assert_eq!(summary.period_name, "2025年3月評分");
    assert_eq!(summary.total_records, 2);
    // 100 與 50 的平均
    assert!((summary.avg_capacity_score - 75.0).abs() < 1e-9);
    assert!(!summary.is_closed);
    assert_eq!(summary.supervisor_scored_count, 0);

    // 結案後摘要反映狀態，重建被跳過
    svc.close_period("C1", ScorePeriod::Monthly, d(2025, 3, 15)).unwrap();
    let rerun = svc
        .create_period_scores(&scoring(&conn), "C1", ScorePeriod::Monthly, d(2025, 3, 15))
        .unwrap();
    assert_eq!(rerun.created, 0);
    assert_eq!(rerun.skipped_closed, 2);

    let summary = svc
        .get_period_summary("C1", ScorePeriod::Monthly, d(2025, 3, 15))
        .unwrap();
    assert!(summary.is_closed);
}
