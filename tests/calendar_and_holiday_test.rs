// ==========================================
// 工作日判定與假期匯入整合測試
// ==========================================

mod test_helpers;

use chrono::NaiveDate;
use mes_reporting::domain::calendar::CalendarEvent;
use mes_reporting::domain::types::CalendarEventType;
use mes_reporting::engine::WorkdayCalendar;
use mes_reporting::importer::{generate_sample_csv, HolidayCsvImporter};
use mes_reporting::repository::calendar_repo::CalendarRepository;
use test_helpers::create_test_db;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn test_previous_workday_skips_weekend() {
    let (_tmp, conn) = create_test_db().unwrap();
    let calendar = WorkdayCalendar::new(CalendarRepository::from_connection(conn));

    // 2025-03-10 是週一，前一工作日應跳過週末回到 03-07（週五）
    assert_eq!(calendar.get_previous_workday(d(2025, 3, 10)), d(2025, 3, 7));
    // 週三的前一工作日就是週二
    assert_eq!(calendar.get_previous_workday(d(2025, 3, 12)), d(2025, 3, 11));
}

#[test]
fn test_fixed_holiday_not_workday() {
    let (_tmp, conn) = create_test_db().unwrap();
    let calendar = WorkdayCalendar::new(CalendarRepository::from_connection(conn));

    // 元旦（2025-01-01 週三）為固定假日
    assert!(!calendar.is_workday(d(2025, 1, 1)));
    // 隔天照常上班
    assert!(calendar.is_workday(d(2025, 1, 2)));
}

#[test]
fn test_workday_event_overrides_fixed_holiday() {
    let (_tmp, conn) = create_test_db().unwrap();
    let repo = CalendarRepository::from_connection(conn.clone());

    // 元旦補班事件
    repo.insert(&CalendarEvent {
        id: None,
        name: "元旦補班".to_string(),
        event_type: CalendarEventType::Workday,
        start_date: d(2025, 1, 1),
        end_date: d(2025, 1, 1),
        description: String::new(),
        created_by: "test".to_string(),
    })
    .unwrap();

    let calendar = WorkdayCalendar::new(CalendarRepository::from_connection(conn));
    assert!(calendar.is_workday(d(2025, 1, 1)));
}

#[test]
fn test_holiday_event_overrides_weekday() {
    let (_tmp, conn) = create_test_db().unwrap();
    let repo = CalendarRepository::from_connection(conn.clone());

    repo.insert(&CalendarEvent {
        id: None,
        name: "廠休".to_string(),
        event_type: CalendarEventType::Holiday,
        start_date: d(2025, 3, 12),
        end_date: d(2025, 3, 13),
        description: String::new(),
        created_by: "test".to_string(),
    })
    .unwrap();

    let calendar = WorkdayCalendar::new(CalendarRepository::from_connection(conn));
    assert!(!calendar.is_workday(d(2025, 3, 12)));
    assert!(!calendar.is_workday(d(2025, 3, 13)));
    // 廠休結束隔天（週五）恢復
    assert!(calendar.is_workday(d(2025, 3, 14)));
    // 前一工作日推導也跳過廠休
    assert_eq!(calendar.get_previous_workday(d(2025, 3, 14)), d(2025, 3, 11));
}

#[test]
fn test_workdays_in_range_excludes_imported_holidays() {
    let (_tmp, conn) = create_test_db().unwrap();
    let importer = HolidayCsvImporter::new(CalendarRepository::from_connection(conn.clone()));

    let outcome = importer.import_str(&generate_sample_csv()).unwrap();
    assert_eq!(outcome.imported, 3);
    assert_eq!(outcome.skipped, 0);

    let calendar = WorkdayCalendar::new(CalendarRepository::from_connection(conn));
    // 和平紀念日 2025-02-28（週五）匯入後不是工作日
    assert!(!calendar.is_workday(d(2025, 2, 28)));
    // 2025-02-24（一）～ 03-02（日）: 週一到週四四個工作日
    assert_eq!(calendar.get_workdays_count(d(2025, 2, 24), d(2025, 3, 2)), 4);
}

#[test]
fn test_reimport_skips_existing_holidays() {
    let (_tmp, conn) = create_test_db().unwrap();
    let importer = HolidayCsvImporter::new(CalendarRepository::from_connection(conn));

    let first = importer.import_str(&generate_sample_csv()).unwrap();
    assert_eq!(first.imported, 3);

    let second = importer.import_str(&generate_sample_csv()).unwrap();
    assert_eq!(second.imported, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(
        second.message(),
        "CSV 匯入完成！成功匯入 0 個假期，跳過 3 個已存在的假期"
    );
}
