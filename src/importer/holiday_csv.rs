// ==========================================
// MES 報表與分析子系統 - 假期 CSV 解析與匯入
// ==========================================
// 職責: Outlook 行事曆匯出格式的假期檔解析、逐列驗證、去重入庫
// 約定: 行號從 2 起算（第 1 行是表頭），錯誤訊息帶行號
// ==========================================

use crate::domain::calendar::CalendarEvent;
use crate::repository::calendar_repo::CalendarRepository;
use crate::repository::RepositoryError;
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// 嘗試的日期格式（依序）
const DATE_FORMATS: [&str; 4] = ["%Y/%m/%d", "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// 匯入者標記（寫入 calendar_event.created_by）
const IMPORT_SOURCE: &str = "csv_import";

/// 匯入錯誤
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("檔案讀取失敗: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV 解析失敗: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type ImportResult<T> = Result<T, ImportError>;

/// 匯入結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub imported: usize,
    pub skipped: usize,
    /// 帶行號的逐列錯誤
    pub errors: Vec<String>,
}

impl ImportOutcome {
    pub fn message(&self) -> String {
        format!(
            "CSV 匯入完成！成功匯入 {} 個假期，跳過 {} 個已存在的假期",
            self.imported, self.skipped
        )
    }
}

/// 解析後的單列假期
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHoliday {
    pub name: String,
    pub date: NaiveDate,
    pub description: String,
    pub all_day: bool,
}

// ==========================================
// HolidayCsvImporter - 假期 CSV 匯入器
// ==========================================

/// 假期 CSV 匯入器
pub struct HolidayCsvImporter {
    calendar_repo: CalendarRepository,
}

impl HolidayCsvImporter {
    pub fn new(calendar_repo: CalendarRepository) -> Self {
        Self { calendar_repo }
    }

    /// 匯入假期 CSV 檔
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn import_file(&self, path: &Path) -> ImportResult<ImportOutcome> {
        let mut content = String::new();
        File::open(path)?.read_to_string(&mut content)?;
        self.import_str(&content)
    }

    /// 匯入 CSV 內容（含 UTF-8 BOM 容忍）
    pub fn import_str(&self, content: &str) -> ImportResult<ImportOutcome> {
        let (holidays, mut errors) = parse_csv(content)?;

        let mut imported = 0usize;
        let mut skipped = 0usize;
        for holiday in &holidays {
            if self.calendar_repo.holiday_exists_on(holiday.date)? {
                skipped += 1;
                continue;
            }
            let event = CalendarEvent::single_day_holiday(
                holiday.date,
                &holiday.name,
                &holiday.description,
                IMPORT_SOURCE,
            );
            match self.calendar_repo.insert(&event) {
                Ok(_) => imported += 1,
                Err(e) if e.is_unique_violation() => skipped += 1,
                Err(e) => {
                    warn!("假期寫入失敗: {} ({})", holiday.name, e);
                    errors.push(format!("假期 '{}' 寫入失敗: {e}", holiday.name));
                }
            }
        }

        let outcome = ImportOutcome {
            imported,
            skipped,
            errors,
        };
        info!(
            "假期匯入完成: imported={} skipped={} errors={}",
            outcome.imported,
            outcome.skipped,
            outcome.errors.len()
        );
        Ok(outcome)
    }
}

/// 解析 CSV 內容，回傳有效假期與逐列錯誤
pub fn parse_csv(content: &str) -> ImportResult<(Vec<ParsedHoliday>, Vec<String>)> {
    let content = content.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let col = |name: &str| -> Option<usize> {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
    };
    let subject_col = col("Subject");
    let start_date_col = col("Start Date");
    let description_col = col("Description");
    let all_day_col = col("All Day Event");

    let mut holidays = Vec::new();
    let mut errors = Vec::new();

    for (index, record) in reader.records().enumerate() {
        // 表頭佔第 1 行，資料從第 2 行起算
        let row_number = index + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                errors.push(format!("第 {row_number} 行：解析失敗 ({e})"));
                continue;
            }
        };

        let subject = field(&record, subject_col);
        let start_date = field(&record, start_date_col);

        // 全空列（尾端空行等）靜默跳過
        if subject.is_empty() && start_date.is_empty() {
            continue;
        }
        if subject.is_empty() {
            errors.push(format!("第 {row_number} 行：缺少假期名稱"));
            continue;
        }
        if start_date.is_empty() {
            errors.push(format!("第 {row_number} 行：缺少開始日期"));
            continue;
        }

        let Some(date) = parse_flexible_date(&start_date) else {
            errors.push(format!("第 {row_number} 行：日期格式錯誤 '{start_date}'"));
            continue;
        };

        holidays.push(ParsedHoliday {
            name: subject,
            date,
            description: field(&record, description_col),
            all_day: is_truthy(&field(&record, all_day_col)),
        });
    }

    Ok((holidays, errors))
}

fn field(record: &StringRecord, index: Option<usize>) -> String {
    index
        .and_then(|i| record.get(i))
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// 依序嘗試已知日期格式
pub fn parse_flexible_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

fn is_truthy(text: &str) -> bool {
    matches!(
        text.trim().to_uppercase().as_str(),
        "TRUE" | "YES" | "1" | "是"
    )
}

/// 產生範例 CSV（說明頁下載用）
pub fn generate_sample_csv() -> String {
    concat!(
        "Subject,Start Date,Start Time,End Date,End Time,All Day Event,Description,Location\n",
        "元旦,2025/1/1,,2025/1/1,,TRUE,中華民國開國紀念日,\n",
        "春節,2025/1/29,,2025/1/29,,TRUE,農曆新年,\n",
        "和平紀念日,2025/2/28,,2025/2/28,,TRUE,二二八和平紀念日,\n",
    )
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sample_csv() {
        let (holidays, errors) = parse_csv(&generate_sample_csv()).unwrap();
        assert_eq!(holidays.len(), 3);
        assert!(errors.is_empty());
        assert_eq!(holidays[0].name, "元旦");
        assert_eq!(holidays[0].date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(holidays[0].all_day);
    }

    #[test]
    fn test_bom_is_tolerated() {
        let content = "\u{feff}Subject,Start Date\n元旦,2025-01-01\n";
        let (holidays, errors) = parse_csv(content).unwrap();
        assert_eq!(holidays.len(), 1);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_row_errors_carry_line_numbers() {
        let content = "Subject,Start Date\n,2025/1/1\n元旦,\n春節,01.29.2025\n";
        let (holidays, errors) = parse_csv(content).unwrap();
        assert!(holidays.is_empty());
        assert_eq!(
            errors,
            vec![
                "第 2 行：缺少假期名稱",
                "第 3 行：缺少開始日期",
                "第 4 行：日期格式錯誤 '01.29.2025'",
            ]
        );
    }

    #[test]
    fn test_blank_rows_skipped_silently() {
        let content = "Subject,Start Date\n,\n元旦,2025/1/1\n";
        let (holidays, errors) = parse_csv(content).unwrap();
        assert_eq!(holidays.len(), 1);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_date_format_variants() {
        assert_eq!(
            parse_flexible_date("2025/3/3"),
            NaiveDate::from_ymd_opt(2025, 3, 3)
        );
        assert_eq!(
            parse_flexible_date("2025-03-03"),
            NaiveDate::from_ymd_opt(2025, 3, 3)
        );
        assert_eq!(
            parse_flexible_date("03/03/2025"),
            NaiveDate::from_ymd_opt(2025, 3, 3)
        );
        assert_eq!(
            parse_flexible_date("03-03-2025"),
            NaiveDate::from_ymd_opt(2025, 3, 3)
        );
        assert_eq!(parse_flexible_date("03.03.2025"), None);
    }

    #[test]
    fn test_truthy_values() {
        for v in ["TRUE", "true", "YES", "1", "是"] {
            assert!(is_truthy(v), "{v} 應為真值");
        }
        assert!(!is_truthy("FALSE"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn test_outcome_message() {
        let outcome = ImportOutcome {
            imported: 3,
            skipped: 1,
            errors: vec![],
        };
        assert_eq!(
            outcome.message(),
            "CSV 匯入完成！成功匯入 3 個假期，跳過 1 個已存在的假期"
        );
    }
}
