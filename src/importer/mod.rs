// ==========================================
// MES 報表與分析子系統 - 匯入層
// ==========================================
// 職責: 外部資料匯入（目前僅假期 CSV）
// ==========================================

pub mod holiday_csv;

pub use holiday_csv::{
    generate_sample_csv, HolidayCsvImporter, ImportError, ImportOutcome, ImportResult,
    ParsedHoliday,
};
