// ==========================================
// MES 報表與分析子系統 - 資料倉儲層
// ==========================================
// 紅線: Repository 不含業務邏輯
// 職責: 提供資料存取介面，隔離資料庫細節
// 約束: 所有查詢使用參數化，防止 SQL 注入
// ==========================================

pub mod analysis_repo;
pub mod calendar_repo;
pub mod error;
pub mod mail_config_repo;
pub mod report_data_repo;
pub mod schedule_repo;
pub mod score_repo;
pub mod source_repo;

// 重導出核心倉儲
pub use analysis_repo::AnalysisRepository;
pub use calendar_repo::CalendarRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use mail_config_repo::MailConfigRepository;
pub use report_data_repo::ReportDataRepository;
pub use schedule_repo::ScheduleRepository;
pub use score_repo::ScoreRepository;
pub use source_repo::SourceRepository;
