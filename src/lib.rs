// ==========================================
// MES 報表與分析子系統 - 核心庫
// ==========================================
// 技術棧: Rust + SQLite
// 系統定位: 排程報表 / 資料同步 / 工單分析 / 產能評分
// ==========================================

// ==========================================
// 模組宣告
// ==========================================

// 領域層 - 實體與類型
pub mod domain;

// 資料倉儲層 - 資料存取
pub mod repository;

// 引擎層 - 業務規則
pub mod engine;

// 報表輸出層 - HTML / Excel
pub mod formatter;

// 郵件發送層
pub mod mailer;

// 匯入層 - 外部資料
pub mod importer;

// 配置層 - 系統配置
pub mod config;

// 資料庫基礎設施（連線初始化/PRAGMA 統一）
pub mod db;

// 日誌系統
pub mod logging;

// ==========================================
// 重導出核心類型
// ==========================================

// 領域類型
pub use domain::types::{
    CalendarEventType, ExecutionStatus, FileFormat, Grade, ReportType, ScheduleStatus,
    ScorePeriod, SyncMode,
};

// 領域實體
pub use domain::{
    CalendarEvent, CompletedWorkOrderAnalysis, OperatorDetail, OperatorProcessCapacityScore,
    ProcessDetail, ReportExecutionLog, ReportSchedule, WorkOrderReportData,
};

// 引擎
pub use engine::{
    CapacityScoringService, DataCollector, DataSynchronizer, ScorePeriodService,
    TriggerEvaluator, UnifiedReportExecutor, WorkOrderAnalyzer, WorkdayCalendar,
};

// 配置
pub use config::AppConfig;

// ==========================================
// 常量定義
// ==========================================

// 系統版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系統名稱
pub const APP_NAME: &str = "MES 報表與分析子系統";

// ==========================================
// 預編譯檢查
// ==========================================
