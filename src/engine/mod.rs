// ==========================================
// MES 報表與分析子系統 - 引擎層
// ==========================================
// 職責: 報表/同步/分析/評分的業務邏輯，倉儲之上、介面之下
// 紅線: 引擎不拼 SQL，資料存取一律經倉儲
// ==========================================

pub mod analyzer;
pub mod calendar;
pub mod collector;
pub mod data_sync;
pub mod executor;
pub mod maintenance;
pub mod score_period;
pub mod scoring;
pub mod trigger;

pub use analyzer::{AnalyzeOutcome, BatchOutcome, WorkOrderAnalyzer};
pub use calendar::WorkdayCalendar;
pub use collector::{DataCollector, ReportDataset};
pub use data_sync::{DataSynchronizer, SyncOutcome};
pub use executor::{ExecutionResult, UnifiedReportExecutor};
pub use score_period::{PeriodScoreOutcome, PeriodSummary, ScorePeriodService};
pub use scoring::{CapacityScoringService, ScoreInput, ScoreOutcome, SupervisorReview};
pub use trigger::TriggerEvaluator;
