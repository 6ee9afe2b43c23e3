// ==========================================
// MES 報表與分析子系統 - 領域模型層
// ==========================================
// 職責: 定義領域實體、類型、純計算規則
// 紅線: 不含資料存取邏輯，不含引擎邏輯
// ==========================================

pub mod analysis;
pub mod calendar;
pub mod report_data;
pub mod schedule;
pub mod score;
pub mod source;
pub mod types;

// 重導出核心類型
pub use analysis::{
    CompletedWorkOrderAnalysis, OperatorDetail, ProcessDetail, SampleRecord,
    EFFICIENCY_RATE_CAP, SAMPLE_RECORD_LIMIT,
};
pub use calendar::CalendarEvent;
pub use report_data::{TimeDimensions, WorkOrderReportData};
pub use schedule::{PeriodicTask, ReportExecutionLog, ReportSchedule};
pub use score::{
    OperatorProcessCapacityScore, DEFAULT_SUPERVISOR_SCORE, MAX_CAPACITY_PER_HOUR,
    MAX_CAPACITY_RATIO, MAX_EFFICIENCY_FACTOR, MAX_LEARNING_CURVE_FACTOR, MAX_SCORE,
};
pub use source::{CompletedWorkOrder, EmailConfig, FillWork, OnsiteReport, StandardCapacity};
pub use types::{
    CalendarEventType, ExecutionStatus, FileFormat, Grade, ReportType, ScheduleStatus,
    ScorePeriod, SyncMode,
};
