// ==========================================
// MES 報表與分析子系統 - 領域類型定義
// ==========================================
// 紅線: 報表類型是帶標籤的和類型，引擎內不得出現字串分派
// 序列化格式: snake_case（與資料庫一致）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 報表類型 (Report Type)
// ==========================================
// 每個變體對應一種覆蓋區間計算與觸發規則
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    PreviousWorkday, // 前一個工作日
    PreviousWeek,    // 上週（週一至週日）
    PreviousMonth,   // 上月
    PreviousQuarter, // 上季
    PreviousYear,    // 去年
    DataSync,        // 資料同步（不產生報表區間）
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::PreviousWorkday => "previous_workday",
            ReportType::PreviousWeek => "previous_week",
            ReportType::PreviousMonth => "previous_month",
            ReportType::PreviousQuarter => "previous_quarter",
            ReportType::PreviousYear => "previous_year",
            ReportType::DataSync => "data_sync",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "previous_workday" => Some(ReportType::PreviousWorkday),
            "previous_week" => Some(ReportType::PreviousWeek),
            "previous_month" => Some(ReportType::PreviousMonth),
            "previous_quarter" => Some(ReportType::PreviousQuarter),
            "previous_year" => Some(ReportType::PreviousYear),
            "data_sync" => Some(ReportType::DataSync),
            _ => None,
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 輸出格式 (File Format)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Html,
    Excel,
    Both,
}

impl FileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Html => "html",
            FileFormat::Excel => "excel",
            FileFormat::Both => "both",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "html" => Some(FileFormat::Html),
            "excel" => Some(FileFormat::Excel),
            "both" => Some(FileFormat::Both),
            _ => None,
        }
    }

    /// 是否需要產出 HTML 檔
    pub fn wants_html(&self) -> bool {
        matches!(self, FileFormat::Html | FileFormat::Both)
    }

    /// 是否需要產出 Excel 檔
    pub fn wants_excel(&self) -> bool {
        matches!(self, FileFormat::Excel | FileFormat::Both)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 排程狀態 (Schedule Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Active,
    Inactive,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Active => "active",
            ScheduleStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ScheduleStatus::Active),
            "inactive" => Some(ScheduleStatus::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 同步觸發模式 (Sync Mode)
// ==========================================
// data_sync 排程二選一：固定間隔 或 每日固定時刻
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// 每 N 分鐘一次
    Interval(i64),
    /// 每日 HH:MM 觸發
    FixedTime(chrono::NaiveTime),
}

// ==========================================
// 執行狀態 (Execution Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(ExecutionStatus::Success),
            "failed" => Some(ExecutionStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 評分期間 (Score Period)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorePeriod {
    Monthly,
    Quarterly,
    Yearly,
}

impl ScorePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScorePeriod::Monthly => "monthly",
            ScorePeriod::Quarterly => "quarterly",
            ScorePeriod::Yearly => "yearly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monthly" => Some(ScorePeriod::Monthly),
            "quarterly" => Some(ScorePeriod::Quarterly),
            "yearly" => Some(ScorePeriod::Yearly),
            _ => None,
        }
    }
}

impl fmt::Display for ScorePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 評分等級 (Grade)
// ==========================================
// 分數門檻: A≥90, B≥80, C≥70, 其餘 D
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A, // 優秀
    B, // 良好
    C, // 及格
    D, // 不及格
}

impl Grade {
    /// 由分數判定等級
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Grade::A
        } else if score >= 80.0 {
            Grade::B
        } else if score >= 70.0 {
            Grade::C
        } else {
            Grade::D
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
    }

    /// 中文等級名稱（報表顯示用）
    pub fn label(&self) -> &'static str {
        match self {
            Grade::A => "優秀",
            Grade::B => "良好",
            Grade::C => "及格",
            Grade::D => "不及格",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A" => Some(Grade::A),
            "B" => Some(Grade::B),
            "C" => Some(Grade::C),
            "D" => Some(Grade::D),
            _ => None,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 行事曆事件類型 (Calendar Event Type)
// ==========================================
// workday 事件優先於 holiday 事件，兩者都優先於週末預設
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarEventType {
    Workday,
    Holiday,
}

impl CalendarEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarEventType::Workday => "workday",
            CalendarEventType::Holiday => "holiday",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "workday" => Some(CalendarEventType::Workday),
            "holiday" => Some(CalendarEventType::Holiday),
            _ => None,
        }
    }
}

impl fmt::Display for CalendarEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
