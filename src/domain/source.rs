// ==========================================
// MES 報表與分析子系統 - 上游資料契約
// ==========================================
// 職責: 唯讀的上游 MES 實體投影（填報/現場報工/完工工單/標準產能/郵件配置）
// 紅線: 本子系統對這些表只讀不寫
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 填報記錄（作業員工時單）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillWork {
    pub id: i64,
    pub workorder: Option<String>,
    pub company_name: Option<String>,
    pub operator: Option<String>,
    pub product_id: Option<String>,
    pub operation: Option<String>,
    pub process_name: Option<String>,
    pub work_date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub work_hours_calculated: f64,
    pub overtime_hours_calculated: f64,
    pub work_quantity: i64,
    pub defect_quantity: i64,
    pub approval_status: String,
}

impl FillWork {
    /// 核准狀態字面值（同步管線只取這個狀態）
    pub const APPROVED: &'static str = "approved";

    pub fn is_approved(&self) -> bool {
        self.approval_status == Self::APPROVED
    }

    /// 工序名稱，operation 缺失時退回 process_name
    pub fn effective_process(&self) -> Option<&str> {
        self.operation
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.process_name.as_deref())
    }
}

/// 現場報工記錄
///
/// 分析與評分引擎讀取；同步管線目前不納入（規劃中的第二來源）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnsiteReport {
    pub id: i64,
    pub workorder: Option<String>,
    pub company_name: Option<String>,
    pub operator: Option<String>,
    pub product_id: Option<String>,
    pub process_name: Option<String>,
    pub work_date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub work_hours_calculated: f64,
    pub overtime_hours_calculated: f64,
    pub work_quantity: i64,
    pub defect_quantity: i64,
}

/// 已完工工單表頭
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedWorkOrder {
    pub id: i64,
    pub order_number: String,
    pub company_code: String,
    pub company_name: Option<String>,
    pub product_code: Option<String>,
    pub product_name: Option<String>,
    pub completed_quantity: i64,
}

/// 產品工序標準產能
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardCapacity {
    pub company_code: String,
    pub product_code: String,
    pub process_name: String,
    pub standard_capacity_per_hour: f64,
}

/// 郵件伺服器配置（單列）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub use_tls: bool,
    pub default_from: String,
}
