// ==========================================
// MES 報表與分析子系統 - 資料收集與彙總
// ==========================================
// 職責: 按日期範圍與公司查詢統一報表表，產出五種統計形狀
// 約定: 效率 = (良品 + 不良品) / 時數，單位為件/小時，不是百分比
// 約定: 分組鍵缺失時以「未指定」呈現
// ==========================================

use crate::domain::report_data::WorkOrderReportData;
use crate::repository::report_data_repo::ReportDataRepository;
use crate::repository::RepositoryResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::instrument;

/// 分組鍵缺失時的呈現字面值
pub const UNSPECIFIED: &str = "未指定";

/// 彙總摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_records: usize,
    pub normal_hours: f64,
    pub overtime_hours: f64,
    pub total_work_hours: f64,
    /// 相異作業員名稱數
    pub operator_count: usize,
    /// 以相異工單數近似（統一表無設備欄位）
    pub equipment_count: usize,
    pub defect_quantity: i64,
}

/// 按公司統計
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyStat {
    pub company_name: String,
    pub record_count: usize,
    pub normal_hours: f64,
    pub overtime_hours: f64,
    pub total_hours: f64,
    pub operator_count: usize,
    pub equipment_count: usize,
}

/// 按工序統計
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStat {
    pub process_name: String,
    pub record_count: usize,
    pub normal_hours: f64,
    pub overtime_hours: f64,
    pub total_hours: f64,
    pub work_quantity: i64,
    pub defect_quantity: i64,
    /// (work_quantity + defect_quantity) / total_hours，件/小時
    pub efficiency: f64,
    pub operator_count: usize,
}

/// 按作業員統計
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorStat {
    pub operator_name: String,
    pub record_count: usize,
    pub normal_hours: f64,
    pub overtime_hours: f64,
    pub total_hours: f64,
    pub work_quantity: i64,
    pub defect_quantity: i64,
    pub efficiency: f64,
    pub equipment_count: usize,
}

/// 明細列（試算表詳細資料頁投影）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRow {
    pub company_name: String,
    pub operator_name: String,
    pub workorder_id: String,
    pub product_code: String,
    pub process_name: String,
    pub work_date: String,
    pub start_time: String,
    pub end_time: String,
    pub work_hours: f64,
    pub overtime_hours: f64,
    pub work_quantity: i64,
    pub defect_quantity: i64,
}

/// 收集結果資料集
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDataset {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub company: Option<String>,
    pub summary: Summary,
    pub company_stats: Vec<CompanyStat>,
    pub process_stats: Vec<ProcessStat>,
    pub operator_stats: Vec<OperatorStat>,
    pub detailed_data: Vec<DetailRow>,
}

impl ReportDataset {
    pub fn is_empty(&self) -> bool {
        self.summary.total_records == 0
    }
}

// 分組彙總的中間累加器
#[derive(Default)]
struct GroupAcc {
    record_count: usize,
    normal_hours: f64,
    overtime_hours: f64,
    work_quantity: i64,
    defect_quantity: i64,
    operators: std::collections::BTreeSet<String>,
    workorders: std::collections::BTreeSet<String>,
}

impl GroupAcc {
    fn add(&mut self, r: &WorkOrderReportData) {
        self.record_count += 1;
        self.normal_hours += r.work_hours;
        self.overtime_hours += r.overtime_hours;
        self.work_quantity += r.work_quantity;
        self.defect_quantity += r.defect_quantity;
        self.operators.insert(r.operator_name.clone());
        self.workorders.insert(r.workorder_id.clone());
    }

    fn total_hours(&self) -> f64 {
        self.normal_hours + self.overtime_hours
    }

    /// 件/小時；時數非正時為 0
    fn efficiency(&self) -> f64 {
        let hours = self.total_hours();
        if hours > 0.0 {
            (self.work_quantity + self.defect_quantity) as f64 / hours
        } else {
            0.0
        }
    }
}

fn key_or_unspecified(value: Option<&str>) -> String {
    match value {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => UNSPECIFIED.to_string(),
    }
}

// ==========================================
// DataCollector - 資料收集器
// ==========================================

/// 資料收集器
///
/// 只消費倉儲回傳的記錄列表，彙總全部在記憶體完成。
pub struct DataCollector {
    report_data_repo: ReportDataRepository,
}

impl DataCollector {
    pub fn new(report_data_repo: ReportDataRepository) -> Self {
        Self { report_data_repo }
    }

    /// 收集日期範圍內的報表資料集
    ///
    /// # 參數
    /// - company: None 表示不過濾公司（哨兵 ALL 由呼叫方轉換）
    #[instrument(skip(self))]
    pub fn collect(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        company: Option<&str>,
    ) -> RepositoryResult<ReportDataset> {
        let records = self
            .report_data_repo
            .find_by_date_range(start_date, end_date, company)?;

        Ok(Self::aggregate(start_date, end_date, company, &records))
    }

    /// 純記憶體彙總（可離庫測試）
    pub fn aggregate(
        start_date: NaiveDate,
        end_date: NaiveDate,
        company: Option<&str>,
        records: &[WorkOrderReportData],
    ) -> ReportDataset {
        let mut operators = std::collections::BTreeSet::new();
        let mut workorders = std::collections::BTreeSet::new();
        let mut normal_hours = 0.0;
        let mut overtime_hours = 0.0;
        let mut defect_quantity = 0i64;

        let mut by_company: BTreeMap<String, GroupAcc> = BTreeMap::new();
        let mut by_process: BTreeMap<String, GroupAcc> = BTreeMap::new();
        let mut by_operator: BTreeMap<String, GroupAcc> = BTreeMap::new();
        let mut detailed_data = Vec::with_capacity(records.len());

        for r in records {
            normal_hours += r.work_hours;
            overtime_hours += r.overtime_hours;
            defect_quantity += r.defect_quantity;
            operators.insert(r.operator_name.clone());
            workorders.insert(r.workorder_id.clone());

            by_company
                .entry(key_or_unspecified(Some(&r.company)))
                .or_default()
                .add(r);
            by_process
                .entry(key_or_unspecified(r.process_name.as_deref()))
                .or_default()
                .add(r);
            by_operator
                .entry(key_or_unspecified(Some(&r.operator_name)))
                .or_default()
                .add(r);

            detailed_data.push(DetailRow {
                company_name: key_or_unspecified(Some(&r.company)),
                operator_name: key_or_unspecified(Some(&r.operator_name)),
                workorder_id: r.workorder_id.clone(),
                product_code: r.product_code.clone().unwrap_or_default(),
                process_name: key_or_unspecified(r.process_name.as_deref()),
                work_date: r.work_date.format("%Y-%m-%d").to_string(),
                start_time: r.start_time.clone(),
                end_time: r.end_time.clone().unwrap_or_default(),
                work_hours: r.work_hours,
                overtime_hours: r.overtime_hours,
                work_quantity: r.work_quantity,
                defect_quantity: r.defect_quantity,
            });
        }

        let summary = Summary {
            total_records: records.len(),
            normal_hours,
            overtime_hours,
            total_work_hours: normal_hours + overtime_hours,
            operator_count: operators.iter().filter(|s| !s.is_empty()).count(),
            equipment_count: workorders.len(),
            defect_quantity,
        };

        // 全部分組按正常時數遞減，同分按鍵名排序
        let company_stats = sorted_groups(by_company)
            .into_iter()
            .map(|(name, acc)| CompanyStat {
                company_name: name,
                record_count: acc.record_count,
                normal_hours: acc.normal_hours,
                overtime_hours: acc.overtime_hours,
                total_hours: acc.total_hours(),
                operator_count: acc.operators.iter().filter(|s| !s.is_empty()).count(),
                equipment_count: acc.workorders.len(),
            })
            .collect();

        let process_stats = sorted_groups(by_process)
            .into_iter()
            .map(|(name, acc)| ProcessStat {
                process_name: name,
                record_count: acc.record_count,
                normal_hours: acc.normal_hours,
                overtime_hours: acc.overtime_hours,
                total_hours: acc.total_hours(),
                work_quantity: acc.work_quantity,
                defect_quantity: acc.defect_quantity,
                efficiency: acc.efficiency(),
                operator_count: acc.operators.iter().filter(|s| !s.is_empty()).count(),
            })
            .collect();

        let operator_stats = sorted_groups(by_operator)
            .into_iter()
            .map(|(name, acc)| OperatorStat {
                operator_name: name,
                record_count: acc.record_count,
                normal_hours: acc.normal_hours,
                overtime_hours: acc.overtime_hours,
                total_hours: acc.total_hours(),
                work_quantity: acc.work_quantity,
                defect_quantity: acc.defect_quantity,
                efficiency: acc.efficiency(),
                equipment_count: acc.workorders.len(),
            })
            .collect();

        ReportDataset {
            start_date,
            end_date,
            company: company.map(|s| s.to_string()),
            summary,
            company_stats,
            process_stats,
            operator_stats,
            detailed_data,
        }
    }
}

/// 正常時數遞減排序；同分以鍵名字典序
fn sorted_groups(groups: BTreeMap<String, GroupAcc>) -> Vec<(String, GroupAcc)> {
    let mut entries: Vec<_> = groups.into_iter().collect();
    entries.sort_by(|(ka, a), (kb, b)| {
        b.normal_hours
            .partial_cmp(&a.normal_hours)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| ka.cmp(kb))
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        company: &str,
        operator: &str,
        workorder: &str,
        process: Option<&str>,
        hours: f64,
        quantity: i64,
        defect: i64,
    ) -> WorkOrderReportData {
        WorkOrderReportData {
            id: None,
            workorder_id: workorder.to_string(),
            company: company.to_string(),
            operator_name: operator.to_string(),
            product_code: Some("P1".to_string()),
            process_name: process.map(|s| s.to_string()),
            work_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            start_time: "08:00".to_string(),
            end_time: Some("17:00".to_string()),
            work_week: 0,
            work_month: 0,
            work_quarter: 0,
            work_year: 0,
            work_hours: hours,
            overtime_hours: 0.0,
            work_quantity: quantity,
            defect_quantity: defect,
            created_at: None,
            updated_at: None,
        }
    }

    fn aggregate(records: &[WorkOrderReportData]) -> ReportDataset {
        let d = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        DataCollector::aggregate(d, d, None, records)
    }

    #[test]
    fn test_summary_counts() {
        let records = vec![
            record("C1", "OP1", "WO1", Some("SMT"), 8.0, 100, 2),
            record("C1", "OP2", "WO2", Some("DIP"), 6.0, 50, 1),
        ];
        let ds = aggregate(&records);
        assert_eq!(ds.summary.total_records, 2);
        assert_eq!(ds.summary.operator_count, 2);
        assert_eq!(ds.summary.equipment_count, 2);
        assert_eq!(ds.summary.defect_quantity, 3);
        assert!((ds.summary.total_work_hours - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_process_renders_unspecified() {
        let records = vec![record("C1", "OP1", "WO1", None, 8.0, 100, 0)];
        let ds = aggregate(&records);
        assert_eq!(ds.process_stats[0].process_name, UNSPECIFIED);
        assert_eq!(ds.detailed_data[0].process_name, UNSPECIFIED);
    }

    #[test]
    fn test_efficiency_units_per_hour() {
        // (100 + 2) / 8 = 12.75 件/小時
        let records = vec![record("C1", "OP1", "WO1", Some("SMT"), 8.0, 100, 2)];
        let ds = aggregate(&records);
        assert!((ds.process_stats[0].efficiency - 12.75).abs() < 1e-9);
    }

    #[test]
    fn test_ordering_by_normal_hours_desc() {
        let records = vec![
            record("C1", "OP1", "WO1", Some("A工序"), 2.0, 10, 0),
            record("C1", "OP2", "WO2", Some("B工序"), 8.0, 10, 0),
            record("C1", "OP3", "WO3", Some("C工序"), 8.0, 10, 0),
        ];
        let ds = aggregate(&records);
        let names: Vec<_> = ds.process_stats.iter().map(|p| p.process_name.as_str()).collect();
        // 同為 8 小時的 B/C 按字典序
        assert_eq!(names, vec!["B工序", "C工序", "A工序"]);
    }

    #[test]
    fn test_empty_dataset() {
        let ds = aggregate(&[]);
        assert!(ds.is_empty());
        assert!(ds.company_stats.is_empty());
    }
}
