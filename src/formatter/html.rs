// ==========================================
// MES 報表與分析子系統 - HTML 渲染
// ==========================================
// 職責: 單檔自足的 HTML 報表（行內 CSS，郵件內文可直接附帶）
// ==========================================

use super::ReportContext;
use crate::engine::collector::ReportDataset;
use std::fmt::Write as _;

const STYLE: &str = r#"
    body { font-family: 'Microsoft JhengHei', 'PingFang TC', sans-serif; margin: 0; padding: 20px; background-color: #f5f5f5; color: #333; }
    .container { max-width: 1200px; margin: 0 auto; background: #fff; padding: 30px; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); }
    .report-header { border-bottom: 2px solid #007bff; padding-bottom: 15px; margin-bottom: 25px; }
    .report-header h1 { margin: 0 0 10px 0; font-size: 24px; }
    .report-meta { color: #666; font-size: 14px; }
    .summary-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(150px, 1fr)); gap: 15px; margin-bottom: 30px; }
    .summary-card { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: #fff; padding: 18px; border-radius: 8px; text-align: center; }
    .summary-card .value { font-size: 26px; font-weight: bold; }
    .summary-card .label { font-size: 13px; margin-top: 6px; opacity: 0.9; }
    .section { margin-bottom: 30px; }
    .section h3 { border-left: 4px solid #007bff; padding-left: 10px; margin-bottom: 15px; }
    table { width: 100%; border-collapse: collapse; font-size: 14px; }
    th { background-color: #4472C4; color: #fff; padding: 8px 10px; text-align: center; }
    td { padding: 8px 10px; border-bottom: 1px solid #e0e0e0; text-align: center; }
    tr:nth-child(even) { background-color: #f8f9fa; }
    .report-footer { margin-top: 30px; padding-top: 15px; border-top: 1px solid #e0e0e0; color: #999; font-size: 13px; text-align: center; }
"#;

/// 渲染完整 HTML 文件
pub fn render(context: &ReportContext<'_>) -> String {
    let dataset = context.dataset;
    let mut out = String::with_capacity(16 * 1024);

    out.push_str("<!DOCTYPE html>\n<html lang=\"zh-TW\">\n<head>\n<meta charset=\"UTF-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape(context.title));
    let _ = writeln!(out, "<style>{STYLE}</style>");
    out.push_str("</head>\n<body>\n<div class=\"container\">\n");

    render_header(&mut out, context);
    render_summary(&mut out, dataset);
    render_company_section(&mut out, dataset);
    render_process_section(&mut out, dataset);
    render_operator_section(&mut out, dataset);
    render_detail_section(&mut out, dataset);

    out.push_str("<div class=\"report-footer\">此報表由 MES 系統自動生成</div>\n");
    out.push_str("</div>\n</body>\n</html>\n");
    out
}

fn render_header(out: &mut String, context: &ReportContext<'_>) {
    let dataset = context.dataset;
    out.push_str("<div class=\"report-header\">\n");
    let _ = writeln!(out, "<h1>📊 {}</h1>", escape(context.title));
    let _ = writeln!(
        out,
        "<div class=\"report-meta\">生成時間：{} | 排程名稱：{} | 資料期間：{} 至 {}</div>",
        context.generated_at.format("%Y-%m-%d %H:%M:%S"),
        escape(context.schedule_name),
        dataset.start_date.format("%Y-%m-%d"),
        dataset.end_date.format("%Y-%m-%d"),
    );
    out.push_str("</div>\n");
}

fn render_summary(out: &mut String, dataset: &ReportDataset) {
    let s = &dataset.summary;
    // 平均每日以一週七天計
    let avg_daily = s.total_work_hours / 7.0;
    let tiles: [(String, &str); 7] = [
        (s.total_records.to_string(), "總記錄數"),
        (format!("{:.2}", s.normal_hours), "正常時數"),
        (format!("{:.2}", s.overtime_hours), "加班時數"),
        (format!("{:.2}", s.total_work_hours), "總工作時數"),
        (s.operator_count.to_string(), "參與作業員數"),
        (s.equipment_count.to_string(), "使用設備數"),
        (format!("{avg_daily:.2}"), "平均每日工作時數"),
    ];

    out.push_str("<div class=\"summary-grid\">\n");
    for (value, label) in tiles {
        let _ = writeln!(
            out,
            "<div class=\"summary-card\"><div class=\"value\">{value}</div><div class=\"label\">{label}</div></div>"
        );
    }
    out.push_str("</div>\n");
}

fn render_company_section(out: &mut String, dataset: &ReportDataset) {
    out.push_str("<div class=\"section\">\n<h3>🏢 按公司統計</h3>\n");
    if dataset.company_stats.is_empty() {
        out.push_str("<p>無資料</p>\n");
    } else {
        out.push_str("<table>\n<tr><th>公司名稱</th><th>記錄數</th><th>正常時數</th><th>加班時數</th><th>總時數</th><th>作業員數</th><th>設備數</th></tr>\n");
        for row in &dataset.company_stats {
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{}</td><td>{}</td></tr>",
                escape(&row.company_name),
                row.record_count,
                row.normal_hours,
                row.overtime_hours,
                row.total_hours,
                row.operator_count,
                row.equipment_count,
            );
        }
        out.push_str("</table>\n");
    }
    out.push_str("</div>\n");
}

fn render_process_section(out: &mut String, dataset: &ReportDataset) {
    out.push_str("<div class=\"section\">\n<h3>⚙️ 按工序統計</h3>\n");
    if dataset.process_stats.is_empty() {
        out.push_str("<p>無資料</p>\n");
    } else {
        out.push_str("<table>\n<tr><th>工序名稱</th><th>記錄數</th><th>正常時數</th><th>加班時數</th><th>總時數</th><th>工作數量</th><th>不良品數量</th><th>平均效率</th><th>作業員數</th></tr>\n");
        for row in &dataset.process_stats {
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td></tr>",
                escape(&row.process_name),
                row.record_count,
                row.normal_hours,
                row.overtime_hours,
                row.total_hours,
                row.work_quantity,
                row.defect_quantity,
                row.efficiency,
                row.operator_count,
            );
        }
        out.push_str("</table>\n");
    }
    out.push_str("</div>\n");
}

fn render_operator_section(out: &mut String, dataset: &ReportDataset) {
    out.push_str("<div class=\"section\">\n<h3>👥 按作業員統計</h3>\n");
    if dataset.operator_stats.is_empty() {
        out.push_str("<p>無資料</p>\n");
    } else {
        out.push_str("<table>\n<tr><th>作業員</th><th>記錄數</th><th>正常時數</th><th>加班時數</th><th>總時數</th><th>工作數量</th><th>不良品數量</th><th>平均效率</th><th>設備數</th></tr>\n");
        for row in &dataset.operator_stats {
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td></tr>",
                escape(&row.operator_name),
                row.record_count,
                row.normal_hours,
                row.overtime_hours,
                row.total_hours,
                row.work_quantity,
                row.defect_quantity,
                row.efficiency,
                row.equipment_count,
            );
        }
        out.push_str("</table>\n");
    }
    out.push_str("</div>\n");
}

fn render_detail_section(out: &mut String, dataset: &ReportDataset) {
    out.push_str("<div class=\"section\">\n<h3>📋 詳細資料</h3>\n");
    if dataset.detailed_data.is_empty() {
        out.push_str("<p>無資料</p>\n");
    } else {
        out.push_str("<table>\n<tr><th>公司名稱</th><th>作業員</th><th>工單編號</th><th>產品編號</th><th>工序名稱</th><th>日期</th><th>開始時間</th><th>結束時間</th><th>正常時數</th><th>加班時數</th><th>工作數量</th><th>不良品數量</th></tr>\n");
        for row in &dataset.detailed_data {
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{}</td><td>{}</td></tr>",
                escape(&row.company_name),
                escape(&row.operator_name),
                escape(&row.workorder_id),
                escape(&row.product_code),
                escape(&row.process_name),
                row.work_date,
                escape(&row.start_time),
                escape(&row.end_time),
                row.work_hours,
                row.overtime_hours,
                row.work_quantity,
                row.defect_quantity,
            );
        }
        out.push_str("</table>\n");
    }
    out.push_str("</div>\n");
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::collector::DataCollector;
    use chrono::NaiveDate;

    #[test]
    fn test_empty_dataset_renders_placeholders() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let dataset = DataCollector::aggregate(d, d, None, &[]);
        let context = ReportContext {
            title: "前一個工作日報表 (2025-03-03)",
            schedule_name: "每日報表",
            generated_at: d.and_hms_opt(10, 30, 0).unwrap(),
            dataset: &dataset,
        };
        let html = render(&context);
        assert!(html.contains("lang=\"zh-TW\""));
        assert!(html.contains("📊 前一個工作日報表 (2025-03-03)"));
        assert_eq!(html.matches("<p>無資料</p>").count(), 4);
        assert!(html.contains("此報表由 MES 系統自動生成"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("A<B>&\"C\""), "A&lt;B&gt;&amp;&quot;C&quot;");
    }
}
