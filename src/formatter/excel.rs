// ==========================================
// MES 報表與分析子系統 - Excel 渲染
// ==========================================
// 職責: 多工作表試算表（統計摘要恆在，其餘分頁僅在有資料時建立）
// ==========================================

use super::ReportContext;
use crate::engine::collector::ReportDataset;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, XlsxError};

const HEADER_FILL: Color = Color::RGB(0x4472C4);
const FONT_NAME: &str = "微軟正黑體";

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_font_name(FONT_NAME)
        .set_font_color(Color::White)
        .set_background_color(HEADER_FILL)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
}

fn text_format() -> Format {
    Format::new().set_font_name(FONT_NAME)
}

fn number_format() -> Format {
    Format::new().set_font_name(FONT_NAME).set_num_format("0.00")
}

/// 建立完整工作簿（呼叫方負責 save）
pub fn build_workbook(context: &ReportContext<'_>) -> Result<Workbook, XlsxError> {
    let dataset = context.dataset;
    let mut workbook = Workbook::new();

    write_summary_sheet(&mut workbook, context)?;
    if !dataset.company_stats.is_empty() {
        write_company_sheet(&mut workbook, dataset)?;
    }
    if !dataset.process_stats.is_empty() {
        write_process_sheet(&mut workbook, dataset)?;
    }
    if !dataset.operator_stats.is_empty() {
        write_operator_sheet(&mut workbook, dataset)?;
    }
    if !dataset.detailed_data.is_empty() {
        write_detail_sheet(&mut workbook, dataset)?;
    }

    Ok(workbook)
}

fn write_summary_sheet(
    workbook: &mut Workbook,
    context: &ReportContext<'_>,
) -> Result<(), XlsxError> {
    let dataset = context.dataset;
    let s = &dataset.summary;
    let header = header_format();
    let text = text_format();
    let number = number_format();

    let sheet = workbook.add_worksheet();
    sheet.set_name("統計摘要")?;
    sheet.set_column_width(0, 24)?;
    sheet.set_column_width(1, 28)?;

    sheet.write_string_with_format(0, 0, "項目", &header)?;
    sheet.write_string_with_format(0, 1, "數值", &header)?;

    sheet.write_string_with_format(1, 0, "報表標題", &text)?;
    sheet.write_string_with_format(1, 1, context.title, &text)?;
    sheet.write_string_with_format(2, 0, "排程名稱", &text)?;
    sheet.write_string_with_format(2, 1, context.schedule_name, &text)?;
    sheet.write_string_with_format(3, 0, "生成時間", &text)?;
    sheet.write_string_with_format(
        3,
        1,
        &context.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        &text,
    )?;
    sheet.write_string_with_format(4, 0, "資料期間", &text)?;
    sheet.write_string_with_format(
        4,
        1,
        &format!(
            "{} 至 {}",
            dataset.start_date.format("%Y-%m-%d"),
            dataset.end_date.format("%Y-%m-%d")
        ),
        &text,
    )?;

    let stats: [(&str, f64, bool); 7] = [
        ("總記錄數", s.total_records as f64, false),
        ("正常時數", s.normal_hours, true),
        ("加班時數", s.overtime_hours, true),
        ("總工作時數", s.total_work_hours, true),
        ("參與作業員數", s.operator_count as f64, false),
        ("使用設備數", s.equipment_count as f64, false),
        ("平均每日工作時數", s.total_work_hours / 7.0, true),
    ];
    for (i, (label, value, decimal)) in stats.iter().enumerate() {
        let row = 5 + i as u32;
        sheet.write_string_with_format(row, 0, *label, &text)?;
        if *decimal {
            sheet.write_number_with_format(row, 1, *value, &number)?;
        } else {
            sheet.write_number_with_format(row, 1, *value, &text)?;
        }
    }
    Ok(())
}

fn write_company_sheet(workbook: &mut Workbook, dataset: &ReportDataset) -> Result<(), XlsxError> {
    let header = header_format();
    let text = text_format();
    let number = number_format();

    let sheet = workbook.add_worksheet();
    sheet.set_name("按公司統計")?;
    for (col, width) in [15.0, 10.0, 12.0, 12.0, 12.0, 10.0, 10.0].into_iter().enumerate() {
        sheet.set_column_width(col as u16, width)?;
    }

    let headers = ["公司名稱", "記錄數", "正常時數", "加班時數", "總時數", "作業員數", "設備數"];
    for (col, title) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    for (i, row) in dataset.company_stats.iter().enumerate() {
        let r = 1 + i as u32;
        sheet.write_string_with_format(r, 0, &row.company_name, &text)?;
        sheet.write_number_with_format(r, 1, row.record_count as f64, &text)?;
        sheet.write_number_with_format(r, 2, row.normal_hours, &number)?;
        sheet.write_number_with_format(r, 3, row.overtime_hours, &number)?;
        sheet.write_number_with_format(r, 4, row.total_hours, &number)?;
        sheet.write_number_with_format(r, 5, row.operator_count as f64, &text)?;
        sheet.write_number_with_format(r, 6, row.equipment_count as f64, &text)?;
    }
    Ok(())
}

fn write_process_sheet(workbook: &mut Workbook, dataset: &ReportDataset) -> Result<(), XlsxError> {
    let header = header_format();
    let text = text_format();
    let number = number_format();

    let sheet = workbook.add_worksheet();
    sheet.set_name("按工序統計")?;
    for (col, width) in [15.0, 10.0, 12.0, 12.0, 12.0, 12.0, 12.0, 10.0].into_iter().enumerate() {
        sheet.set_column_width(col as u16, width)?;
    }

    let headers = [
        "工序名稱", "記錄數", "正常時數", "加班時數", "總時數",
        "工作數量", "不良品數量", "平均效率", "作業員數",
    ];
    for (col, title) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    for (i, row) in dataset.process_stats.iter().enumerate() {
        let r = 1 + i as u32;
        sheet.write_string_with_format(r, 0, &row.process_name, &text)?;
        sheet.write_number_with_format(r, 1, row.record_count as f64, &text)?;
        sheet.write_number_with_format(r, 2, row.normal_hours, &number)?;
        sheet.write_number_with_format(r, 3, row.overtime_hours, &number)?;
        sheet.write_number_with_format(r, 4, row.total_hours, &number)?;
        sheet.write_number_with_format(r, 5, row.work_quantity as f64, &text)?;
        sheet.write_number_with_format(r, 6, row.defect_quantity as f64, &text)?;
        sheet.write_number_with_format(r, 7, row.efficiency, &number)?;
        sheet.write_number_with_format(r, 8, row.operator_count as f64, &text)?;
    }
    Ok(())
}

fn write_operator_sheet(workbook: &mut Workbook, dataset: &ReportDataset) -> Result<(), XlsxError> {
    let header = header_format();
    let text = text_format();
    let number = number_format();

    let sheet = workbook.add_worksheet();
    sheet.set_name("按作業員統計")?;
    for (col, width) in [15.0, 10.0, 12.0, 12.0, 12.0, 12.0, 12.0, 10.0].into_iter().enumerate() {
        sheet.set_column_width(col as u16, width)?;
    }

    let headers = [
        "作業員", "記錄數", "正常時數", "加班時數", "總時數",
        "工作數量", "不良品數量", "平均效率", "設備數",
    ];
    for (col, title) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    for (i, row) in dataset.operator_stats.iter().enumerate() {
        let r = 1 + i as u32;
        sheet.write_string_with_format(r, 0, &row.operator_name, &text)?;
        sheet.write_number_with_format(r, 1, row.record_count as f64, &text)?;
        sheet.write_number_with_format(r, 2, row.normal_hours, &number)?;
        sheet.write_number_with_format(r, 3, row.overtime_hours, &number)?;
        sheet.write_number_with_format(r, 4, row.total_hours, &number)?;
        sheet.write_number_with_format(r, 5, row.work_quantity as f64, &text)?;
        sheet.write_number_with_format(r, 6, row.defect_quantity as f64, &text)?;
        sheet.write_number_with_format(r, 7, row.efficiency, &number)?;
        sheet.write_number_with_format(r, 8, row.equipment_count as f64, &text)?;
    }
    Ok(())
}

fn write_detail_sheet(workbook: &mut Workbook, dataset: &ReportDataset) -> Result<(), XlsxError> {
    let header = header_format();
    let text = text_format();
    let number = number_format();

    let sheet = workbook.add_worksheet();
    sheet.set_name("詳細資料")?;
    let widths = [15.0, 12.0, 12.0, 12.0, 12.0, 10.0, 10.0, 12.0, 12.0, 12.0];
    for (col, width) in widths.into_iter().enumerate() {
        sheet.set_column_width(col as u16, width)?;
    }

    let headers = [
        "公司名稱", "作業員", "工單編號", "產品編號", "工序名稱", "日期",
        "開始時間", "結束時間", "正常時數", "加班時數", "工作數量", "不良品數量",
    ];
    for (col, title) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    for (i, row) in dataset.detailed_data.iter().enumerate() {
        let r = 1 + i as u32;
        sheet.write_string_with_format(r, 0, &row.company_name, &text)?;
        sheet.write_string_with_format(r, 1, &row.operator_name, &text)?;
        sheet.write_string_with_format(r, 2, &row.workorder_id, &text)?;
        sheet.write_string_with_format(r, 3, &row.product_code, &text)?;
        sheet.write_string_with_format(r, 4, &row.process_name, &text)?;
        sheet.write_string_with_format(r, 5, &row.work_date, &text)?;
        sheet.write_string_with_format(r, 6, &row.start_time, &text)?;
        sheet.write_string_with_format(r, 7, &row.end_time, &text)?;
        sheet.write_number_with_format(r, 8, row.work_hours, &number)?;
        sheet.write_number_with_format(r, 9, row.overtime_hours, &number)?;
        sheet.write_number_with_format(r, 10, row.work_quantity as f64, &text)?;
        sheet.write_number_with_format(r, 11, row.defect_quantity as f64, &text)?;
    }
    Ok(())
}
