// ==========================================
// MES 報表與分析子系統 - 報表格式化
// ==========================================
// 職責: 把彙總資料集渲染為 HTML / Excel 並落地到報表目錄
// 約定: 檔名 = 安全化標題 + 資料起始日（非產生日）
// ==========================================

pub mod excel;
pub mod html;

use crate::engine::collector::ReportDataset;
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument};

/// 格式化錯誤
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("報表目錄建立失敗: {0}")]
    Io(#[from] std::io::Error),

    #[error("Excel 產生失敗: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

pub type FormatResult<T> = Result<T, FormatError>;

/// 渲染輸入
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub title: &'a str,
    pub schedule_name: &'a str,
    pub generated_at: NaiveDateTime,
    pub dataset: &'a ReportDataset,
}

// ==========================================
// ReportFormatter - 報表格式化器
// ==========================================

/// 報表格式化器
///
/// 輸出目錄不存在時自動建立。
pub struct ReportFormatter {
    reports_dir: PathBuf,
}

impl ReportFormatter {
    pub fn new(reports_dir: PathBuf) -> Self {
        Self { reports_dir }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// 渲染並寫出 HTML 報表，回傳落地路徑
    #[instrument(skip(self, context), fields(title = %context.title))]
    pub fn write_html(&self, context: &ReportContext<'_>) -> FormatResult<PathBuf> {
        let path = self.output_path(context, "html");
        fs::create_dir_all(&self.reports_dir)?;
        fs::write(&path, html::render(context))?;
        info!("HTML 報表已寫出: {}", path.display());
        Ok(path)
    }

    /// 渲染並寫出 Excel 報表，回傳落地路徑
    #[instrument(skip(self, context), fields(title = %context.title))]
    pub fn write_excel(&self, context: &ReportContext<'_>) -> FormatResult<PathBuf> {
        let path = self.output_path(context, "xlsx");
        fs::create_dir_all(&self.reports_dir)?;
        let mut workbook = excel::build_workbook(context)?;
        workbook.save(&path)?;
        info!("Excel 報表已寫出: {}", path.display());
        Ok(path)
    }

    fn output_path(&self, context: &ReportContext<'_>, ext: &str) -> PathBuf {
        self.reports_dir
            .join(build_filename(context.title, context.dataset, ext))
    }
}

/// 組合輸出檔名: `<安全標題>_<資料起始日YYYYMMDD>.<副檔名>`
pub fn build_filename(title: &str, dataset: &ReportDataset, ext: &str) -> String {
    format!(
        "{}_{}.{}",
        sanitize_title(title),
        dataset.start_date.format("%Y%m%d"),
        ext
    )
}

/// 標題安全化: 空白換底線，去括號（含全形）
fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            '(' | ')' | '（' | '）' => None,
            other => Some(other),
        })
        .collect()
}
