// ==========================================
// MES 報表與分析子系統 - 系統配置
// ==========================================
// 職責: 集中管理可調參數，支援 JSON 檔載入與預設值
// ==========================================

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 系統配置
///
/// 全部欄位有預設值；部署時可用 JSON 檔覆寫任意子集。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite 資料庫檔案路徑
    pub db_path: String,
    /// 報表檔案輸出根目錄（檔案落在 <media_root>/reports/ 下）
    pub media_root: PathBuf,
    /// 完工日期判定用的包裝工序名稱
    pub packaging_process_name: String,
    /// 前一工作日無資料時，是否回退到最近有資料的日期
    pub allow_sparse_fallback: bool,
    /// 報表檔案保留天數
    pub report_retention_days: i64,
    /// 執行日誌保留天數
    pub log_retention_days: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: "mes_reporting.db".to_string(),
            media_root: PathBuf::from("media"),
            packaging_process_name: "出貨包裝".to_string(),
            allow_sparse_fallback: true,
            report_retention_days: 7,
            log_retention_days: 30,
        }
    }
}

impl AppConfig {
    /// 從 JSON 檔載入配置；檔案不存在時回傳預設值
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::info!("配置檔不存在，使用預設配置: {}", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 報表輸出目錄
    pub fn reports_dir(&self) -> PathBuf {
        self.media_root.join("reports")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_packaging_label() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.packaging_process_name, "出貨包裝");
        assert!(cfg.allow_sparse_fallback);
    }

    #[test]
    fn test_partial_json_override() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{"packaging_process_name": "包裝出貨"}"#).unwrap();
        assert_eq!(cfg.packaging_process_name, "包裝出貨");
        // 其餘欄位維持預設
        assert_eq!(cfg.report_retention_days, 7);
    }
}
