// ==========================================
// MES 報表與分析子系統 - 維護清理
// ==========================================
// 職責: 過期報表檔清理、執行日誌修剪
// 約定: 檔案年齡以修改時間判定；刪不掉的檔案記 warn 後續跑
// ==========================================

use crate::repository::schedule_repo::ScheduleRepository;
use crate::repository::RepositoryResult;
use chrono::{Duration, NaiveDateTime, Utc};
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use tracing::{info, instrument, warn};

/// 刪除報表目錄下超過保留天數的檔案，回傳刪除數
///
/// 目錄不存在視為無事可做。
#[instrument(skip(reports_dir), fields(dir = %reports_dir.display()))]
pub fn cleanup_report_files(reports_dir: &Path, retention_days: i64) -> std::io::Result<usize> {
    if !reports_dir.is_dir() {
        return Ok(0);
    }

    let cutoff = SystemTime::now()
        - std::time::Duration::from_secs(retention_days.max(0) as u64 * 24 * 3600);

    let mut removed = 0usize;
    for entry in fs::read_dir(reports_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) => {
                warn!("無法讀取檔案時間，略過: {} ({})", path.display(), e);
                continue;
            }
        };
        if modified < cutoff {
            match fs::remove_file(&path) {
                Ok(()) => {
                    removed += 1;
                    info!("已刪除過期報表檔: {}", path.display());
                }
                Err(e) => warn!("報表檔刪除失敗: {} ({})", path.display(), e),
            }
        }
    }

    info!("報表檔清理完成: removed={}", removed);
    Ok(removed)
}

/// 刪除超過保留天數的執行日誌，回傳刪除筆數
#[instrument(skip(schedule_repo))]
pub fn cleanup_execution_logs(
    schedule_repo: &ScheduleRepository,
    retention_days: i64,
) -> RepositoryResult<usize> {
    let cutoff: NaiveDateTime = Utc::now().naive_utc() - Duration::days(retention_days.max(0));
    let removed = schedule_repo.delete_logs_before(cutoff)?;
    info!("執行日誌修剪完成: cutoff={} removed={}", cutoff, removed);
    Ok(removed)
}
