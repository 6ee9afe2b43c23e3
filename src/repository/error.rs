// ==========================================
// MES 報表與分析子系統 - 倉儲層錯誤類型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 倉儲層錯誤類型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 資料庫錯誤 =====
    #[error("記錄未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("資料庫連線失敗: {0}")]
    DatabaseConnectionError(String),

    #[error("資料庫鎖取得失敗: {0}")]
    LockError(String),

    #[error("資料庫查詢失敗: {0}")]
    DatabaseQueryError(String),

    #[error("唯一約束違反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外鍵約束違反: {0}")]
    ForeignKeyViolation(String),

    // ===== 資料品質錯誤 =====
    #[error("資料驗證失敗: {0}")]
    ValidationError(String),

    #[error("欄位值錯誤 (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    // ===== 通用錯誤 =====
    #[error("內部錯誤: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 實現 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    RepositoryError::ForeignKeyViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::FieldValueError {
            field: "json".to_string(),
            message: err.to_string(),
        }
    }
}

impl RepositoryError {
    /// 是否為唯一約束衝突（同步去重的靜默跳過依據）
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, RepositoryError::UniqueConstraintViolation(_))
    }
}

/// Result 類型別名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
