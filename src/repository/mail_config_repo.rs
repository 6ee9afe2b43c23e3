// ==========================================
// MES 報表與分析子系統 - 郵件配置倉儲
// ==========================================
// 紅線: Repository 不含業務邏輯
// 職責: 讀取 email_config 單列配置
// ==========================================

use crate::domain::source::EmailConfig;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

/// 郵件配置倉儲
pub struct MailConfigRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MailConfigRepository {
    /// 建立新的倉儲實例
    pub fn new(db_path: String) -> RepositoryResult<Self> {
        let conn = Connection::open(&db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 從已有連線建立倉儲實例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 取得資料庫連線
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 讀取郵件配置（取第一列；缺失時回傳 None，寄信步驟據此失敗）
    pub fn find(&self) -> RepositoryResult<Option<EmailConfig>> {
        let conn = self.get_conn()?;
        let config = conn
            .query_row(
                r#"
                SELECT host, port, username, password, use_tls, default_from
                FROM email_config
                ORDER BY id
                LIMIT 1
                "#,
                [],
                |row| {
                    Ok(EmailConfig {
                        host: row.get(0)?,
                        port: row.get::<_, i64>(1)? as u16,
                        username: row.get(2)?,
                        password: row.get(3)?,
                        use_tls: row.get::<_, i64>(4)? != 0,
                        default_from: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(config)
    }

    /// 寫入郵件配置（測試與佈建用；覆蓋既有第一列）
    pub fn upsert(&self, config: &EmailConfig) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute("DELETE FROM email_config", [])?;
        conn.execute(
            r#"
            INSERT INTO email_config (host, port, username, password, use_tls, default_from)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                config.host,
                config.port as i64,
                config.username,
                config.password,
                config.use_tls as i64,
                config.default_from,
            ],
        )?;
        Ok(())
    }
}
