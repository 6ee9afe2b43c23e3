// ==========================================
// MES 報表與分析子系統 - 郵件遞送
// ==========================================
// 職責: 報表郵件與同步通知的組信、附件掛載、SMTP 送出
// 紅線: 寄信失敗不回滾報表檔；寄信不重試
// 約定: 附件檔名一律 RFC 2047 UTF-8 Base64 編碼（中文檔名）
// ==========================================

use crate::domain::schedule::ReportSchedule;
use crate::domain::source::EmailConfig;
use crate::repository::mail_config_repo::MailConfigRepository;
use crate::repository::RepositoryError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// 同步通知的主旨與內文共用字面值
const SYNC_NOTIFICATION_TEXT: &str = "填報與現場記錄資料同步完成";

/// 郵件錯誤
#[derive(Debug, Error)]
pub enum MailError {
    #[error("郵件設定不存在，無法寄送")]
    MissingConfig,

    #[error("收件人地址無效: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("郵件組裝失敗: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP 傳輸失敗: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("附件讀取失敗 {path}: {source}")]
    AttachmentRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type MailResult<T> = Result<T, MailError>;

// ==========================================
// ReportMailer - 報表郵件遞送器
// ==========================================

/// 報表郵件遞送器
///
/// SMTP 參數每次寄送時從 email_config 表讀取，設定可熱改。
pub struct ReportMailer {
    mail_config_repo: MailConfigRepository,
}

impl ReportMailer {
    pub fn new(mail_config_repo: MailConfigRepository) -> Self {
        Self { mail_config_repo }
    }

    /// 寄送報表郵件（主旨 `自動報表 - <排程名稱>`，附件為落地報表檔）
    ///
    /// 收件人清單為空時不寄送，視為成功。
    #[instrument(skip(self, schedule, message_text, attachments), fields(schedule = %schedule.name))]
    pub fn send_report_email(
        &self,
        schedule: &ReportSchedule,
        message_text: &str,
        attachments: &[PathBuf],
    ) -> MailResult<()> {
        let recipients = schedule.recipient_list();
        if recipients.is_empty() {
            info!("排程未設定收件人，略過寄信: schedule={}", schedule.name);
            return Ok(());
        }

        let subject = format!("自動報表 - {}", schedule.name);
        let body = render_mail_body(message_text);
        self.send(&recipients, &subject, &body, attachments)
    }

    /// 寄送資料同步完成通知（無附件）
    #[instrument(skip(self, schedule), fields(schedule = %schedule.name))]
    pub fn send_sync_notification(&self, schedule: &ReportSchedule) -> MailResult<()> {
        let recipients = schedule.recipient_list();
        if recipients.is_empty() {
            info!("排程未設定收件人，略過寄信: schedule={}", schedule.name);
            return Ok(());
        }
        let body = render_mail_body(SYNC_NOTIFICATION_TEXT);
        self.send(&recipients, SYNC_NOTIFICATION_TEXT, &body, &[])
    }

    fn send(
        &self,
        recipients: &[String],
        subject: &str,
        html_body: &str,
        attachments: &[PathBuf],
    ) -> MailResult<()> {
        let config = self
            .mail_config_repo
            .find()?
            .ok_or(MailError::MissingConfig)?;

        let mut builder = Message::builder()
            .from(config.default_from.parse()?)
            .subject(subject);
        for recipient in recipients {
            builder = builder.to(recipient.parse()?);
        }

        let html_part = SinglePart::builder()
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string());

        let mut multipart = MultiPart::mixed().singlepart(html_part);
        for path in attachments {
            multipart = multipart.singlepart(build_attachment(path)?);
        }

        let message = builder.multipart(multipart)?;
        let transport = build_transport(&config)?;
        transport.send(&message)?;

        info!(
            "郵件已寄出: subject={} recipients={} attachments={}",
            subject,
            recipients.len(),
            attachments.len()
        );
        Ok(())
    }
}

/// 掛載單一附件，檔名 RFC 2047 編碼
fn build_attachment(path: &Path) -> MailResult<SinglePart> {
    let content = fs::read(path).map_err(|source| MailError::AttachmentRead {
        path: path.to_path_buf(),
        source,
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());

    Ok(Attachment::new(encode_filename(&filename)).body(content, content_type_for(path)))
}

/// RFC 2047 編碼字詞: `=?utf-8?B?<base64>?=`
fn encode_filename(filename: &str) -> String {
    if filename.is_ascii() {
        return filename.to_string();
    }
    format!("=?utf-8?B?{}?=", BASE64.encode(filename.as_bytes()))
}

fn content_type_for(path: &Path) -> ContentType {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => ContentType::TEXT_HTML,
        Some("xlsx") => ContentType::parse(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        )
        .unwrap_or(ContentType::TEXT_PLAIN),
        _ => ContentType::parse("application/octet-stream").unwrap_or(ContentType::TEXT_PLAIN),
    }
}

fn build_transport(config: &EmailConfig) -> MailResult<SmtpTransport> {
    let mut builder = if config.use_tls {
        SmtpTransport::relay(&config.host)?
    } else {
        // 內網 SMTP 不走 TLS
        SmtpTransport::builder_dangerous(&config.host)
    };
    builder = builder.port(config.port);
    if !config.username.is_empty() {
        builder = builder.credentials(Credentials::new(
            config.username.clone(),
            config.password.clone(),
        ));
    } else {
        warn!("郵件設定未含帳號，以匿名方式連線 SMTP");
    }
    Ok(builder.build())
}

/// 郵件 HTML 內文
fn render_mail_body(message_text: &str) -> String {
    format!(
        concat!(
            "<html><body style=\"font-family: 'Microsoft JhengHei', sans-serif;\">\n",
            "<h2 style=\"color: #007bff;\">自動報表系統</h2>\n",
            "<p>{}</p>\n",
            "<hr style=\"border: none; border-top: 1px solid #e0e0e0;\">\n",
            "<p style=\"color: #999; font-size: 13px;\">此郵件由 MES 系統自動發送</p>\n",
            "</body></html>\n",
        ),
        message_text
    )
}
