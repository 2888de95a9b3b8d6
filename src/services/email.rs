use std::sync::Arc;

use async_trait::async_trait;

/// 送信するメール
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("不正なメールアドレス: {0}")]
    Address(String),

    #[error("メールの組み立てに失敗: {0}")]
    Build(String),

    #[error("メール送信に失敗: {0}")]
    Delivery(String),
}

/// メール送信の抽象
///
/// 送信失敗時は必ず Err を返す。伝播させるかどうかは呼び出し側が決める。
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

/// 開発用: 送信せずログに出力する
///
/// 本文にはトークン入りのリンクが含まれるため、宛先と件名のみ出力する
pub struct ConsoleMailer {
    from: String,
}

impl ConsoleMailer {
    pub fn new(from: String) -> Self {
        Self { from }
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        tracing::info!(
            from = %self.from,
            to = %message.to.join(", "),
            subject = %message.subject,
            body_len = message.body.len(),
            "メール送信（開発モード）"
        );
        Ok(())
    }
}

#[cfg(feature = "email")]
pub use smtp::SmtpMailer;

#[cfg(feature = "email")]
mod smtp {
    use async_trait::async_trait;
    use lettre::message::header::ContentType;
    use lettre::message::Mailbox;
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

    use super::{MailError, MailMessage, Mailer};

    /// SMTP (STARTTLS) でメールを送信する
    pub struct SmtpMailer {
        from: Mailbox,
        transport: AsyncSmtpTransport<Tokio1Executor>,
    }

    impl SmtpMailer {
        pub fn new(
            host: &str,
            port: u16,
            username: String,
            password: String,
            from: &str,
        ) -> Result<Self, MailError> {
            let from = from
                .parse::<Mailbox>()
                .map_err(|e| MailError::Address(e.to_string()))?;
            let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| MailError::Delivery(e.to_string()))?
                .port(port)
                .credentials(Credentials::new(username, password))
                .build();

            Ok(Self { from, transport })
        }
    }

    #[async_trait]
    impl Mailer for SmtpMailer {
        async fn send(&self, message: MailMessage) -> Result<(), MailError> {
            let mut builder = Message::builder()
                .from(self.from.clone())
                .subject(message.subject.as_str())
                .header(if message.is_html {
                    ContentType::TEXT_HTML
                } else {
                    ContentType::TEXT_PLAIN
                });
            for to in &message.to {
                let mailbox = to
                    .parse::<Mailbox>()
                    .map_err(|e| MailError::Address(e.to_string()))?;
                builder = builder.to(mailbox);
            }
            let email = builder
                .body(message.body)
                .map_err(|e| MailError::Build(e.to_string()))?;

            self.transport
                .send(email)
                .await
                .map_err(|e| MailError::Delivery(e.to_string()))?;

            Ok(())
        }
    }
}

/// アカウント関連メールの組み立てと送信
#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<dyn Mailer>,
    base_url: String,
}

impl EmailService {
    pub fn new(mailer: Arc<dyn Mailer>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { mailer, base_url }
    }

    pub fn confirmation_url(&self, token: &str) -> String {
        format!("{}/confirmation/{}", self.base_url, token)
    }

    pub fn reset_url(&self, token: &str) -> String {
        format!("{}/user/password/{}", self.base_url, token)
    }

    /// アカウント確認メール
    ///
    /// # Security
    /// トークン（平文）はログに出力しない
    pub async fn send_confirmation(&self, to: &str, token: &str) -> Result<(), MailError> {
        let url = self.confirmation_url(token);
        let body = format!(
            "<p>quicknotes へのご登録ありがとうございます。</p>\
             <p>以下のリンクからアカウントを有効化してください。</p>\
             <p><a href=\"{url}\">{url}</a></p>"
        );
        self.mailer
            .send(MailMessage {
                to: vec![to.to_string()],
                subject: "アカウント登録の確認".to_string(),
                body,
                is_html: true,
            })
            .await
    }

    /// パスワードリセットメール
    pub async fn send_password_reset(&self, to: &str, token: &str) -> Result<(), MailError> {
        let url = self.reset_url(token);
        let body = format!(
            "<p>パスワードリセットのリクエストを受け付けました。</p>\
             <p>以下のリンクから新しいパスワードを設定してください（有効期限: 4時間）。</p>\
             <p><a href=\"{url}\">{url}</a></p>\
             <p>心当たりがない場合はこのメールを破棄してください。</p>"
        );
        self.mailer
            .send(MailMessage {
                to: vec![to.to_string()],
                subject: "パスワードリセット".to_string(),
                body,
                is_html: true,
            })
            .await
    }

    /// パスワード変更完了の通知
    pub async fn send_password_changed(&self, to: &str) -> Result<(), MailError> {
        self.mailer
            .send(MailMessage {
                to: vec![to.to_string()],
                subject: "パスワードが変更されました".to_string(),
                body: "あなたのアカウントのパスワードが変更されました。\n\
                       心当たりがない場合は、すぐにパスワードを再設定してください。"
                    .to_string(),
                is_html: false,
            })
            .await
    }
}

/// 送信内容を記録するだけの Mailer（テスト用）
#[cfg(test)]
#[derive(Default)]
pub struct RecordingMailer {
    sent: std::sync::Mutex<Vec<MailMessage>>,
    fail: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_deliveries(&self) {
        self.fail.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(MailError::Delivery("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}
