use std::sync::Arc;

use sqlx::PgPool;
use time::Duration;

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::{NoteRepository, PgNoteRepository, PgUserRepository, UserRepository};
use crate::services::{AccountService, ConsoleMailer, EmailService, Mailer};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    /// ノートリポジトリ
    pub note_repo: Arc<dyn NoteRepository>,
    /// アカウント操作（登録・確認・サインイン・パスワードリセット）
    pub account_service: AccountService,
}

impl AppState {
    /// PostgreSQL 実装で AppState を作成
    pub fn new(db_pool: PgPool, config: Config) -> Result<Self, AppError> {
        let mailer = build_mailer(&config)?;
        Ok(Self::from_parts(
            config,
            Arc::new(PgUserRepository::new(db_pool.clone())),
            Arc::new(PgNoteRepository::new(db_pool)),
            mailer,
        ))
    }

    /// 任意のリポジトリ・Mailer 実装から組み立てる
    pub fn from_parts(
        config: Config,
        user_repo: Arc<dyn UserRepository>,
        note_repo: Arc<dyn NoteRepository>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let config = Arc::new(config);
        let email_service = EmailService::new(mailer, config.base_url.clone());
        let account_service = AccountService::new(
            user_repo,
            email_service,
            Duration::seconds(config.reset_token_ttl_secs),
        );

        Self {
            config,
            note_repo,
            account_service,
        }
    }
}

/// SMTP 設定が揃っていれば SMTP、なければコンソール出力
fn build_mailer(config: &Config) -> Result<Arc<dyn Mailer>, AppError> {
    #[cfg(feature = "email")]
    if let (Some(host), Some(username), Some(password)) = (
        &config.smtp_host,
        &config.smtp_username,
        &config.smtp_password,
    ) {
        use secrecy::ExposeSecret;

        let mailer = crate::services::SmtpMailer::new(
            host,
            config.smtp_port,
            username.expose_secret().clone(),
            password.expose_secret().clone(),
            &config.smtp_from,
        )?;
        tracing::info!(host = %host, port = %config.smtp_port, "SMTP メール送信を使用");
        return Ok(Arc::new(mailer));
    }

    #[cfg(not(feature = "email"))]
    if config.smtp_configured() {
        tracing::warn!("SMTP が設定されていますが email 機能が無効です（コンソール出力を使用）");
    }

    tracing::info!("メールはコンソールに出力されます");
    Ok(Arc::new(ConsoleMailer::new(config.smtp_from.clone())))
}
