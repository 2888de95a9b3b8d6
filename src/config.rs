use secrecy::SecretBox;
use serde::Deserialize;

/// 環境変数のプレフィックス（例: `QNS_DATABASE_URL`）
pub const ENV_PREFIX: &str = "QNS_";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: SecretBox<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// メール内リンクの組み立てに使う公開URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    // セッション設定
    #[serde(default = "default_session_lifetime_secs")]
    pub session_lifetime_secs: i64,
    #[serde(default)]
    pub secure_cookie: bool,

    // パスワードリセット設定
    #[serde(default = "default_reset_token_ttl_secs")]
    pub reset_token_ttl_secs: i64,

    // SMTP設定（オプション - email機能有効時のみ使用）
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<SecretBox<String>>,
    pub smtp_password: Option<SecretBox<String>>,
    #[serde(default = "default_smtp_from")]
    pub smtp_from: String,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_SESSION_LIFETIME_SECS: i64 = 3600;
const DEFAULT_RESET_TOKEN_TTL_SECS: i64 = 4 * 3600;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SMTP_FROM: &str = "no-reply@quicknotes.local";

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    DEFAULT_DB_MAX_CONNECTIONS
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_session_lifetime_secs() -> i64 {
    DEFAULT_SESSION_LIFETIME_SECS
}

fn default_reset_token_ttl_secs() -> i64 {
    DEFAULT_RESET_TOKEN_TTL_SECS
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_smtp_from() -> String {
    DEFAULT_SMTP_FROM.to_string()
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::prefixed(ENV_PREFIX).from_env()
    }

    /// 与えられた変数一覧から読み込む（テスト用）
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX).from_iter(vars)
    }

    /// SMTP 送信に必要な設定が揃っているか
    pub fn smtp_configured(&self) -> bool {
        self.smtp_host.is_some() && self.smtp_username.is_some() && self.smtp_password.is_some()
    }
}
