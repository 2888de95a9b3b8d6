//! Cookie セッションの構成と期限切れセッションの掃除

use std::time::Duration as StdDuration;

use time::Duration;
use tokio::task::JoinHandle;
use tower_sessions::cookie::SameSite;
use tower_sessions::{ExpiredDeletion, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::Config;

/// 期限切れセッションを削除する間隔
pub const SESSION_CLEANUP_INTERVAL: StdDuration = StdDuration::from_secs(60);

/// 設定に従った SessionManagerLayer（無操作が続くと失効）
pub fn session_layer(store: PostgresStore, config: &Config) -> SessionManagerLayer<PostgresStore> {
    SessionManagerLayer::new(store)
        .with_secure(config.secure_cookie)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            config.session_lifetime_secs,
        )))
}

/// 期限切れセッションの定期削除タスクを起動する
///
/// サーバー停止時に返り値の handle を abort すること
pub fn spawn_expired_cleanup(
    store: PostgresStore,
    period: StdDuration,
) -> JoinHandle<Result<(), tower_sessions::session_store::Error>> {
    tokio::task::spawn(async move {
        let result = store.continuously_delete_expired(period).await;
        if let Err(e) = &result {
            tracing::error!(error = ?e, "期限切れセッションの削除に失敗");
        }
        result
    })
}
