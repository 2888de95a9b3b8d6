use sqlx::FromRow;
use time::OffsetDateTime;

/// アカウント
///
/// `active` は確認メールのリンクを踏むまで false。
/// false の間はパスワードが一致してもサインインできない。
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
