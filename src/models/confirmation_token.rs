use sqlx::FromRow;
use time::OffsetDateTime;

/// アカウント確認・パスワードリセット共用のトークン
///
/// DBには平文ではなく SHA256 ハッシュ（token）を保存する。
/// confirmed = true になったトークンは二度と使えない。
#[derive(Debug, Clone, FromRow)]
pub struct ConfirmationToken {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub confirmed: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
