/// リポジトリ層のエラー
///
/// 業務上の失敗（重複・無効トークンなど）と DB 障害を種別で区別する。
/// DB 障害の詳細はログにのみ出力し、利用者には見せない。
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("このメールアドレスは既に使用されています")]
    DuplicateEmail,

    #[error("無効なトークン、または確認済みのアカウントです")]
    InvalidOrAlreadyConfirmed,

    #[error("トークンの有効期限が切れています")]
    TokenExpired,

    #[error("メールアドレスが見つかりません")]
    EmailNotFound,

    #[error("レコードが見つかりません")]
    NotFound,

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),
}
