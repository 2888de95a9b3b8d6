use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::repositories::RepositoryError;
use crate::services::MailError;
use crate::validation::FieldErrors;
use crate::views;

const GENERIC_MESSAGE: &str = "内部エラーが発生しました";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("バリデーションエラー")]
    Validation(FieldErrors),

    #[error("メールアドレスまたはパスワードが正しくありません")]
    InvalidCredentials,

    #[error("アカウントが有効化されていません")]
    AccountNotActive,

    #[error("ページが見つかりません")]
    NotFound,

    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("セッションエラー")]
    Session(#[from] tower_sessions::session::Error),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// ステータスコードと利用者向けメッセージ
    ///
    /// DB・セッション・内部エラーの詳細はここでログに出し、画面には出さない。
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Validation(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "入力内容に誤りがあります".to_string(),
            ),
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::AccountNotActive => (
                StatusCode::FORBIDDEN,
                "アカウントが有効化されていません。確認メールのリンクを開いてください".to_string(),
            ),
            Self::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Repository(e) => match e {
                RepositoryError::DuplicateEmail => (StatusCode::CONFLICT, e.to_string()),
                RepositoryError::InvalidOrAlreadyConfirmed | RepositoryError::TokenExpired => (
                    StatusCode::BAD_REQUEST,
                    "無効または期限切れのリンクです".to_string(),
                ),
                RepositoryError::EmailNotFound | RepositoryError::NotFound => (
                    StatusCode::NOT_FOUND,
                    "ページが見つかりません".to_string(),
                ),
                RepositoryError::Database(e) => {
                    tracing::error!(error = ?e, "データベースエラー");
                    (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_MESSAGE.to_string())
                }
            },
            Self::Session(e) => {
                tracing::error!(error = ?e, "セッションエラー");
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_MESSAGE.to_string())
            }
            Self::Mail(e) => {
                tracing::error!(error = ?e, "メール送信エラー");
                (
                    StatusCode::BAD_GATEWAY,
                    "メールの送信に失敗しました。しばらくしてから再度お試しください".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_MESSAGE.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        let body = match &self {
            Self::NotFound
            | Self::Repository(RepositoryError::NotFound | RepositoryError::EmailNotFound) => {
                views::not_found()
            }
            Self::Validation(errors) => views::error_page(status, &message, Some(errors)),
            _ => views::error_page(status, &message, None),
        };

        (status, Html(body)).into_response()
    }
}
