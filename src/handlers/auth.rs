use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::AppError;

/// セッションに保存するユーザーIDのキー
pub const SESSION_USER_ID_KEY: &str = "userId";
/// セッションに保存するメールアドレスのキー
pub const SESSION_USER_EMAIL_KEY: &str = "userEmail";

pub const SIGNIN_PATH: &str = "/user/signin";

/// サインイン中のユーザー
///
/// ハンドラーの引数に置くと認証必須になる。
/// 未サインインの場合は `/user/signin` にリダイレクトする。
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
}

impl AuthUser {
    /// セッションからユーザーを取り出す（未サインインなら None）
    pub async fn from_session(session: &Session) -> Result<Option<Self>, AppError> {
        let Some(id) = session.get::<i64>(SESSION_USER_ID_KEY).await? else {
            return Ok(None);
        };
        let email = session
            .get::<String>(SESSION_USER_EMAIL_KEY)
            .await?
            .unwrap_or_default();

        Ok(Some(Self { id, email }))
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match Self::from_session(&session).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                tracing::debug!(path = %parts.uri.path(), "未サインインのためリダイレクト");
                Err(Redirect::to(SIGNIN_PATH).into_response())
            }
            Err(e) => Err(e.into_response()),
        }
    }
}
