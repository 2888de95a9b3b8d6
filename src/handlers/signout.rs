use axum::response::Redirect;
use tower_sessions::Session;

use super::auth::{SESSION_USER_EMAIL_KEY, SESSION_USER_ID_KEY, SIGNIN_PATH};
use crate::error::AppError;

/// GET /user/signout
///
/// セッションIDを更新してからユーザー情報を削除する
pub async fn signout(session: Session) -> Result<Redirect, AppError> {
    session.cycle_id().await?;
    let user_id = session.remove::<i64>(SESSION_USER_ID_KEY).await?;
    session.remove::<String>(SESSION_USER_EMAIL_KEY).await?;

    if let Some(user_id) = user_id {
        tracing::info!(user_id = %user_id, "サインアウト");
    }

    Ok(Redirect::to(SIGNIN_PATH))
}
