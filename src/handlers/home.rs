use axum::response::Html;
use tower_sessions::Session;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::views;

/// GET /
pub async fn home(session: Session) -> Result<Html<String>, AppError> {
    let user = AuthUser::from_session(&session).await?;
    Ok(Html(views::home(user.as_ref().map(|u| u.email.as_str()))))
}
