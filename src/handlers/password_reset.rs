use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::error::AppError;
use crate::repositories::RepositoryError;
use crate::state::AppState;
use crate::validation::{FieldErrors, ForgetPasswordForm, ResetPasswordForm};
use crate::views;

// === リセットリクエスト ===

/// GET /user/forgetpassword
pub async fn forget_password_form() -> Html<String> {
    Html(views::forget_form("", &FieldErrors::new()))
}

/// POST /user/forgetpassword
///
/// # Security
/// アカウントの有無にかかわらず同じページを返す（ユーザー存在有無を漏洩しない）
pub async fn forget_password(
    State(state): State<AppState>,
    Form(form): Form<ForgetPasswordForm>,
) -> Result<Response, AppError> {
    let form = form.normalized();

    match state.account_service.request_password_reset(&form).await {
        Ok(()) => Ok(Html(views::forget_sent()).into_response()),
        Err(AppError::Validation(errors)) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(views::forget_form(&form.email, &errors)),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}

// === パスワードリセット実行 ===

/// GET /user/password/{token}
pub async fn reset_password_form(Path(token): Path<String>) -> Html<String> {
    Html(views::reset_form(&token, &FieldErrors::new()))
}

/// POST /user/password
///
/// # Security
/// - token, password はログに出力しない
pub async fn reset_password(
    State(state): State<AppState>,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response, AppError> {
    match state.account_service.reset_password(&form).await {
        Ok(()) => Ok(Html(views::reset_done()).into_response()),
        Err(AppError::Validation(errors)) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(views::reset_form(&form.token, &errors)),
        )
            .into_response()),
        Err(AppError::Repository(
            RepositoryError::InvalidOrAlreadyConfirmed | RepositoryError::TokenExpired,
        )) => {
            tracing::info!("パスワードリセット失敗: 無効または期限切れのトークン");
            Ok((StatusCode::BAD_REQUEST, Html(views::reset_failed())).into_response())
        }
        Err(e) => Err(e),
    }
}
