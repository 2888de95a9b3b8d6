use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::error::AppError;
use crate::repositories::RepositoryError;
use crate::state::AppState;
use crate::validation::{FieldErrors, SignupForm};
use crate::views;

/// GET /user/signup
pub async fn signup_form() -> Html<String> {
    Html(views::signup_form("", &FieldErrors::new()))
}

/// POST /user/signup
///
/// 入力エラー・メールアドレス重複はフォームを再表示（422）
///
/// # Security
/// - password はログに出力しない
pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let form = form.normalized();

    match state.account_service.signup(&form).await {
        Ok(user) => Ok(Html(views::signup_success(&user.email)).into_response()),
        Err(AppError::Validation(errors)) => Ok(rerender(&form.email, &errors)),
        Err(AppError::Repository(RepositoryError::DuplicateEmail)) => {
            tracing::info!(email = %form.email, "登録失敗: メールアドレス重複");
            let mut errors = FieldErrors::new();
            errors.add("email", RepositoryError::DuplicateEmail.to_string());
            Ok(rerender(&form.email, &errors))
        }
        Err(e) => Err(e),
    }
}

fn rerender(email: &str, errors: &FieldErrors) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Html(views::signup_form(email, errors)),
    )
        .into_response()
}

/// GET /confirmation/{token}
///
/// 無効・確認済みのトークンは説明ページを 400 で返す
pub async fn confirm(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    match state.account_service.confirm(&token).await {
        Ok(()) => Ok(Html(views::confirm_success()).into_response()),
        Err(AppError::Repository(RepositoryError::InvalidOrAlreadyConfirmed)) => {
            tracing::info!("アカウント確認失敗: 無効または確認済みのトークン");
            Ok((StatusCode::BAD_REQUEST, Html(views::confirm_failed())).into_response())
        }
        Err(e) => Err(e),
    }
}
