use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::auth::{SESSION_USER_EMAIL_KEY, SESSION_USER_ID_KEY};
use crate::error::AppError;
use crate::state::AppState;
use crate::validation::{FieldErrors, SigninForm};
use crate::views;

/// GET /user/signin
pub async fn signin_form() -> Html<String> {
    Html(views::signin_form("", &FieldErrors::new(), None))
}

/// POST /user/signin
///
/// 処理フロー:
/// 1. 入力チェック
/// 2. パスワード照合・有効化済みか確認
/// 3. セッションIDを更新（セッション固定攻撃対策）
/// 4. ユーザーID・メールアドレスをセッションに保存して /note へ
///
/// # Security
/// - password はログに出力しない
pub async fn signin(
    session: Session,
    State(state): State<AppState>,
    Form(form): Form<SigninForm>,
) -> Result<Response, AppError> {
    let form = form.normalized();

    let user = match state.account_service.signin(&form).await {
        Ok(user) => user,
        Err(AppError::InvalidCredentials) => {
            return Ok(rejected(
                StatusCode::UNAUTHORIZED,
                &form.email,
                "メールアドレスまたはパスワードが正しくありません",
            ));
        }
        Err(AppError::AccountNotActive) => {
            return Ok(rejected(
                StatusCode::FORBIDDEN,
                &form.email,
                "アカウントが有効化されていません。確認メールのリンクを開いてください",
            ));
        }
        Err(AppError::Validation(errors)) => {
            let page = views::signin_form(&form.email, &errors, None);
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response());
        }
        Err(e) => return Err(e),
    };

    session.cycle_id().await?;
    session.insert(SESSION_USER_ID_KEY, user.id).await?;
    session.insert(SESSION_USER_EMAIL_KEY, &user.email).await?;

    tracing::info!(user_id = %user.id, "サインイン");

    Ok(Redirect::to("/note").into_response())
}

fn rejected(status: StatusCode, email: &str, message: &str) -> Response {
    let page = views::signin_form(email, &FieldErrors::new(), Some(message));
    (status, Html(page)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::auth::AuthUser;
    use crate::handlers::test_support::{TestApp, empty_session};

    fn form(email: &str, password: &str) -> Form<SigninForm> {
        Form(SigninForm {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    #[tokio::test]
    async fn test_signin_success_stores_user_in_session() {
        let app = TestApp::new();
        app.active_user("a@b.com", "secret1").await;
        let session = empty_session();

        let response = signin(session.clone(), State(app.state.clone()), form("A@B.com", "secret1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/note");

        let user = AuthUser::from_session(&session).await.unwrap().unwrap();
        assert_eq!(user.email, "a@b.com");
    }

    #[tokio::test]
    async fn test_signin_wrong_password() {
        let app = TestApp::new();
        app.active_user("a@b.com", "secret1").await;
        let session = empty_session();

        let response = signin(session.clone(), State(app.state.clone()), form("a@b.com", "wrong99"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(AuthUser::from_session(&session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_signin_inactive_account() {
        let app = TestApp::new();
        app.pending_user("a@b.com", "secret1").await;

        let response = signin(empty_session(), State(app.state.clone()), form("a@b.com", "secret1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_signin_missing_fields() {
        let app = TestApp::new();

        let response = signin(empty_session(), State(app.state.clone()), form("", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
