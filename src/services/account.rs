use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::error::AppError;
use crate::models::User;
use crate::repositories::{RepositoryError, UserRepository};
use crate::services::EmailService;
use crate::services::password::{hash_password, verify_dummy, verify_password};
use crate::services::token::{generate_token, hash_token};
use crate::validation::{self, ForgetPasswordForm, ResetPasswordForm, SigninForm, SignupForm};

/// アカウントのライフサイクル
///
/// 未登録 → 確認待ち（active = false）→ 有効（active = true）
/// 有効なアカウントはパスワードリセット待ちを経て再び有効に戻る。
///
/// どの操作もバリデーションエラーがあればリポジトリに触れずに返す。
#[derive(Clone)]
pub struct AccountService {
    user_repo: Arc<dyn UserRepository>,
    email_service: EmailService,
    reset_token_ttl: Duration,
}

impl AccountService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        email_service: EmailService,
        reset_token_ttl: Duration,
    ) -> Self {
        Self {
            user_repo,
            email_service,
            reset_token_ttl,
        }
    }

    /// ユーザー登録
    ///
    /// # Security
    /// - パスワードはログに出力しない
    /// - 確認メールの送信失敗はログのみ（登録自体は成功扱い）
    pub async fn signup(&self, form: &SignupForm) -> Result<User, AppError> {
        validation::check(form)?;

        let password_hash = hash_password(&form.password)?;
        let token = generate_token();

        let (user, _) = self
            .user_repo
            .create(&form.email, &password_hash, &hash_token(&token))
            .await?;

        tracing::info!(user_id = %user.id, email = %user.email, "ユーザー登録成功");

        if let Err(e) = self
            .email_service
            .send_confirmation(&user.email, &token)
            .await
        {
            tracing::error!(error = ?e, email = %user.email, "確認メールの送信に失敗");
        }

        Ok(user)
    }

    /// 確認リンクによるアカウント有効化
    pub async fn confirm(&self, token: &str) -> Result<(), AppError> {
        if token.trim().is_empty() {
            return Err(RepositoryError::InvalidOrAlreadyConfirmed.into());
        }

        self.user_repo
            .confirm_user_by_token(&hash_token(token))
            .await?;

        tracing::info!("アカウント確認完了");
        Ok(())
    }

    /// サインイン
    ///
    /// タイミング攻撃対策: ユーザーが存在しない場合もダミーのパスワード検証を実行
    pub async fn signin(&self, form: &SigninForm) -> Result<User, AppError> {
        validation::check(form)?;

        let user = match self.user_repo.find_by_email(&form.email).await {
            Ok(user) => user,
            Err(RepositoryError::NotFound) => {
                verify_dummy(&form.password);
                tracing::warn!(email = %form.email, "認証失敗: ユーザー不在");
                return Err(AppError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        if !verify_password(&form.password, &user.password_hash)? {
            tracing::warn!(email = %form.email, "認証失敗: パスワード不一致");
            return Err(AppError::InvalidCredentials);
        }

        if !user.active {
            tracing::warn!(email = %form.email, "認証失敗: 未確認アカウント");
            return Err(AppError::AccountNotActive);
        }

        tracing::info!(user_id = %user.id, "認証成功");
        Ok(user)
    }

    /// パスワードリセットをリクエスト
    ///
    /// # Security
    /// - ユーザーが存在しない・未確認の場合も成功を返す（情報漏洩防止）
    /// - トークン（平文）はログに出力しない
    pub async fn request_password_reset(&self, form: &ForgetPasswordForm) -> Result<(), AppError> {
        validation::check(form)?;

        tracing::info!(email = %form.email, "パスワードリセットリクエスト");

        let token = generate_token();
        match self
            .user_repo
            .create_reset_password_token(&form.email, &hash_token(&token))
            .await
        {
            Ok(_) => {}
            Err(RepositoryError::EmailNotFound) => {
                tracing::info!(email = %form.email, "パスワードリセット: 対象ユーザーなし（成功レスポンス返却）");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        self.email_service
            .send_password_reset(&form.email, &token)
            .await?;

        tracing::info!(email = %form.email, "パスワードリセットメール送信完了");
        Ok(())
    }

    /// パスワードをリセット
    ///
    /// # Security
    /// - トークン・新パスワードはログに出力しない
    pub async fn reset_password(&self, form: &ResetPasswordForm) -> Result<(), AppError> {
        validation::check(form)?;

        let password_hash = hash_password(&form.password)?;
        let issued_after = OffsetDateTime::now_utc() - self.reset_token_ttl;

        let email = self
            .user_repo
            .update_password_by_token(&password_hash, &hash_token(form.token.trim()), issued_after)
            .await?;

        tracing::info!(email = %email, "パスワードリセット完了");

        if let Err(e) = self.email_service.send_password_changed(&email).await {
            tracing::error!(error = ?e, email = %email, "パスワード変更通知の送信に失敗");
        }

        Ok(())
    }
}
