use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use super::RepositoryError;
use crate::models::{ConfirmationToken, User};

/// users / users_conf_tokens テーブルへのアクセス
///
/// トークン引数はすべて SHA256 ハッシュ化済みの値を受け取る。
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 未確認ユーザーと確認トークンを同一トランザクションで作成
    ///
    /// # Errors
    /// - メールアドレス重複時: `RepositoryError::DuplicateEmail`（トークンは作成されない）
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        token_hash: &str,
    ) -> Result<(User, ConfirmationToken), RepositoryError>;

    /// メールアドレスでユーザーを検索
    async fn find_by_email(&self, email: &str) -> Result<User, RepositoryError>;

    /// 確認トークンでユーザーを有効化し、トークンを使用済みにする
    async fn confirm_user_by_token(&self, token_hash: &str) -> Result<(), RepositoryError>;

    /// 有効なユーザーに対してのみパスワードリセット用トークンを発行
    async fn create_reset_password_token(
        &self,
        email: &str,
        token_hash: &str,
    ) -> Result<ConfirmationToken, RepositoryError>;

    /// トークンを消費してパスワードを更新し、対象ユーザーのメールアドレスを返す
    ///
    /// `issued_after` より前に発行されたトークンは `TokenExpired`
    async fn update_password_by_token(
        &self,
        password_hash: &str,
        token_hash: &str,
        issued_after: OffsetDateTime,
    ) -> Result<String, RepositoryError>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// リセット対象のトークンとユーザー
#[derive(FromRow)]
struct PendingReset {
    token_id: i64,
    user_id: i64,
    email: String,
    created_at: OffsetDateTime,
}

/// users_email_key の UNIQUE 制約違反を DuplicateEmail に変換
fn map_duplicate_email(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.constraint() == Some("users_email_key")
    {
        return RepositoryError::DuplicateEmail;
    }
    RepositoryError::Database(e)
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        token_hash: &str,
    ) -> Result<(User, ConfirmationToken), RepositoryError> {
        // commit 前に return した場合、tx の drop でロールバックされる
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password)
            VALUES ($1, $2)
            RETURNING id, email, password AS password_hash, active, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_duplicate_email)?;

        let token = sqlx::query_as::<_, ConfirmationToken>(
            r#"
            INSERT INTO users_conf_tokens (user_id, token)
            VALUES ($1, $2)
            RETURNING id, user_id, token, confirmed, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(token_hash)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((user, token))
    }

    async fn find_by_email(&self, email: &str) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password AS password_hash, active, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    async fn confirm_user_by_token(&self, token_hash: &str) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let pair: Option<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT u.id, t.id
            FROM users u
            INNER JOIN users_conf_tokens t ON u.id = t.user_id
            WHERE u.active = false
              AND t.confirmed = false
              AND t.token = $1
            FOR UPDATE
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((user_id, token_id)) = pair else {
            return Err(RepositoryError::InvalidOrAlreadyConfirmed);
        };

        sqlx::query(
            r#"
            UPDATE users
            SET active = true, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE users_conf_tokens
            SET confirmed = true, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(token_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn create_reset_password_token(
        &self,
        email: &str,
        token_hash: &str,
    ) -> Result<ConfirmationToken, RepositoryError> {
        sqlx::query_as::<_, ConfirmationToken>(
            r#"
            INSERT INTO users_conf_tokens (user_id, token)
            SELECT id, $2
            FROM users
            WHERE email = $1 AND active = true
            RETURNING id, user_id, token, confirmed, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::EmailNotFound)
    }

    async fn update_password_by_token(
        &self,
        password_hash: &str,
        token_hash: &str,
        issued_after: OffsetDateTime,
    ) -> Result<String, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let pending = sqlx::query_as::<_, PendingReset>(
            r#"
            SELECT t.id AS token_id, u.id AS user_id, u.email, t.created_at
            FROM users_conf_tokens t
            INNER JOIN users u ON u.id = t.user_id
            WHERE t.token = $1
              AND t.confirmed = false
              AND u.active = true
            FOR UPDATE
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::InvalidOrAlreadyConfirmed)?;

        if pending.created_at < issued_after {
            tracing::warn!(token_id = %pending.token_id, "期限切れトークン");
            return Err(RepositoryError::TokenExpired);
        }

        sqlx::query(
            r#"
            UPDATE users_conf_tokens
            SET confirmed = true, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(pending.token_id)
        .execute(&mut *tx)
        .await?;

        // password_hash はログに出力しないこと
        sqlx::query(
            r#"
            UPDATE users
            SET password = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(pending.user_id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(pending.email)
    }
}
