use async_trait::async_trait;
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::{Note, NoteInput};

/// notes テーブルへのアクセス
///
/// すべての操作は所有ユーザーで絞り込む。他ユーザーのノートは `NotFound` になる。
#[async_trait]
pub trait NoteRepository: Send + Sync {
    async fn create(&self, user_id: i64, input: &NoteInput) -> Result<Note, RepositoryError>;

    async fn get_by_id(&self, user_id: i64, id: i64) -> Result<Note, RepositoryError>;

    async fn list(&self, user_id: i64) -> Result<Vec<Note>, RepositoryError>;

    /// 部分更新（空文字のフィールドは既存値を維持）
    async fn update(
        &self,
        user_id: i64,
        id: i64,
        input: &NoteInput,
    ) -> Result<Note, RepositoryError>;

    async fn delete(&self, user_id: i64, id: i64) -> Result<(), RepositoryError>;
}

#[derive(Clone)]
pub struct PgNoteRepository {
    pool: PgPool,
}

impl PgNoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn create(&self, user_id: i64, input: &NoteInput) -> Result<Note, RepositoryError> {
        let note = sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO notes (user_id, title, content, color)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, content, color, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(&input.title)
        .bind(&input.content)
        .bind(&input.color)
        .fetch_one(&self.pool)
        .await?;

        Ok(note)
    }

    async fn get_by_id(&self, user_id: i64, id: i64) -> Result<Note, RepositoryError> {
        sqlx::query_as::<_, Note>(
            r#"
            SELECT id, user_id, title, content, color, created_at, updated_at
            FROM notes
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self, user_id: i64) -> Result<Vec<Note>, RepositoryError> {
        let notes = sqlx::query_as::<_, Note>(
            r#"
            SELECT id, user_id, title, content, color, created_at, updated_at
            FROM notes
            WHERE user_id = $1
            ORDER BY updated_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notes)
    }

    async fn update(
        &self,
        user_id: i64,
        id: i64,
        input: &NoteInput,
    ) -> Result<Note, RepositoryError> {
        sqlx::query_as::<_, Note>(
            r#"
            UPDATE notes
            SET title = COALESCE(NULLIF($3, ''), title),
                content = COALESCE(NULLIF($4, ''), content),
                color = COALESCE(NULLIF($5, ''), color),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, content, color, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&input.title)
        .bind(&input.content)
        .bind(&input.color)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, user_id: i64, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            DELETE FROM notes
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
