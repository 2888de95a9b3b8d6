//! テスト用のインメモリ実装
//!
//! 1つのストアにつき Mutex を1つだけ持ち、各操作はロックを保持したまま
//! 全ステップを適用する（PostgreSQL 実装のトランザクションに相当）。

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

use super::{NoteRepository, RepositoryError, UserRepository};
use crate::models::{ConfirmationToken, Note, NoteInput, User};

#[derive(Default)]
struct UserTables {
    users: Vec<User>,
    tokens: Vec<ConfirmationToken>,
    next_user_id: i64,
    next_token_id: i64,
}

impl UserTables {
    fn insert_token(&mut self, user_id: i64, token_hash: &str) -> ConfirmationToken {
        self.next_token_id += 1;
        let now = OffsetDateTime::now_utc();
        let token = ConfirmationToken {
            id: self.next_token_id,
            user_id,
            token: token_hash.to_string(),
            confirmed: false,
            created_at: now,
            updated_at: now,
        };
        self.tokens.push(token.clone());
        token
    }
}

#[derive(Default)]
pub struct MemoryUserRepository {
    tables: Mutex<UserTables>,
    fail_token_insert: AtomicBool,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn users(&self) -> Vec<User> {
        self.tables.lock().await.users.clone()
    }

    pub async fn tokens(&self) -> Vec<ConfirmationToken> {
        self.tables.lock().await.tokens.clone()
    }

    /// 発行済みトークンの作成日時を過去にずらす
    pub async fn backdate_tokens(&self, by: Duration) {
        let mut tables = self.tables.lock().await;
        for token in tables.tokens.iter_mut() {
            token.created_at -= by;
        }
    }

    /// 次回以降のトークン INSERT を失敗させる
    pub fn fail_token_insert(&self) {
        self.fail_token_insert.store(true, Ordering::SeqCst);
    }

    pub fn allow_token_insert(&self) {
        self.fail_token_insert.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        token_hash: &str,
    ) -> Result<(User, ConfirmationToken), RepositoryError> {
        let mut tables = self.tables.lock().await;

        if tables.users.iter().any(|u| u.email == email) {
            return Err(RepositoryError::DuplicateEmail);
        }

        tables.next_user_id += 1;
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: tables.next_user_id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            active: false,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());

        // トークン INSERT 失敗時は作成済みのユーザーも取り消す
        if self.fail_token_insert.load(Ordering::SeqCst) {
            tables.users.retain(|u| u.id != user.id);
            return Err(RepositoryError::Database(sqlx::Error::Protocol(
                "token insert failed".to_string(),
            )));
        }
        let token = tables.insert_token(user.id, token_hash);

        Ok((user, token))
    }

    async fn find_by_email(&self, email: &str) -> Result<User, RepositoryError> {
        let tables = self.tables.lock().await;
        tables
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn confirm_user_by_token(&self, token_hash: &str) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        let tables = &mut *tables;

        let token = tables
            .tokens
            .iter_mut()
            .find(|t| t.token == token_hash && !t.confirmed)
            .ok_or(RepositoryError::InvalidOrAlreadyConfirmed)?;
        let user_id = token.user_id;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == user_id && !u.active)
            .ok_or(RepositoryError::InvalidOrAlreadyConfirmed)?;

        let now = OffsetDateTime::now_utc();
        user.active = true;
        user.updated_at = now;
        token.confirmed = true;
        token.updated_at = now;

        Ok(())
    }

    async fn create_reset_password_token(
        &self,
        email: &str,
        token_hash: &str,
    ) -> Result<ConfirmationToken, RepositoryError> {
        let mut tables = self.tables.lock().await;

        let user_id = tables
            .users
            .iter()
            .find(|u| u.email == email && u.active)
            .map(|u| u.id)
            .ok_or(RepositoryError::EmailNotFound)?;

        Ok(tables.insert_token(user_id, token_hash))
    }

    async fn update_password_by_token(
        &self,
        password_hash: &str,
        token_hash: &str,
        issued_after: OffsetDateTime,
    ) -> Result<String, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let tables = &mut *tables;

        let token = tables
            .tokens
            .iter_mut()
            .find(|t| t.token == token_hash && !t.confirmed)
            .ok_or(RepositoryError::InvalidOrAlreadyConfirmed)?;
        let user_id = token.user_id;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == user_id && u.active)
            .ok_or(RepositoryError::InvalidOrAlreadyConfirmed)?;

        if token.created_at < issued_after {
            return Err(RepositoryError::TokenExpired);
        }

        let now = OffsetDateTime::now_utc();
        token.confirmed = true;
        token.updated_at = now;
        user.password_hash = password_hash.to_string();
        user.updated_at = now;

        Ok(user.email.clone())
    }
}

#[derive(Default)]
struct NoteTable {
    notes: Vec<Note>,
    next_id: i64,
}

#[derive(Default)]
pub struct MemoryNoteRepository {
    table: Mutex<NoteTable>,
}

impl MemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 空文字なら既存値を維持
fn coalesce(current: &mut String, incoming: &str) {
    if !incoming.is_empty() {
        *current = incoming.to_string();
    }
}

#[async_trait]
impl NoteRepository for MemoryNoteRepository {
    async fn create(&self, user_id: i64, input: &NoteInput) -> Result<Note, RepositoryError> {
        let mut table = self.table.lock().await;
        table.next_id += 1;
        let now = OffsetDateTime::now_utc();
        let note = Note {
            id: table.next_id,
            user_id,
            title: input.title.clone(),
            content: input.content.clone(),
            color: input.color.clone(),
            created_at: now,
            updated_at: now,
        };
        table.notes.push(note.clone());
        Ok(note)
    }

    async fn get_by_id(&self, user_id: i64, id: i64) -> Result<Note, RepositoryError> {
        let table = self.table.lock().await;
        table
            .notes
            .iter()
            .find(|n| n.id == id && n.user_id == user_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self, user_id: i64) -> Result<Vec<Note>, RepositoryError> {
        let table = self.table.lock().await;
        let mut notes: Vec<Note> = table
            .notes
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(notes)
    }

    async fn update(
        &self,
        user_id: i64,
        id: i64,
        input: &NoteInput,
    ) -> Result<Note, RepositoryError> {
        let mut table = self.table.lock().await;
        let note = table
            .notes
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .ok_or(RepositoryError::NotFound)?;

        coalesce(&mut note.title, &input.title);
        coalesce(&mut note.content, &input.content);
        coalesce(&mut note.color, &input.color);
        note.updated_at = OffsetDateTime::now_utc();

        Ok(note.clone())
    }

    async fn delete(&self, user_id: i64, id: i64) -> Result<(), RepositoryError> {
        let mut table = self.table.lock().await;
        let before = table.notes.len();
        table.notes.retain(|n| !(n.id == id && n.user_id == user_id));
        if table.notes.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str, content: &str, color: &str) -> NoteInput {
        NoteInput {
            title: title.to_string(),
            content: content.to_string(),
            color: color.to_string(),
        }
    }

    #[tokio::test]
    async fn test_delete_removes_only_target_note() {
        let repo = MemoryNoteRepository::new();
        let a = repo.create(1, &input("a", "aa", "color1")).await.unwrap();
        let b = repo.create(1, &input("b", "bb", "color2")).await.unwrap();
        let c = repo.create(1, &input("c", "cc", "color3")).await.unwrap();

        repo.delete(1, b.id).await.unwrap();

        let ids: Vec<i64> = repo.list(1).await.unwrap().iter().map(|n| n.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a.id));
        assert!(ids.contains(&c.id));
        assert!(!ids.contains(&b.id));
    }

    #[tokio::test]
    async fn test_delete_other_users_note_is_not_found() {
        let repo = MemoryNoteRepository::new();
        let note = repo.create(1, &input("a", "aa", "color1")).await.unwrap();

        let result = repo.delete(2, note.id).await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
        assert_eq!(repo.list(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_is_scoped_by_owner() {
        let repo = MemoryNoteRepository::new();
        repo.create(1, &input("mine", "x", "color1")).await.unwrap();
        repo.create(2, &input("theirs", "y", "color1")).await.unwrap();

        let notes = repo.list(1).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "mine");
    }

    #[tokio::test]
    async fn test_partial_update_keeps_empty_fields() {
        let repo = MemoryNoteRepository::new();
        let note = repo.create(1, &input("title", "body", "color4")).await.unwrap();

        let updated = repo
            .update(1, note.id, &input("", "new body", ""))
            .await
            .unwrap();

        assert_eq!(updated.title, "title");
        assert_eq!(updated.content, "new body");
        assert_eq!(updated.color, "color4");
    }
}
