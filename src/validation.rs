//! フォーム入力のバリデーション
//!
//! garde はフィールドごとのエラーをすべて集めて返すので、
//! 再表示したフォームに全項目のエラーを同時に表示できる。

use std::collections::BTreeMap;
use std::sync::LazyLock;

use garde::Validate;
use regex::Regex;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::{DEFAULT_NOTE_COLOR, NOTE_COLORS, NoteInput};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}$").unwrap());

/// パスワードの最小文字数
pub const MIN_PASSWORD_LEN: usize = 6;

/// フィールド名 → エラーメッセージ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同一フィールドに複数のエラーがある場合は最初のものを残す
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<garde::Report> for FieldErrors {
    fn from(report: garde::Report) -> Self {
        let mut errors = FieldErrors::new();
        for (path, error) in report.iter() {
            errors.add(path.to_string(), error.message());
        }
        errors
    }
}

/// バリデーションを実行し、エラーがあれば `AppError::Validation` を返す
pub fn check<T: Validate<Context = ()>>(form: &T) -> Result<(), AppError> {
    form.validate().map_err(|report| AppError::Validation(report.into()))
}

/// メールアドレス形式チェック（小文字化済みの値を想定）
pub fn valid_email(value: &str, _ctx: &()) -> garde::Result {
    if value.is_empty() {
        return Err(garde::Error::new("メールアドレスは必須です"));
    }
    if !EMAIL_PATTERN.is_match(value) {
        return Err(garde::Error::new("有効なメールアドレスを入力してください"));
    }
    Ok(())
}

/// パスワード強度チェック: 6文字以上、英字と数字をそれぞれ1文字以上
pub fn strong_password(value: &str, _ctx: &()) -> garde::Result {
    if value.is_empty() {
        return Err(garde::Error::new("パスワードは必須です"));
    }
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(garde::Error::new("パスワードは6文字以上で入力してください"));
    }
    let has_letter = value.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(garde::Error::new(
            "パスワードには英字と数字を含めてください",
        ));
    }
    Ok(())
}

fn required_password(value: &str, _ctx: &()) -> garde::Result {
    if value.is_empty() {
        return Err(garde::Error::new("パスワードは必須です"));
    }
    Ok(())
}

fn required_token(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        return Err(garde::Error::new("トークンは必須です"));
    }
    Ok(())
}

fn required_title(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        return Err(garde::Error::new("タイトルは必須です"));
    }
    Ok(())
}

fn required_content(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        return Err(garde::Error::new("本文は必須です"));
    }
    Ok(())
}

fn known_color(value: &str, _ctx: &()) -> garde::Result {
    if value.is_empty() || NOTE_COLORS.contains(&value) {
        return Ok(());
    }
    Err(garde::Error::new("不明な色が指定されました"))
}

/// メールアドレスの正規化（前後空白除去・小文字化）
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// === アカウント系フォーム ===

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SignupForm {
    #[serde(default)]
    #[garde(custom(valid_email))]
    pub email: String,
    #[serde(default)]
    #[garde(custom(strong_password))]
    pub password: String, // Deserialize後すぐハッシュ化
}

impl SignupForm {
    pub fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SigninForm {
    #[serde(default)]
    #[garde(custom(valid_email))]
    pub email: String,
    #[serde(default)]
    #[garde(custom(required_password))]
    pub password: String,
}

impl SigninForm {
    pub fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ForgetPasswordForm {
    #[serde(default)]
    #[garde(custom(valid_email))]
    pub email: String,
}

impl ForgetPasswordForm {
    pub fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ResetPasswordForm {
    #[serde(default)]
    #[garde(custom(required_token))]
    pub token: String,
    #[serde(default)]
    #[garde(custom(strong_password))]
    pub password: String,
}

// === ノートフォーム ===

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NoteForm {
    /// 編集時のみ送信される（新規作成時は空）
    #[serde(default)]
    #[garde(skip)]
    pub id: String,
    #[serde(default)]
    #[garde(custom(required_title))]
    pub title: String,
    #[serde(default)]
    #[garde(custom(required_content))]
    pub content: String,
    #[serde(default)]
    #[garde(custom(known_color))]
    pub color: String,
}

impl NoteForm {
    /// 既存ノートのID（数値でない・0以下なら新規作成扱い）
    pub fn note_id(&self) -> Option<i64> {
        self.id.trim().parse::<i64>().ok().filter(|id| *id > 0)
    }

    /// 新規作成用（色未指定時は既定色を補う）
    pub fn to_create_input(&self) -> NoteInput {
        let mut input = self.to_update_input();
        if input.color.is_empty() {
            input.color = DEFAULT_NOTE_COLOR.to_string();
        }
        input
    }

    /// 更新用（空文字のフィールドは既存値を維持するのでそのまま渡す）
    pub fn to_update_input(&self) -> NoteInput {
        NoteInput {
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
            color: self.color.clone(),
        }
    }
}
