use sqlx::FromRow;
use time::OffsetDateTime;

/// ノートに指定できる色タグ
pub const NOTE_COLORS: [&str; 9] = [
    "color1", "color2", "color3", "color4", "color5", "color6", "color7", "color8", "color9",
];

/// 色未指定時の既定値
pub const DEFAULT_NOTE_COLOR: &str = "color3";

#[derive(Debug, Clone, FromRow)]
pub struct Note {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub color: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// 作成・更新時の入力値
///
/// 更新時、空文字のフィールドは既存値を上書きしない
#[derive(Debug, Clone, Default)]
pub struct NoteInput {
    pub title: String,
    pub content: String,
    pub color: String,
}
