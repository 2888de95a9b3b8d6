//! HTML ページの組み立て
//!
//! 利用者の入力やDBの値を埋め込むときは必ず `escape` を通す。

use std::fmt::Write;

use axum::http::StatusCode;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::models::{NOTE_COLORS, Note};
use crate::validation::{FieldErrors, MIN_PASSWORD_LEN, NoteForm};

/// HTML エスケープ
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn format_time(at: OffsetDateTime) -> String {
    at.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_default()
}

/// 共通レイアウト
///
/// `user` はサインイン中のメールアドレス（ナビゲーションの切り替えに使う）
fn layout(title: &str, user: Option<&str>, content: &str) -> String {
    let nav = match user {
        Some(email) => format!(
            "<a href=\"/note\">ノート一覧</a> <a href=\"/note/new\">新規作成</a> \
             <span class=\"user\">{}</span> <a href=\"/user/signout\">サインアウト</a>",
            escape(email)
        ),
        None => "<a href=\"/user/signin\">サインイン</a> <a href=\"/user/signup\">新規登録</a>"
            .to_string(),
    };

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"ja\">\n\
         <head><meta charset=\"utf-8\"><title>{title} - quicknotes</title></head>\n\
         <body>\n\
         <header><a href=\"/\">quicknotes</a> <nav>{nav}</nav></header>\n\
         <main>\n{content}\n</main>\n\
         </body>\n\
         </html>\n",
        title = escape(title),
    )
}

fn field_error(errors: &FieldErrors, field: &str) -> String {
    errors
        .get(field)
        .map(|msg| format!("<p class=\"error\">{}</p>", escape(msg)))
        .unwrap_or_default()
}

fn notice(message: Option<&str>) -> String {
    message
        .map(|msg| format!("<p class=\"notice\">{}</p>", escape(msg)))
        .unwrap_or_default()
}

fn message_page(title: &str, user: Option<&str>, message: &str, link: (&str, &str)) -> String {
    let content = format!(
        "<h1>{}</h1>\n<p>{}</p>\n<p><a href=\"{}\">{}</a></p>",
        escape(title),
        escape(message),
        link.0,
        escape(link.1)
    );
    layout(title, user, &content)
}

pub fn home(user: Option<&str>) -> String {
    let content = match user {
        Some(_) => "<h1>quicknotes</h1>\n<p><a href=\"/note\">ノート一覧へ</a></p>".to_string(),
        None => "<h1>quicknotes</h1>\n\
                 <p>シンプルなメモアプリです。</p>\n\
                 <p><a href=\"/user/signup\">新規登録</a> または <a href=\"/user/signin\">サインイン</a></p>"
            .to_string(),
    };
    layout("ホーム", user, &content)
}

// === アカウント ===

pub fn signup_form(email: &str, errors: &FieldErrors) -> String {
    let content = format!(
        "<h1>新規登録</h1>\n\
         <form method=\"post\" action=\"/user/signup\">\n\
         <label>メールアドレス <input type=\"email\" name=\"email\" value=\"{email}\"></label>\n{email_error}\
         <label>パスワード <input type=\"password\" name=\"password\"></label>\n{password_error}\
         <p class=\"hint\">{min}文字以上、英字と数字を含めてください</p>\n\
         <button type=\"submit\">登録</button>\n\
         </form>",
        email = escape(email),
        email_error = field_error(errors, "email"),
        password_error = field_error(errors, "password"),
        min = MIN_PASSWORD_LEN,
    );
    layout("新規登録", None, &content)
}

pub fn signup_success(email: &str) -> String {
    message_page(
        "確認メールを送信しました",
        None,
        &format!("{email} 宛てに確認メールを送信しました。メール内のリンクを開いて登録を完了してください。"),
        ("/user/signin", "サインインへ"),
    )
}

pub fn confirm_success() -> String {
    message_page(
        "アカウントを有効化しました",
        None,
        "登録が完了しました。サインインしてください。",
        ("/user/signin", "サインインへ"),
    )
}

pub fn confirm_failed() -> String {
    message_page(
        "確認できませんでした",
        None,
        "リンクが無効か、既に確認済みのアカウントです。",
        ("/user/signin", "サインインへ"),
    )
}

pub fn signin_form(email: &str, errors: &FieldErrors, message: Option<&str>) -> String {
    let content = format!(
        "<h1>サインイン</h1>\n{notice}\n\
         <form method=\"post\" action=\"/user/signin\">\n\
         <label>メールアドレス <input type=\"email\" name=\"email\" value=\"{email}\"></label>\n{email_error}\
         <label>パスワード <input type=\"password\" name=\"password\"></label>\n{password_error}\
         <button type=\"submit\">サインイン</button>\n\
         </form>\n\
         <p><a href=\"/user/forgetpassword\">パスワードをお忘れですか？</a></p>",
        notice = notice(message),
        email = escape(email),
        email_error = field_error(errors, "email"),
        password_error = field_error(errors, "password"),
    );
    layout("サインイン", None, &content)
}

pub fn forget_form(email: &str, errors: &FieldErrors) -> String {
    let content = format!(
        "<h1>パスワードの再設定</h1>\n\
         <p>登録済みのメールアドレスを入力してください。再設定用のリンクを送信します。</p>\n\
         <form method=\"post\" action=\"/user/forgetpassword\">\n\
         <label>メールアドレス <input type=\"email\" name=\"email\" value=\"{email}\"></label>\n{email_error}\
         <button type=\"submit\">送信</button>\n\
         </form>",
        email = escape(email),
        email_error = field_error(errors, "email"),
    );
    layout("パスワードの再設定", None, &content)
}

/// アカウントの有無にかかわらず同じ内容を返す
pub fn forget_sent() -> String {
    message_page(
        "メールを確認してください",
        None,
        "入力されたメールアドレスが登録済みの場合、パスワード再設定用のリンクを送信しました。",
        ("/user/signin", "サインインへ"),
    )
}

pub fn reset_form(token: &str, errors: &FieldErrors) -> String {
    let content = format!(
        "<h1>新しいパスワード</h1>\n{token_error}\
         <form method=\"post\" action=\"/user/password\">\n\
         <input type=\"hidden\" name=\"token\" value=\"{token}\">\n\
         <label>パスワード <input type=\"password\" name=\"password\"></label>\n{password_error}\
         <p class=\"hint\">{min}文字以上、英字と数字を含めてください</p>\n\
         <button type=\"submit\">変更</button>\n\
         </form>",
        token = escape(token),
        token_error = field_error(errors, "token"),
        password_error = field_error(errors, "password"),
        min = MIN_PASSWORD_LEN,
    );
    layout("新しいパスワード", None, &content)
}

pub fn reset_done() -> String {
    message_page(
        "パスワードを変更しました",
        None,
        "新しいパスワードでサインインしてください。",
        ("/user/signin", "サインインへ"),
    )
}

pub fn reset_failed() -> String {
    message_page(
        "パスワードを変更できませんでした",
        None,
        "リンクが無効か、有効期限が切れています。もう一度やり直してください。",
        ("/user/forgetpassword", "再設定をやり直す"),
    )
}

// === ノート ===

pub fn note_list(user: &str, notes: &[Note]) -> String {
    let mut content = String::from("<h1>ノート一覧</h1>\n");
    if notes.is_empty() {
        content.push_str("<p>ノートはまだありません。<a href=\"/note/new\">作成する</a></p>");
    } else {
        content.push_str("<ul class=\"notes\">\n");
        for note in notes {
            let _ = writeln!(
                content,
                "<li class=\"{color}\"><a href=\"/note/{id}\">{title}</a> <time>{updated}</time></li>",
                color = escape(&note.color),
                id = note.id,
                title = escape(&note.title),
                updated = format_time(note.updated_at),
            );
        }
        content.push_str("</ul>");
    }
    layout("ノート一覧", Some(user), &content)
}

pub fn note_view(user: &str, note: &Note) -> String {
    let content = format!(
        "<article class=\"{color}\">\n\
         <h1>{title}</h1>\n\
         <pre>{body}</pre>\n\
         <p><time>{updated}</time></p>\n\
         </article>\n\
         <p><a href=\"/note/{id}/edit\">編集</a> \
         <button type=\"button\" id=\"delete-note\">削除</button></p>\n\
         <script>\n\
         document.getElementById(\"delete-note\").addEventListener(\"click\", async () => {{\n\
           if (!confirm(\"このノートを削除しますか？\")) return;\n\
           const res = await fetch(\"/note/{id}\", {{ method: \"DELETE\" }});\n\
           if (res.ok) window.location.href = \"/note\";\n\
         }});\n\
         </script>",
        color = escape(&note.color),
        title = escape(&note.title),
        body = escape(&note.content),
        updated = format_time(note.updated_at),
        id = note.id,
    );
    layout(&note.title, Some(user), &content)
}

pub fn note_form(user: &str, form: &NoteForm, errors: &FieldErrors) -> String {
    let heading = if form.note_id().is_some() {
        "ノートの編集"
    } else {
        "新しいノート"
    };

    let mut options = String::new();
    for color in NOTE_COLORS {
        let selected = if form.color == color { " selected" } else { "" };
        let _ = write!(options, "<option value=\"{color}\"{selected}>{color}</option>");
    }

    let content = format!(
        "<h1>{heading}</h1>\n\
         <form method=\"post\" action=\"/note\">\n\
         <input type=\"hidden\" name=\"id\" value=\"{id}\">\n\
         <label>タイトル <input type=\"text\" name=\"title\" value=\"{title}\"></label>\n{title_error}\
         <label>本文 <textarea name=\"content\">{body}</textarea></label>\n{content_error}\
         <label>色 <select name=\"color\"><option value=\"\"></option>{options}</select></label>\n{color_error}\
         <button type=\"submit\">保存</button>\n\
         </form>",
        id = escape(&form.id),
        title = escape(&form.title),
        body = escape(&form.content),
        title_error = field_error(errors, "title"),
        content_error = field_error(errors, "content"),
        color_error = field_error(errors, "color"),
    );
    layout(heading, Some(user), &content)
}

// === エラー ===

pub fn error_page(status: StatusCode, message: &str, errors: Option<&FieldErrors>) -> String {
    let mut content = format!(
        "<h1>{} {}</h1>\n<p>{}</p>\n",
        status.as_u16(),
        escape(status.canonical_reason().unwrap_or("Error")),
        escape(message)
    );
    if let Some(errors) = errors.filter(|e| !e.is_empty()) {
        content.push_str("<ul class=\"errors\">\n");
        for (field, msg) in errors.iter() {
            let _ = writeln!(content, "<li>{}: {}</li>", escape(field), escape(msg));
        }
        content.push_str("</ul>\n");
    }
    content.push_str("<p><a href=\"/\">トップへ戻る</a></p>");
    layout("エラー", None, &content)
}

pub fn not_found() -> String {
    message_page(
        "ページが見つかりません",
        None,
        "お探しのページは存在しないか、削除されました。",
        ("/", "トップへ戻る"),
    )
}
