use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::models::Note;
use crate::state::AppState;
use crate::validation::{self, FieldErrors, NoteForm};
use crate::views;

/// GET /note
pub async fn list_notes(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    let notes = state.note_repo.list(user.id).await?;
    Ok(Html(views::note_list(&user.email, &notes)))
}

/// GET /note/new
pub async fn new_note(user: AuthUser) -> Html<String> {
    Html(views::note_form(
        &user.email,
        &NoteForm::default(),
        &FieldErrors::new(),
    ))
}

/// POST /note
///
/// hidden の `id` が正の整数なら更新、それ以外は新規作成
pub async fn save_note(
    user: AuthUser,
    State(state): State<AppState>,
    Form(form): Form<NoteForm>,
) -> Result<Response, AppError> {
    if let Err(e) = validation::check(&form) {
        let AppError::Validation(errors) = e else {
            return Err(e);
        };
        let page = views::note_form(&user.email, &form, &errors);
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response());
    }

    let note = match form.note_id() {
        Some(id) => {
            state
                .note_repo
                .update(user.id, id, &form.to_update_input())
                .await?
        }
        None => {
            state
                .note_repo
                .create(user.id, &form.to_create_input())
                .await?
        }
    };

    tracing::info!(user_id = %user.id, note_id = %note.id, "ノート保存");

    Ok(Redirect::to(&format!("/note/{}", note.id)).into_response())
}

/// GET /note/{id}
pub async fn view_note(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let note = state.note_repo.get_by_id(user.id, parse_note_id(&id)?).await?;
    Ok(Html(views::note_view(&user.email, &note)))
}

/// GET /note/{id}/edit
pub async fn edit_note(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let note = state.note_repo.get_by_id(user.id, parse_note_id(&id)?).await?;
    Ok(Html(views::note_form(
        &user.email,
        &edit_form(&note),
        &FieldErrors::new(),
    )))
}

/// DELETE /note/{id}
pub async fn delete_note(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_note_id(&id)?;
    state.note_repo.delete(user.id, id).await?;

    tracing::info!(user_id = %user.id, note_id = %id, "ノート削除");

    Ok(StatusCode::OK)
}

/// パスの ID は正の整数のみ受け付ける
fn parse_note_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest("不正なノートIDです".to_string()))
}

fn edit_form(note: &Note) -> NoteForm {
    NoteForm {
        id: note.id.to_string(),
        title: note.title.clone(),
        content: note.content.clone(),
        color: note.color.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::TestApp;
    use crate::repositories::{NoteRepository, RepositoryError};

    fn alice() -> AuthUser {
        AuthUser {
            id: 1,
            email: "alice@b.com".to_string(),
        }
    }

    fn bob() -> AuthUser {
        AuthUser {
            id: 2,
            email: "bob@b.com".to_string(),
        }
    }

    fn note_form(id: &str, title: &str, content: &str, color: &str) -> Form<NoteForm> {
        Form(NoteForm {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            color: color.to_string(),
        })
    }

    fn location(response: &Response) -> &str {
        response.headers()["location"].to_str().unwrap()
    }

    #[test]
    fn test_parse_note_id() {
        assert_eq!(parse_note_id("12").unwrap(), 12);
        for raw in ["0", "-1", "abc", "", "1.5"] {
            assert!(matches!(parse_note_id(raw), Err(AppError::BadRequest(_))));
        }
    }

    #[tokio::test]
    async fn test_create_note_redirects_to_note() {
        let app = TestApp::new();

        let response = save_note(
            alice(),
            State(app.state.clone()),
            note_form("", "title", "body", ""),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let notes = app.notes.list(1).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].color, "color3");
        assert_eq!(location(&response), format!("/note/{}", notes[0].id));
    }

    #[tokio::test]
    async fn test_save_note_requires_title_and_content() {
        let app = TestApp::new();

        let response = save_note(alice(), State(app.state.clone()), note_form("", "", "", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(app.notes.list(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_note() {
        let app = TestApp::new();
        save_note(alice(), State(app.state.clone()), note_form("", "old", "body", "color1"))
            .await
            .unwrap();
        let id = app.notes.list(1).await.unwrap()[0].id;

        save_note(
            alice(),
            State(app.state.clone()),
            note_form(&id.to_string(), "new", "body", "color1"),
        )
        .await
        .unwrap();

        let notes = app.notes.list(1).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "new");
    }

    #[tokio::test]
    async fn test_update_with_blank_color_keeps_color() {
        let app = TestApp::new();
        save_note(alice(), State(app.state.clone()), note_form("", "title", "body", "color7"))
            .await
            .unwrap();
        let id = app.notes.list(1).await.unwrap()[0].id;

        save_note(
            alice(),
            State(app.state.clone()),
            note_form(&id.to_string(), "title", "new body", ""),
        )
        .await
        .unwrap();

        let note = app.notes.get_by_id(1, id).await.unwrap();
        assert_eq!(note.color, "color7");
        assert_eq!(note.content, "new body");
    }

    #[tokio::test]
    async fn test_other_users_note_is_not_found() {
        let app = TestApp::new();
        save_note(alice(), State(app.state.clone()), note_form("", "mine", "x", ""))
            .await
            .unwrap();
        let id = app.notes.list(1).await.unwrap()[0].id.to_string();

        let view = view_note(bob(), State(app.state.clone()), Path(id.clone())).await;
        let edit = edit_note(bob(), State(app.state.clone()), Path(id.clone())).await;
        let delete = delete_note(bob(), State(app.state.clone()), Path(id)).await;

        for result in [view.map(|_| ()), edit.map(|_| ()), delete.map(|_| ())] {
            assert!(matches!(
                result,
                Err(AppError::Repository(RepositoryError::NotFound))
            ));
        }
        assert_eq!(app.notes.list(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_note() {
        let app = TestApp::new();
        for title in ["a", "b"] {
            save_note(alice(), State(app.state.clone()), note_form("", title, "x", ""))
                .await
                .unwrap();
        }
        let target = app.notes.list(1).await.unwrap()[0].id;

        let status = delete_note(alice(), State(app.state.clone()), Path(target.to_string()))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::OK);
        let remaining = app.notes.list(1).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_ne!(remaining[0].id, target);
    }

    #[tokio::test]
    async fn test_invalid_path_id_is_bad_request() {
        let app = TestApp::new();

        let result = view_note(alice(), State(app.state.clone()), Path("abc".to_string())).await;

        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_edit_form_is_prefilled() {
        let app = TestApp::new();
        save_note(alice(), State(app.state.clone()), note_form("", "title", "body", "color7"))
            .await
            .unwrap();
        let id = app.notes.list(1).await.unwrap()[0].id;

        let page = edit_note(alice(), State(app.state.clone()), Path(id.to_string()))
            .await
            .unwrap();

        assert!(page.0.contains(&format!("name=\"id\" value=\"{id}\"")));
        assert!(page.0.contains("<option value=\"color7\" selected>"));
    }
}
