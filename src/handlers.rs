//! HTTP route handlers for the command surface.
//!
//! Each handler maps one UI command onto a store call and answers with JSON.
//! Note routes require a signed-in identity; session and chat routes do not.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::error::{ChatError, ConversationError};
use crate::models::{AskOptions, Note, NoteFilter, NoteId, NotePatch};
use crate::{lock, AppState};

/// Router with every `/api` route bound to `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Session routes
        .route("/api/session", get(session))
        .route("/api/login", post(login))
        .route("/api/register", post(register))
        .route("/api/logout", post(logout))
        // Note routes
        .route("/api/notes", get(list_notes).post(create_note))
        .route("/api/notes/selected", get(selected_note))
        .route("/api/notes/{id}", post(update_note).delete(delete_note))
        .route("/api/notes/{id}/select", post(select_note))
        .route("/api/notes/{id}/star", post(toggle_star))
        // Chat routes
        .route("/api/chat", get(chat_log).post(chat_send))
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn require_login(state: &AppState) -> Result<(), Response> {
    if lock(&state.session).is_authenticated() {
        Ok(())
    } else {
        Err(error_response(StatusCode::UNAUTHORIZED, "Not logged in"))
    }
}

// ============================================================================
// Session Handlers
// ============================================================================

#[derive(Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn session(State(state): State<Arc<AppState>>) -> Response {
    let session = lock(&state.session);
    Json(json!({ "user": session.current() })).into_response()
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Credentials>,
) -> Response {
    match lock(&state.session).login(&body.email, &body.password) {
        Ok(user) => Json(json!({ "user": user })).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Credentials>,
) -> Response {
    match lock(&state.session).register(&body.email, &body.password) {
        Ok(user) => Json(json!({ "user": user })).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

pub async fn logout(State(state): State<Arc<AppState>>) -> Response {
    lock(&state.session).logout();
    Json(json!({ "user": null })).into_response()
}

// ============================================================================
// Note Handlers
// ============================================================================

#[derive(Deserialize, Default)]
pub struct ListQuery {
    #[serde(default)]
    pub filter: NoteFilter,
    pub q: Option<String>,
}

/// List row: the note plus its display projections.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NoteListItem<'a> {
    #[serde(flatten)]
    note: &'a Note,
    display_title: &'a str,
    snippet: String,
}

impl<'a> From<&'a Note> for NoteListItem<'a> {
    fn from(note: &'a Note) -> Self {
        Self {
            note,
            display_title: note.display_title(),
            snippet: note.snippet(),
        }
    }
}

pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Response {
    if let Err(resp) = require_login(&state) {
        return resp;
    }
    let repo = lock(&state.notes);
    let items: Vec<NoteListItem<'_>> = match query.q.as_deref() {
        Some(q) => repo
            .search(query.filter, q)
            .into_iter()
            .map(NoteListItem::from)
            .collect(),
        None => repo.list(query.filter).iter().map(NoteListItem::from).collect(),
    };
    Json(json!({
        "filter": query.filter,
        "selectedNoteId": repo.selected_id(),
        "notes": items,
    }))
    .into_response()
}

pub async fn create_note(State(state): State<Arc<AppState>>) -> Response {
    if let Err(resp) = require_login(&state) {
        return resp;
    }
    let note = lock(&state.notes).create();
    (StatusCode::CREATED, Json(note)).into_response()
}

pub async fn selected_note(State(state): State<Arc<AppState>>) -> Response {
    if let Err(resp) = require_login(&state) {
        return resp;
    }
    let repo = lock(&state.notes);
    Json(json!({ "note": repo.selected() })).into_response()
}

pub async fn update_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<NoteId>,
    Json(patch): Json<NotePatch>,
) -> Response {
    if let Err(resp) = require_login(&state) {
        return resp;
    }
    let mut repo = lock(&state.notes);
    repo.update(id, patch);
    Json(json!({ "note": repo.get(id) })).into_response()
}

pub async fn delete_note(State(state): State<Arc<AppState>>, Path(id): Path<NoteId>) -> Response {
    if let Err(resp) = require_login(&state) {
        return resp;
    }
    lock(&state.notes).delete(id);
    StatusCode::NO_CONTENT.into_response()
}

pub async fn select_note(State(state): State<Arc<AppState>>, Path(id): Path<NoteId>) -> Response {
    if let Err(resp) = require_login(&state) {
        return resp;
    }
    lock(&state.notes).select(id);
    StatusCode::NO_CONTENT.into_response()
}

pub async fn toggle_star(State(state): State<Arc<AppState>>, Path(id): Path<NoteId>) -> Response {
    if let Err(resp) = require_login(&state) {
        return resp;
    }
    let mut repo = lock(&state.notes);
    repo.toggle_star(id);
    Json(json!({ "note": repo.get(id) })).into_response()
}

// ============================================================================
// Chat Handlers
// ============================================================================

#[derive(Deserialize)]
pub struct AskRequest {
    pub prompt: String,
    pub top_k: Option<u32>,
}

fn conversation_json(state: &AppState) -> serde_json::Value {
    let convo = lock(&state.conversation);
    json!({
        "messages": convo.messages(),
        "busy": convo.is_busy(),
        "error": convo.last_error(),
    })
}

pub async fn chat_log(State(state): State<Arc<AppState>>) -> Response {
    Json(conversation_json(&state)).into_response()
}

pub async fn chat_send(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AskRequest>,
) -> Response {
    let begun = lock(&state.conversation).begin_send(&body.prompt);
    let pending = match begun {
        Ok(pending) => pending,
        Err(e @ ConversationError::Busy) => {
            return error_response(StatusCode::CONFLICT, e.to_string())
        }
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let options = body
        .top_k
        .map(|top_k| AskOptions { top_k })
        .unwrap_or_default();

    // The round trip runs detached so a dropped request still completes the send.
    let task_state = state.clone();
    let round_trip = tokio::spawn(async move {
        let result = task_state.chat.ask(pending.prompt(), options).await;
        let failure = result.as_ref().err().map(|e| {
            match e {
                ChatError::Upstream { status, .. } => warn!(
                    "event=chat_send module=handlers status=error kind={} http_status={}",
                    e.kind(),
                    status
                ),
                _ => warn!(
                    "event=chat_send module=handlers status=error kind={}",
                    e.kind()
                ),
            }
            e.user_message()
        });
        lock(&task_state.conversation).complete(pending, result);
        failure
    });

    match round_trip.await {
        Ok(None) => Json(conversation_json(&state)).into_response(),
        Ok(Some(message)) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": message, "conversation": conversation_json(&state) })),
        )
            .into_response(),
        Err(e) => {
            error!("event=chat_send module=handlers status=aborted error={}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "chat request aborted")
        }
    }
}
