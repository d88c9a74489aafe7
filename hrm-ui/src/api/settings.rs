//! Setting management endpoints.
//!
//! Thin HTTP shell over [`SettingEditor`]: list, select, create, copy,
//! mark-default and delete, with the selection kept in the session.
//! Editor-level refusals (nothing selected, bad name) come back as a
//! normal response with `ok: false` and the editor message, mirroring
//! how the editor page presents them; only protocol-level problems
//! become HTTP errors.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use hrm_common::db::settings::SettingRow;
use hrm_common::{SettingEditor, SettingKind, SettingPhase, WizardPage};

use crate::api::wizard::initial_channels;
use crate::error::{ApiError, ApiResult};
use crate::session::{EditingState, SessionId};
use crate::AppState;

fn parse_kind(kind: &str) -> ApiResult<SettingKind> {
    SettingKind::parse(kind)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown setting kind: {}", kind)))
}

#[derive(Debug, Serialize)]
pub struct SettingEntry {
    pub name: String,
    pub standard: bool,
}

impl From<SettingRow> for SettingEntry {
    fn from(row: SettingRow) -> SettingEntry {
        SettingEntry {
            name: row.name,
            standard: row.standard,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SettingListResponse {
    pub settings: Vec<SettingEntry>,
    pub selected: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EditorResponse {
    pub ok: bool,
    pub message: String,
    pub selected: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

/// Load the session context an editor operation needs.
async fn session_context(
    state: &AppState,
    session: uuid::Uuid,
    kind: SettingKind,
) -> ApiResult<(String, Option<String>)> {
    state
        .sessions
        .update(session, |s| (s.user.clone(), s.selected.get(&kind).cloned()))
        .await
        .ok_or_else(|| ApiError::Unauthorized("Session expired".to_string()))
}

/// Store the editor outcome back into the session and shape the
/// response.
async fn finish_editor_op(
    state: &AppState,
    session: uuid::Uuid,
    kind: SettingKind,
    editor: SettingEditor,
    ok: bool,
) -> ApiResult<Json<EditorResponse>> {
    let selected = editor.selected().map(str::to_string);
    let message = editor.message().to_string();
    let stored = selected.clone();
    state
        .sessions
        .update(session, move |s| match stored {
            Some(name) => {
                s.selected.insert(kind, name);
            }
            None => {
                s.selected.remove(&kind);
            }
        })
        .await
        .ok_or_else(|| ApiError::Unauthorized("Session expired".to_string()))?;
    Ok(Json(EditorResponse {
        ok,
        message,
        selected,
    }))
}

/// GET /api/settings/{kind}
pub async fn list_settings(
    State(state): State<AppState>,
    SessionId(session): SessionId,
    Path(kind): Path<String>,
) -> ApiResult<Json<SettingListResponse>> {
    let kind = parse_kind(&kind)?;
    let (user, selected) = session_context(&state, session, kind).await?;
    let mut editor = SettingEditor::new(state.db.clone(), &user, kind);
    editor.restore_selection(selected);
    let settings = editor.settings().await?;
    Ok(Json(SettingListResponse {
        settings: settings.into_iter().map(SettingEntry::from).collect(),
        selected: editor.selected().map(str::to_string),
    }))
}

/// GET /api/settings/{kind}/public
pub async fn list_public_settings(
    State(state): State<AppState>,
    SessionId(session): SessionId,
    Path(kind): Path<String>,
) -> ApiResult<Json<Vec<SettingEntry>>> {
    let kind = parse_kind(&kind)?;
    let (user, _) = session_context(&state, session, kind).await?;
    let editor = SettingEditor::new(state.db.clone(), &user, kind);
    let templates = editor.public_settings().await?;
    Ok(Json(templates.into_iter().map(SettingEntry::from).collect()))
}

/// POST /api/settings/{kind}
///
/// Creates a new, empty setting and opens the wizard on it. Nothing is
/// stored yet; the setting is listed and selectable only once the
/// wizard's final page validates and saves it.
pub async fn create_setting(
    State(state): State<AppState>,
    SessionId(session): SessionId,
    Path(kind): Path<String>,
    Json(req): Json<NameRequest>,
) -> ApiResult<Json<EditorResponse>> {
    let kind = parse_kind(&kind)?;
    let (user, selected) = session_context(&state, session, kind).await?;
    let mut editor = SettingEditor::new(state.db.clone(), &user, kind);
    editor.restore_selection(selected);
    if editor.setting(req.name.trim()).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "A setting with the name {} already exists",
            req.name.trim()
        )));
    }
    let Some(mut setting) = editor.create_new_setting(&req.name).await? else {
        return finish_editor_op(&state, session, kind, editor, false).await;
    };

    let image_selection = state
        .sessions
        .update(session, |s| s.selected.get(&SettingKind::Image).cloned())
        .await
        .ok_or_else(|| ApiError::Unauthorized("Session expired".to_string()))?;
    let channels = initial_channels(&state, &user, kind, image_selection).await?;
    setting.set_number_of_channels(channels);

    state
        .sessions
        .update(session, move |s| {
            s.editing.insert(
                kind,
                EditingState {
                    setting,
                    page: WizardPage::first(kind),
                    phase: SettingPhase::Empty,
                },
            );
        })
        .await
        .ok_or_else(|| ApiError::Unauthorized("Session expired".to_string()))?;
    finish_editor_op(&state, session, kind, editor, true).await
}

/// POST /api/settings/{kind}/select
pub async fn select_setting(
    State(state): State<AppState>,
    SessionId(session): SessionId,
    Path(kind): Path<String>,
    Json(req): Json<NameRequest>,
) -> ApiResult<Json<EditorResponse>> {
    let kind = parse_kind(&kind)?;
    let (user, selected) = session_context(&state, session, kind).await?;
    let mut editor = SettingEditor::new(state.db.clone(), &user, kind);
    editor.restore_selection(selected);
    let ok = editor.select(&req.name).await?;
    finish_editor_op(&state, session, kind, editor, ok).await
}

/// POST /api/settings/{kind}/copy
pub async fn copy_setting(
    State(state): State<AppState>,
    SessionId(session): SessionId,
    Path(kind): Path<String>,
    Json(req): Json<NameRequest>,
) -> ApiResult<Json<EditorResponse>> {
    let kind = parse_kind(&kind)?;
    let (user, selected) = session_context(&state, session, kind).await?;
    let mut editor = SettingEditor::new(state.db.clone(), &user, kind);
    editor.restore_selection(selected);
    let ok = editor.copy_selected_setting(&req.name).await?;
    finish_editor_op(&state, session, kind, editor, ok).await
}

/// POST /api/settings/{kind}/copy_public
pub async fn copy_public_setting(
    State(state): State<AppState>,
    SessionId(session): SessionId,
    Path(kind): Path<String>,
    Json(req): Json<NameRequest>,
) -> ApiResult<Json<EditorResponse>> {
    let kind = parse_kind(&kind)?;
    let (user, selected) = session_context(&state, session, kind).await?;
    let mut editor = SettingEditor::new(state.db.clone(), &user, kind);
    editor.restore_selection(selected);
    let ok = editor.copy_public_setting(&req.name).await?;
    finish_editor_op(&state, session, kind, editor, ok).await
}

/// POST /api/settings/{kind}/default
pub async fn make_default(
    State(state): State<AppState>,
    SessionId(session): SessionId,
    Path(kind): Path<String>,
) -> ApiResult<Json<EditorResponse>> {
    let kind = parse_kind(&kind)?;
    let (user, selected) = session_context(&state, session, kind).await?;
    let mut editor = SettingEditor::new(state.db.clone(), &user, kind);
    editor.restore_selection(selected);
    let ok = editor.make_selected_setting_default().await?;
    finish_editor_op(&state, session, kind, editor, ok).await
}

/// DELETE /api/settings/{kind}
pub async fn delete_setting(
    State(state): State<AppState>,
    SessionId(session): SessionId,
    Path(kind): Path<String>,
) -> ApiResult<Json<EditorResponse>> {
    let kind = parse_kind(&kind)?;
    let (user, selected) = session_context(&state, session, kind).await?;
    let mut editor = SettingEditor::new(state.db.clone(), &user, kind);
    editor.restore_selection(selected);
    let ok = editor.delete_selected_setting().await?;
    finish_editor_op(&state, session, kind, editor, ok).await
}

pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/settings/:kind",
            get(list_settings).post(create_setting).delete(delete_setting),
        )
        .route("/api/settings/:kind/public", get(list_public_settings))
        .route("/api/settings/:kind/select", post(select_setting))
        .route("/api/settings/:kind/copy", post(copy_setting))
        .route("/api/settings/:kind/copy_public", post(copy_public_setting))
        .route("/api/settings/:kind/default", post(make_default))
}
