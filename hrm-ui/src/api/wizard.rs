//! Wizard endpoints.
//!
//! A wizard edits one in-session setting per kind. Form submissions go
//! to `POST /api/wizard/{kind}/page/{page}` with a JSON object of
//! posted fields; the response tells the client whether to redisplay
//! the page, advance to another one, or that the setting has been
//! persisted.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use hrm_common::wizard::{self, NextStep};
use hrm_common::{db, FieldMap, Setting, SettingKind, SettingPhase, WizardPage};

use crate::error::{ApiError, ApiResult};
use crate::session::{EditingState, SessionId};
use crate::AppState;

/// One-shot flag raised when the pixel size calculator succeeds, so
/// the capturing page can announce the computed value once.
pub const PIXEL_SIZE_FLAG: &str = "pixel_size_calculated";

fn parse_kind(kind: &str) -> ApiResult<SettingKind> {
    SettingKind::parse(kind)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown setting kind: {}", kind)))
}

fn parse_page(page: &str) -> ApiResult<WizardPage> {
    WizardPage::parse(page)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown wizard page: {}", page)))
}

/// Convert a posted JSON object into a form field map. Arrays become
/// repeated fields (multi-selections); scalars become single fields.
fn field_map_from_json(body: &Value) -> ApiResult<FieldMap> {
    let object = body
        .as_object()
        .ok_or_else(|| ApiError::BadRequest("Expected a JSON object of fields".to_string()))?;
    let mut fields = FieldMap::new();
    for (key, value) in object {
        match value {
            Value::String(s) => fields.insert(key, s),
            Value::Number(n) => fields.insert(key, &n.to_string()),
            Value::Bool(b) => fields.insert(key, if *b { "true" } else { "false" }),
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(s) => fields.insert(key, s),
                        Value::Number(n) => fields.insert(key, &n.to_string()),
                        _ => {
                            return Err(ApiError::BadRequest(format!(
                                "Field {} contains a non-scalar entry",
                                key
                            )))
                        }
                    }
                }
            }
            Value::Object(_) => {
                return Err(ApiError::BadRequest(format!(
                    "Field {} must be a scalar or an array",
                    key
                )))
            }
        }
    }
    Ok(fields)
}

/// Channel count a fresh setting starts with. Restoration and analysis
/// settings describe the channels of an acquired image, so they inherit
/// the count from the user's selected image setting.
pub(crate) async fn initial_channels(
    state: &AppState,
    user: &str,
    kind: SettingKind,
    image_selection: Option<String>,
) -> ApiResult<usize> {
    if kind != SettingKind::Image {
        if let Some(image_name) = image_selection {
            if let Some(image) =
                db::settings::load_setting(&state.db, user, SettingKind::Image, &image_name)
                    .await?
            {
                return Ok(image.number_of_channels());
            }
        }
    }
    Ok(1)
}

#[derive(Debug, Deserialize)]
pub struct StartWizardRequest {
    pub name: String,
    /// Load an existing setting instead of starting from scratch.
    #[serde(default)]
    pub load: bool,
}

#[derive(Debug, Serialize)]
pub struct WizardStateResponse {
    pub name: String,
    pub page: WizardPage,
    pub phase: SettingPhase,
    pub message: String,
    pub display: String,
    pub pixel_size_calculated: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitResponse {
    Redisplay { message: String },
    Advance { next_page: WizardPage },
    Persisted { name: String },
}

/// POST /api/wizard/{kind}/start
pub async fn start_wizard(
    State(state): State<AppState>,
    SessionId(session): SessionId,
    Path(kind): Path<String>,
    Json(req): Json<StartWizardRequest>,
) -> ApiResult<Json<WizardStateResponse>> {
    let kind = parse_kind(&kind)?;
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("A setting name is required".to_string()));
    }

    let (user, image_selection) = state
        .sessions
        .update(session, |s| {
            (s.user.clone(), s.selected.get(&SettingKind::Image).cloned())
        })
        .await
        .ok_or_else(|| ApiError::Unauthorized("Session expired".to_string()))?;

    let (setting, phase) = if req.load {
        let setting = db::settings::load_setting(&state.db, &user, kind, &name)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("No {} setting named {}", kind, name)))?;
        (setting, SettingPhase::Editing)
    } else {
        if db::settings::exists(&state.db, &user, kind, &name).await? {
            return Err(ApiError::Conflict(format!(
                "A setting with the name {} already exists",
                name
            )));
        }
        let mut setting = Setting::new(kind);
        setting.set_name(&name);
        setting.set_owner(&user);
        setting.set_number_of_channels(initial_channels(&state, &user, kind, image_selection).await?);
        (setting, SettingPhase::Empty)
    };

    let page = WizardPage::first(kind);
    let response = WizardStateResponse {
        name: setting.name().to_string(),
        page,
        phase,
        message: String::new(),
        display: setting.display_string(),
        pixel_size_calculated: false,
    };
    state
        .sessions
        .update(session, move |s| {
            s.editing.insert(
                kind,
                EditingState {
                    setting,
                    page,
                    phase,
                },
            );
        })
        .await
        .ok_or_else(|| ApiError::Unauthorized("Session expired".to_string()))?;
    Ok(Json(response))
}

/// GET /api/wizard/{kind}
pub async fn wizard_state(
    State(state): State<AppState>,
    SessionId(session): SessionId,
    Path(kind): Path<String>,
) -> ApiResult<Json<WizardStateResponse>> {
    let kind = parse_kind(&kind)?;
    let response = state
        .sessions
        .update(session, |s| {
            let snapshot = s.editing.get(&kind).map(|es| {
                (
                    es.setting.name().to_string(),
                    es.page,
                    es.phase,
                    es.setting.message().to_string(),
                    es.setting.display_string(),
                )
            });
            snapshot.map(|(name, page, phase, message, display)| {
                // The one-shot notice belongs to the image wizard;
                // polling another kind must not consume it.
                let pixel_size_calculated =
                    kind == SettingKind::Image && s.take_flag(PIXEL_SIZE_FLAG);
                WizardStateResponse {
                    name,
                    page,
                    phase,
                    message,
                    display,
                    pixel_size_calculated,
                }
            })
        })
        .await
        .ok_or_else(|| ApiError::Unauthorized("Session expired".to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("No {} wizard in progress", kind)))?;
    Ok(Json(response))
}

/// POST /api/wizard/{kind}/page/{page}
pub async fn submit_page(
    State(state): State<AppState>,
    SessionId(session): SessionId,
    Path((kind, page)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> ApiResult<Json<SubmitResponse>> {
    let kind = parse_kind(&kind)?;
    let page = parse_page(&page)?;
    if page.kind() != kind {
        return Err(ApiError::BadRequest(format!(
            "Page {} does not belong to the {} wizard",
            page, kind
        )));
    }
    let posted = field_map_from_json(&body)?;

    enum Outcome {
        Redisplay(String),
        Advance(WizardPage),
        ReadyToSave(Setting),
    }

    let policy = state.policy.clone();
    let outcome = state
        .sessions
        .update(session, move |s| -> Result<Outcome, ApiError> {
            let es = s
                .editing
                .get_mut(&kind)
                .ok_or_else(|| ApiError::NotFound(format!("No {} wizard in progress", kind)))?;
            let step = wizard::submit(&mut es.setting, page, &posted);
            es.phase = es.phase.after(&step);
            match step {
                NextStep::Redisplay(message) => Ok(Outcome::Redisplay(message)),
                NextStep::Advance(next) => {
                    if page == WizardPage::CalculatePixelSize {
                        s.set_flag(PIXEL_SIZE_FLAG);
                    }
                    let es = s.editing.get_mut(&kind).expect("wizard checked above");
                    es.page = next;
                    Ok(Outcome::Advance(next))
                }
                NextStep::Persisted => {
                    es.setting.apply_confidence(&policy);
                    if !es.setting.check_setting() {
                        es.phase = SettingPhase::Editing;
                        return Ok(Outcome::Redisplay(es.setting.message().to_string()));
                    }
                    es.phase = SettingPhase::Validated;
                    Ok(Outcome::ReadyToSave(es.setting.clone()))
                }
            }
        })
        .await
        .ok_or_else(|| ApiError::Unauthorized("Session expired".to_string()))??;

    match outcome {
        Outcome::Redisplay(message) => Ok(Json(SubmitResponse::Redisplay { message })),
        Outcome::Advance(next_page) => Ok(Json(SubmitResponse::Advance { next_page })),
        Outcome::ReadyToSave(mut setting) => {
            if !setting.save(&state.db).await {
                // Validation passed; the wizard stays in its validated
                // phase so the client can retry the save.
                return Err(ApiError::Internal(
                    "The setting could not be saved".to_string(),
                ));
            }
            let name = setting.name().to_string();
            info!("Persisted {} setting '{}'", kind, name);
            let selected = name.clone();
            state
                .sessions
                .update(session, move |s| {
                    s.editing.remove(&kind);
                    s.selected.insert(kind, selected);
                })
                .await;
            Ok(Json(SubmitResponse::Persisted { name }))
        }
    }
}

pub fn wizard_routes() -> Router<AppState> {
    Router::new()
        .route("/api/wizard/:kind", get(wizard_state))
        .route("/api/wizard/:kind/start", post(start_wizard))
        .route("/api/wizard/:kind/page/:page", post(submit_page))
}
