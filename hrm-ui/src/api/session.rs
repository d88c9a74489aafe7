//! Session creation

use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Response};
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::session::SESSION_COOKIE;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub user: String,
}

/// POST /api/session
///
/// Opens a session for a user and hands the session id back both in
/// the body and as a cookie.
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<Response> {
    let user = req.user.trim();
    if user.is_empty() {
        return Err(ApiError::BadRequest("A user name is required".to_string()));
    }
    let id = state.sessions.create(user).await;
    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
    Ok((
        [(SET_COOKIE, cookie)],
        Json(json!({ "session": id, "user": user })),
    )
        .into_response())
}

pub fn session_routes() -> Router<AppState> {
    Router::new().route("/api/session", post(create_session))
}
