//! In-memory sessions.
//!
//! Each browser session holds the settings currently being edited in
//! the wizard, the per-kind editor selections and a handful of
//! one-shot flags (consumed on first read, e.g. "the pixel size was
//! just calculated"). Sessions expire after a period of inactivity and
//! are removed by a periodic sweep.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use hrm_common::{Setting, SettingKind, SettingPhase, WizardPage};

use crate::error::ApiError;

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "hrm_session";

/// One wizard in progress.
pub struct EditingState {
    pub setting: Setting,
    pub page: WizardPage,
    pub phase: SettingPhase,
}

/// Per-browser state.
pub struct Session {
    pub user: String,
    /// Wizards in progress, at most one per setting kind.
    pub editing: HashMap<SettingKind, EditingState>,
    /// Editor selection per setting kind.
    pub selected: HashMap<SettingKind, String>,
    flags: HashSet<String>,
    last_seen: DateTime<Utc>,
}

impl Session {
    fn new(user: &str) -> Session {
        Session {
            user: user.to_string(),
            editing: HashMap::new(),
            selected: HashMap::new(),
            flags: HashSet::new(),
            last_seen: Utc::now(),
        }
    }

    /// Raise a one-shot flag.
    pub fn set_flag(&mut self, flag: &str) {
        self.flags.insert(flag.to_string());
    }

    /// Consume a one-shot flag: true at most once per raise.
    pub fn take_flag(&mut self, flag: &str) -> bool {
        self.flags.remove(flag)
    }
}

/// Shared session table.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_minutes: i64) -> SessionStore {
        SessionStore {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Create a session for a user and hand back its id.
    pub async fn create(&self, user: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.write().await.insert(id, Session::new(user));
        id
    }

    /// Run a closure against a live session, refreshing its activity
    /// timestamp. `None` when the session is unknown or expired.
    pub async fn update<F, R>(&self, id: Uuid, f: F) -> Option<R>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut sessions = self.inner.write().await;
        let session = sessions.get_mut(&id)?;
        if Utc::now() - session.last_seen > self.ttl {
            sessions.remove(&id);
            return None;
        }
        session.last_seen = Utc::now();
        Some(f(session))
    }

    /// Drop all expired sessions; returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| now - s.last_seen <= self.ttl);
        before - sessions.len()
    }
}

/// Session id extractor: parses the session cookie and fails closed
/// with 401 when it is absent or malformed. Liveness is checked by the
/// handler against the store.
pub struct SessionId(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SessionId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(COOKIE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing session cookie".to_string()))?;
        for pair in header.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            if parts.next() == Some(SESSION_COOKIE) {
                if let Some(value) = parts.next() {
                    if let Ok(id) = Uuid::parse_str(value.trim()) {
                        return Ok(SessionId(id));
                    }
                }
            }
        }
        Err(ApiError::Unauthorized("Missing session cookie".to_string()))
    }
}
