//! # Sessions
//!
//! Session model shared by the dispatcher and the session client.
//! Sessions are owned by the session store; the dispatcher only borrows
//! one for the duration of a request.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Authenticated session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique session identifier
    pub id: String,

    /// When the session stops being valid
    pub expired_at: DateTime<Utc>,

    /// User entity this session belongs to
    pub entity_name: String,

    /// Id of the authenticated user
    pub user_id: String,

    /// Integrator-defined values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Value>,
}

impl Session {
    /// Materialize a session from a pre-session
    pub fn from_pre_session(id: impl Into<String>, pre: PreSession) -> Self {
        Self {
            id: id.into(),
            expired_at: pre.expired_at,
            entity_name: pre.entity_name,
            user_id: pre.user_id,
            values: pre.values,
        }
    }

    /// Whether the session has expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expired_at <= now
    }
}

/// Session store input produced by successful authentication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreSession {
    pub expired_at: DateTime<Utc>,
    pub entity_name: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Value>,
}

impl PreSession {
    /// Pre-session for `user_id` that expires after `ttl`
    pub fn new(entity_name: impl Into<String>, user_id: impl Into<String>, ttl: Duration) -> Self {
        Self {
            expired_at: Utc::now() + ttl,
            entity_name: entity_name.into(),
            user_id: user_id.into(),
            values: None,
        }
    }

    /// Attach integrator-defined values
    pub fn with_values(mut self, values: Value) -> Self {
        self.values = Some(values);
        self
    }
}
