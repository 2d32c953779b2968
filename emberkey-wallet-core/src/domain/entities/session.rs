use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::types::Address;

/// An authenticated session for the unlocked wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub address: Address,
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
}

/// What the session leaves in process-scoped storage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    /// Unix milliseconds
    pub last_heartbeat: i64,
}

impl From<&Session> for SessionRecord {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.session_id.clone(),
            last_heartbeat: session.last_heartbeat.timestamp_millis(),
        }
    }
}
