//! Session Types
//!
//! Sessions are issued by the external auth collaborator and consumed
//! read-only by submission intake. They carry no expiry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated platform session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Opaque external account id
    pub external_account_id: String,
    pub username: Option<String>,
    /// Credential presented to the metrics provider
    pub access_token: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSession {
    pub external_account_id: String,
    pub username: Option<String>,
    pub access_token: String,
}

impl Session {
    pub fn from_new(id: impl Into<String>, new: NewSession, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            external_account_id: new.external_account_id,
            username: new.username,
            access_token: new.access_token,
            created_at,
        }
    }
}
