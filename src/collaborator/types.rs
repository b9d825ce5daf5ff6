//! Request, response and event types exchanged with collaborators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Inbound call presented to the decision pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Unique among live calls
    pub call_id: String,
    pub caller: String,
    pub callee: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CallRequest {
    pub fn new(
        call_id: impl Into<String>,
        caller: impl Into<String>,
        callee: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            caller: caller.into(),
            callee: callee.into(),
            metadata: HashMap::new(),
        }
    }
}

/// Authenticator verdict. Only `verified` and `attestation_level` drive
/// decisions; `error_code` is carried into logs and events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub verified: bool,
    pub attestation_level: Option<String>,
    pub error_code: Option<String>,
}

impl Verification {
    pub fn verified(attestation_level: impl Into<String>) -> Self {
        Self {
            verified: true,
            attestation_level: Some(attestation_level.into()),
            error_code: None,
        }
    }

    pub fn rejected(error_code: impl Into<String>) -> Self {
        Self {
            verified: false,
            attestation_level: None,
            error_code: Some(error_code.into()),
        }
    }
}

/// Opaque session key material. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey(Vec<u8>);

impl SessionKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw key bytes, for encryptor implementations only
    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

/// Session issued by a [`SessionEncryptor`](super::SessionEncryptor)
#[derive(Debug, Clone)]
pub struct EncryptionSession {
    pub id: String,
    pub key: SessionKey,
    pub expires_at: DateTime<Utc>,
}

/// Encrypted payload, opaque to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CipherBundle {
    pub session_id: String,
    pub ciphertext: Vec<u8>,
}

/// Kind of call lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CallStarted,
    CallVerified,
    RouteSelected,
    RiskAssessed,
    CallCompleted,
    CallAborted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CallStarted => "call_started",
            EventKind::CallVerified => "call_verified",
            EventKind::RouteSelected => "route_selected",
            EventKind::RiskAssessed => "risk_assessed",
            EventKind::CallCompleted => "call_completed",
            EventKind::CallAborted => "call_aborted",
        }
    }
}

/// Structured record appended to the analytics sink
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleEvent {
    pub event_id: Uuid,
    pub call_id: String,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub attributes: serde_json::Value,
}

impl LifecycleEvent {
    pub fn new(call_id: &str, kind: EventKind, attributes: serde_json::Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            call_id: call_id.to_string(),
            kind,
            timestamp: Utc::now(),
            attributes,
        }
    }
}
