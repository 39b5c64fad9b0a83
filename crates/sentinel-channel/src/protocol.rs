//! Channel wire protocol.
//!
//! Every frame is a JSON envelope `{ "type", "data", "timestamp" }` where
//! `timestamp` is Unix millis. Messages without a payload omit `data`.
//! Client frames are decoded into [`ClientMessage`] at the boundary; anything
//! else is rejected with a [`ChannelError`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sentinel_core::errors::ChannelError;
use sentinel_core::{GuardStats, Violation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationsPayload {
    pub file: PathBuf,
    pub violations: Vec<Violation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRef {
    pub violation_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixErrorPayload {
    pub violation_id: String,
    /// `[CODE] message`
    pub error: String,
}

/// Server → client messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// The complete violation set for one file; empty clears it.
    Violations(ViolationsPayload),
    Stats(GuardStats),
    FixApplied(ViolationRef),
    FixError(FixErrorPayload),
    ViolationDismissed(ViolationRef),
    Pong,
}

impl ServerMessage {
    pub fn violations(file: impl Into<PathBuf>, violations: Vec<Violation>) -> Self {
        Self::Violations(ViolationsPayload {
            file: file.into(),
            violations,
        })
    }

    pub fn fix_applied(violation_id: impl Into<String>) -> Self {
        Self::FixApplied(ViolationRef {
            violation_id: violation_id.into(),
        })
    }

    pub fn fix_error(violation_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::FixError(FixErrorPayload {
            violation_id: violation_id.into(),
            error: error.into(),
        })
    }

    pub fn violation_dismissed(violation_id: impl Into<String>) -> Self {
        Self::ViolationDismissed(ViolationRef {
            violation_id: violation_id.into(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Violations(_) => "violations",
            Self::Stats(_) => "stats",
            Self::FixApplied(_) => "fix-applied",
            Self::FixError(_) => "fix-error",
            Self::ViolationDismissed(_) => "violation-dismissed",
            Self::Pong => "pong",
        }
    }

    /// Serialize into a stamped envelope.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        self.encode_at(chrono::Utc::now().timestamp_millis())
    }

    pub fn encode_at(&self, timestamp_ms: i64) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let serde_json::Value::Object(map) = &mut value {
            map.insert("timestamp".to_string(), timestamp_ms.into());
        }
        serde_json::to_string(&value)
    }
}

/// Client → server messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    ApplyFix { violation_id: String },
    DismissViolation { violation_id: String },
    RequestStats,
    Ping,
    Pong,
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

const SERVER_ONLY: &[&str] = &[
    "violations",
    "stats",
    "fix-applied",
    "fix-error",
    "violation-dismissed",
];

fn violation_ref(kind: &str, data: serde_json::Value) -> Result<String, ChannelError> {
    let payload: ViolationRef =
        serde_json::from_value(data).map_err(|e| ChannelError::Malformed {
            message: format!("{kind}: {e}"),
        })?;
    if payload.violation_id.is_empty() {
        return Err(ChannelError::Malformed {
            message: format!("{kind}: empty violationId"),
        });
    }
    Ok(payload.violation_id)
}

impl ClientMessage {
    /// Decode one text frame. The timestamp is optional and ignored.
    pub fn decode(text: &str) -> Result<Self, ChannelError> {
        let raw: RawEnvelope = serde_json::from_str(text).map_err(|e| ChannelError::Malformed {
            message: e.to_string(),
        })?;
        match raw.kind.as_str() {
            "apply-fix" => Ok(Self::ApplyFix {
                violation_id: violation_ref(&raw.kind, raw.data)?,
            }),
            "dismiss-violation" => Ok(Self::DismissViolation {
                violation_id: violation_ref(&raw.kind, raw.data)?,
            }),
            "request-stats" => Ok(Self::RequestStats),
            "ping" => Ok(Self::Ping),
            "pong" => Ok(Self::Pong),
            kind if SERVER_ONLY.contains(&kind) => Err(ChannelError::NotAccepted {
                kind: raw.kind,
            }),
            _ => Err(ChannelError::UnknownType { kind: raw.kind }),
        }
    }
}
