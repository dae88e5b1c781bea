//! Wire envelope for the relay's WebSocket subprotocol.
//!
//! Every message exchanged over `/ws` is one JSON object with a `type` tag,
//! an optional `id`, and an opaque `payload`. The codec never inspects the
//! bytes inside `payload` — that's the caller's job.

use serde::{Deserialize, Serialize};

/// Maximum size, in bytes, of a message accepted from a client.
///
/// Registration and ack messages both fit comfortably under this; anything
/// larger is treated as a protocol violation.
pub const MAX_MESSAGE_SIZE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeType {
    Registration,
    Hello,
    Notification,
    Ack,
}

/// The framed envelope sent in both directions over `/ws`.
///
/// `id` is `0` when absent (registration and hello carry no id). `payload`
/// is raw, already-serialized JSON; the codec re-parses it only for
/// `Registration`, via [`Envelope::registration_fields`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeType,
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// `{user, password}`, carried as `Envelope.payload` on a `Registration` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationFields {
    pub user: String,
    pub password: String,
}

impl Envelope {
    pub fn make_registration(user: &str, password: &str) -> Self {
        Envelope {
            kind: EnvelopeType::Registration,
            id: 0,
            payload: serde_json::json!({ "user": user, "password": password }),
        }
    }

    pub fn make_hello() -> Self {
        Envelope {
            kind: EnvelopeType::Hello,
            id: 0,
            payload: serde_json::Value::Null,
        }
    }

    pub fn make_notification(id: u64, raw: serde_json::Value) -> Self {
        Envelope {
            kind: EnvelopeType::Notification,
            id,
            payload: raw,
        }
    }

    pub fn make_ack(id: u64) -> Self {
        Envelope {
            kind: EnvelopeType::Ack,
            id,
            payload: serde_json::Value::Null,
        }
    }

    /// Parses `payload` as [`RegistrationFields`]. Only meaningful when
    /// `kind == EnvelopeType::Registration`.
    pub fn registration_fields(&self) -> Result<RegistrationFields, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
