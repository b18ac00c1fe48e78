//! The `{ success, message }` envelope wrapping every bridge response.
//!
//! On success `message` is itself JSON text, so a response is decoded in two
//! explicit steps:
//!
//! ```text
//! body ──parse──▶ Envelope { success, message: String }
//!                     │ success == false ──▶ BridgeError::Rejected(message)
//!                     ▼
//!               message ──parse──▶ payload (PropertiesDump, FunctionsDump, ProbeResult)
//! ```
//!
//! A `message` that arrives already structured (an object rather than a
//! string) is an invalid response, not a shortcut.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

impl Envelope {
    /// Step one: decode the outer envelope from a response body.
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| BridgeError::InvalidResponse(format!("malformed envelope: {e}")))
    }

    /// Step two: check `success` and decode the embedded payload text.
    pub fn into_payload<T: DeserializeOwned>(self) -> Result<T> {
        if !self.success {
            return Err(BridgeError::Rejected(self.message));
        }
        serde_json::from_str(&self.message)
            .map_err(|e| BridgeError::InvalidResponse(format!("malformed payload: {e}")))
    }

    /// Both steps at once.
    pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
        Self::parse(body)?.into_payload()
    }

    /// Wrap a payload the way the bridge does (payload serialized to text).
    pub fn success<T: Serialize>(payload: &T) -> Result<Self> {
        let message = serde_json::to_string(payload)
            .map_err(|e| BridgeError::InvalidResponse(e.to_string()))?;
        Ok(Self {
            success: true,
            message,
        })
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Serialize to a response body.
    pub fn to_body(&self) -> String {
        serde_json::json!({ "success": self.success, "message": self.message }).to_string()
    }
}
