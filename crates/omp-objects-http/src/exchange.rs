//! Agent message acknowledgement served at `POST /exchange`.
//!
//! A message names a performative and a capability. Both are checked
//! against fixed vocabularies and the message is acknowledged. The
//! payload is accepted as-is and never acted on.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use omp_objects_model::error::ObjectsError;

/// Path of the exchange route.
pub const EXCHANGE_PATH: &str = "/exchange";

/// Accepted message performatives.
pub const PERFORMATIVES: &[&str] = &["inform", "request", "propose", "agree", "refuse", "query"];

/// Capabilities a message may address.
pub const CAPABILITIES: &[&str] = &["data.write", "data.read", "data.delete", "data.search"];

/// An inbound agent message.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeMessage {
    /// Sender-chosen message id, echoed in the acknowledgement.
    pub id: String,
    /// Communicative act, one of [`PERFORMATIVES`].
    pub performative: String,
    /// Addressed capability, one of [`CAPABILITIES`].
    pub capability: String,
    /// Message body. Not interpreted.
    #[serde(default)]
    pub payload: Map<String, Value>,
}

/// Acknowledgement returned for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeAck {
    /// Always `true`.
    pub ack: bool,
    /// Echoed message id.
    pub id: String,
    /// Echoed performative.
    pub performative: String,
    /// Echoed capability.
    pub capability: String,
    /// Key identifier of the verified signature, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,
    /// RFC 3339 receipt time.
    pub received_at: String,
}

/// Validate a raw message body and build its acknowledgement.
pub fn acknowledge(body: &[u8], caller: Option<String>) -> Result<ExchangeAck, ObjectsError> {
    let message: ExchangeMessage = serde_json::from_slice(body).map_err(|e| {
        ObjectsError::invalid_request(vec![serde_json::json!({
            "loc": ["body"],
            "msg": e.to_string(),
        })])
    })?;

    if !PERFORMATIVES.contains(&message.performative.as_str()) {
        return Err(ObjectsError::bad_request("invalid performative"));
    }
    if !CAPABILITIES.contains(&message.capability.as_str()) {
        return Err(ObjectsError::bad_request("invalid capability"));
    }

    Ok(ExchangeAck {
        ack: true,
        id: message.id,
        performative: message.performative,
        capability: message.capability,
        caller,
        received_at: chrono::Utc::now().to_rfc3339(),
    })
}
