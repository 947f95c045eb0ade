use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outbound wrapper sent to the broadcast endpoint.
///
/// The payload is JSON-encoded into `message`, and the envelope itself is
/// serialized again into the request body, so the payload arrives
/// double-encoded by contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    pub content_type: String,
    pub message: String,
    pub targets: Vec<String>,
}

impl Envelope {
    /// Serialize to the JSON request body.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Wrap one queue item for broadcast. Pure; a fresh envelope per send.
pub fn build_envelope(item: &Value) -> Result<Envelope, serde_json::Error> {
    Ok(Envelope {
        content_type: "application/json".to_string(),
        message: serde_json::to_string(item)?,
        targets: vec!["broadcast".to_string()],
    })
}
