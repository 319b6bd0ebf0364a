//! JSON-lines encoding of protocol messages for out-of-process workers.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::{MainMessage, WorkerMessage};

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Message has no type tag")]
    MissingTag,

    #[error("Unknown message type: {0}")]
    UnknownTag(String),
}

/// A message that can cross the worker/controller boundary
pub trait Message: Serialize + DeserializeOwned {
    /// All `type` tags this message family accepts
    const TAGS: &'static [&'static str];
}

impl Message for WorkerMessage {
    const TAGS: &'static [&'static str] = &[
        "dict-prog",
        "dict-upd",
        "worker-status",
        "search-prog",
        "results",
        "rand-line",
    ];
}

impl Message for MainMessage {
    const TAGS: &'static [&'static str] = &["status-req", "search", "get-rand"];
}

pub fn encode<M: Message>(msg: &M) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(msg)?)
}

/// Decode one message. An unrecognized tag is reported as such rather than
/// as a generic parse failure.
pub fn decode<M: Message>(text: &str) -> Result<M, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingTag)?;

    if !M::TAGS.contains(&tag) {
        return Err(ProtocolError::UnknownTag(tag.to_string()));
    }

    Ok(serde_json::from_value(value)?)
}
