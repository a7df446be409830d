//! Wire contracts for the robot controller's websocket event bus.
//!
//! Every frame is a JSON object carrying `namespace`, `type` and `payload`.
//! Outbound frames always use string payloads; inbound frames may carry any
//! JSON value as payload and are only interesting when they belong to the
//! OnBotJava namespace.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const SYSTEM_NAMESPACE: &str = "system";
pub const ONBOTJAVA_NAMESPACE: &str = "ONBOTJAVA";

const SUBSCRIBE_TYPE: &str = "subscribeToNamespace";
const BUILD_LAUNCH_TYPE: &str = "build:launch";

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("malformed message: {0}")]
    Decode(String),
}

/// Outbound frame. Field order matches what the controller's own web UI sends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OnBotJavaEvent {
    pub namespace: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: String,
}

pub fn subscribe_to(namespace: &str) -> OnBotJavaEvent {
    OnBotJavaEvent {
        namespace: SYSTEM_NAMESPACE.to_string(),
        kind: SUBSCRIBE_TYPE.to_string(),
        payload: namespace.to_string(),
    }
}

pub fn build_launch() -> OnBotJavaEvent {
    OnBotJavaEvent {
        namespace: ONBOTJAVA_NAMESPACE.to_string(),
        kind: BUILD_LAUNCH_TYPE.to_string(),
        payload: String::new(),
    }
}

pub fn encode_event(event: &OnBotJavaEvent) -> Result<String, ProtocolError> {
    serde_json::to_string(event).map_err(|err| ProtocolError::Encode(err.to_string()))
}

/// Inbound frame. Fields are kept loosely typed since other subsystems push
/// whatever they like on the same socket.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PushedMessage {
    #[serde(default)]
    pub namespace: Value,
    #[serde(default, rename = "type")]
    pub kind: Value,
    #[serde(default)]
    pub payload: Value,
}

pub fn decode_pushed(text: &str) -> Result<PushedMessage, ProtocolError> {
    serde_json::from_str(text).map_err(|err| ProtocolError::Decode(err.to_string()))
}

impl PushedMessage {
    pub fn is_namespace(&self, namespace: &str) -> bool {
        self.namespace.as_str() == Some(namespace)
    }

    /// Renders `[namespace] type: payload` for OnBotJava messages with a string
    /// type. Anything else yields `None` and is meant to be dropped.
    pub fn display_line(&self) -> Option<String> {
        if !self.is_namespace(ONBOTJAVA_NAMESPACE) {
            return None;
        }
        let kind = self.kind.as_str()?;
        let payload = match &self.payload {
            Value::String(text) => text.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Some(format!("[{ONBOTJAVA_NAMESPACE}] {kind}: {payload}"))
    }
}
