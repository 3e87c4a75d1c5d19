//! The JSON envelope every endpoint answers with.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub server_error: bool,
    pub server_message: String,
    pub message_detail: String,
    pub response_status: String,
    pub response_color: String,
    pub response_action: String,
    pub server_data: Value,
}

impl Envelope {
    pub fn success(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            server_error: false,
            server_message: message.into(),
            message_detail: detail.into(),
            response_status: "success".to_string(),
            response_color: "success".to_string(),
            response_action: String::new(),
            server_data: Value::Object(Default::default()),
        }
    }

    pub fn error(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            server_error: true,
            server_message: message.into(),
            message_detail: detail.into(),
            response_status: "error".to_string(),
            response_color: "danger".to_string(),
            response_action: String::new(),
            server_data: Value::Object(Default::default()),
        }
    }

    /// Attach a payload. A payload that fails to serialize is replaced by null.
    pub fn with_data(mut self, data: impl Serialize) -> Self {
        self.server_data = serde_json::to_value(data).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to serialize response payload");
            Value::Null
        });
        self
    }

    /// Client-side action to take, such as `reload_page`.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.response_action = action.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.response_color = color.into();
        self
    }
}
