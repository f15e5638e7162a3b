//! Turns failed responses into what the conversation should show.

use serde_json::Value;

use crate::error::ClientError;

/// Status the backend uses when the account has run out of credits
pub const QUOTA_EXCEEDED_STATUS: u16 = 402;

/// Shown when a failure carries no usable text of its own
pub const GENERIC_ERROR_TEXT: &str = "Sorry, I encountered an error. Please try again.";

/// Stored in place of a successful reply that came back blank
pub const EMPTY_REPLY_TEXT: &str = "I apologize, but I couldn't process your request.";

/// Classification of a non-2xx response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Out of credits; the caller should prompt for a purchase
    QuotaExceeded,
    /// The backend explained the failure in a structured body
    Application { message: String },
    /// No usable explanation; `message` is a fallback that names the status
    Unstructured { message: String },
}

impl FailureKind {
    /// Text for the error entry, `None` for the quota case which has none
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::QuotaExceeded => None,
            Self::Application { message } | Self::Unstructured { message } => Some(message),
        }
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded)
    }

    pub fn into_message(self) -> Option<String> {
        match self {
            Self::QuotaExceeded => None,
            Self::Application { message } | Self::Unstructured { message } => Some(message),
        }
    }
}

/// Classify a failed response from its status and, when it could be read, its body.
///
/// 402 wins regardless of the body.
pub fn classify_failure(status: u16, body: Option<&str>) -> FailureKind {
    if status == QUOTA_EXCEEDED_STATUS {
        return FailureKind::QuotaExceeded;
    }

    match body.and_then(structured_message) {
        Some(message) => FailureKind::Application { message },
        None => FailureKind::Unstructured {
            message: format!("HTTP error! status: {}", status),
        },
    }
}

fn structured_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    ["message", "error"]
        .iter()
        .filter_map(|field| object.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

/// Text for a request that never produced a response, or a stream that broke
pub fn transport_failure_text(error: &ClientError) -> String {
    let detail = error.detail().trim();
    if detail.is_empty() {
        GENERIC_ERROR_TEXT.to_string()
    } else {
        detail.to_string()
    }
}
