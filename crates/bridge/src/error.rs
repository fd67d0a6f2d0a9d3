use decisioning_interchange::JsonMap;
use serde_json::Value;

/// Errors returned by an [`EventHub`](crate::EventHub) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// No response event arrived before the deadline.
    #[error("no response to '{event_name}' within {timeout_ms} ms")]
    Timeout { event_name: String, timeout_ms: u64 },

    /// The hub could not deliver the event.
    #[error("failed to dispatch '{event_name}': {message}")]
    Dispatch { event_name: String, message: String },
}

impl BridgeError {
    pub(crate) fn timeout(event_name: &str, timeout: std::time::Duration) -> Self {
        BridgeError::Timeout {
            event_name: event_name.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Coarse error reported to get-propositions callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum AdobeError {
    #[error("unexpected error")]
    UnexpectedError,
    #[error("callback timeout")]
    CallbackTimeout,
    #[error("callback null")]
    CallbackNull,
    #[error("extension not initialized")]
    ExtensionNotInitialized,
}

impl AdobeError {
    /// Map a numeric `responseerror` code. Unknown codes are unexpected errors.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => AdobeError::CallbackTimeout,
            2 => AdobeError::CallbackNull,
            11 => AdobeError::ExtensionNotInitialized,
            _ => AdobeError::UnexpectedError,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            AdobeError::UnexpectedError => 0,
            AdobeError::CallbackTimeout => 1,
            AdobeError::CallbackNull => 2,
            AdobeError::ExtensionNotInitialized => 11,
        }
    }
}

impl From<&BridgeError> for AdobeError {
    fn from(err: &BridgeError) -> Self {
        match err {
            BridgeError::Timeout { .. } => AdobeError::CallbackTimeout,
            BridgeError::Dispatch { .. } => AdobeError::UnexpectedError,
        }
    }
}

pub const TIMEOUT_STATUS: i64 = 408;

/// Detailed error reported to update-propositions callers.
///
/// Mirrors the problem-details map the hub sends in `responseerror`:
/// `{type, status, title, detail, report}`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{title}: {detail}")]
pub struct OptimizeError {
    pub error_type: Option<String>,
    pub status: Option<i64>,
    pub title: String,
    pub detail: String,
    pub report: Option<JsonMap>,
    pub adobe_error: AdobeError,
}

impl OptimizeError {
    pub fn timeout() -> Self {
        OptimizeError {
            error_type: None,
            status: Some(TIMEOUT_STATUS),
            title: "Request Timeout".to_string(),
            detail: "Update/Get proposition request resulted in a timeout.".to_string(),
            report: None,
            adobe_error: AdobeError::CallbackTimeout,
        }
    }

    pub fn unexpected() -> Self {
        OptimizeError {
            error_type: None,
            status: None,
            title: "Unexpected Error".to_string(),
            detail: "An unexpected error occurred.".to_string(),
            report: None,
            adobe_error: AdobeError::UnexpectedError,
        }
    }

    /// Build from a `responseerror` map. Fields with the wrong type are ignored.
    pub fn from_map(map: &JsonMap) -> Self {
        let string = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
        let status = map.get("status").and_then(Value::as_i64);
        OptimizeError {
            error_type: string("type"),
            status,
            title: string("title").unwrap_or_default(),
            detail: string("detail").unwrap_or_default(),
            report: map.get("report").and_then(Value::as_object).cloned(),
            adobe_error: match status {
                Some(TIMEOUT_STATUS) => AdobeError::CallbackTimeout,
                _ => AdobeError::UnexpectedError,
            },
        }
    }
}

impl From<&BridgeError> for OptimizeError {
    fn from(err: &BridgeError) -> Self {
        match err {
            BridgeError::Timeout { .. } => OptimizeError::timeout(),
            BridgeError::Dispatch { .. } => OptimizeError::unexpected(),
        }
    }
}
