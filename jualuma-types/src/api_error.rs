//! Error value for calls into the backend API.

use thiserror::Error;

/// A failed backend request.
///
/// `status` carries the HTTP status when the server answered; it is `None`
/// for transport failures where no response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", display_api_error(.status, .message))]
pub struct ApiError {
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

fn display_api_error(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("API request failed ({code}): {message}"),
        None => format!("API request failed: {message}"),
    }
}
