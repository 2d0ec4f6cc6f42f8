use std::collections::BTreeMap;

use campus_api_types::ErrorBody;
use thiserror::Error;

use crate::domain::PaginationError;

/// Failure of a single API call.
///
/// `Clone` so that one outcome can be handed to every caller joined on the
/// same in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        errors: BTreeMap<String, Vec<String>>,
    },
    #[error("request failed with status {status}: {message}")]
    Http { status: u16, message: String },
    #[error("server error (status {status})")]
    Server { status: u16 },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

const GENERIC_SERVER_MESSAGE: &str = "The service is temporarily unavailable. Please try again.";
const GENERIC_TRANSPORT_MESSAGE: &str = "The service could not be reached.";

impl ClientError {
    /// Classify a non-success response by status code and JSON error body.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();

        match status {
            422 => Self::Validation {
                message: parsed
                    .message
                    .unwrap_or_else(|| "The given data was invalid.".to_string()),
                errors: parsed.errors,
            },
            500..=599 => Self::Server { status },
            _ => Self::Http {
                status,
                message: parsed
                    .message
                    .unwrap_or_else(|| default_client_message(status).to_string()),
            },
        }
    }

    /// HTTP status of the failed response, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Validation { .. } => Some(422),
            Self::Http { status, .. } | Self::Server { status } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Field-level messages of a 422 response.
    pub fn field_errors(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        match self {
            Self::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// Text suitable for direct display in a view.
    pub fn display_message(&self) -> String {
        match self {
            Self::Validation { message, .. } | Self::Http { message, .. } => message.clone(),
            Self::Server { .. } => GENERIC_SERVER_MESSAGE.to_string(),
            Self::Transport(_) => GENERIC_TRANSPORT_MESSAGE.to_string(),
            Self::Decode(_) | Self::InvalidRequest(_) => "Unexpected error occurred".to_string(),
        }
    }
}

fn default_client_message(status: u16) -> &'static str {
    match status {
        401 => "Authentication required",
        403 => "Permission denied",
        404 => "Resource not found",
        _ => "Request could not be processed",
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else if error.is_builder() {
            Self::InvalidRequest(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(error: url::ParseError) -> Self {
        Self::InvalidRequest(error.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

impl From<PaginationError> for ClientError {
    fn from(error: PaginationError) -> Self {
        Self::Decode(error.to_string())
    }
}
