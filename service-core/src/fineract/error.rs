//! Errors returned by the Fineract REST client.
//!
//! Fineract reports failures with a JSON envelope:
//!
//! ```json
//! {
//!   "developerMessage": "...",
//!   "httpStatusCode": "403",
//!   "defaultUserMessage": "...",
//!   "errors": [{ "parameterName": "firstname", "defaultUserMessage": "..." }]
//! }
//! ```
//!
//! The user-facing text and per-parameter errors are lifted out of that
//! envelope so the console can show them in a toast or next to a form field.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// A single parameter-level error reported by Fineract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub parameter: Option<String>,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum FineractError {
    #[error("Fineract is unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Fineract rejected the credentials")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Fineract error ({status}): {message}")]
    Api {
        status: StatusCode,
        message: String,
        errors: Vec<FieldError>,
        /// The envelope's own `defaultUserMessage`, kept apart from `message`
        /// which prefers the first parameter error.
        summary: Option<String>,
    },

    #[error("Unexpected response from Fineract: {0}")]
    Decode(String),

    #[error("{0}")]
    Invalid(String),
}

impl FineractError {
    /// Build an error from a non-success response status and its raw body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let envelope: Option<ErrorEnvelope> = serde_json::from_str(body).ok();

        if status == StatusCode::UNAUTHORIZED {
            return FineractError::Unauthorized;
        }

        let message = envelope
            .as_ref()
            .and_then(ErrorEnvelope::user_message)
            .unwrap_or_else(|| fallback_message(status, body));

        if status == StatusCode::NOT_FOUND {
            return FineractError::NotFound(message);
        }

        let summary = envelope
            .as_ref()
            .and_then(|e| non_empty(e.default_user_message.as_deref()));

        let errors = envelope
            .map(|e| {
                e.errors
                    .into_iter()
                    .filter_map(|detail| {
                        detail.message().map(|message| FieldError {
                            parameter: detail.parameter_name,
                            message,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        FineractError::Api {
            status,
            message,
            errors,
            summary,
        }
    }

    /// Text suitable for a toast.
    pub fn user_message(&self) -> String {
        match self {
            FineractError::Transport(e) if e.is_timeout() => {
                "Fineract did not respond in time".to_string()
            }
            FineractError::Transport(_) => "Fineract is unreachable".to_string(),
            FineractError::Unauthorized => "Your session has expired, please sign in again".to_string(),
            FineractError::NotFound(message) => message.clone(),
            FineractError::Api { message, .. } => message.clone(),
            FineractError::Decode(_) => "Fineract returned an unexpected response".to_string(),
            FineractError::Invalid(message) => message.clone(),
        }
    }

    /// Parameter-level errors, empty for anything but [`FineractError::Api`].
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            FineractError::Api { errors, .. } => errors,
            _ => &[],
        }
    }

    /// The envelope-level message, when Fineract sent one.
    pub fn summary(&self) -> Option<&str> {
        match self {
            FineractError::Api { summary, .. } => summary.as_deref(),
            _ => None,
        }
    }

    /// HTTP status reported by Fineract, when there was one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FineractError::Transport(e) => e.status(),
            FineractError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            FineractError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            FineractError::Api { status, .. } => Some(*status),
            FineractError::Decode(_) | FineractError::Invalid(_) => None,
        }
    }

    /// Transient failures worth retrying for idempotent requests.
    pub fn is_retryable(&self) -> bool {
        match self {
            FineractError::Transport(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            FineractError::Api { status, .. } => matches!(
                *status,
                StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            ),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for FineractError {
    fn from(err: serde_json::Error) -> Self {
        FineractError::Decode(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEnvelope {
    developer_message: Option<String>,
    default_user_message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

impl ErrorEnvelope {
    fn user_message(&self) -> Option<String> {
        self.errors
            .iter()
            .find_map(ErrorDetail::message)
            .or_else(|| non_empty(self.default_user_message.as_deref()))
            .or_else(|| non_empty(self.developer_message.as_deref()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetail {
    parameter_name: Option<String>,
    default_user_message: Option<String>,
    developer_message: Option<String>,
}

impl ErrorDetail {
    fn message(&self) -> Option<String> {
        non_empty(self.default_user_message.as_deref())
            .or_else(|| non_empty(self.developer_message.as_deref()))
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() || body.starts_with('<') {
        return status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string();
    }
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_first_parameter_error() {
        let body = r#"{
            "developerMessage": "The request was invalid.",
            "httpStatusCode": "400",
            "defaultUserMessage": "Validation errors exist.",
            "errors": [
                {"parameterName": "firstname", "defaultUserMessage": "The parameter `firstname` is mandatory.", "developerMessage": "x"}
            ]
        }"#;

        let err = FineractError::from_response(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.user_message(), "The parameter `firstname` is mandatory.");
        assert_eq!(err.field_errors().len(), 1);
        assert_eq!(err.field_errors()[0].parameter.as_deref(), Some("firstname"));
        assert_eq!(err.summary(), Some("Validation errors exist."));
    }

    #[test]
    fn falls_back_to_default_user_message() {
        let body = r#"{"developerMessage": "dev", "defaultUserMessage": "Client is not active."}"#;
        let err = FineractError::from_response(StatusCode::FORBIDDEN, body);
        assert_eq!(err.user_message(), "Client is not active.");
        assert!(err.field_errors().is_empty());
    }

    #[test]
    fn html_body_uses_reason_phrase() {
        let err = FineractError::from_response(StatusCode::BAD_GATEWAY, "<html>proxy</html>");
        assert_eq!(err.user_message(), "Bad Gateway");
        assert!(err.is_retryable());
    }

    #[test]
    fn unauthorized_and_not_found_are_distinct() {
        assert!(matches!(
            FineractError::from_response(StatusCode::UNAUTHORIZED, ""),
            FineractError::Unauthorized
        ));
        let err = FineractError::from_response(
            StatusCode::NOT_FOUND,
            r#"{"defaultUserMessage": "Client with identifier 9 does not exist"}"#,
        );
        assert!(matches!(err, FineractError::NotFound(_)));
        assert_eq!(err.user_message(), "Client with identifier 9 does not exist");
    }

    #[test]
    fn plain_text_body_is_truncated() {
        let body = "x".repeat(500);
        let err = FineractError::from_response(StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert_eq!(err.user_message().len(), 200);
        assert!(!err.is_retryable());
    }
}
