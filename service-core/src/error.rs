use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::fineract::{FieldError, FineractError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Too many requests: {0}")]
    TooManyRequests(String, Option<u64>),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    /// Fineract refused the request; carries its user message and field errors.
    #[error("Fineract error: {message}")]
    Upstream {
        status: StatusCode,
        message: String,
        fields: Vec<FieldError>,
    },

    #[error("Bad Gateway: {0}")]
    BadGateway(String),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::TooManyRequests(..) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream { status, .. } => *status,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::InternalError(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text safe to show to an operator.
    pub fn user_message(&self) -> String {
        match self {
            AppError::ValidationError(_) => "Some fields are invalid".to_string(),
            AppError::BadRequest(err)
            | AppError::NotFound(err)
            | AppError::Unauthorized(err) => err.to_string(),
            AppError::TooManyRequests(msg, _) => msg.clone(),
            AppError::Upstream { message, .. } => message.clone(),
            AppError::BadGateway(msg) => msg.clone(),
            AppError::InternalError(_) | AppError::ConfigError(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<FineractError> for AppError {
    fn from(err: FineractError) -> Self {
        let message = err.user_message();
        match err {
            FineractError::Unauthorized => AppError::Unauthorized(anyhow::anyhow!(message)),
            FineractError::NotFound(_) => AppError::NotFound(anyhow::anyhow!(message)),
            FineractError::Invalid(_) => AppError::BadRequest(anyhow::anyhow!(message)),
            FineractError::Transport(_) => AppError::BadGateway(message),
            FineractError::Decode(detail) => {
                tracing::error!(detail = %detail, "Undecodable Fineract response");
                AppError::BadGateway(message)
            }
            FineractError::Api {
                status,
                message,
                errors,
                ..
            } => AppError::Upstream {
                status,
                message,
                fields: errors,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let status = self.status();
        let (details, retry_after) = match &self {
            AppError::ValidationError(err) => (Some(err.to_string()), None),
            AppError::TooManyRequests(_, retry) => (None, *retry),
            AppError::Upstream { fields, .. } if !fields.is_empty() => (
                Some(
                    fields
                        .iter()
                        .map(|f| f.message.as_str())
                        .collect::<Vec<_>>()
                        .join("; "),
                ),
                None,
            ),
            AppError::InternalError(err) | AppError::ConfigError(err) => {
                tracing::error!(error = ?err, "Request failed");
                (None, None)
            }
            _ => (None, None),
        };

        let mut res = (
            status,
            Json(ErrorResponse {
                error: self.user_message(),
                details,
            }),
        )
            .into_response();

        if let Some(retry) = retry_after {
            res.headers_mut()
                .insert(axum::http::header::RETRY_AFTER, retry.into());
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fineract_errors_map_to_statuses() {
        let err: AppError = FineractError::Unauthorized.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err: AppError = FineractError::Invalid("Amount is required".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "Amount is required");

        let err: AppError = FineractError::from_response(
            reqwest::StatusCode::FORBIDDEN,
            r#"{"defaultUserMessage":"Maker-checker approval required"}"#,
        )
        .into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.user_message(), "Maker-checker approval required");
    }

    #[test]
    fn too_many_requests_sets_retry_after() {
        let res = AppError::TooManyRequests("Slow down".into(), Some(30)).into_response();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers()[axum::http::header::RETRY_AFTER], "30");
    }
}
