// src/error.rs
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, warn};

pub use crate::services::schema::SchemaValidationError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures of a chat exchange.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    SchemaValidation(#[from] SchemaValidationError),

    /// Network, quota or provider-internal failure, including timeouts.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Invalid model identifier or schema descriptor.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ChatError {
    pub fn provider(message: impl Into<String>) -> Self {
        ChatError::Provider {
            message: message.into(),
            source: None,
        }
    }

    pub fn provider_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ChatError::Provider {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::SchemaValidation(_) => "schema_validation",
            ChatError::Provider { .. } => "provider",
            ChatError::Configuration(_) => "configuration",
        }
    }
}

/// One field-level problem with an inbound request body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn new(loc: &[&str], msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc: loc.iter().map(|s| s.to_string()).collect(),
            msg: msg.into(),
            kind: kind.into(),
        }
    }

    /// Error located at `body.<field>`.
    pub fn body_field(field: &str, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new(&["body", field], msg, kind)
    }
}

/// Malformed inbound body, answered with 422.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("request validation failed with {} error(s)", .detail.len())]
pub struct RequestValidationError {
    pub detail: Vec<FieldError>,
    /// The body as received: parsed JSON, or the raw text when it was not JSON.
    pub body: Value,
}

impl RequestValidationError {
    pub fn new(detail: Vec<FieldError>, body: Value) -> Self {
        Self { detail, body }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] RequestValidationError),

    #[error(transparent)]
    Engine(#[from] ChatError),

    #[error("failed to encode response: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(err) => {
                warn!(errors = err.detail.len(), "rejected malformed chat request");
                let body = json!({ "detail": err.detail, "body": err.body });
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
            other => {
                error!(error = %other, "chat request failed");
                let body = json!({ "detail": other.to_string() });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
