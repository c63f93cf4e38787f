use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Request, State},
};
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    error::{AppError, FieldError, RequestValidationError},
    message::{ChatRequest, GenericMessage},
    services::{memory::Turn, metrics_manager::MetricsData},
    state::SharedState,
};

/// Body extractor that answers malformed input with field-level 422 errors.
#[derive(Debug)]
pub struct ChatPayload(pub ChatRequest);

impl<S> FromRequest<S> for ChatPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            RequestValidationError::new(
                vec![FieldError::new(&["body"], rejection.body_text(), "body_read")],
                Value::Null,
            )
        })?;

        let body: Value = serde_json::from_slice(&bytes).map_err(|e| {
            RequestValidationError::new(
                vec![FieldError::new(&["body"], format!("JSON decode error: {e}"), "json_invalid")],
                Value::String(String::from_utf8_lossy(&bytes).into_owned()),
            )
        })?;

        match ChatRequest::validate(&body) {
            Ok(request) => Ok(ChatPayload(request)),
            Err(detail) => Err(RequestValidationError::new(detail, body).into()),
        }
    }
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    ChatPayload(request): ChatPayload,
) -> Result<Json<GenericMessage>, AppError> {
    debug!(id = ?request.id, is_user = ?request.is_user, "received chat message");

    let response = match state.engine.chat(&request.text).await {
        Ok(response) => response,
        Err(err) => {
            state.metrics.record_failure(err.kind()).await;
            return Err(err.into());
        }
    };
    state.metrics.record_reply(response.message_type()).await;

    Ok(Json(GenericMessage::try_from(&response)?))
}

pub async fn root_handler() -> Json<Value> {
    Json(json!({ "message": "Hello World" }))
}

pub async fn get_history_handler(State(state): State<SharedState>) -> Json<Vec<Turn>> {
    Json(state.engine.history().await)
}

pub async fn get_metrics_handler(State(state): State<SharedState>) -> Json<MetricsData> {
    Json(state.metrics.get_metrics().await)
}
