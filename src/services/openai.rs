// src/services/openai.rs
//! Adapter for OpenAI-compatible `/chat/completions` endpoints in
//! structured-output (`json_schema`) mode.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::provider::{ChatProvider, PromptMessage, ProviderRequest};
use super::schema::{ResponseSchema, ResponseVariant};
use crate::error::ChatError;

const COMPLETIONS_PATH: &str = "chat/completions";

#[derive(Clone, Debug)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub request_timeout: Duration,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    strict: bool,
    schema: &'a Value,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorPayload,
}

#[derive(Deserialize)]
struct ApiErrorPayload {
    message: String,
    code: Option<String>,
}

pub struct OpenAiProvider {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
    schema: ResponseSchema,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("schema", &self.schema.name())
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(settings: OpenAiSettings, schema: ResponseSchema) -> Result<Self, ChatError> {
        let model = settings.model.trim().to_string();
        if model.is_empty() {
            return Err(ChatError::Configuration("model identifier is empty".into()));
        }
        let endpoint = format!("{}/{COMPLETIONS_PATH}", settings.base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&endpoint).map_err(|e| {
            ChatError::Configuration(format!("invalid provider base url `{}`: {e}", settings.base_url))
        })?;
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| ChatError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key: settings.api_key.filter(|k| !k.is_empty()),
            model,
            schema,
        })
    }

    pub fn schema(&self) -> &ResponseSchema {
        &self.schema
    }

    fn status_error(&self, status: StatusCode, body: &str) -> ChatError {
        let (message, code) = match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(parsed) => (parsed.error.message, parsed.error.code),
            Err(_) if body.trim().is_empty() => (
                status.canonical_reason().unwrap_or("no details").to_string(),
                None,
            ),
            Err(_) => (body.trim().to_string(), None),
        };

        let unknown_model = status == StatusCode::NOT_FOUND
            && (code.as_deref() == Some("model_not_found") || message.contains(&self.model));
        if unknown_model {
            return ChatError::Configuration(format!(
                "model `{}` is not recognized by the provider: {message}",
                self.model
            ));
        }
        ChatError::provider(format!("provider returned {status}: {message}"))
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<ResponseVariant, ChatError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: &request.messages,
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: self.schema.name(),
                    strict: true,
                    schema: self.schema.document(),
                },
            },
        };

        debug!(model = %self.model, messages = request.messages.len(), "requesting completion");
        let mut builder = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ChatError::provider_with("provider request timed out", e)
            } else {
                ChatError::provider_with("provider request failed", e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    warn!(%status, error = %e, "failed to read provider error body");
                    String::new()
                }
            };
            warn!(%status, "provider rejected completion request");
            return Err(self.status_error(status, &text));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::provider_with("failed to decode provider response", e))?;

        let message = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| ChatError::provider("provider returned no choices"))?;

        if let Some(refusal) = message.refusal.filter(|r| !r.is_empty()) {
            return Err(ChatError::provider(format!("model refused to answer: {refusal}")));
        }
        let content = message
            .content
            .ok_or_else(|| ChatError::provider("provider returned an empty message"))?;

        Ok(self.schema.parse(&content)?)
    }
}
