// src/services/provider.rs
use std::collections::VecDeque;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;

use super::memory::{Role, Turn};
use super::schema::{ResponseSchema, ResponseVariant};
use crate::error::ChatError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

impl From<Role> for PromptRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => PromptRole::User,
            Role::Assistant => PromptRole::Assistant,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: PromptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Everything sent to the provider for one exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderRequest {
    pub messages: Vec<PromptMessage>,
}

impl ProviderRequest {
    /// System instruction, then the history in order, then the new user input.
    pub fn build(system_prompt: &str, history: &[Turn], user_input: &str) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(PromptMessage::new(PromptRole::System, system_prompt));
        messages.extend(
            history
                .iter()
                .map(|turn| PromptMessage::new(turn.role.into(), turn.text.clone())),
        );
        messages.push(PromptMessage::new(PromptRole::User, user_input));
        Self { messages }
    }
}

/// A text-generation backend asked for structured output.
///
/// Implementations validate the provider's answer against their
/// [`ResponseSchema`] and only ever hand back a well-formed
/// [`ResponseVariant`].
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Model identifier requests are made against.
    fn model(&self) -> &str;

    async fn complete(&self, request: &ProviderRequest) -> Result<ResponseVariant, ChatError>;
}

/// One queued outcome of a [`ScriptedProvider`].
#[derive(Clone, Debug)]
pub enum ScriptedReply {
    Reply(ResponseVariant),
    /// Raw provider text, run through the schema like a real answer would be.
    Raw(String),
    Fail(String),
    /// Never answers.
    Stall,
}

/// Offline provider that replays queued outcomes in order and records every
/// request it receives.
#[derive(Debug)]
pub struct ScriptedProvider {
    model: String,
    schema: ResponseSchema,
    script: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            schema: ResponseSchema::chat_response(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_schema(mut self, schema: ResponseSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn then(mut self, reply: ScriptedReply) -> Self {
        self.script.get_mut().push_back(reply);
        self
    }

    pub fn then_reply(self, reply: ResponseVariant) -> Self {
        self.then(ScriptedReply::Reply(reply))
    }

    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.then(ScriptedReply::Fail(message.into()))
    }

    pub async fn push(&self, reply: ScriptedReply) {
        self.script.lock().await.push_back(reply);
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<ResponseVariant, ChatError> {
        self.requests.lock().await.push(request.clone());
        let next = self.script.lock().await.pop_front();
        match next {
            Some(ScriptedReply::Reply(reply)) => Ok(reply),
            Some(ScriptedReply::Raw(raw)) => Ok(self.schema.parse(&raw)?),
            Some(ScriptedReply::Fail(message)) => Err(ChatError::provider(message)),
            Some(ScriptedReply::Stall) => std::future::pending().await,
            None => Err(ChatError::provider("scripted provider has no reply queued")),
        }
    }
}
