// src/services/chatbot.rs
use std::{fmt::Debug, sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, RwLock},
    time,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::memory::{ConversationMemory, Role, Turn};
use super::provider::{ChatProvider, ProviderRequest};
use super::schema::ResponseVariant;
use crate::error::ChatError;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. \
Based on the user's input, please provide a response in one of the following formats:\n\
1. TextMessage: A simple text response.\n\
2. MultiSelectMessage: A response with multiple selectable options.\n\
3. PickerMessage: A response with a list of options to pick from.\n\
4. RatingMessage: A response asking for a rating within a specified range.\n\
5. YesNoMessage: A simple yes or no response.\n\n\
Select the most appropriate response type for the user's query.";

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct EngineSettings {
    pub system_prompt: String,
    /// Upper bound on one provider round-trip.
    pub provider_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

/// One conversation with a provider: the system instruction, the memory of
/// prior turns, and the provider handle.
///
/// `chat` calls on the same engine run one at a time, so every exchange sees
/// all earlier ones. The memory itself is only locked to snapshot and to
/// commit, which keeps `history` readable while a provider call is in flight.
pub struct ChatEngine {
    conversation_id: Uuid,
    provider: Arc<dyn ChatProvider>,
    settings: EngineSettings,
    /// Held for a whole exchange, provider call included.
    exchange: Mutex<()>,
    memory: RwLock<ConversationMemory>,
}

impl Debug for ChatEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatEngine")
            .field("conversation_id", &self.conversation_id)
            .field("model", &self.provider.model())
            .field("provider_timeout", &self.settings.provider_timeout)
            .finish()
    }
}

impl ChatEngine {
    pub fn new(provider: Arc<dyn ChatProvider>, settings: EngineSettings) -> Result<Self, ChatError> {
        if settings.system_prompt.trim().is_empty() {
            return Err(ChatError::Configuration("system prompt is empty".into()));
        }
        if settings.provider_timeout.is_zero() {
            return Err(ChatError::Configuration("provider timeout must be positive".into()));
        }
        Ok(Self {
            conversation_id: Uuid::new_v4(),
            provider,
            settings,
            exchange: Mutex::new(()),
            memory: RwLock::new(ConversationMemory::new()),
        })
    }

    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Last committed turns; never waits on an in-flight provider call.
    pub async fn history(&self) -> Vec<Turn> {
        self.memory.read().await.history()
    }

    /// Send `user_input` with the whole conversation so far and record the
    /// exchange once the provider has answered.
    ///
    /// Nothing is recorded when the provider fails, times out, or the returned
    /// future is dropped before completion.
    pub async fn chat(&self, user_input: &str) -> Result<ResponseVariant, ChatError> {
        let _exchange = self.exchange.lock().await;
        let history = self.history().await;
        let request = ProviderRequest::build(&self.settings.system_prompt, &history, user_input);
        debug!(
            conversation = %self.conversation_id,
            messages = request.messages.len(),
            "sending chat request"
        );

        let response = match time::timeout(self.settings.provider_timeout, self.provider.complete(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                warn!(conversation = %self.conversation_id, kind = err.kind(), error = %err, "provider call failed");
                return Err(err);
            }
            Err(_) => {
                warn!(conversation = %self.conversation_id, "provider call timed out");
                return Err(ChatError::provider(format!(
                    "provider did not answer within {:?}",
                    self.settings.provider_timeout
                )));
            }
        };

        let turns = {
            let mut memory = self.memory.write().await;
            memory.append(Role::User, user_input);
            memory.append(Role::Assistant, response.to_string())
        };
        info!(
            conversation = %self.conversation_id,
            message_type = response.message_type(),
            turns,
            "chat exchange recorded"
        );
        Ok(response)
    }
}
