pub mod chatbot;
pub mod memory;
pub mod metrics_manager;
pub mod openai;
pub mod provider;
pub mod schema;
