// src/state.rs
use std::sync::Arc;

use crate::services::chatbot::ChatEngine;
use crate::services::metrics_manager::MetricsManager;

pub type SharedState = Arc<AppState>;

#[derive(Debug)]
pub struct AppState {
    pub engine: ChatEngine,
    pub metrics: MetricsManager,
}

impl AppState {
    pub fn new(engine: ChatEngine) -> Self {
        Self {
            engine,
            metrics: MetricsManager::new(),
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}
