use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MetricsData {
    /// Successful replies per message type.
    pub replies: HashMap<String, u64>,
    /// Failed exchanges per error kind.
    pub failures: HashMap<String, u64>,
}

#[derive(Debug, Clone)]
pub struct MetricsManager {
    inner: Arc<RwLock<MetricsData>>,
}

impl Default for MetricsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MetricsData::default())),
        }
    }

    pub async fn record_reply(&self, message_type: &str) {
        let mut data = self.inner.write().await;
        *data.replies.entry(message_type.to_string()).or_insert(0) += 1;
    }

    pub async fn record_failure(&self, kind: &str) {
        let mut data = self.inner.write().await;
        *data.failures.entry(kind.to_string()).or_insert(0) += 1;
    }

    pub async fn get_metrics(&self) -> MetricsData {
        self.inner.read().await.clone()
    }
}
