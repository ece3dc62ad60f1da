//! Mock creative generator for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::fixtures;
use crate::creative::{CreativeAssets, CreativeError, CreativeGenerator, CreativeRequest};

/// Mock implementation of the CreativeGenerator trait.
///
/// Returns one image and no video unless configured otherwise. Can be told
/// to fail, to panic (for exercising the queue's panic guard) or to never
/// answer (for campaigns that stall mid-stage).
#[derive(Debug)]
pub struct MockCreativeGenerator {
    creative: Arc<RwLock<CreativeAssets>>,
    requests: Arc<RwLock<Vec<CreativeRequest>>>,
    next_error: Arc<RwLock<Option<String>>>,
    panic_message: Arc<RwLock<Option<String>>>,
    hanging: Arc<RwLock<bool>>,
}

impl Default for MockCreativeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCreativeGenerator {
    pub fn new() -> Self {
        Self {
            creative: Arc::new(RwLock::new(fixtures::creative(1, 0))),
            requests: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            panic_message: Arc::new(RwLock::new(None)),
            hanging: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn set_creative(&self, creative: CreativeAssets) {
        *self.creative.write().await = creative;
    }

    pub async fn set_next_error(&self, message: &str) {
        *self.next_error.write().await = Some(message.to_string());
    }

    /// Panic on every following call.
    pub async fn panic_with(&self, message: &str) {
        *self.panic_message.write().await = Some(message.to_string());
    }

    /// Never return from following calls.
    pub async fn hang(&self) {
        *self.hanging.write().await = true;
    }

    pub async fn recorded_requests(&self) -> Vec<CreativeRequest> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl CreativeGenerator for MockCreativeGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &CreativeRequest) -> Result<CreativeAssets, CreativeError> {
        self.requests.write().await.push(request.clone());

        let panic_message = self.panic_message.read().await.clone();
        if let Some(message) = panic_message {
            panic!("{}", message);
        }
        if *self.hanging.read().await {
            futures::future::pending::<()>().await;
        }
        if let Some(message) = self.next_error.write().await.take() {
            return Err(CreativeError::Generation(message));
        }
        Ok(self.creative.read().await.clone())
    }
}
