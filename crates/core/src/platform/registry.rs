use std::collections::HashMap;
use std::sync::Arc;

use super::{HttpPlatformLauncher, PlatformLauncher};
use crate::campaign::Platform;
use crate::config::PlatformEndpointConfig;
use crate::http_client::HttpCallError;

/// Launchers keyed by platform.
#[derive(Clone, Default)]
pub struct PlatformRegistry {
    launchers: HashMap<Platform, Arc<dyn PlatformLauncher>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One HTTP launcher per configured platform.
    pub fn from_config(platforms: &[PlatformEndpointConfig]) -> Result<Self, HttpCallError> {
        let mut registry = Self::new();
        for entry in platforms {
            registry.register(Arc::new(HttpPlatformLauncher::new(
                entry.platform,
                &entry.endpoint(),
            )?));
        }
        Ok(registry)
    }

    /// Register a launcher, replacing any previous one for its platform.
    pub fn register(&mut self, launcher: Arc<dyn PlatformLauncher>) {
        self.launchers.insert(launcher.platform(), launcher);
    }

    pub fn with(mut self, launcher: Arc<dyn PlatformLauncher>) -> Self {
        self.register(launcher);
        self
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn PlatformLauncher>> {
        self.launchers.get(&platform).cloned()
    }

    pub fn contains(&self, platform: Platform) -> bool {
        self.launchers.contains_key(&platform)
    }

    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<_> = self.launchers.keys().copied().collect();
        platforms.sort_by_key(|p| p.as_str());
        platforms
    }

    pub fn is_empty(&self) -> bool {
        self.launchers.is_empty()
    }
}
