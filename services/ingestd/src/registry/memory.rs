use super::{ChannelRegistry, RegistryError, Result};
use acequia_model::{ChannelConfig, ChannelId};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// In-memory registry. State lives for the process only; used by tests and
/// the `memory` storage backend.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    channels: RwLock<BTreeMap<ChannelId, ChannelConfig>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the registry with pre-existing channels, for tests.
    pub fn with_channels(channels: impl IntoIterator<Item = ChannelConfig>) -> Self {
        let registry = Self::new();
        {
            let mut map = registry.channels.write();
            for config in channels {
                map.insert(config.channel_id.clone(), config);
            }
        }
        registry
    }
}

#[async_trait]
impl ChannelRegistry for MemoryRegistry {
    async fn get(&self, channel_id: &ChannelId) -> Result<Option<ChannelConfig>> {
        Ok(self.channels.read().get(channel_id).cloned())
    }

    async fn list(&self) -> Result<Vec<ChannelConfig>> {
        Ok(self.channels.read().values().cloned().collect())
    }

    async fn create(&self, config: ChannelConfig) -> Result<ChannelConfig> {
        let mut channels = self.channels.write();
        if channels.contains_key(&config.channel_id) {
            return Err(RegistryError::Conflict(config.channel_id.to_string()));
        }
        channels.insert(config.channel_id.clone(), config.clone());
        Ok(config)
    }

    async fn bind_device(&self, channel_id: &ChannelId, device_id: &str) -> Result<()> {
        let mut channels = self.channels.write();
        let config = channels
            .get_mut(channel_id)
            .ok_or_else(|| RegistryError::NotFound(channel_id.to_string()))?;
        config.device_id = Some(device_id.to_string());
        Ok(())
    }

    async fn find_by_device(&self, device_id: &str) -> Result<Option<ChannelConfig>> {
        Ok(self
            .channels
            .read()
            .values()
            .find(|c| c.device_id.as_deref() == Some(device_id))
            .cloned())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
