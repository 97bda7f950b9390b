//! Channel registry: the durable catalog of canal channels and their
//! device bindings. Two backends, selected by configuration: an in-memory
//! map for tests and single-node trials, and Postgres for production.
use acequia_model::{ChannelConfig, ChannelId};
use async_trait::async_trait;

mod memory;
mod postgres;

pub use memory::MemoryRegistry;
pub use postgres::PostgresRegistry;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("channel not found: {0}")]
    NotFound(String),
    #[error("channel already exists: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

#[async_trait]
pub trait ChannelRegistry: Send + Sync {
    /// Fetch one channel's configuration.
    async fn get(&self, channel_id: &ChannelId) -> Result<Option<ChannelConfig>>;

    /// All registered channels, ordered by channel id.
    async fn list(&self) -> Result<Vec<ChannelConfig>>;

    /// Register a new channel. `Conflict` if the id is already taken.
    async fn create(&self, config: ChannelConfig) -> Result<ChannelConfig>;

    /// Bind (or rebind) a device to an existing channel.
    async fn bind_device(&self, channel_id: &ChannelId, device_id: &str) -> Result<()>;

    /// Resolve the channel a device is bound to, if any.
    async fn find_by_device(&self, device_id: &str) -> Result<Option<ChannelConfig>>;

    /// Cheap backend liveness probe for the health endpoint.
    async fn health_check(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}
