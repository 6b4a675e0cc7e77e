//! Channel provisioning backend.
//!
//! `ChannelProvisioner` is everything the validator needs from a chat backend:
//! create a channel by name and visibility, then confirm the identifier exists.
//! Implementations are shared across concurrent validations and must be safe
//! under concurrent use.
//!
//! `InMemoryChannelClient` keeps the registry in process memory behind a single
//! reader/writer lock. Readers are shared, writers are exclusive, and the lock
//! is never held across (simulated) network I/O.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use super::types::ChannelRecord;

/// Errors reported by a channel backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    #[error("channel name must not be empty")]
    InvalidName,

    #[error("backend rejected channel {name}: {message}")]
    Remote { name: String, message: String },

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Backend capable of provisioning Slack channels.
#[async_trait]
pub trait ChannelProvisioner: Send + Sync {
    /// Create a channel and return its identifier.
    async fn create_channel(&self, name: &str, private: bool) -> Result<String, ProvisionError>;

    /// Check whether a channel identifier is known to the backend.
    async fn channel_exists(&self, id: &str) -> bool;
}

#[derive(Default)]
struct Registry {
    channels: HashMap<String, ChannelRecord>,
    last_requested: Option<String>,
}

/// Process-wide in-memory channel registry.
#[derive(Default)]
pub struct InMemoryChannelClient {
    registry: RwLock<Registry>,
    /// Simulated round-trip to the backend, applied before the write lock is taken.
    latency: Duration,
}

impl InMemoryChannelClient {
    /// Create an empty registry with no simulated latency.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a simulated backend latency for `create_channel`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Look up a provisioned channel.
    pub async fn channel(&self, id: &str) -> Option<ChannelRecord> {
        self.registry.read().await.channels.get(id).cloned()
    }

    /// Number of provisioned channels.
    pub async fn len(&self) -> usize {
        self.registry.read().await.channels.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Display name of the most recent successful `create_channel` call.
    pub async fn last_requested_name(&self) -> Option<String> {
        self.registry.read().await.last_requested.clone()
    }

    /// Identifiers are derived from the registry size at insertion time.
    /// Records are never removed, so the size only grows and ids never repeat.
    fn allocate_id(count: usize) -> String {
        format!("C{:08x}", count)
    }
}

#[async_trait]
impl ChannelProvisioner for InMemoryChannelClient {
    #[instrument(skip(self))]
    async fn create_channel(&self, name: &str, private: bool) -> Result<String, ProvisionError> {
        if name.is_empty() {
            return Err(ProvisionError::InvalidName);
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut registry = self.registry.write().await;
        let record = ChannelRecord::new(&Self::allocate_id(registry.channels.len()), name, private);
        let id = record.id.clone();
        registry.channels.insert(id.clone(), record);
        registry.last_requested = Some(name.to_string());

        info!(channel = %name, id = %id, private, "Created Slack channel");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn channel_exists(&self, id: &str) -> bool {
        let exists = self.registry.read().await.channels.contains_key(id);
        debug!(id = %id, exists, "Checked Slack channel");
        exists
    }
}
