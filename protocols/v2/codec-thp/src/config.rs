use serde::Deserialize;
use std::time::Duration;

/// Flow control knobs of a host channel.
///
/// ```toml
/// [channel]
/// allocation_retries = 2
/// busy_retries = 3
/// busy_backoff_ms = 100
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    allocation_retries: u32,
    busy_retries: u32,
    busy_backoff_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            allocation_retries: 0,
            busy_retries: 3,
            busy_backoff_ms: 100,
        }
    }
}

impl ChannelConfig {
    pub fn new(allocation_retries: u32, busy_retries: u32, busy_backoff_ms: u64) -> Self {
        Self {
            allocation_retries,
            busy_retries,
            busy_backoff_ms,
        }
    }

    /// Unrelated broadcast frames tolerated while waiting for an allocation response.
    pub fn allocation_retries(&self) -> u32 {
        self.allocation_retries
    }

    /// Resends of a frame answered with TRANSPORT_BUSY.
    pub fn busy_retries(&self) -> u32 {
        self.busy_retries
    }

    pub fn busy_backoff(&self) -> Duration {
        Duration::from_millis(self.busy_backoff_ms)
    }
}
