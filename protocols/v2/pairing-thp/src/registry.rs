//! Channels known to the device, by host static key.

use std::collections::HashMap;
use tracing::info;

/// At most one live channel per host identity. Pairing on a new channel evicts the others.
pub trait ChannelRegistry {
    /// Drops every channel other than `channel_id` bound to `host_static_pubkey`, returns how
    /// many were dropped. `channel_id` itself becomes bound to the key.
    fn replace_channels_with_host_key(
        &mut self,
        channel_id: u16,
        host_static_pubkey: &[u8; 32],
    ) -> usize;

    /// Whether another channel bound to `host_static_pubkey` exists, which a new connection
    /// would replace.
    fn is_channel_to_replace(&self, channel_id: u16, host_static_pubkey: &[u8; 32]) -> bool;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryChannelRegistry {
    channels: HashMap<u16, [u8; 32]>,
}

impl MemoryChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, channel_id: u16, host_static_pubkey: [u8; 32]) {
        self.channels.insert(channel_id, host_static_pubkey);
    }

    pub fn contains(&self, channel_id: u16) -> bool {
        self.channels.contains_key(&channel_id)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl ChannelRegistry for MemoryChannelRegistry {
    fn replace_channels_with_host_key(
        &mut self,
        channel_id: u16,
        host_static_pubkey: &[u8; 32],
    ) -> usize {
        let before = self.channels.len();
        self.channels
            .retain(|id, key| *id == channel_id || key != host_static_pubkey);
        let replaced = before - self.channels.len();
        self.channels.insert(channel_id, *host_static_pubkey);
        if replaced > 0 {
            info!(channel_id, replaced, "Replaced channels of the same host");
        }
        replaced
    }

    fn is_channel_to_replace(&self, channel_id: u16, host_static_pubkey: &[u8; 32]) -> bool {
        self.channels
            .iter()
            .any(|(id, key)| *id != channel_id && key == host_static_pubkey)
    }
}
