//! Persistence of established channels, keyed by transport path.
//!
//! A host that stored a channel can talk to the device again after a restart without a new
//! handshake, see `ProtocolV2Channel::resume`. Records hold derived transport keys only.

mod error;
pub mod json;

pub use error::{Error, Result};
pub use json::JsonChannelStore;

use codec_thp::ChannelData;

pub trait ChannelStore {
    fn load_stored_channels(&self) -> Result<Vec<ChannelData>>;

    /// Inserts or replaces the record with the same transport path.
    fn save_channel(&mut self, channel: &ChannelData) -> Result<()>;

    fn remove_channel(&mut self, transport_path: &str) -> Result<()>;

    fn clear_stored_channels(&mut self) -> Result<()>;

    fn find_channel(&self, transport_path: &str) -> Result<Option<ChannelData>> {
        Ok(self
            .load_stored_channels()?
            .into_iter()
            .find(|c| c.transport_path == transport_path))
    }
}

/// Store that keeps nothing, for hosts that must not persist channels.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyChannelStore;

impl ChannelStore for DummyChannelStore {
    fn load_stored_channels(&self) -> Result<Vec<ChannelData>> {
        Ok(Vec::new())
    }

    fn save_channel(&mut self, _channel: &ChannelData) -> Result<()> {
        Ok(())
    }

    fn remove_channel(&mut self, _transport_path: &str) -> Result<()> {
        Ok(())
    }

    fn clear_stored_channels(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Upsert by transport path, the record keeps its position when replaced.
pub(crate) fn upsert(channels: &mut Vec<ChannelData>, channel: &ChannelData) {
    match channels
        .iter_mut()
        .find(|c| c.transport_path == channel.transport_path)
    {
        Some(existing) => *existing = channel.clone(),
        None => channels.push(channel.clone()),
    }
}
