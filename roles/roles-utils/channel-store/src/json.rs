//! Channel records in a JSON file.

use crate::{upsert, ChannelStore, Result};
use codec_thp::ChannelData;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// The file holds a JSON array of records. A missing file is an empty store.
#[derive(Debug, Clone)]
pub struct JsonChannelStore {
    path: PathBuf,
}

impl JsonChannelStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a sibling file first and renames it over the store, a crash leaves either the
    /// old or the new content.
    fn write_all(&self, channels: &[ChannelData]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(channels)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), records = channels.len(), "Channel store written");
        Ok(())
    }
}

impl ChannelStore for JsonChannelStore {
    fn load_stored_channels(&self) -> Result<Vec<ChannelData>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save_channel(&mut self, channel: &ChannelData) -> Result<()> {
        let mut channels = self.load_stored_channels()?;
        upsert(&mut channels, channel);
        self.write_all(&channels)?;
        info!(transport_path = %channel.transport_path, channel_id = channel.channel_id, "Channel saved");
        Ok(())
    }

    fn remove_channel(&mut self, transport_path: &str) -> Result<()> {
        let mut channels = self.load_stored_channels()?;
        let before = channels.len();
        channels.retain(|c| c.transport_path != transport_path);
        if channels.len() != before {
            self.write_all(&channels)?;
            info!(transport_path, "Channel removed");
        }
        Ok(())
    }

    fn clear_stored_channels(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
