use crate::{Error, Result};
use codec_thp::ChannelConfig;
use ext_config::{Config, File, FileFormat};
use pairing_thp::PairingConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_HOST_NAME: &str = "THP host";

fn default_host_name() -> String {
    DEFAULT_HOST_NAME.to_string()
}

/// Everything a host or a device simulator reads from its TOML file.
///
/// ```toml
/// host_name = "laptop"
/// store_path = "channels.json"
///
/// [channel]
/// busy_retries = 5
///
/// [pairing]
/// allowed_methods = ["CodeEntry", "QrCode"]
/// ```
#[derive(Debug, Deserialize, Clone)]
pub struct ThpConfig {
    #[serde(default)]
    channel: ChannelConfig,
    #[serde(default)]
    pairing: PairingConfig,
    #[serde(default = "default_host_name")]
    host_name: String,
    store_path: Option<PathBuf>,
    log_file: Option<PathBuf>,
}

impl Default for ThpConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            pairing: PairingConfig::default(),
            host_name: default_host_name(),
            store_path: None,
            log_file: None,
        }
    }
}

impl ThpConfig {
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize::<ThpConfig>()?)
    }

    pub fn channel(&self) -> &ChannelConfig {
        &self.channel
    }

    pub fn pairing(&self) -> &PairingConfig {
        &self.pairing
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// JSON channel store, `None` keeps channels in memory only.
    pub fn store_path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Command line `--log-file` wins over the file.
    pub fn set_log_file(&mut self, log_file: Option<PathBuf>) {
        if log_file.is_some() {
            self.log_file = log_file;
        }
    }
}

/// Loads and deserializes the TOML file at `path`.
pub fn load_config(path: &Path) -> Result<ThpConfig> {
    let config_path = path
        .to_str()
        .ok_or_else(|| Error::InvalidPath(path.to_path_buf()))?;

    let settings = Config::builder()
        .add_source(File::new(config_path, FileFormat::Toml))
        .build()
        .map_err(|e| {
            error!("Failed to build config: {}", e);
            e
        })?;

    settings.try_deserialize::<ThpConfig>().map_err(|e| {
        error!("Failed to deserialize config: {}", e);
        Error::Config(e)
    })
}
