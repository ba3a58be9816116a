//! Configuration and logging shared by THP hosts and device simulators.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{load_config, ThpConfig};
pub use error::{Error, Result};
pub use logging::init_logging;
