use core::fmt;
use std::{io, path::PathBuf};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Configuration file missing, malformed or not matching [`crate::ThpConfig`]
    Config(ext_config::ConfigError),
    /// Path that is not valid UTF-8
    InvalidPath(PathBuf),
    /// Log file cannot be opened
    Io(io::Error),
    /// A global subscriber is already installed
    Logging(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;
        match self {
            Config(e) => write!(f, "Configuration error: `{}`", e),
            InvalidPath(path) => write!(f, "Invalid path `{}`", path.display()),
            Io(e) => write!(f, "I/O error: `{}`", e),
            Logging(e) => write!(f, "Cannot install logger: `{}`", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<ext_config::ConfigError> for Error {
    fn from(e: ext_config::ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
