//! THP pairing.
//!
//! After the handshake an unpaired host must prove to the user that it talks to this very
//! device, through one of the pairing methods:
//!
//! - `CodeEntry`: the device commits to a secret, the host sends a challenge, both derive a 6
//!   digit code the user types on the host. CPace turns the code into a shared secret.
//! - `QrCode`: the host scans a code derived from the handshake hash.
//! - `Nfc`: both ends exchange secrets over NFC and prove they read them.
//! - `SkipPairing`: no proof, when configuration allows it.
//!
//! A paired host receives credentials ([`credential_manager`]) it presents in later handshakes
//! to skip the pairing. [`handler::PairingHandler`] is the device state machine,
//! [`host::HostPairing`] the host driver.

pub mod config;
pub mod context;
pub mod cpace;
pub mod credential_manager;
pub mod crypto;
pub mod error;
pub mod handler;
pub mod host;
pub mod registry;
pub mod ui;

pub use config::PairingConfig;
pub use context::PairingContext;
pub use credential_manager::{CounterStore, CredentialManager, MemoryCounterStore};
pub use error::{Error, Result};
pub use handler::PairingHandler;
pub use host::HostPairing;
pub use registry::{ChannelRegistry, MemoryChannelRegistry};
pub use ui::{NfcHostData, PairingDisplay, PairingUi, ScreenOutcome};
