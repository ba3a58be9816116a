//! THP channels.
//!
//! A channel is a logical, encrypted session with one device over one transport. The host side
//! goes through:
//!
//! ```txt
//! Unallocated -> NoiseHandshakeInProgress -> HandshakeComplete -> Ready
//! ```
//!
//! - allocation: an 8 byte nonce on the broadcast channel `0xFFFF`, answered with the echoed
//!   nonce, the assigned channel id and the device properties.
//! - handshake: Noise XX (see [`noise_thp`]), the device properties are the prologue and the
//!   host may present a pairing credential in the last message.
//! - transport: `session_id || message_type || data` encrypted and framed as
//!   `ENCRYPTED_TRANSPORT`, each frame acknowledged before the next one is sent.
//!
//! [`ProtocolV2Channel`] is the host implementation, [`device::DeviceChannel`] is the device
//! mirror used by pairing and by simulators. [`ProtocolV1Channel`] is the legacy unencrypted
//! codec behind the same [`Channel`] capability set.

pub mod channel_data;
pub mod config;
pub mod device;
pub mod error;
mod sync;
pub mod v1;
pub mod v2;

pub use channel_data::ChannelData;
pub use config::ChannelConfig;
pub use error::{Error, Result, ThpErrorCode};
pub use v1::ProtocolV1Channel;
pub use v2::ProtocolV2Channel;

use messages_thp::{Features, RawMessage};

/// Capability set shared by the legacy and the THP channels.
pub trait Channel {
    /// Features of the device, queried once and cached.
    fn get_features(&mut self) -> Result<Features>;

    /// Queries the features again, replacing the cached value.
    fn update_features(&mut self) -> Result<()>;

    /// Reads the next message addressed to `session_id`. Legacy channels have no sessions.
    fn read(&mut self, session_id: u8) -> Result<RawMessage>;

    fn write(&mut self, session_id: u8, message: &RawMessage) -> Result<()>;
}

/// Host view of the channel lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Unallocated,
    NoiseHandshakeInProgress,
    HandshakeComplete,
    Ready,
    /// A fatal error happened, the channel must be reallocated
    Invalidated,
}

/// Device view of the channel, including the pairing phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceChannelState {
    /// Waiting for the handshake init request
    Th1,
    /// Waiting for the handshake completion request
    Th2,
    /// Handshake done, no pairing started
    Tp0,
    /// Pairing method selected, preparing
    Tp1,
    /// Code entry challenge exchanged
    Tp2,
    /// Method screen shown, waiting for the host tag
    Tp3,
    /// Secret revealed
    Tp4,
    /// Credential phase
    Tc1,
    EncryptedTransport,
    Invalidated,
}

/// Pairing state the device reports at the end of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrezorState {
    Unpaired,
    Paired,
    PairedAutoconnect,
}

impl TrezorState {
    pub fn is_paired(self) -> bool {
        !matches!(self, TrezorState::Unpaired)
    }
}

impl TryFrom<&[u8]> for TrezorState {
    type Error = Error;

    fn try_from(payload: &[u8]) -> Result<Self> {
        match payload {
            [const_thp::TREZOR_STATE_UNPAIRED] => Ok(TrezorState::Unpaired),
            [const_thp::TREZOR_STATE_PAIRED] => Ok(TrezorState::Paired),
            [const_thp::TREZOR_STATE_PAIRED_AUTOCONNECT] => Ok(TrezorState::PairedAutoconnect),
            other => Err(Error::InvalidTrezorState(other.to_vec())),
        }
    }
}

impl From<TrezorState> for u8 {
    fn from(state: TrezorState) -> Self {
        match state {
            TrezorState::Unpaired => const_thp::TREZOR_STATE_UNPAIRED,
            TrezorState::Paired => const_thp::TREZOR_STATE_PAIRED,
            TrezorState::PairedAutoconnect => const_thp::TREZOR_STATE_PAIRED_AUTOCONNECT,
        }
    }
}

/// `session_id || message_type || data`
pub(crate) fn encode_transport_payload(session_id: u8, message: &RawMessage) -> Vec<u8> {
    let mut payload = Vec::with_capacity(3 + message.data.len());
    payload.push(session_id);
    payload.extend_from_slice(&message.message_type.to_be_bytes());
    payload.extend_from_slice(&message.data);
    payload
}

pub(crate) fn decode_transport_payload(mut payload: Vec<u8>) -> Result<(u8, RawMessage)> {
    let header_len = const_thp::SESSION_ID_SIZE + const_thp::MESSAGE_TYPE_SIZE;
    if payload.len() < header_len {
        return Err(Error::InvalidPayload(payload));
    }
    let data = payload.split_off(header_len);
    let message_type = u16::from_be_bytes([payload[1], payload[2]]);
    Ok((payload[0], RawMessage::new(message_type, data)))
}
