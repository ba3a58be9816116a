use crate::DeviceChannelState;
use core::fmt;

pub type Result<T> = core::result::Result<T, Error>;

/// Error code carried by an `ERROR` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThpErrorCode {
    TransportBusy,
    UnallocatedChannel,
    DecryptionFailed,
    InvalidData,
    DeviceLocked,
    Unknown(u8),
}

impl From<u8> for ThpErrorCode {
    fn from(code: u8) -> Self {
        match code {
            const_thp::TRANSPORT_BUSY => ThpErrorCode::TransportBusy,
            const_thp::UNALLOCATED_CHANNEL => ThpErrorCode::UnallocatedChannel,
            const_thp::DECRYPTION_FAILED => ThpErrorCode::DecryptionFailed,
            const_thp::INVALID_DATA => ThpErrorCode::InvalidData,
            const_thp::DEVICE_LOCKED => ThpErrorCode::DeviceLocked,
            other => ThpErrorCode::Unknown(other),
        }
    }
}

impl From<ThpErrorCode> for u8 {
    fn from(code: ThpErrorCode) -> Self {
        match code {
            ThpErrorCode::TransportBusy => const_thp::TRANSPORT_BUSY,
            ThpErrorCode::UnallocatedChannel => const_thp::UNALLOCATED_CHANNEL,
            ThpErrorCode::DecryptionFailed => const_thp::DECRYPTION_FAILED,
            ThpErrorCode::InvalidData => const_thp::INVALID_DATA,
            ThpErrorCode::DeviceLocked => const_thp::DEVICE_LOCKED,
            ThpErrorCode::Unknown(other) => other,
        }
    }
}

#[derive(Debug)]
pub enum Error {
    /// Transport, header or continuation problems
    Framing(framing_thp::Error),
    /// Handshake or transport cipher failure
    Noise(noise_thp::Error),
    /// Message decoding failure or wrong message type
    Message(messages_thp::Error),
    /// The device reported an error frame
    Thp(ThpErrorCode),
    /// The device refuses the handshake until it is unlocked
    DeviceLocked,
    /// The device answered a message with `Failure`
    Failure { code: Option<i32>, message: Option<String> },
    /// Allocation response does not echo our nonce or is truncated
    InvalidAllocationResponse(Vec<u8>),
    /// A frame of the wrong kind arrived
    UnexpectedControlByte { expected: u8, actual: u8 },
    /// Handshake completion response carries an unknown state
    InvalidTrezorState(Vec<u8>),
    /// A message for another session arrived
    SessionMismatch { expected: u8, actual: u8 },
    /// Decrypted payload is too short to hold session id and message type
    InvalidPayload(Vec<u8>),
    /// Legacy v1 chunk does not start with the expected magic
    InvalidV1Header(Vec<u8>),
    /// Operation not allowed in the current channel state
    InvalidState(&'static str),
    /// Device side operation not allowed in the current state
    InvalidDeviceState(DeviceChannelState),
    /// Persisted channel record cannot be turned back into a channel
    InvalidChannelData(String),
    /// TRANSPORT_BUSY persisted beyond the configured retries
    RetriesExhausted,
}

impl Error {
    /// Fatal errors leave the channel unusable, it must be reallocated.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::DeviceLocked
                | Error::SessionMismatch { .. }
                | Error::Message(_)
                | Error::Failure { .. }
                | Error::InvalidState(_)
                | Error::InvalidDeviceState(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;
        match self {
            Framing(e) => write!(f, "Framing error: `{}`", e),
            Noise(e) => write!(f, "Noise error: `{}`", e),
            Message(e) => write!(f, "Message error: `{}`", e),
            Thp(code) => write!(f, "Device reported error: `{:?}`", code),
            DeviceLocked => write!(f, "Device is locked, unlock it and retry the handshake"),
            Failure { code, message } => {
                write!(f, "Failure from device: code `{:?}`, message `{:?}`", code, message)
            }
            InvalidAllocationResponse(payload) => {
                write!(f, "Invalid channel allocation response: `{:02x?}`", payload)
            }
            UnexpectedControlByte { expected, actual } => write!(
                f,
                "Unexpected control byte: expected `{:#04x}`, received `{:#04x}`",
                expected, actual
            ),
            InvalidTrezorState(payload) => write!(f, "Invalid trezor state: `{:02x?}`", payload),
            SessionMismatch { expected, actual } => write!(
                f,
                "Message for session `{}` while reading session `{}`",
                actual, expected
            ),
            InvalidPayload(payload) => write!(f, "Invalid decrypted payload: `{:02x?}`", payload),
            InvalidV1Header(chunk) => write!(f, "Invalid v1 chunk: `{:02x?}`", chunk),
            InvalidState(state) => write!(f, "Channel not usable: `{}`", state),
            InvalidDeviceState(state) => write!(f, "Operation not allowed in state `{:?}`", state),
            InvalidChannelData(reason) => write!(f, "Invalid channel data: `{}`", reason),
            RetriesExhausted => write!(f, "Device stayed busy after all retries"),
        }
    }
}

impl std::error::Error for Error {}

impl From<framing_thp::Error> for Error {
    fn from(e: framing_thp::Error) -> Self {
        Error::Framing(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Framing(framing_thp::Error::Io(e))
    }
}

impl From<noise_thp::Error> for Error {
    fn from(e: noise_thp::Error) -> Self {
        Error::Noise(e)
    }
}

impl From<messages_thp::Error> for Error {
    fn from(e: messages_thp::Error) -> Self {
        Error::Message(e)
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::InvalidChannelData(e.to_string())
    }
}
