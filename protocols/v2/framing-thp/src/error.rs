use core::fmt;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// The underlying transport failed
    Io(std::io::Error),
    /// Not enough bytes for a header, carries the offending bytes
    UnexpectedHeaderLength(Vec<u8>),
    /// A continuation chunk belongs to another channel
    ChannelIdMismatch { expected: u16, actual: u16 },
    /// A chunk that is not a continuation arrived in the middle of a frame
    ExpectedContinuation(u8),
    /// Declared length cannot even hold the checksum
    InvalidDataLength(u16),
    /// Payload does not fit the 2 byte length field
    PayloadTooLarge(usize),
    /// Chunk size of the transport cannot hold a header
    InvalidChunkSize(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;
        match self {
            Io(e) => write!(f, "Transport error: `{}`", e),
            UnexpectedHeaderLength(bytes) => {
                write!(f, "Unexpected `MessageHeader` bytes: `{:02x?}`", bytes)
            }
            ChannelIdMismatch { expected, actual } => write!(
                f,
                "Continuation chunk for channel `{:#06x}`, expected `{:#06x}`",
                actual, expected
            ),
            ExpectedContinuation(ctrl) => {
                write!(f, "Expected a continuation chunk, received ctrl byte `{:#04x}`", ctrl)
            }
            InvalidDataLength(len) => write!(f, "Invalid data length: `{}`", len),
            PayloadTooLarge(len) => write!(f, "Payload of `{}` bytes is too large", len),
            InvalidChunkSize(size) => write!(f, "Invalid transport chunk size: `{}`", size),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
