use core::fmt;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Protobuf payload could not be decoded
    Decode(prost::DecodeError),
    /// Asked to decode a message of a different type
    UnexpectedMessageType { expected: u16, actual: u16 },
    /// A field required by the protocol is absent
    MissingField(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;
        match self {
            Decode(e) => write!(f, "Protobuf decode error: `{}`", e),
            UnexpectedMessageType { expected, actual } => write!(
                f,
                "Unexpected message type: expected `{}`, received `{}`",
                expected, actual
            ),
            MissingField(name) => write!(f, "Missing required field `{}`", name),
        }
    }
}

impl std::error::Error for Error {}

impl From<prost::DecodeError> for Error {
    fn from(e: prost::DecodeError) -> Self {
        Error::Decode(e)
    }
}
