//! Messages exchanged inside an encrypted THP channel.
//!
//! Every message on the wire is a `(message_type, protobuf bytes)` pair, represented here as
//! [`RawMessage`]. Concrete messages implement [`ThpMessage`], which ties a prost struct to its
//! numeric type. Reading a message where a specific type is expected yields an [`Outcome`]: the
//! caller decides what an unexpected but well formed message means (a `Cancel` during pairing
//! is not an error, a `Features` is).

mod error;
pub mod messages;

pub use error::{Error, Result};
pub use messages::*;

pub trait ThpMessage: prost::Message + Default {
    const MESSAGE_TYPE: u16;
    const NAME: &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub message_type: u16,
    pub data: Vec<u8>,
}

impl RawMessage {
    pub fn new(message_type: u16, data: Vec<u8>) -> Self {
        Self { message_type, data }
    }

    pub fn from_message<M: ThpMessage>(message: &M) -> Self {
        Self {
            message_type: M::MESSAGE_TYPE,
            data: message.encode_to_vec(),
        }
    }

    pub fn is<M: ThpMessage>(&self) -> bool {
        self.message_type == M::MESSAGE_TYPE
    }

    pub fn decode<M: ThpMessage>(&self) -> Result<M> {
        if !self.is::<M>() {
            return Err(Error::UnexpectedMessageType {
                expected: M::MESSAGE_TYPE,
                actual: self.message_type,
            });
        }
        Ok(M::decode(self.data.as_slice())?)
    }

    pub fn into_outcome<M: ThpMessage>(self) -> Result<Outcome<M>> {
        if self.is::<M>() {
            Ok(Outcome::Expected(self.decode()?))
        } else {
            Ok(Outcome::Unexpected(self))
        }
    }
}

/// Result of reading a message of an expected type. Fatal problems are the `Err` side of the
/// surrounding `Result`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<M> {
    Expected(M),
    Unexpected(RawMessage),
}

impl<M> Outcome<M> {
    /// Turns an unexpected message into an error.
    pub fn expected(self) -> Result<M>
    where
        M: ThpMessage,
    {
        match self {
            Outcome::Expected(m) => Ok(m),
            Outcome::Unexpected(raw) => Err(Error::UnexpectedMessageType {
                expected: M::MESSAGE_TYPE,
                actual: raw.message_type,
            }),
        }
    }
}

/// Extracts a required field.
pub fn required<T>(field: Option<T>, name: &'static str) -> Result<T> {
    field.ok_or(Error::MissingField(name))
}
