//! Legacy unencrypted codec.
//!
//! Messages travel in 64 byte reports. The first report carries `?##`, the message type
//! (2 bytes) and the data length (4 bytes), following reports start with `?`. All reports are
//! zero padded.

use crate::{Channel, Error, Result};
use const_thp::{V1_CHUNK_SIZE, V1_HEADER_MAGIC, V1_MAGIC};
use framing_thp::Transport;
use messages_thp::{Failure, Features, GetFeatures, Initialize, Outcome, RawMessage, ThpMessage};
use tracing::debug;

const HEADER_SIZE: usize = 1 + 2 + 2 + 4;

pub struct ProtocolV1Channel<T> {
    transport: T,
    features: Option<Features>,
}

impl<T: Transport> ProtocolV1Channel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            features: None,
        }
    }

    pub fn write_raw(&mut self, message: &RawMessage) -> Result<()> {
        let mut buffer = Vec::with_capacity(HEADER_SIZE - 1 + message.data.len());
        buffer.extend_from_slice(V1_HEADER_MAGIC);
        buffer.extend_from_slice(&message.message_type.to_be_bytes());
        buffer.extend_from_slice(&(message.data.len() as u32).to_be_bytes());
        buffer.extend_from_slice(&message.data);

        for slice in buffer.chunks(V1_CHUNK_SIZE - 1) {
            let mut chunk = Vec::with_capacity(V1_CHUNK_SIZE);
            chunk.push(V1_MAGIC);
            chunk.extend_from_slice(slice);
            chunk.resize(V1_CHUNK_SIZE, 0);
            self.transport.write_chunk(&chunk)?;
        }
        debug!(message_type = message.message_type, "v1 message sent");
        Ok(())
    }

    pub fn read_raw(&mut self) -> Result<RawMessage> {
        let first = self.transport.read_chunk()?;
        if first.len() < HEADER_SIZE || first[0] != V1_MAGIC || &first[1..3] != V1_HEADER_MAGIC {
            return Err(Error::InvalidV1Header(first));
        }
        let message_type = u16::from_be_bytes([first[3], first[4]]);
        let length = u32::from_be_bytes([first[5], first[6], first[7], first[8]]) as usize;

        let mut data = first[HEADER_SIZE..].to_vec();
        while data.len() < length {
            let chunk = self.transport.read_chunk()?;
            if chunk.first() != Some(&V1_MAGIC) {
                return Err(Error::InvalidV1Header(chunk));
            }
            data.extend_from_slice(&chunk[1..]);
        }
        data.truncate(length);
        Ok(RawMessage::new(message_type, data))
    }

    pub fn write_message<M: ThpMessage>(&mut self, message: &M) -> Result<()> {
        self.write_raw(&RawMessage::from_message(message))
    }

    pub fn read_expected<M: ThpMessage>(&mut self) -> Result<M> {
        match self.read_raw()?.into_outcome::<M>()? {
            Outcome::Expected(message) => Ok(message),
            Outcome::Unexpected(raw) if raw.is::<Failure>() => {
                let failure = raw.decode::<Failure>()?;
                Err(Error::Failure {
                    code: failure.code,
                    message: failure.message,
                })
            }
            Outcome::Unexpected(raw) => Err(Error::Message(
                messages_thp::Error::UnexpectedMessageType {
                    expected: M::MESSAGE_TYPE,
                    actual: raw.message_type,
                },
            )),
        }
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}

impl<T: Transport> Channel for ProtocolV1Channel<T> {
    /// The first query is an `Initialize`, which also resets the device session.
    fn get_features(&mut self) -> Result<Features> {
        if let Some(features) = &self.features {
            return Ok(features.clone());
        }
        self.write_message(&Initialize {})?;
        let features = self.read_expected::<Features>()?;
        self.features = Some(features.clone());
        Ok(features)
    }

    fn update_features(&mut self) -> Result<()> {
        self.write_message(&GetFeatures {})?;
        self.features = Some(self.read_expected::<Features>()?);
        Ok(())
    }

    fn read(&mut self, _session_id: u8) -> Result<RawMessage> {
        self.read_raw()
    }

    fn write(&mut self, _session_id: u8, message: &RawMessage) -> Result<()> {
        self.write_raw(message)
    }
}
