use crate::{control_byte, Error, Result};
use const_thp::{
    BROADCAST_CHANNEL_ID, CHECKSUM_LENGTH, CONTINUATION_PACKET, CONT_HEADER_SIZE,
    INIT_HEADER_SIZE, MAX_PAYLOAD_LENGTH,
};

/// Header of the first chunk of a frame.
///
/// `data_length` counts the payload plus the trailing checksum, so it tells the reader how many
/// continuation chunks follow.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    ctrl_byte: u8,
    channel_id: u16,
    data_length: u16,
}

impl MessageHeader {
    pub const SIZE: usize = INIT_HEADER_SIZE;
    pub const CONT_SIZE: usize = CONT_HEADER_SIZE;

    pub fn new(ctrl_byte: u8, channel_id: u16, data_length: u16) -> Self {
        Self {
            ctrl_byte,
            channel_id,
            data_length,
        }
    }

    /// Header for a payload of `payload_len` bytes, the checksum length is added here.
    pub fn for_payload(ctrl_byte: u8, channel_id: u16, payload_len: usize) -> Result<Self> {
        let data_length = payload_len + CHECKSUM_LENGTH;
        if data_length > MAX_PAYLOAD_LENGTH {
            return Err(Error::PayloadTooLarge(payload_len));
        }
        Ok(Self::new(ctrl_byte, channel_id, data_length as u16))
    }

    pub fn for_channel_allocation_request(payload_len: usize) -> Result<Self> {
        Self::for_payload(
            const_thp::CHANNEL_ALLOCATION_REQ,
            BROADCAST_CHANNEL_ID,
            payload_len,
        )
    }

    /// An ACK frame has no payload, only the checksum.
    pub fn for_ack(channel_id: u16, ack_bit: u8) -> Self {
        let ctrl_byte = control_byte::add_ack_bit_to_ctrl_byte(const_thp::ACK_MESSAGE, ack_bit);
        Self::new(ctrl_byte, channel_id, CHECKSUM_LENGTH as u16)
    }

    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::UnexpectedHeaderLength(bytes.to_vec()));
        }
        Ok(Self {
            ctrl_byte: bytes[0],
            channel_id: u16::from_be_bytes([bytes[1], bytes[2]]),
            data_length: u16::from_be_bytes([bytes[3], bytes[4]]),
        })
    }

    pub fn to_bytes(&self) -> [u8; INIT_HEADER_SIZE] {
        let cid = self.channel_id.to_be_bytes();
        let len = self.data_length.to_be_bytes();
        [self.ctrl_byte, cid[0], cid[1], len[0], len[1]]
    }

    pub fn to_bytes_cont(&self) -> [u8; CONT_HEADER_SIZE] {
        let cid = self.channel_id.to_be_bytes();
        [CONTINUATION_PACKET, cid[0], cid[1]]
    }

    pub fn ctrl_byte(&self) -> u8 {
        self.ctrl_byte
    }

    pub fn channel_id(&self) -> u16 {
        self.channel_id
    }

    pub fn data_length(&self) -> u16 {
        self.data_length
    }

    /// Payload length without the checksum trailer.
    pub fn payload_length(&self) -> usize {
        (self.data_length as usize).saturating_sub(CHECKSUM_LENGTH)
    }

    pub fn is_ack(&self) -> bool {
        control_byte::is_ack(self.ctrl_byte)
    }

    pub fn is_error(&self) -> bool {
        control_byte::is_error(self.ctrl_byte)
    }

    pub fn is_encrypted_transport(&self) -> bool {
        control_byte::is_encrypted_transport(self.ctrl_byte)
    }

    pub fn is_broadcast(&self) -> bool {
        self.channel_id == BROADCAST_CHANNEL_ID
    }
}

/// Parses a continuation header and checks it belongs to `channel_id`.
pub fn parse_continuation(bytes: &[u8], channel_id: u16) -> Result<()> {
    if bytes.len() < CONT_HEADER_SIZE {
        return Err(Error::UnexpectedHeaderLength(bytes.to_vec()));
    }
    if !control_byte::is_continuation(bytes[0]) {
        return Err(Error::ExpectedContinuation(bytes[0]));
    }
    let actual = u16::from_be_bytes([bytes[1], bytes[2]]);
    if actual != channel_id {
        return Err(Error::ChannelIdMismatch {
            expected: channel_id,
            actual,
        });
    }
    Ok(())
}
