//! Splitting a frame into transport chunks and reassembling it on the way in.

use crate::{checksum, control_byte, header::parse_continuation, Error, MessageHeader, Result, Transport};
use const_thp::{CHECKSUM_LENGTH, CONT_HEADER_SIZE, INIT_HEADER_SIZE};
use tracing::{debug, warn};

/// A reassembled frame. The checksum has not been verified yet, see [`Frame::is_valid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: MessageHeader,
    pub payload: Vec<u8>,
    pub checksum: [u8; CHECKSUM_LENGTH],
}

impl Frame {
    /// The checksum covers the initial header and the payload.
    pub fn is_valid(&self) -> bool {
        let mut covered = self.header.to_bytes().to_vec();
        covered.extend_from_slice(&self.payload);
        checksum::is_valid(&self.checksum, &covered)
    }

    pub fn ctrl_byte(&self) -> u8 {
        self.header.ctrl_byte()
    }

    pub fn channel_id(&self) -> u16 {
        self.header.channel_id()
    }
}

/// Payload followed by its checksum, ready to be put behind `header`.
pub fn add_checksum(header: &MessageHeader, payload: &[u8]) -> Vec<u8> {
    let mut covered = header.to_bytes().to_vec();
    covered.extend_from_slice(payload);
    let mut data = payload.to_vec();
    data.extend_from_slice(&checksum::compute(&covered));
    data
}

/// Splits `header || data` into chunks of `chunk_size`, zero padding the last one. With no
/// chunk size the whole buffer is a single unit.
pub fn encode_chunks(
    header: &MessageHeader,
    data: &[u8],
    chunk_size: Option<usize>,
) -> Result<Vec<Vec<u8>>> {
    let mut buffer = header.to_bytes().to_vec();
    buffer.extend_from_slice(data);
    let size = match chunk_size {
        None => return Ok(vec![buffer]),
        Some(size) if size <= INIT_HEADER_SIZE => return Err(Error::InvalidChunkSize(size)),
        Some(size) => size,
    };

    let first_len = size.min(buffer.len());
    let mut first = buffer[..first_len].to_vec();
    first.resize(size, 0);
    let mut chunks = vec![first];

    let cont_header = header.to_bytes_cont();
    let mut rest = &buffer[first_len..];
    while !rest.is_empty() {
        let take = (size - CONT_HEADER_SIZE).min(rest.len());
        let mut chunk = Vec::with_capacity(size);
        chunk.extend_from_slice(&cont_header);
        chunk.extend_from_slice(&rest[..take]);
        chunk.resize(size, 0);
        chunks.push(chunk);
        rest = &rest[take..];
    }
    Ok(chunks)
}

/// Writes a frame whose `data` already ends with the checksum.
pub fn write_payload_to_wire<T: Transport + ?Sized>(
    transport: &mut T,
    header: &MessageHeader,
    data: &[u8],
) -> Result<()> {
    for chunk in encode_chunks(header, data, transport.chunk_size())? {
        transport.write_chunk(&chunk)?;
    }
    Ok(())
}

pub fn write_payload_to_wire_and_add_checksum<T: Transport + ?Sized>(
    transport: &mut T,
    ctrl_byte: u8,
    channel_id: u16,
    payload: &[u8],
) -> Result<()> {
    let header = MessageHeader::for_payload(ctrl_byte, channel_id, payload.len())?;
    let data = add_checksum(&header, payload);
    write_payload_to_wire(transport, &header, &data)
}

/// Reads one frame. Header problems and foreign continuation chunks are errors, a bad checksum
/// is left for the caller to detect. Continuation chunks of a frame we never saw the start of
/// are dropped.
pub fn read<T: Transport + ?Sized>(transport: &mut T) -> Result<Frame> {
    let first = loop {
        let chunk = transport.read_chunk()?;
        if chunk.first().is_some_and(|c| control_byte::is_continuation(*c)) {
            warn!("Dropping stray continuation chunk");
            continue;
        }
        break chunk;
    };
    let header = MessageHeader::from_bytes(&first)?;
    let expected = header.data_length() as usize;
    if expected < CHECKSUM_LENGTH {
        return Err(Error::InvalidDataLength(header.data_length()));
    }

    let mut data = first[INIT_HEADER_SIZE..].to_vec();
    while data.len() < expected {
        let chunk = transport.read_chunk()?;
        parse_continuation(&chunk, header.channel_id())?;
        data.extend_from_slice(&chunk[CONT_HEADER_SIZE..]);
    }
    data.truncate(expected);

    let trailer = data.split_off(expected - CHECKSUM_LENGTH);
    let mut checksum = [0_u8; CHECKSUM_LENGTH];
    checksum.copy_from_slice(&trailer);
    Ok(Frame {
        header,
        payload: data,
        checksum,
    })
}

/// Reads frames until one carries a valid checksum, corrupted frames are dropped.
pub fn read_until_valid_crc<T: Transport + ?Sized>(transport: &mut T) -> Result<Frame> {
    loop {
        let frame = read(transport)?;
        if frame.is_valid() {
            debug!(
                ctrl_byte = frame.ctrl_byte(),
                channel_id = frame.channel_id(),
                len = frame.payload.len(),
                "Frame received"
            );
            return Ok(frame);
        }
        warn!(
            channel_id = frame.channel_id(),
            "Discarding frame with invalid checksum"
        );
    }
}
