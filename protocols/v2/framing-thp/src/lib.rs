//! THP messages travel over transports that move fixed size chunks (USB HID, BLE) or whole
//! buffers (emulator sockets). Every message is a single frame: an initial chunk with a 5 byte
//! header, followed by as many continuation chunks as needed, with a CRC32 trailer closing the
//! payload.
//!
//! | Field | Size | Present on |
//! |---|---|---|
//! | `ctrl_byte` | 1 | all chunks |
//! | `channel_id` | 2 | all chunks |
//! | `data_length` | 2 | initial chunk only, counts the payload and the 4 byte checksum |
//! | `payload` | variable | all chunks |
//!
//! All integers are big-endian.
//!
//! This crate provides:
//! - [`checksum`]: CRC32 computation and validation.
//! - [`control_byte`]: classification of control bytes and sequence / ack bit handling.
//! - [`header`]: the [`MessageHeader`] codec.
//! - [`chunks`]: writing a frame as chunks and reading it back, see [`write_payload_to_wire`]
//!   and [`read_until_valid_crc`].
//! - [`memory`]: an in-process [`Transport`] used by simulators and tests.

pub mod checksum;
pub mod chunks;
pub mod control_byte;
pub mod error;
pub mod header;
pub mod memory;
pub mod transport;

pub use chunks::{
    read, read_until_valid_crc, write_payload_to_wire, write_payload_to_wire_and_add_checksum,
    Frame,
};
pub use error::{Error, Result};
pub use header::MessageHeader;
pub use transport::Transport;
