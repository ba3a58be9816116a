//! Durable form of an established channel.
//!
//! Only the derived transport keys are kept, never the handshake private keys. Keys and the
//! handshake hash are hex strings so the record stays readable in a JSON file.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelData {
    pub protocol_version_major: u32,
    pub protocol_version_minor: u32,
    /// Key of the record, at most one record exists per path
    pub transport_path: String,
    pub channel_id: u16,
    /// Host to device key
    pub key_request: String,
    /// Device to host key
    pub key_response: String,
    pub nonce_request: u64,
    pub nonce_response: u64,
    pub sync_bit_send: u8,
    pub sync_bit_receive: u8,
    pub handshake_hash: String,
}

impl ChannelData {
    pub fn key_request_bytes(&self) -> Result<[u8; 32]> {
        decode_32(&self.key_request, "key_request")
    }

    pub fn key_response_bytes(&self) -> Result<[u8; 32]> {
        decode_32(&self.key_response, "key_response")
    }

    pub fn handshake_hash_bytes(&self) -> Result<[u8; 32]> {
        decode_32(&self.handshake_hash, "handshake_hash")
    }

    pub(crate) fn check_sync_bits(&self) -> Result<()> {
        if self.sync_bit_send > 1 || self.sync_bit_receive > 1 {
            return Err(Error::InvalidChannelData(format!(
                "sync bits must be 0 or 1, got {} and {}",
                self.sync_bit_send, self.sync_bit_receive
            )));
        }
        Ok(())
    }
}

fn decode_32(value: &str, field: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(value)?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| Error::InvalidChannelData(format!("{} has {} bytes", field, b.len())))
}
