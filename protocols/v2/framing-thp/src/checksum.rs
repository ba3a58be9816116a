//! CRC32 integrity code appended to every frame.

use const_thp::CHECKSUM_LENGTH;

/// CRC32 of `data`, big-endian encoded.
pub fn compute(data: &[u8]) -> [u8; CHECKSUM_LENGTH] {
    crc32fast::hash(data).to_be_bytes()
}

pub fn is_valid(checksum: &[u8], data: &[u8]) -> bool {
    checksum == compute(data)
}
