//! Commitments, codes and tags of the pairing methods.
//!
//! Every value is bound to the handshake hash of the channel, so codes and tags computed on two
//! different handshakes (a relay between two channels) never agree.

use const_thp::{CODE_ENTRY_MODULUS, PAIRING_SECRET_SIZE};
use messages_thp::ThpPairingMethod;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub type Secret = [u8; PAIRING_SECRET_SIZE];

pub fn random_secret() -> Secret {
    let mut secret = [0_u8; PAIRING_SECRET_SIZE];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}

fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// `SHA256(secret)`
pub fn code_entry_commitment(secret: &[u8]) -> [u8; 32] {
    sha256(&[secret])
}

/// Six decimal digits: `SHA256(method || handshake_hash || secret || challenge)` read as a big
/// endian integer, modulo 1 000 000.
pub fn code_entry_code(handshake_hash: &[u8], secret: &[u8], challenge: &[u8]) -> u32 {
    let digest = sha256(&[
        &[ThpPairingMethod::CodeEntry.tag()],
        handshake_hash,
        secret,
        challenge,
    ]);
    let modulus = CODE_ENTRY_MODULUS as u64;
    digest
        .iter()
        .fold(0_u64, |acc, byte| (acc * 256 + *byte as u64) % modulus) as u32
}

/// The code as CPace password, 6 bytes big endian.
pub fn code_entry_password(code: u32) -> [u8; 6] {
    let bytes = (code as u64).to_be_bytes();
    let mut password = [0_u8; 6];
    password.copy_from_slice(&bytes[2..]);
    password
}

/// `SHA256(shared_secret)`
pub fn code_entry_tag(shared_secret: &[u8]) -> [u8; 32] {
    sha256(&[shared_secret])
}

/// Displayed QR code: `SHA256(method || handshake_hash || secret)[..16]`.
pub fn qr_code_code(handshake_hash: &[u8], secret: &[u8]) -> Secret {
    let digest = sha256(&[&[ThpPairingMethod::QrCode.tag()], handshake_hash, secret]);
    let mut code = [0_u8; PAIRING_SECRET_SIZE];
    code.copy_from_slice(&digest[..PAIRING_SECRET_SIZE]);
    code
}

/// Tag the host derives from the scanned code: `SHA256(handshake_hash || code)`.
pub fn qr_code_tag(handshake_hash: &[u8], code: &[u8]) -> [u8; 32] {
    sha256(&[handshake_hash, code])
}

/// `SHA256(method || handshake_hash || secret)`, used in both directions.
pub fn nfc_tag(handshake_hash: &[u8], secret: &[u8]) -> [u8; 32] {
    sha256(&[&[ThpPairingMethod::Nfc.tag()], handshake_hash, secret])
}

/// Comparison whose duration does not depend on where the inputs differ.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
