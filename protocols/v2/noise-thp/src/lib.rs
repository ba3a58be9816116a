//! Noise `XX` handshake over Curve25519, AES-256-GCM and SHA-256, as used by THP.
//!
//! Both parties exchange their static keys during the handshake itself, so neither needs to
//! know the other in advance:
//!
//! ```txt
//! -> e                 host ephemeral key, 32 bytes
//! <- e, ee, s, es      device ephemeral and encrypted static key, 96 bytes
//! -> s, se             host encrypted static key plus an encrypted payload
//! ```
//!
//! The host is the [`Initiator`], the device the [`Responder`]. The device properties received
//! at channel allocation are mixed in as the prologue. Once the last message is processed both
//! sides hold the same transcript hash (the *handshake hash*), which pairing later commits to,
//! and a [`NoiseCodec`] for transport messages.
//!
//! Nonces are 4 zero bytes followed by a big-endian 64 bit counter.

mod cipher_state;
mod error;
mod handshake;
mod initiator;
mod responder;

use cipher_state::{Cipher, CipherState};
use handshake::HandshakeOp;
use x25519_dalek::{PublicKey, StaticSecret};

pub use aes_gcm::aead::Error as AeadError;
pub use error::{Error, Result};
pub use initiator::Initiator;
pub use responder::Responder;

/// Transport ciphers of an established channel, one per direction.
pub struct NoiseCodec {
    encryptor: Cipher,
    decryptor: Cipher,
}

impl std::fmt::Debug for NoiseCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseCodec").finish()
    }
}

impl NoiseCodec {
    /// Rebuilds the ciphers of a persisted channel.
    pub fn from_keys(
        encrypt_key: [u8; 32],
        encrypt_nonce: u64,
        decrypt_key: [u8; 32],
        decrypt_nonce: u64,
    ) -> Self {
        Self {
            encryptor: Cipher::from_key_and_nonce(encrypt_key, encrypt_nonce),
            decryptor: Cipher::from_key_and_nonce(decrypt_key, decrypt_nonce),
        }
    }

    pub fn encrypt(&mut self, msg: &mut Vec<u8>) -> Result<()> {
        self.encryptor.encrypt_with_ad(&[], msg)
    }

    pub fn decrypt(&mut self, msg: &mut Vec<u8>) -> Result<()> {
        self.decryptor.decrypt_with_ad(&[], msg)
    }

    pub fn encrypt_key(&self) -> Option<[u8; 32]> {
        self.encryptor.key()
    }

    pub fn decrypt_key(&self) -> Option<[u8; 32]> {
        self.decryptor.key()
    }

    pub fn encrypt_nonce(&self) -> u64 {
        self.encryptor.nonce()
    }

    pub fn decrypt_nonce(&self) -> u64 {
        self.decryptor.nonce()
    }
}

/// Fresh X25519 private key from the thread rng.
pub fn generate_private_key() -> [u8; 32] {
    Initiator::generate_key().to_bytes()
}

pub fn public_key(private_key: &[u8; 32]) -> [u8; 32] {
    PublicKey::from(&StaticSecret::from(*private_key)).to_bytes()
}
