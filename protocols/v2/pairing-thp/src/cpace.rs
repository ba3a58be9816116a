//! CPace over ristretto255.
//!
//! Both sides derive a generator from the 6 digit code and the handshake hash, exchange
//! `Y = y·G` and hash the common point `K = y·Y_peer` into the shared secret. Without the code
//! the peer's public key carries no information about the secret.

use crate::{Error, Result};
use const_thp::{CPACE_GENERATOR_LABEL, CPACE_ISK_LABEL};
use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
    traits::IsIdentity,
};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroize;

/// Which side of the exchange we are, fixes the order of the public keys in the shared secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Trezor,
    Host,
}

pub struct Cpace {
    role: Role,
    handshake_hash: Vec<u8>,
    secret: Option<Scalar>,
    public_key: Option<[u8; 32]>,
    shared_secret: Option<[u8; 32]>,
}

impl Cpace {
    pub fn new(role: Role, handshake_hash: &[u8]) -> Self {
        Self {
            role,
            handshake_hash: handshake_hash.to_vec(),
            secret: None,
            public_key: None,
            shared_secret: None,
        }
    }

    fn generator(&self, password: &[u8]) -> RistrettoPoint {
        let mut hasher = Sha512::new();
        hasher.update(CPACE_GENERATOR_LABEL);
        hasher.update([password.len() as u8]);
        hasher.update(password);
        hasher.update([self.handshake_hash.len() as u8]);
        hasher.update(&self.handshake_hash);
        let mut uniform = [0_u8; 64];
        uniform.copy_from_slice(&hasher.finalize());
        let generator = RistrettoPoint::from_uniform_bytes(&uniform);
        uniform.zeroize();
        generator
    }

    /// Draws the secret scalar and returns our public key.
    pub fn generate_keys<R: RngCore + CryptoRng>(&mut self, password: &[u8], rng: &mut R) -> [u8; 32] {
        let mut wide = [0_u8; 64];
        rng.fill_bytes(&mut wide);
        let secret = Scalar::from_bytes_mod_order_wide(&wide);
        wide.zeroize();

        let public_key = (secret * self.generator(password)).compress().to_bytes();
        self.secret = Some(secret);
        self.public_key = Some(public_key);
        public_key
    }

    /// Completes the exchange with the peer's public key.
    pub fn compute_shared_secret(&mut self, peer_public_key: &[u8]) -> Result<[u8; 32]> {
        let (secret, public_key) = match (&self.secret, self.public_key) {
            (Some(secret), Some(public_key)) => (secret, public_key),
            _ => return Err(Error::OutOfOrder("CPace keys not generated")),
        };
        let peer = CompressedRistretto::from_slice(peer_public_key)
            .map_err(|_| Error::InvalidCpaceKey)?
            .decompress()
            .ok_or(Error::InvalidCpaceKey)?;
        let point = secret * peer;
        if point.is_identity() {
            return Err(Error::InvalidCpaceKey);
        }

        let (trezor_key, host_key) = match self.role {
            Role::Trezor => (public_key.to_vec(), peer_public_key.to_vec()),
            Role::Host => (peer_public_key.to_vec(), public_key.to_vec()),
        };
        let mut hasher = Sha256::new();
        hasher.update(CPACE_ISK_LABEL);
        hasher.update(&self.handshake_hash);
        hasher.update(point.compress().as_bytes());
        hasher.update(&trezor_key);
        hasher.update(&host_key);
        let shared_secret: [u8; 32] = hasher.finalize().into();
        self.shared_secret = Some(shared_secret);
        Ok(shared_secret)
    }

    pub fn public_key(&self) -> Option<[u8; 32]> {
        self.public_key
    }

    pub fn shared_secret(&self) -> Option<[u8; 32]> {
        self.shared_secret
    }
}

impl Drop for Cpace {
    fn drop(&mut self) {
        self.secret.zeroize();
        self.shared_secret.zeroize();
    }
}
