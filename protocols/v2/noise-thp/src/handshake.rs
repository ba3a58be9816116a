use crate::{
    cipher_state::CipherState,
    error::{Error, Result},
};
use aes_gcm::{aead::KeyInit, Aes256Gcm};
use const_thp::{HASH_LEN, NOISE_PROTOCOL_NAME};
use hmac::{digest::generic_array::GenericArray, Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey, StaticSecret};

type HmacSha256 = Hmac<Sha256>;

/// Symmetric state operations shared by both sides of the XX handshake.
pub trait HandshakeOp: CipherState {
    fn name(&self) -> String;
    fn get_h(&mut self) -> &mut [u8; 32];

    fn get_ck(&mut self) -> &mut [u8; 32];

    fn set_h(&mut self, data: [u8; 32]);

    fn set_ck(&mut self, data: [u8; 32]);

    fn set_handshake_cipher(&mut self, cipher: Aes256Gcm);

    fn mix_hash(&mut self, data: &[u8]) {
        let h = self.get_h();
        let mut hasher = Sha256::new();
        hasher.update(&h[..]);
        hasher.update(data);
        *h = hasher.finalize().into();
    }

    fn generate_key() -> StaticSecret {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        StaticSecret::from(bytes)
    }

    fn hmac_hash(key: &[u8; 32], data: &[u8]) -> [u8; 32] {
        // HMAC zero pads short keys to the block size, padding here keeps `new` infallible
        let mut block = [0u8; 64];
        block[..32].copy_from_slice(key);
        let mut mac = <HmacSha256 as Mac>::new(GenericArray::from_slice(&block));
        mac.update(data);
        mac.finalize().into_bytes().into()
    }

    fn hkdf_2(chaining_key: &[u8; 32], input_key_material: &[u8]) -> ([u8; 32], [u8; 32]) {
        let temp_key = Self::hmac_hash(chaining_key, input_key_material);
        let out_1 = Self::hmac_hash(&temp_key, &[0x1]);
        let out_2 = Self::hmac_hash(&temp_key, &[&out_1[..], &[0x2][..]].concat());
        (out_1, out_2)
    }

    fn mix_key(&mut self, input_key_material: &[u8]) {
        let ck = self.get_ck();
        let (ck, temp_k) = Self::hkdf_2(ck, input_key_material);
        self.set_ck(ck);
        self.initialize_key(temp_k);
    }

    fn encrypt_and_hash(&mut self, plaintext: &mut Vec<u8>) -> Result<()> {
        if self.get_k().is_some() {
            let h = *self.get_h();
            self.encrypt_with_ad(&h, plaintext)?;
        };
        let ciphertext = plaintext;
        self.mix_hash(ciphertext);
        Ok(())
    }

    fn decrypt_and_hash(&mut self, ciphertext: &mut Vec<u8>) -> Result<()> {
        let encrypted = ciphertext.clone();
        if self.get_k().is_some() {
            let h = *self.get_h();
            self.decrypt_with_ad(&h, ciphertext)?;
        };
        self.mix_hash(&encrypted);
        Ok(())
    }

    fn ecdh(private: &StaticSecret, public: &[u8; 32]) -> Result<[u8; 32]> {
        let shared = private.diffie_hellman(&PublicKey::from(*public));
        if !shared.was_contributory() {
            return Err(Error::InvalidPublicKey);
        }
        Ok(*shared.as_bytes())
    }

    /// Protocol name padded to the hash length becomes both `h` and `ck`, then the prologue
    /// (the device properties) is mixed in.
    fn initialize_self(&mut self, prologue: &[u8]) {
        let mut h = [0u8; HASH_LEN];
        h[..NOISE_PROTOCOL_NAME.len()].copy_from_slice(NOISE_PROTOCOL_NAME);
        self.set_h(h);
        self.set_ck(h);
        self.set_k(None);
        self.set_n(0);
        self.mix_hash(prologue);
    }

    fn initialize_key(&mut self, key: [u8; 32]) {
        self.set_n(0);
        let cipher = Aes256Gcm::new(&key.into());
        self.set_handshake_cipher(cipher);
        self.set_k(Some(key));
    }

    /// `(k1, k2)`: k1 protects host to device traffic, k2 the opposite direction.
    fn split(&mut self) -> ([u8; 32], [u8; 32]) {
        Self::hkdf_2(self.get_ck(), &[])
    }
}

pub(crate) fn read_key(bytes: &[u8]) -> Result<[u8; 32]> {
    bytes.try_into().map_err(|_| Error::InvalidMessageLength {
        expected: 32,
        actual: bytes.len(),
    })
}
