use crate::error::{Error, Result};
use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm,
};
use zeroize::Zeroize;

pub trait CipherState
where
    Self: Sized,
{
    fn get_k(&mut self) -> &mut Option<[u8; 32]>;
    fn set_k(&mut self, k: Option<[u8; 32]>);
    fn get_n(&self) -> u64;
    fn set_n(&mut self, n: u64);
    fn get_cipher(&mut self) -> &mut Option<Aes256Gcm>;

    /// Four zero bytes followed by the big-endian counter.
    fn nonce_to_bytes(&self) -> [u8; 12] {
        let mut res = [0u8; 12];
        res[4..].copy_from_slice(&self.get_n().to_be_bytes());
        res
    }

    /// Encrypts in place and appends the tag. Without a key the data is left untouched. The
    /// nonce only moves forward when encryption succeeds.
    fn encrypt_with_ad(&mut self, ad: &[u8], data: &mut Vec<u8>) -> Result<()> {
        let n = self.get_n();
        if n == u64::MAX {
            return Err(Error::NonceExhausted);
        }
        let nonce = self.nonce_to_bytes();
        if let Some(c) = self.get_cipher() {
            c.encrypt_in_place((&nonce).into(), ad, data)?;
            self.set_n(n + 1);
        }
        Ok(())
    }

    fn decrypt_with_ad(&mut self, ad: &[u8], data: &mut Vec<u8>) -> Result<()> {
        let n = self.get_n();
        if n == u64::MAX {
            return Err(Error::NonceExhausted);
        }
        let nonce = self.nonce_to_bytes();
        if let Some(c) = self.get_cipher() {
            c.decrypt_in_place((&nonce).into(), ad, data)?;
            self.set_n(n + 1);
        }
        Ok(())
    }
}

/// Transport cipher for one direction of an established channel.
///
/// The key stays available so the channel can be persisted and resumed, it is wiped on drop.
pub struct Cipher {
    k: Option<[u8; 32]>,
    n: u64,
    cipher: Option<Aes256Gcm>,
}

impl Cipher {
    pub fn from_key(k: [u8; 32]) -> Self {
        Self::from_key_and_nonce(k, 0)
    }

    pub fn from_key_and_nonce(k: [u8; 32], n: u64) -> Self {
        Self {
            k: Some(k),
            n,
            cipher: Some(Aes256Gcm::new(&k.into())),
        }
    }

    pub fn key(&self) -> Option<[u8; 32]> {
        self.k
    }

    pub fn nonce(&self) -> u64 {
        self.n
    }

    pub fn erase_k(&mut self) {
        self.k.zeroize();
        self.k = None;
        self.cipher = None;
    }
}

impl Drop for Cipher {
    fn drop(&mut self) {
        self.erase_k();
    }
}

impl CipherState for Cipher {
    fn get_k(&mut self) -> &mut Option<[u8; 32]> {
        &mut self.k
    }
    fn get_n(&self) -> u64 {
        self.n
    }
    fn set_n(&mut self, n: u64) {
        self.n = n;
    }
    fn get_cipher(&mut self) -> &mut Option<Aes256Gcm> {
        &mut self.cipher
    }

    fn set_k(&mut self, k: Option<[u8; 32]>) {
        self.k = k;
    }
}
