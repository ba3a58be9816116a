use crate::{
    cipher_state::{Cipher, CipherState},
    error::{Error, Result},
    handshake::{read_key, HandshakeOp},
    NoiseCodec,
};
use aes_gcm::Aes256Gcm;
use const_thp::{AEAD_TAG_SIZE, HANDSHAKE_INIT_RES_SIZE, X25519_KEY_SIZE};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

/// Host side of the XX handshake.
///
/// ```txt
/// -> e
/// <- e, ee, s, es
/// -> s, se
/// ```
pub struct Initiator {
    handshake_cipher: Option<Aes256Gcm>,
    k: Option<[u8; 32]>,
    n: u64,
    ck: [u8; 32],
    h: [u8; 32],
    s: StaticSecret,
    e: StaticSecret,
    re: Option<[u8; 32]>,
    rs: Option<[u8; 32]>,
    sent_ephemeral: bool,
}

impl std::fmt::Debug for Initiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Initiator").finish()
    }
}

impl CipherState for Initiator {
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
        &mut self.handshake_cipher
    }

    fn set_k(&mut self, k: Option<[u8; 32]>) {
        self.k = k;
    }
}

impl HandshakeOp for Initiator {
    fn name(&self) -> String {
        "Initiator".to_string()
    }
    fn get_h(&mut self) -> &mut [u8; 32] {
        &mut self.h
    }

    fn get_ck(&mut self) -> &mut [u8; 32] {
        &mut self.ck
    }

    fn set_h(&mut self, data: [u8; 32]) {
        self.h = data;
    }

    fn set_ck(&mut self, data: [u8; 32]) {
        self.ck = data;
    }

    fn set_handshake_cipher(&mut self, cipher: Aes256Gcm) {
        self.handshake_cipher = Some(cipher);
    }
}

impl Initiator {
    /// `static_key` is the host static private key, `prologue` the device properties received
    /// during channel allocation.
    pub fn new(static_key: [u8; 32], prologue: &[u8]) -> Box<Self> {
        Self::with_ephemeral(static_key, Self::generate_key(), prologue)
    }

    pub fn with_ephemeral(static_key: [u8; 32], e: StaticSecret, prologue: &[u8]) -> Box<Self> {
        let mut self_ = Self {
            handshake_cipher: None,
            k: None,
            n: 0,
            ck: [0; 32],
            h: [0; 32],
            s: StaticSecret::from(static_key),
            e,
            re: None,
            rs: None,
            sent_ephemeral: false,
        };
        self_.initialize_self(prologue);
        Box::new(self_)
    }

    pub fn static_public_key(&self) -> [u8; 32] {
        PublicKey::from(&self.s).to_bytes()
    }

    /// Device static key, known once [`Initiator::step_2`] succeeded.
    pub fn remote_static_key(&self) -> Option<[u8; 32]> {
        self.rs
    }

    /// Transcript hash. After [`Initiator::step_2`] it is the value both peers bind pairing to.
    pub fn handshake_hash(&self) -> [u8; 32] {
        self.h
    }

    /// First handshake message: the ephemeral public key.
    pub fn step_0(&mut self) -> Result<[u8; X25519_KEY_SIZE]> {
        let e_pub = PublicKey::from(&self.e).to_bytes();
        self.mix_hash(&e_pub);
        self.encrypt_and_hash(&mut vec![])?;
        self.sent_ephemeral = true;
        Ok(e_pub)
    }

    /// Consumes the responder message `e, ee, s, es` and produces `s, se` carrying `payload`,
    /// together with the transport ciphers.
    pub fn step_2(&mut self, message: &[u8], payload: &[u8]) -> Result<(Vec<u8>, NoiseCodec)> {
        if !self.sent_ephemeral {
            return Err(Error::InvalidHandshakeStep);
        }
        if message.len() != HANDSHAKE_INIT_RES_SIZE {
            return Err(Error::InvalidMessageLength {
                expected: HANDSHAKE_INIT_RES_SIZE,
                actual: message.len(),
            });
        }
        let (re, rest) = message.split_at(X25519_KEY_SIZE);
        let (rs_encrypted, payload_encrypted) = rest.split_at(X25519_KEY_SIZE + AEAD_TAG_SIZE);

        // e
        let re = read_key(re)?;
        self.mix_hash(&re);
        self.re = Some(re);

        // ee
        let ecdh = Self::ecdh(&self.e, &re)?;
        self.mix_key(&ecdh);

        // s
        let mut rs = rs_encrypted.to_vec();
        self.decrypt_and_hash(&mut rs)?;
        let rs = read_key(&rs)?;
        self.rs = Some(rs);

        // es
        let ecdh = Self::ecdh(&self.e, &rs)?;
        self.mix_key(&ecdh);

        let mut responder_payload = payload_encrypted.to_vec();
        self.decrypt_and_hash(&mut responder_payload)?;

        // -> s
        let mut out = PublicKey::from(&self.s).to_bytes().to_vec();
        self.encrypt_and_hash(&mut out)?;

        // se
        let ecdh = Self::ecdh(&self.s, &re)?;
        self.mix_key(&ecdh);

        let mut payload = payload.to_vec();
        self.encrypt_and_hash(&mut payload)?;
        out.extend_from_slice(&payload);

        let (k1, k2) = self.split();
        let codec = NoiseCodec {
            encryptor: Cipher::from_key(k1),
            decryptor: Cipher::from_key(k2),
        };
        Ok((out, codec))
    }

    fn erase(&mut self) {
        self.k.zeroize();
        self.ck.zeroize();
        self.h.zeroize();
        self.handshake_cipher = None;
    }
}

impl Drop for Initiator {
    fn drop(&mut self) {
        self.erase();
    }
}
