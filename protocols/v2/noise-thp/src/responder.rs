use crate::{
    cipher_state::{Cipher, CipherState},
    error::{Error, Result},
    handshake::{read_key, HandshakeOp},
    NoiseCodec,
};
use aes_gcm::Aes256Gcm;
use const_thp::{AEAD_TAG_SIZE, HANDSHAKE_INIT_REQ_SIZE, X25519_KEY_SIZE};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

/// Device side of the XX handshake.
pub struct Responder {
    handshake_cipher: Option<Aes256Gcm>,
    k: Option<[u8; 32]>,
    n: u64,
    ck: [u8; 32],
    h: [u8; 32],
    s: StaticSecret,
    e: StaticSecret,
    re: Option<[u8; 32]>,
    rs: Option<[u8; 32]>,
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder").finish()
    }
}

impl CipherState for Responder {
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

impl HandshakeOp for Responder {
    fn name(&self) -> String {
        "Responder".to_string()
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

impl Responder {
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
        };
        self_.initialize_self(prologue);
        Box::new(self_)
    }

    pub fn static_public_key(&self) -> [u8; 32] {
        PublicKey::from(&self.s).to_bytes()
    }

    /// Host static key, known once [`Responder::step_3`] succeeded.
    pub fn remote_static_key(&self) -> Option<[u8; 32]> {
        self.rs
    }

    pub fn handshake_hash(&self) -> [u8; 32] {
        self.h
    }

    /// Consumes the initiator ephemeral key and answers with `e, ee, s, es`.
    pub fn step_1(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        if message.len() != HANDSHAKE_INIT_REQ_SIZE {
            return Err(Error::InvalidMessageLength {
                expected: HANDSHAKE_INIT_REQ_SIZE,
                actual: message.len(),
            });
        }
        let re = read_key(message)?;
        self.mix_hash(&re);
        self.decrypt_and_hash(&mut vec![])?;
        self.re = Some(re);

        // e
        let e_pub = PublicKey::from(&self.e).to_bytes();
        self.mix_hash(&e_pub);
        let mut out = e_pub.to_vec();

        // ee
        let ecdh = Self::ecdh(&self.e, &re)?;
        self.mix_key(&ecdh);

        // s
        let mut encrypted_static = PublicKey::from(&self.s).to_bytes().to_vec();
        self.encrypt_and_hash(&mut encrypted_static)?;
        out.extend_from_slice(&encrypted_static);

        // es
        let ecdh = Self::ecdh(&self.s, &re)?;
        self.mix_key(&ecdh);

        let mut payload = vec![];
        self.encrypt_and_hash(&mut payload)?;
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Consumes `s, se` and returns the decrypted initiator payload with the transport ciphers.
    pub fn step_3(&mut self, message: &[u8]) -> Result<(Vec<u8>, NoiseCodec)> {
        if self.re.is_none() {
            return Err(Error::InvalidHandshakeStep);
        }
        let min_len = X25519_KEY_SIZE + 2 * AEAD_TAG_SIZE;
        if message.len() < min_len {
            return Err(Error::InvalidMessageLength {
                expected: min_len,
                actual: message.len(),
            });
        }
        let (rs_encrypted, payload_encrypted) = message.split_at(X25519_KEY_SIZE + AEAD_TAG_SIZE);

        // s
        let mut rs = rs_encrypted.to_vec();
        self.decrypt_and_hash(&mut rs)?;
        let rs = read_key(&rs)?;
        self.rs = Some(rs);

        // se
        let ecdh = Self::ecdh(&self.e, &rs)?;
        self.mix_key(&ecdh);

        let mut payload = payload_encrypted.to_vec();
        self.decrypt_and_hash(&mut payload)?;

        let (k1, k2) = self.split();
        let codec = NoiseCodec {
            encryptor: Cipher::from_key(k2),
            decryptor: Cipher::from_key(k1),
        };
        Ok((payload, codec))
    }

    fn erase(&mut self) {
        self.k.zeroize();
        self.ck.zeroize();
        self.h.zeroize();
        self.handshake_cipher = None;
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        self.erase();
    }
}
