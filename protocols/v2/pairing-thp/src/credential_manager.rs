//! Pairing credentials.
//!
//! A credential is `{cred_metadata, mac}` where the MAC is HMAC-SHA256 over the protobuf
//! encoding of `{host_static_pubkey, cred_metadata}`. The MAC key is derived from the device
//! secret along the path `["Credential authentication key", counter]`; bumping the counter
//! makes every credential issued so far unverifiable.

use crate::{Error, Result};
use codec_thp::TrezorState;
use const_thp::CREDENTIAL_AUTH_KEY_LABEL;
use hmac::{digest::generic_array::GenericArray, Hmac, Mac};
use messages_thp::{ThpAuthenticatedCredentialData, ThpCredentialMetadata, ThpPairingCredential};
use prost::Message;
use sha2::{Sha256, Sha512};
use tracing::{debug, info};
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

const SLIP21_SEED_KEY: &[u8] = b"Symmetric key seed";

/// Persistent home of the derivation counter.
pub trait CounterStore {
    fn counter(&self) -> u32;
    fn set_counter(&mut self, counter: u32);
}

#[derive(Debug, Default, Clone)]
pub struct MemoryCounterStore {
    counter: u32,
}

impl MemoryCounterStore {
    pub fn new(counter: u32) -> Self {
        Self { counter }
    }
}

impl CounterStore for MemoryCounterStore {
    fn counter(&self) -> u32 {
        self.counter
    }

    fn set_counter(&mut self, counter: u32) {
        self.counter = counter;
    }
}

pub struct CredentialManager<S> {
    device_secret: Zeroizing<Vec<u8>>,
    store: S,
}

impl<S: CounterStore> CredentialManager<S> {
    pub fn new(device_secret: &[u8], store: S) -> Self {
        Self {
            device_secret: Zeroizing::new(device_secret.to_vec()),
            store,
        }
    }

    /// SLIP-21 node for `path`: 32 bytes of chain key followed by 32 bytes of key.
    fn slip21_node(&self, path: &[&[u8]]) -> Zeroizing<[u8; 64]> {
        let mut node = Zeroizing::new([0_u8; 64]);
        node.copy_from_slice(&hmac_sha512(SLIP21_SEED_KEY, &[&self.device_secret]));
        for label in path {
            let child = hmac_sha512(&node[..32], &[&[0], label]);
            node.copy_from_slice(&child);
        }
        node
    }

    pub fn derive_cred_auth_key(&self) -> Zeroizing<[u8; 32]> {
        let counter = self.store.counter().to_be_bytes();
        let node = self.slip21_node(&[CREDENTIAL_AUTH_KEY_LABEL, &counter]);
        let mut key = Zeroizing::new([0_u8; 32]);
        key.copy_from_slice(&node[32..]);
        key
    }

    /// Invalidates every credential issued so far. Once the counter is exhausted the key can
    /// no longer be rotated, wrapping around would revive the credentials of counter 0.
    pub fn invalidate_cred_auth_key(&mut self) -> Result<()> {
        let counter = self
            .store
            .counter()
            .checked_add(1)
            .ok_or(Error::CredentialCounterExhausted)?;
        self.store.set_counter(counter);
        info!(counter, "Credential authentication key rotated");
        Ok(())
    }

    fn mac(&self, host_static_pubkey: &[u8], metadata: &ThpCredentialMetadata) -> HmacSha256 {
        let data = ThpAuthenticatedCredentialData {
            host_static_pubkey: Some(host_static_pubkey.to_vec()),
            cred_metadata: Some(metadata.clone()),
        };
        let mut block = Zeroizing::new([0_u8; 64]);
        block[..32].copy_from_slice(self.derive_cred_auth_key().as_slice());
        let mut mac = <HmacSha256 as Mac>::new(GenericArray::from_slice(block.as_slice()));
        mac.update(&data.encode_to_vec());
        mac
    }

    /// Serialized `{cred_metadata, mac}` binding `metadata` to `host_static_pubkey`.
    pub fn issue_credential(
        &self,
        host_static_pubkey: &[u8],
        metadata: ThpCredentialMetadata,
    ) -> Vec<u8> {
        let mac = self.mac(host_static_pubkey, &metadata).finalize().into_bytes();
        let credential = ThpPairingCredential {
            cred_metadata: Some(metadata),
            mac: Some(mac.to_vec()),
        };
        debug!("Credential issued");
        credential.encode_to_vec()
    }

    /// A credential is valid when it parses, is in canonical encoding and its MAC recomputed
    /// for `host_static_pubkey` with the current key matches.
    pub fn validate_credential(&self, credential: &[u8], host_static_pubkey: &[u8]) -> bool {
        let decoded = match decode_credential(credential) {
            Some(decoded) => decoded,
            None => return false,
        };
        // The MAC covers the re-encoded metadata, so only the canonical form is accepted.
        if decoded.encode_to_vec() != credential {
            debug!("Non canonical credential rejected");
            return false;
        }
        let credential = decoded;
        let (metadata, mac) = match (credential.cred_metadata, credential.mac) {
            (Some(metadata), Some(mac)) => (metadata, mac),
            _ => return false,
        };
        self.mac(host_static_pubkey, &metadata)
            .verify_slice(&mac)
            .is_ok()
    }

    /// Pairing state to report for a host presenting `credential` in the handshake.
    pub fn trezor_state_for(&self, host_static_pubkey: &[u8], credential: Option<&[u8]>) -> TrezorState {
        match credential {
            Some(c) if self.validate_credential(c, host_static_pubkey) => {
                if is_credential_autoconnect(c) {
                    TrezorState::PairedAutoconnect
                } else {
                    TrezorState::Paired
                }
            }
            _ => TrezorState::Unpaired,
        }
    }

    pub fn counter_store(&self) -> &S {
        &self.store
    }
}

pub fn decode_credential(credential: &[u8]) -> Option<ThpPairingCredential> {
    ThpPairingCredential::decode(credential).ok()
}

/// Autoconnect flag of the metadata, unauthenticated.
pub fn is_credential_autoconnect(credential: &[u8]) -> bool {
    decode_credential(credential)
        .and_then(|c| c.cred_metadata)
        .and_then(|m| m.autoconnect)
        .unwrap_or(false)
}

/// `key` is at most 32 bytes here, well below the 128 byte block.
fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> [u8; 64] {
    let mut block = Zeroizing::new([0_u8; 128]);
    block[..key.len()].copy_from_slice(key);
    let mut mac = <HmacSha512 as Mac>::new(GenericArray::from_slice(block.as_slice()));
    for part in parts {
        mac.update(part);
    }
    let mut out = [0_u8; 64];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}
