//! Host side of the pairing.
//!
//! [`HostPairing`] drives the messages of every pairing method over a ready
//! [`ProtocolV2Channel`] and checks what the device reveals: the code entry secret must open
//! the commitment received before the challenge and reproduce the code the user typed, the QR
//! secret must reproduce the scanned code, the NFC tag must prove the device read our secret.

use crate::{
    cpace::{Cpace, Role},
    crypto::{
        code_entry_code, code_entry_commitment, code_entry_password, code_entry_tag, ct_eq,
        nfc_tag, qr_code_code, qr_code_tag, random_secret, Secret,
    },
    ui::NfcHostData,
    Error, Result,
};
use codec_thp::{v2::MANAGEMENT_SESSION_ID, ProtocolV2Channel, TrezorState};
use framing_thp::Transport;
use messages_thp::{
    required, ButtonAck, ButtonRequest, Cancel, Failure, ThpCodeEntryChallenge,
    ThpCodeEntryCommitment, ThpCodeEntryCpaceHostTag, ThpCodeEntryCpaceTrezor,
    ThpCodeEntrySecret, ThpCredentialRequest, ThpCredentialResponse, ThpEndRequest,
    ThpEndResponse, ThpMessage, ThpNfcTagHost, ThpNfcTagTrezor, ThpPairingMethod,
    ThpPairingPreparationsFinished, ThpPairingRequest, ThpPairingRequestApproved,
    ThpQrCodeSecret, ThpQrCodeTag, ThpSelectMethod,
};
use tracing::{debug, info};

pub struct HostPairing<'a, T> {
    channel: &'a mut ProtocolV2Channel<T>,
    session_id: u8,
    method: Option<ThpPairingMethod>,
    commitment: Option<Vec<u8>>,
    challenge: Option<Secret>,
    cpace_trezor_public_key: Option<Vec<u8>>,
    nfc_secret_host: Option<Secret>,
}

impl<'a, T: Transport> HostPairing<'a, T> {
    pub fn new(channel: &'a mut ProtocolV2Channel<T>) -> Self {
        Self::with_session(channel, MANAGEMENT_SESSION_ID)
    }

    pub fn with_session(channel: &'a mut ProtocolV2Channel<T>, session_id: u8) -> Self {
        Self {
            channel,
            session_id,
            method: None,
            commitment: None,
            challenge: None,
            cpace_trezor_public_key: None,
            nfc_secret_host: None,
        }
    }

    /// Sends the pairing request and acknowledges the confirmation dialog. Returns once the
    /// user approved; a rejection surfaces as [`Error::Cancelled`].
    pub fn request_pairing(&mut self, host_name: &str) -> Result<()> {
        self.write(&ThpPairingRequest {
            host_name: Some(host_name.to_string()),
        })?;
        self.read_expected::<ButtonRequest>()?;
        self.write(&ButtonAck {})?;
        self.read_expected::<ThpPairingRequestApproved>()?;
        info!(channel_id = self.channel.channel_id(), "Pairing approved");
        Ok(())
    }

    /// Selects `method` and reads the device preparations. `SkipPairing` ends the pairing
    /// right away. Selecting code entry again after a first round reuses the commitment.
    pub fn select_method(&mut self, method: ThpPairingMethod) -> Result<()> {
        self.write(&ThpSelectMethod {
            selected_pairing_method: Some(method as i32),
        })?;
        self.method = Some(method);
        match method {
            ThpPairingMethod::SkipPairing => {
                self.read_expected::<ThpEndResponse>()?;
                self.channel.set_paired(TrezorState::Paired);
                info!(channel_id = self.channel.channel_id(), "Pairing skipped");
            }
            ThpPairingMethod::CodeEntry if self.cpace_trezor_public_key.is_none() => {
                let commitment = self.read_expected::<ThpCodeEntryCommitment>()?;
                self.commitment = Some(required(commitment.commitment, "commitment")?);
                let challenge = random_secret();
                self.challenge = Some(challenge);
                self.write(&ThpCodeEntryChallenge {
                    challenge: Some(challenge.to_vec()),
                })?;
                let cpace = self.read_expected::<ThpCodeEntryCpaceTrezor>()?;
                self.cpace_trezor_public_key = Some(required(
                    cpace.cpace_trezor_public_key,
                    "cpace_trezor_public_key",
                )?);
            }
            _ => {
                self.read_expected::<ThpPairingPreparationsFinished>()?;
            }
        }
        debug!(method = ?method, "Pairing method prepared");
        Ok(())
    }

    /// Completes code entry with the 6 digit `code` shown by the device.
    pub fn code_entry(&mut self, code: u32) -> Result<()> {
        self.check_method(ThpPairingMethod::CodeEntry)?;
        let handshake_hash = self.handshake_hash()?;
        let (commitment, challenge, trezor_public_key) = match (
            &self.commitment,
            self.challenge,
            &self.cpace_trezor_public_key,
        ) {
            (Some(commitment), Some(challenge), Some(key)) => {
                (commitment.clone(), challenge, key.clone())
            }
            _ => return Err(Error::OutOfOrder("code entry not prepared")),
        };

        let mut cpace = Cpace::new(Role::Host, &handshake_hash);
        let public_key = cpace.generate_keys(&code_entry_password(code), &mut rand::thread_rng());
        let shared_secret = cpace.compute_shared_secret(&trezor_public_key)?;
        self.write(&ThpCodeEntryCpaceHostTag {
            cpace_host_public_key: Some(public_key.to_vec()),
            tag: Some(code_entry_tag(&shared_secret).to_vec()),
        })?;

        let secret = self.read_expected::<ThpCodeEntrySecret>()?;
        let secret = required(secret.secret, "secret")?;
        if !ct_eq(&code_entry_commitment(&secret), &commitment) {
            return Err(Error::CommitmentMismatch);
        }
        if code_entry_code(&handshake_hash, &secret, &challenge) != code {
            return Err(Error::CodeMismatch);
        }
        Ok(())
    }

    /// Completes the QR code method with the scanned `code`.
    pub fn qr_code(&mut self, code: &[u8]) -> Result<()> {
        self.check_method(ThpPairingMethod::QrCode)?;
        let handshake_hash = self.handshake_hash()?;
        self.write(&ThpQrCodeTag {
            tag: Some(qr_code_tag(&handshake_hash, code).to_vec()),
        })?;
        let secret = self.read_expected::<ThpQrCodeSecret>()?;
        let secret = required(secret.secret, "secret")?;
        if !ct_eq(&qr_code_code(&handshake_hash, &secret), code) {
            return Err(Error::CodeMismatch);
        }
        Ok(())
    }

    /// What the host hands to the device over NFC: its handshake hash and a fresh secret.
    pub fn nfc_host_data(&mut self) -> Result<NfcHostData> {
        let secret = random_secret();
        self.nfc_secret_host = Some(secret);
        Ok(NfcHostData {
            handshake_hash: self.handshake_hash()?,
            secret,
        })
    }

    /// Completes the NFC method with the secret read from the device.
    pub fn nfc(&mut self, nfc_secret: &[u8]) -> Result<()> {
        self.check_method(ThpPairingMethod::Nfc)?;
        let handshake_hash = self.handshake_hash()?;
        let host_secret = self
            .nfc_secret_host
            .ok_or(Error::OutOfOrder("NFC host data not produced"))?;
        self.write(&ThpNfcTagHost {
            tag: Some(nfc_tag(&handshake_hash, nfc_secret).to_vec()),
        })?;
        let tag = self.read_expected::<ThpNfcTagTrezor>()?;
        let tag = required(tag.tag, "tag")?;
        if !ct_eq(&nfc_tag(&handshake_hash, &host_secret), &tag) {
            return Err(Error::TagMismatch(ThpPairingMethod::Nfc));
        }
        Ok(())
    }

    /// Asks for a credential bound to our static key. The credential is kept on the channel
    /// for the next connection.
    pub fn request_credential(&mut self, autoconnect: bool) -> Result<ThpCredentialResponse> {
        let host_static_pubkey = self
            .channel
            .host_static_pubkey()
            .ok_or(Error::OutOfOrder("handshake not finished"))?;
        self.write(&ThpCredentialRequest {
            host_static_pubkey: Some(host_static_pubkey.to_vec()),
            autoconnect: Some(autoconnect),
            credential: self.channel.credential().map(|c| c.to_vec()),
        })?;
        let response = self.read_expected::<ThpCredentialResponse>()?;
        self.channel.set_credential(response.credential.clone());
        Ok(response)
    }

    pub fn end(&mut self) -> Result<()> {
        self.write(&ThpEndRequest {})?;
        self.read_expected::<ThpEndResponse>()?;
        self.channel.set_paired(TrezorState::Paired);
        info!(channel_id = self.channel.channel_id(), "Pairing finished");
        Ok(())
    }

    /// Aborts the pairing, the device answers with a `Failure`.
    pub fn cancel(&mut self) -> Result<()> {
        self.write(&Cancel {})?;
        let message = self.channel.read_raw(self.session_id)?;
        if message.is::<Failure>() {
            Ok(())
        } else {
            Err(Error::UnexpectedMessage {
                expected: Some(Failure::MESSAGE_TYPE),
                actual: message.message_type,
            })
        }
    }

    pub fn method(&self) -> Option<ThpPairingMethod> {
        self.method
    }

    fn check_method(&self, method: ThpPairingMethod) -> Result<()> {
        if self.method != Some(method) {
            return Err(Error::MethodNotSelected(method));
        }
        Ok(())
    }

    fn handshake_hash(&self) -> Result<[u8; 32]> {
        self.channel
            .handshake_hash()
            .ok_or(Error::OutOfOrder("handshake not finished"))
    }

    fn write<M: ThpMessage>(&mut self, message: &M) -> Result<()> {
        Ok(self.channel.write_message(self.session_id, message)?)
    }

    fn read_expected<M: ThpMessage>(&mut self) -> Result<M> {
        Ok(self.channel.read_expected(self.session_id)?)
    }
}
