//! Device side pairing state machine.
//!
//! Runs on a [`DeviceChannel`] once the handshake is done. An unpaired channel starts in `Tp0`
//! and expects a `ThpPairingRequest`, a channel that presented a valid credential starts in
//! `Tc1` and goes straight to the credential phase:
//!
//! ```txt
//! Tp0 --PairingRequest--> dialog --SelectMethod--> Tp1 (prepare) [Tp2: code entry challenge]
//!     --> Tp3 (method screen, host tag) --> Tp4 (reveal) --> Tc1 (credentials) --EndRequest-->
//!     EncryptedTransport
//! ```
//!
//! Any error, a cancellation included, wipes the pairing secrets and goes back to `Tp0`; the
//! host is told with a `Failure` while the channel is still usable.

use crate::{
    context::PairingContext,
    cpace::{Cpace, Role},
    credential_manager::{decode_credential, is_credential_autoconnect, CounterStore, CredentialManager},
    crypto::{
        code_entry_code, code_entry_commitment, code_entry_password, code_entry_tag, ct_eq,
        nfc_tag, qr_code_code, qr_code_tag, random_secret,
    },
    registry::ChannelRegistry,
    ui::{PairingUi, ScreenOutcome},
    PairingConfig, Error, Result,
};
use codec_thp::{device::DeviceChannel, DeviceChannelState};
use framing_thp::Transport;
use messages_thp::{
    required, ButtonAck, ButtonRequest, Cancel, Failure, RawMessage, ThpCodeEntryChallenge,
    ThpCodeEntryCommitment, ThpCodeEntryCpaceHostTag, ThpCodeEntryCpaceTrezor,
    ThpCodeEntrySecret, ThpCredentialMetadata, ThpCredentialRequest, ThpCredentialResponse,
    ThpEndRequest, ThpEndResponse, ThpMessage, ThpNfcTagHost, ThpNfcTagTrezor,
    ThpPairingMethod, ThpPairingPreparationsFinished, ThpPairingRequest,
    ThpPairingRequestApproved, ThpQrCodeSecret, ThpQrCodeTag, ThpSelectMethod,
};
use tracing::{debug, error, info, warn};

/// `ButtonRequestType.Other`
const BUTTON_REQUEST_OTHER: i32 = 1;

pub struct PairingHandler<'a, T, S> {
    channel: &'a mut DeviceChannel<T>,
    ui: &'a mut dyn PairingUi,
    registry: &'a mut dyn ChannelRegistry,
    credentials: &'a CredentialManager<S>,
    config: &'a PairingConfig,
    context: PairingContext,
    session_id: u8,
}

impl<'a, T: Transport, S: CounterStore> PairingHandler<'a, T, S> {
    pub fn new(
        channel: &'a mut DeviceChannel<T>,
        ui: &'a mut dyn PairingUi,
        registry: &'a mut dyn ChannelRegistry,
        credentials: &'a CredentialManager<S>,
        config: &'a PairingConfig,
    ) -> Self {
        Self {
            channel,
            ui,
            registry,
            credentials,
            config,
            context: PairingContext::new(),
            session_id: 0,
        }
    }

    /// Reads the next host message and runs the phase the channel is in.
    pub fn dispatch(&mut self) -> Result<()> {
        let (session_id, message) = self.channel.read_message()?;
        match self.channel.state() {
            DeviceChannelState::Tp0 => self.handle_pairing_request(session_id, message),
            DeviceChannelState::Tc1 => self.handle_credential_phase(session_id, message, true),
            state => {
                warn!(message_type = message.message_type, state = ?state, "Not a pairing message");
                Err(Error::InvalidState(state))
            }
        }
    }

    /// Full pairing, from the `ThpPairingRequest` to the `ThpEndResponse`.
    pub fn handle_pairing_request(&mut self, session_id: u8, message: RawMessage) -> Result<()> {
        self.session_id = session_id;
        let result = self.pairing_request(message);
        self.finish(result)
    }

    /// Credential requests of a paired channel, up to the `ThpEndResponse`.
    pub fn handle_credential_phase(
        &mut self,
        session_id: u8,
        message: RawMessage,
        show_connection_dialog: bool,
    ) -> Result<()> {
        self.session_id = session_id;
        let result = self.credential_phase(message, show_connection_dialog);
        self.finish(result)
    }

    pub fn context(&self) -> &PairingContext {
        &self.context
    }

    fn finish(&mut self, result: Result<()>) -> Result<()> {
        let e = match result {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        self.context.reset();
        if e.is_security_relevant() {
            error!(channel_id = self.channel.channel_id(), error = %e, "Pairing aborted");
        } else if e.is_cancellation() {
            info!(channel_id = self.channel.channel_id(), "Pairing cancelled");
        } else {
            warn!(channel_id = self.channel.channel_id(), error = %e, "Pairing failed");
        }
        if self.channel.state() == DeviceChannelState::Invalidated {
            return Err(e);
        }
        self.set_state(DeviceChannelState::Tp0);
        if !matches!(e, Error::Channel(_)) {
            let failure = Failure {
                code: Some(e.failure_code()),
                message: Some(e.to_string()),
            };
            if let Err(write_error) = self.channel.write(self.session_id, &failure) {
                warn!(error = %write_error, "Cannot report pairing failure");
            }
        }
        Err(e)
    }

    fn pairing_request(&mut self, message: RawMessage) -> Result<()> {
        self.check_state(&[DeviceChannelState::Tp0])?;
        let request = expect::<ThpPairingRequest>(message)?;
        let host_name = request
            .host_name
            .filter(|name| !name.is_empty())
            .ok_or(messages_thp::Error::MissingField("host_name"))?;
        info!(channel_id = self.channel.channel_id(), host_name = %host_name, "Pairing requested");
        self.context.host_name = Some(host_name.clone());
        self.pairing_dialog(&host_name)?;

        let select = self.read_expected::<ThpSelectMethod>()?;
        self.select_method(&select)?;
        if self.context.selected_method == Some(ThpPairingMethod::SkipPairing) {
            return self.end_pairing();
        }

        let response = loop {
            self.prepare_pairing()?;
            self.set_state(DeviceChannelState::Tp3);
            let display = self.context.display()?;
            if self.ui.show_pairing_method_screen(&display) == ScreenOutcome::Cancelled {
                return Err(Error::Cancelled);
            }
            let message = self.read()?;
            if message.is::<Cancel>() {
                return Err(Error::Cancelled);
            }
            if !message.is::<ThpSelectMethod>() {
                break message;
            }
            self.select_method(&message.decode()?)?;
            if self.context.selected_method == Some(ThpPairingMethod::SkipPairing) {
                return self.end_pairing();
            }
        };

        let message = self.handle_tag(response)?;
        self.credential_phase(message, false)
    }

    /// `ButtonRequest` / `ButtonAck` around the user confirmation, then `PairingRequestApproved`.
    fn pairing_dialog(&mut self, host_name: &str) -> Result<()> {
        self.write(&ButtonRequest {
            code: Some(BUTTON_REQUEST_OTHER),
        })?;
        self.read_expected::<ButtonAck>()?;
        if self.config.show_pairing_dialog() {
            if !self.ui.confirm_pairing(host_name) {
                return Err(Error::Cancelled);
            }
        } else {
            debug!("Pairing dialog skipped");
        }
        self.write(&ThpPairingRequestApproved {})
    }

    fn select_method(&mut self, message: &ThpSelectMethod) -> Result<()> {
        let value = required(message.selected_pairing_method, "selected_pairing_method")?;
        let method = ThpPairingMethod::try_from(value).map_err(|_| Error::UnknownMethod(value))?;
        if !self.config.is_allowed(method) {
            return Err(Error::MethodNotAllowed(method));
        }
        debug!(method = ?method, "Pairing method selected");
        self.context.selected_method = Some(method);
        Ok(())
    }

    fn prepare_pairing(&mut self) -> Result<()> {
        self.set_state(DeviceChannelState::Tp1);
        match self.context.selected_method {
            Some(ThpPairingMethod::CodeEntry) if self.context.code_entry_secret.is_none() => {
                self.prepare_code_entry()
            }
            // the commitment is already out, the previous code stays valid
            Some(ThpPairingMethod::CodeEntry) => self.write(&ThpPairingPreparationsFinished {}),
            Some(ThpPairingMethod::Nfc) => {
                self.context.nfc_secret = Some(random_secret());
                self.write(&ThpPairingPreparationsFinished {})
            }
            Some(ThpPairingMethod::QrCode) => {
                let secret = random_secret();
                self.context.code_qr_code = Some(qr_code_code(&self.handshake_hash()?, &secret));
                self.context.qr_code_secret = Some(secret);
                self.write(&ThpPairingPreparationsFinished {})
            }
            _ => Err(Error::OutOfOrder("no pairing method to prepare")),
        }
    }

    fn prepare_code_entry(&mut self) -> Result<()> {
        let secret = random_secret();
        self.context.code_entry_secret = Some(secret);
        self.write(&ThpCodeEntryCommitment {
            commitment: Some(code_entry_commitment(&secret).to_vec()),
        })?;

        let challenge = self.read_expected::<ThpCodeEntryChallenge>()?;
        self.set_state(DeviceChannelState::Tp2);
        let challenge = required(challenge.challenge, "challenge")?;
        let handshake_hash = self.handshake_hash()?;
        let code = code_entry_code(&handshake_hash, &secret, &challenge);

        let mut cpace = Cpace::new(Role::Trezor, &handshake_hash);
        let public_key = cpace.generate_keys(&code_entry_password(code), &mut rand::thread_rng());
        self.context.code_code_entry = Some(code);
        self.context.cpace = Some(cpace);
        self.write(&ThpCodeEntryCpaceTrezor {
            cpace_trezor_public_key: Some(public_key.to_vec()),
        })
    }

    /// Checks the host tag of the selected method and reveals our secret. Returns the first
    /// message of the credential phase.
    fn handle_tag(&mut self, message: RawMessage) -> Result<RawMessage> {
        self.check_state(&[DeviceChannelState::Tp3])?;
        let reveal = if message.is::<ThpCodeEntryCpaceHostTag>() {
            self.check_method(ThpPairingMethod::CodeEntry)?;
            let secret = self.code_entry_tag(message.decode()?)?;
            RawMessage::from_message(&ThpCodeEntrySecret {
                secret: Some(secret),
            })
        } else if message.is::<ThpQrCodeTag>() {
            self.check_method(ThpPairingMethod::QrCode)?;
            let secret = self.qr_code_tag(message.decode()?)?;
            RawMessage::from_message(&ThpQrCodeSecret {
                secret: Some(secret),
            })
        } else if message.is::<ThpNfcTagHost>() {
            self.check_method(ThpPairingMethod::Nfc)?;
            let tag = self.nfc_tag(message.decode()?)?;
            RawMessage::from_message(&ThpNfcTagTrezor { tag: Some(tag) })
        } else {
            return Err(Error::UnexpectedMessage {
                expected: None,
                actual: message.message_type,
            });
        };

        self.set_state(DeviceChannelState::Tp4);
        self.channel.write_message(self.session_id, &reveal)?;
        self.set_state(DeviceChannelState::Tc1);
        self.read()
    }

    fn code_entry_tag(&mut self, message: ThpCodeEntryCpaceHostTag) -> Result<Vec<u8>> {
        let host_public_key = required(message.cpace_host_public_key, "cpace_host_public_key")?;
        let tag = required(message.tag, "tag")?;
        let cpace = self
            .context
            .cpace
            .as_mut()
            .ok_or(Error::OutOfOrder("CPace not prepared"))?;
        let shared_secret = cpace.compute_shared_secret(&host_public_key)?;
        if !ct_eq(&code_entry_tag(&shared_secret), &tag) {
            return Err(Error::TagMismatch(ThpPairingMethod::CodeEntry));
        }
        self.context
            .code_entry_secret
            .map(|secret| secret.to_vec())
            .ok_or(Error::OutOfOrder("code entry secret missing"))
    }

    fn qr_code_tag(&mut self, message: ThpQrCodeTag) -> Result<Vec<u8>> {
        let tag = required(message.tag, "tag")?;
        let (code, secret) = match (self.context.code_qr_code, self.context.qr_code_secret) {
            (Some(code), Some(secret)) => (code, secret),
            _ => return Err(Error::OutOfOrder("QR code not prepared")),
        };
        if !ct_eq(&qr_code_tag(&self.handshake_hash()?, &code), &tag) {
            return Err(Error::TagMismatch(ThpPairingMethod::QrCode));
        }
        Ok(secret.to_vec())
    }

    /// Both directions of the NFC exchange: the host proves it read our secret, we prove we
    /// read the host secret and that both ends saw the same handshake.
    fn nfc_tag(&mut self, message: ThpNfcTagHost) -> Result<Vec<u8>> {
        let tag = required(message.tag, "tag")?;
        let nfc_secret = self
            .context
            .nfc_secret
            .ok_or(Error::OutOfOrder("NFC not prepared"))?;
        let host = self.ui.nfc_host_data().ok_or(Error::MissingNfcHostData)?;
        let handshake_hash = self.handshake_hash()?;
        if !ct_eq(&nfc_tag(&handshake_hash, &nfc_secret), &tag) {
            return Err(Error::TagMismatch(ThpPairingMethod::Nfc));
        }
        if !ct_eq(&host.handshake_hash[..16], &handshake_hash[..16]) {
            return Err(Error::HandshakeHashMismatch);
        }
        Ok(nfc_tag(&handshake_hash, &host.secret).to_vec())
    }

    fn credential_phase(&mut self, mut message: RawMessage, show_connection_dialog: bool) -> Result<()> {
        self.check_state(&[DeviceChannelState::Tc1])?;
        let mut autoconnect = false;
        if let Some(credential) = self.channel.credential() {
            let host_static_pubkey = self.host_static_pubkey()?;
            autoconnect = is_credential_autoconnect(credential)
                || self
                    .registry
                    .is_channel_to_replace(self.channel.channel_id(), &host_static_pubkey);
            if let Some(host_name) = decode_credential(credential)
                .and_then(|c| c.cred_metadata)
                .and_then(|m| m.host_name)
            {
                self.context.host_name = Some(host_name);
            }
            if self.context.host_name.is_none() {
                return Err(messages_thp::Error::MissingField("host_name").into());
            }
        }

        if show_connection_dialog && !autoconnect {
            let host_name = self.context.host_name.clone().unwrap_or_default();
            if !self.ui.confirm_connection(&host_name) {
                return Err(Error::Cancelled);
            }
        }

        while message.is::<ThpCredentialRequest>() {
            message = self.credential_request(message.decode()?)?;
        }
        expect::<ThpEndRequest>(message)?;
        self.end_pairing()
    }

    fn credential_request(&mut self, request: ThpCredentialRequest) -> Result<RawMessage> {
        self.check_state(&[DeviceChannelState::Tc1])?;
        let host_static_pubkey = required(request.host_static_pubkey, "host_static_pubkey")?;
        let autoconnect = request.autoconnect.unwrap_or(false);
        let host_name = self.context.host_name.clone();

        if autoconnect {
            // a freshly paired channel has no credential, autoconnect needs an earlier pairing
            let channel_key = self.host_static_pubkey()?;
            let valid = self
                .channel
                .credential()
                .map(|credential| self.credentials.validate_credential(credential, &channel_key))
                .unwrap_or(false);
            if !valid {
                return Err(Error::AutoconnectWithoutCredential);
            }
            if !self
                .ui
                .confirm_autoconnect(host_name.as_deref().unwrap_or_default())
            {
                return Err(Error::Cancelled);
            }
        }

        let credential = self.credentials.issue_credential(
            &host_static_pubkey,
            ThpCredentialMetadata {
                host_name,
                autoconnect: Some(autoconnect),
            },
        );
        info!(channel_id = self.channel.channel_id(), autoconnect, "Credential issued to host");
        self.write(&ThpCredentialResponse {
            trezor_static_pubkey: Some(self.channel.trezor_static_pubkey().to_vec()),
            credential: Some(credential),
        })?;
        self.read()
    }

    fn end_pairing(&mut self) -> Result<()> {
        let host_static_pubkey = self.host_static_pubkey()?;
        let channel_id = self.channel.channel_id();
        self.registry
            .replace_channels_with_host_key(channel_id, &host_static_pubkey);
        self.set_state(DeviceChannelState::EncryptedTransport);
        self.write(&ThpEndResponse {})?;
        self.context.reset();
        info!(channel_id, "Pairing finished");
        Ok(())
    }

    fn check_state(&self, allowed: &[DeviceChannelState]) -> Result<()> {
        let state = self.channel.state();
        if allowed.contains(&state) {
            Ok(())
        } else {
            Err(Error::InvalidState(state))
        }
    }

    fn check_method(&self, method: ThpPairingMethod) -> Result<()> {
        if !self.config.is_allowed(method) {
            return Err(Error::MethodNotAllowed(method));
        }
        if self.context.selected_method != Some(method) {
            return Err(Error::MethodNotSelected(method));
        }
        Ok(())
    }

    fn set_state(&mut self, state: DeviceChannelState) {
        self.channel.set_state(state);
    }

    fn handshake_hash(&self) -> Result<[u8; 32]> {
        self.channel
            .handshake_hash()
            .ok_or(Error::OutOfOrder("handshake not finished"))
    }

    fn host_static_pubkey(&self) -> Result<[u8; 32]> {
        self.channel
            .host_static_pubkey()
            .ok_or(Error::OutOfOrder("handshake not finished"))
    }

    fn write<M: ThpMessage>(&mut self, message: &M) -> Result<()> {
        Ok(self.channel.write(self.session_id, message)?)
    }

    /// Next message of the pairing session.
    fn read(&mut self) -> Result<RawMessage> {
        let (session_id, message) = self.channel.read_message()?;
        if session_id != self.session_id {
            return Err(codec_thp::Error::SessionMismatch {
                expected: self.session_id,
                actual: session_id,
            }
            .into());
        }
        Ok(message)
    }

    fn read_expected<M: ThpMessage>(&mut self) -> Result<M> {
        let message = self.read()?;
        expect(message)
    }
}

/// `Cancel` is a cancellation wherever it arrives, anything else but `M` is unexpected.
fn expect<M: ThpMessage>(message: RawMessage) -> Result<M> {
    if message.is::<M>() {
        return Ok(message.decode()?);
    }
    if message.is::<Cancel>() {
        return Err(Error::Cancelled);
    }
    Err(Error::UnexpectedMessage {
        expected: Some(M::MESSAGE_TYPE),
        actual: message.message_type,
    })
}
