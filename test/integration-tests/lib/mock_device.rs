//! A device on the other end of an in-memory link.
//!
//! [`DeviceSimulator`] answers allocation and the handshake, runs the pairing state machine in
//! `Tp0` and `Tc1` and serves `GetFeatures` once the channel carries encrypted transport. The
//! device screen is a [`MockUi`] driven by the test through the matching [`User`].

use async_channel::{unbounded, Receiver, Sender};
use codec_thp::{device::DeviceChannel, DeviceChannelState, Error as CodecError, TrezorState};
use config_helpers_thp::config::ThpConfig;
use framing_thp::Transport;
use messages_thp::{Failure, Features, GetFeatures, RawMessage, ThpDeviceProperties};
use pairing_thp::{
    CredentialManager, MemoryChannelRegistry, MemoryCounterStore, NfcHostData, PairingConfig,
    PairingDisplay, PairingHandler, PairingUi, ScreenOutcome,
};
use prost::Message;
use rand::RngCore;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

pub const DEFAULT_CHANNEL_ID: u16 = 0x0102;
pub const INTERNAL_MODEL: &str = "T3W1";

/// Dialogs the device asked the user to confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    Pairing(String),
    Connection(String),
    Autoconnect(String),
}

pub struct MockUi {
    confirm: bool,
    dialogs: Sender<Dialog>,
    screen: Sender<PairingDisplay>,
    outcome: Receiver<ScreenOutcome>,
    nfc: Receiver<NfcHostData>,
}

impl MockUi {
    fn dialog(&self, dialog: Dialog) -> bool {
        debug!(?dialog, confirm = self.confirm, "Dialog shown");
        let _ = self.dialogs.send_blocking(dialog);
        self.confirm
    }
}

impl PairingUi for MockUi {
    fn confirm_pairing(&mut self, host_name: &str) -> bool {
        self.dialog(Dialog::Pairing(host_name.to_string()))
    }

    fn show_pairing_method_screen(&mut self, display: &PairingDisplay) -> ScreenOutcome {
        if self.screen.send_blocking(*display).is_err() {
            return ScreenOutcome::Cancelled;
        }
        self.outcome
            .recv_blocking()
            .unwrap_or(ScreenOutcome::Cancelled)
    }

    fn nfc_host_data(&mut self) -> Option<NfcHostData> {
        self.nfc.try_recv().ok()
    }

    fn confirm_connection(&mut self, host_name: &str) -> bool {
        self.dialog(Dialog::Connection(host_name.to_string()))
    }

    fn confirm_autoconnect(&mut self, host_name: &str) -> bool {
        self.dialog(Dialog::Autoconnect(host_name.to_string()))
    }
}

/// The person in front of the device: reads the screen, dismisses it or waits for the host.
pub struct User {
    dialogs: Receiver<Dialog>,
    screen: Receiver<PairingDisplay>,
    outcome: Sender<ScreenOutcome>,
    nfc: Sender<NfcHostData>,
}

impl User {
    /// Blocks until the device shows the method screen.
    pub fn look(&self) -> PairingDisplay {
        self.screen
            .recv_blocking()
            .expect("Device stopped before showing the method screen")
    }

    pub fn code_entry_code(&self) -> u32 {
        match self.look() {
            PairingDisplay::CodeEntry { code } => code,
            other => panic!("Expected a code entry screen, got {:?}", other),
        }
    }

    pub fn qr_code(&self) -> Vec<u8> {
        match self.look() {
            PairingDisplay::QrCode { code } => code.to_vec(),
            other => panic!("Expected a QR code screen, got {:?}", other),
        }
    }

    pub fn nfc_secret(&self) -> Vec<u8> {
        match self.look() {
            PairingDisplay::Nfc { secret } => secret.to_vec(),
            other => panic!("Expected an NFC screen, got {:?}", other),
        }
    }

    /// Leaves the screen up until the host sends its tag.
    pub fn wait_for_host(&self) {
        self.outcome
            .send_blocking(ScreenOutcome::HostMessage)
            .expect("Device UI is gone");
    }

    pub fn dismiss(&self) {
        self.outcome
            .send_blocking(ScreenOutcome::Cancelled)
            .expect("Device UI is gone");
    }

    /// Holds the host NFC data against the device.
    pub fn tap_nfc(&self, data: NfcHostData) {
        self.nfc.send_blocking(data).expect("Device UI is gone");
    }

    /// Dialogs shown so far, oldest first.
    pub fn dialogs(&self) -> Vec<Dialog> {
        let mut dialogs = Vec::new();
        while let Ok(dialog) = self.dialogs.try_recv() {
            dialogs.push(dialog);
        }
        dialogs
    }
}

/// A device UI and the user in front of it. `confirm` answers every dialog.
pub fn mock_ui(confirm: bool) -> (MockUi, User) {
    let (dialogs, dialogs_receiver) = unbounded();
    let (screen, screen_receiver) = unbounded();
    let (outcome_sender, outcome) = unbounded();
    let (nfc_sender, nfc) = unbounded();
    (
        MockUi {
            confirm,
            dialogs,
            screen,
            outcome,
            nfc,
        },
        User {
            dialogs: dialogs_receiver,
            screen: screen_receiver,
            outcome: outcome_sender,
            nfc: nfc_sender,
        },
    )
}

/// What happened during one connection.
#[derive(Debug)]
pub struct ConnectionReport {
    pub channel_id: u16,
    pub trezor_state: Option<TrezorState>,
    pub handshake_hash: Option<[u8; 32]>,
    pub host_static_pubkey: Option<[u8; 32]>,
    pub locked_refusals: usize,
    pub pairing_results: Vec<pairing_thp::Result<()>>,
    /// Message types served outside of pairing, in arrival order
    pub served: Vec<u16>,
    pub final_state: Option<DeviceChannelState>,
}

impl ConnectionReport {
    fn new(channel_id: u16) -> Self {
        Self {
            channel_id,
            trezor_state: None,
            handshake_hash: None,
            host_static_pubkey: None,
            locked_refusals: 0,
            pairing_results: Vec::new(),
            served: Vec::new(),
            final_state: None,
        }
    }

    pub fn last_pairing_result(&self) -> Option<&pairing_thp::Result<()>> {
        self.pairing_results.last()
    }
}

/// Device state that outlives a connection: keys, credentials and known channels.
pub struct DeviceSimulator {
    properties: ThpDeviceProperties,
    static_key: [u8; 32],
    credentials: CredentialManager<MemoryCounterStore>,
    registry: MemoryChannelRegistry,
    config: PairingConfig,
    ui: MockUi,
    next_channel_id: u16,
    locked_handshakes: usize,
}

impl DeviceSimulator {
    pub fn new(config: PairingConfig, ui: MockUi) -> Self {
        let mut device_secret = [0_u8; 32];
        rand::thread_rng().fill_bytes(&mut device_secret);
        let properties = ThpDeviceProperties {
            internal_model: Some(INTERNAL_MODEL.to_string()),
            model_variant: Some(0),
            protocol_version_major: Some(2),
            protocol_version_minor: Some(0),
            pairing_methods: config
                .allowed_methods()
                .iter()
                .map(|method| *method as i32)
                .collect(),
        };
        Self {
            properties,
            static_key: noise_thp::generate_private_key(),
            credentials: CredentialManager::new(&device_secret, MemoryCounterStore::default()),
            registry: MemoryChannelRegistry::new(),
            config,
            ui,
            next_channel_id: DEFAULT_CHANNEL_ID,
            locked_handshakes: 0,
        }
    }

    pub fn from_config(config: &ThpConfig, ui: MockUi) -> Self {
        Self::new(config.pairing().clone(), ui)
    }

    /// Channel id handed out by the next allocation.
    pub fn with_channel_id(mut self, channel_id: u16) -> Self {
        self.next_channel_id = channel_id;
        self
    }

    /// Refuses the next `count` handshakes with `DEVICE_LOCKED`, as if the user had not
    /// unlocked the device yet.
    pub fn with_locked_handshakes(mut self, count: usize) -> Self {
        self.locked_handshakes = count;
        self
    }

    pub fn properties(&self) -> &ThpDeviceProperties {
        &self.properties
    }

    pub fn static_pubkey(&self) -> [u8; 32] {
        noise_thp::public_key(&self.static_key)
    }

    pub fn credentials(&self) -> &CredentialManager<MemoryCounterStore> {
        &self.credentials
    }

    pub fn credentials_mut(&mut self) -> &mut CredentialManager<MemoryCounterStore> {
        &mut self.credentials
    }

    pub fn registry(&self) -> &MemoryChannelRegistry {
        &self.registry
    }

    /// Serves one connection on a device thread.
    pub fn spawn<T>(mut self, transport: T) -> JoinHandle<(DeviceSimulator, ConnectionReport)>
    where
        T: Transport + Send + 'static,
    {
        thread::spawn(move || {
            let report = self.serve(transport);
            (self, report)
        })
    }

    /// Runs until the host hangs up or the channel becomes unusable.
    pub fn serve<T: Transport>(&mut self, transport: T) -> ConnectionReport {
        let channel_id = self.next_channel_id;
        self.next_channel_id = self.next_channel_id.wrapping_add(1);
        let mut report = ConnectionReport::new(channel_id);

        let mut channel = match DeviceChannel::accept(
            transport,
            channel_id,
            self.properties.encode_to_vec(),
            self.static_key,
        ) {
            Ok(channel) => channel,
            Err(e) => {
                warn!(error = %e, "Device stopped before allocation");
                return report;
            }
        };

        let credentials = &self.credentials;
        channel.set_locked(self.locked_handshakes > 0);
        loop {
            match channel.handshake(|key, credential| credentials.trezor_state_for(key, credential)) {
                Ok(trezor_state) => {
                    report.trezor_state = Some(trezor_state);
                    break;
                }
                Err(CodecError::DeviceLocked) => {
                    report.locked_refusals += 1;
                    self.locked_handshakes = self.locked_handshakes.saturating_sub(1);
                    channel.set_locked(self.locked_handshakes > 0);
                }
                Err(e) => {
                    warn!(channel_id, error = %e, "Handshake failed");
                    report.final_state = Some(channel.state());
                    return report;
                }
            }
        }
        report.handshake_hash = channel.handshake_hash();
        report.host_static_pubkey = channel.host_static_pubkey();

        loop {
            let (session_id, message) = match channel.read_message() {
                Ok(message) => message,
                Err(e) => {
                    debug!(channel_id, error = %e, "Connection closed");
                    break;
                }
            };
            if message.is::<GetFeatures>() {
                report.served.push(message.message_type);
                self.features(&mut channel, session_id);
                continue;
            }
            match channel.state() {
                DeviceChannelState::Tp0 => {
                    let result = self
                        .pairing_handler(&mut channel)
                        .handle_pairing_request(session_id, message);
                    report.pairing_results.push(result);
                }
                DeviceChannelState::Tc1 => {
                    let result = self
                        .pairing_handler(&mut channel)
                        .handle_credential_phase(session_id, message, true);
                    report.pairing_results.push(result);
                }
                _ => {
                    report.served.push(message.message_type);
                    self.unexpected(&mut channel, session_id, &message);
                }
            }
        }
        report.final_state = Some(channel.state());
        info!(channel_id, state = ?report.final_state, "Device done with the connection");
        report
    }

    fn pairing_handler<'a, T: Transport>(
        &'a mut self,
        channel: &'a mut DeviceChannel<T>,
    ) -> PairingHandler<'a, T, MemoryCounterStore> {
        PairingHandler::new(
            channel,
            &mut self.ui,
            &mut self.registry,
            &self.credentials,
            &self.config,
        )
    }

    fn features<T: Transport>(&self, channel: &mut DeviceChannel<T>, session_id: u8) {
        let features = Features {
            vendor: Some("trezor.io".to_string()),
            major_version: Some(2),
            minor_version: Some(9),
            patch_version: Some(0),
            device_id: Some(hex_id(&self.static_pubkey())),
            label: Some("simulator".to_string()),
            initialized: Some(true),
            internal_model: self.properties.internal_model.clone(),
            unlocked: Some(true),
        };
        if let Err(e) = channel.write(session_id, &features) {
            warn!(error = %e, "Cannot answer GetFeatures");
        }
    }

    fn unexpected<T: Transport>(
        &self,
        channel: &mut DeviceChannel<T>,
        session_id: u8,
        message: &RawMessage,
    ) {
        let failure = Failure {
            code: Some(const_thp::FAILURE_UNEXPECTED_MESSAGE),
            message: Some(format!("Unexpected message type {}", message.message_type)),
        };
        if let Err(e) = channel.write(session_id, &failure) {
            warn!(error = %e, "Cannot answer unexpected message");
        }
    }
}

fn hex_id(key: &[u8]) -> String {
    key.iter().take(6).map(|b| format!("{:02X}", b)).collect()
}
