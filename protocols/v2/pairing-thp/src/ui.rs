//! Device user interface as seen by the pairing state machine.

use crate::crypto::Secret;
use core::fmt;

/// How the pairing method screen was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenOutcome {
    /// The user dismissed the screen
    Cancelled,
    /// A host message is waiting to be read
    HostMessage,
}

/// What the device shows for the selected method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingDisplay {
    CodeEntry { code: u32 },
    QrCode { code: Secret },
    /// Secret handed to the host over NFC
    Nfc { secret: Secret },
}

impl fmt::Display for PairingDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairingDisplay::CodeEntry { code } => write!(f, "{:06}", code),
            PairingDisplay::QrCode { .. } => write!(f, "QR code"),
            PairingDisplay::Nfc { .. } => write!(f, "NFC"),
        }
    }
}

/// Host handshake hash and host secret, read from the NFC interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NfcHostData {
    pub handshake_hash: [u8; 32],
    pub secret: Secret,
}

pub trait PairingUi {
    /// Asks the user to allow pairing with `host_name`.
    fn confirm_pairing(&mut self, host_name: &str) -> bool;

    /// Shows the code of the selected method and blocks until the user dismisses the screen
    /// or the host sends its next message.
    fn show_pairing_method_screen(&mut self, display: &PairingDisplay) -> ScreenOutcome;

    fn nfc_host_data(&mut self) -> Option<NfcHostData>;

    /// Asks the user to let an already paired host connect.
    fn confirm_connection(&mut self, host_name: &str) -> bool;

    fn confirm_autoconnect(&mut self, host_name: &str) -> bool;
}
