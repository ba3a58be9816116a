//! Per channel pairing secrets. Everything here is wiped when the pairing ends, fails or is
//! cancelled.

use crate::{cpace::Cpace, crypto::Secret, ui::PairingDisplay, Error, Result};
use messages_thp::ThpPairingMethod;
use zeroize::Zeroize;

#[derive(Default)]
pub struct PairingContext {
    pub(crate) selected_method: Option<ThpPairingMethod>,
    pub(crate) host_name: Option<String>,
    pub(crate) code_entry_secret: Option<Secret>,
    pub(crate) code_code_entry: Option<u32>,
    pub(crate) cpace: Option<Cpace>,
    pub(crate) qr_code_secret: Option<Secret>,
    pub(crate) code_qr_code: Option<Secret>,
    pub(crate) nfc_secret: Option<Secret>,
}

impl PairingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.selected_method = None;
        self.host_name = None;
        self.code_entry_secret.zeroize();
        self.code_code_entry.zeroize();
        self.cpace = None;
        self.qr_code_secret.zeroize();
        self.code_qr_code.zeroize();
        self.nfc_secret.zeroize();
    }

    pub fn selected_method(&self) -> Option<ThpPairingMethod> {
        self.selected_method
    }

    pub fn host_name(&self) -> Option<&str> {
        self.host_name.as_deref()
    }

    /// Whether nothing secret is held.
    pub fn is_clear(&self) -> bool {
        self.code_entry_secret.is_none()
            && self.code_code_entry.is_none()
            && self.cpace.is_none()
            && self.qr_code_secret.is_none()
            && self.code_qr_code.is_none()
            && self.nfc_secret.is_none()
    }

    /// What the method screen shows, available once the method is prepared.
    pub fn display(&self) -> Result<PairingDisplay> {
        match self.selected_method {
            Some(ThpPairingMethod::CodeEntry) => self
                .code_code_entry
                .map(|code| PairingDisplay::CodeEntry { code })
                .ok_or(Error::OutOfOrder("code entry not prepared")),
            Some(ThpPairingMethod::QrCode) => self
                .code_qr_code
                .map(|code| PairingDisplay::QrCode { code })
                .ok_or(Error::OutOfOrder("QR code not prepared")),
            Some(ThpPairingMethod::Nfc) => self
                .nfc_secret
                .map(|secret| PairingDisplay::Nfc { secret })
                .ok_or(Error::OutOfOrder("NFC not prepared")),
            _ => Err(Error::OutOfOrder("no method to display")),
        }
    }
}

impl Drop for PairingContext {
    fn drop(&mut self) {
        self.reset();
    }
}
