use messages_thp::ThpPairingMethod;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PairingConfig {
    allowed_methods: Vec<ThpPairingMethod>,
    #[cfg(feature = "debug-pairing")]
    show_pairing_dialog: bool,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            allowed_methods: vec![
                ThpPairingMethod::SkipPairing,
                ThpPairingMethod::CodeEntry,
                ThpPairingMethod::QrCode,
                ThpPairingMethod::Nfc,
            ],
            #[cfg(feature = "debug-pairing")]
            show_pairing_dialog: true,
        }
    }
}

impl PairingConfig {
    pub fn new(allowed_methods: Vec<ThpPairingMethod>) -> Self {
        Self {
            allowed_methods,
            ..Default::default()
        }
    }

    pub fn allowed_methods(&self) -> &[ThpPairingMethod] {
        &self.allowed_methods
    }

    pub fn is_allowed(&self, method: ThpPairingMethod) -> bool {
        self.allowed_methods.contains(&method)
    }

    #[cfg(feature = "debug-pairing")]
    pub fn show_pairing_dialog(&self) -> bool {
        self.show_pairing_dialog
    }

    #[cfg(feature = "debug-pairing")]
    pub fn set_show_pairing_dialog(&mut self, show: bool) {
        self.show_pairing_dialog = show;
    }

    #[cfg(not(feature = "debug-pairing"))]
    pub fn show_pairing_dialog(&self) -> bool {
        true
    }
}
