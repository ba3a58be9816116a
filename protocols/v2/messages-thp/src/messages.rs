//! Message definitions. Field numbers follow the THP protobuf schema, prost encodes fields in
//! field number order so the encoding of a given value is stable.

use crate::ThpMessage;
use const_thp::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum ThpPairingMethod {
    SkipPairing = 1,
    CodeEntry = 2,
    QrCode = 3,
    Nfc = 4,
}

impl ThpPairingMethod {
    /// Tag mixed into the pairing hashes of this method.
    pub fn tag(self) -> u8 {
        self as i32 as u8
    }
}

/// Opaque to the framing layer, used as the Noise prologue.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpDeviceProperties {
    #[prost(string, optional, tag = "1")]
    pub internal_model: Option<String>,
    #[prost(uint32, optional, tag = "2")]
    pub model_variant: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub protocol_version_major: Option<u32>,
    #[prost(uint32, optional, tag = "4")]
    pub protocol_version_minor: Option<u32>,
    #[prost(enumeration = "ThpPairingMethod", repeated, packed = "false", tag = "5")]
    pub pairing_methods: Vec<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpHandshakeCompletionReqNoisePayload {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub host_pairing_credential: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpCredentialMetadata {
    #[prost(string, optional, tag = "1")]
    pub host_name: Option<String>,
    #[prost(bool, optional, tag = "2")]
    pub autoconnect: Option<bool>,
}

/// Credential blob handed to the host.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpPairingCredential {
    #[prost(message, optional, tag = "1")]
    pub cred_metadata: Option<ThpCredentialMetadata>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub mac: Option<Vec<u8>>,
}

/// What the credential MAC covers, never sent on the wire.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpAuthenticatedCredentialData {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub host_static_pubkey: Option<Vec<u8>>,
    #[prost(message, optional, tag = "2")]
    pub cred_metadata: Option<ThpCredentialMetadata>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Initialize {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Success {
    #[prost(string, optional, tag = "1")]
    pub message: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Failure {
    #[prost(int32, optional, tag = "1")]
    pub code: Option<i32>,
    #[prost(string, optional, tag = "2")]
    pub message: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetFeatures {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Features {
    #[prost(string, optional, tag = "1")]
    pub vendor: Option<String>,
    #[prost(uint32, optional, tag = "2")]
    pub major_version: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub minor_version: Option<u32>,
    #[prost(uint32, optional, tag = "4")]
    pub patch_version: Option<u32>,
    #[prost(string, optional, tag = "6")]
    pub device_id: Option<String>,
    #[prost(string, optional, tag = "10")]
    pub label: Option<String>,
    #[prost(bool, optional, tag = "12")]
    pub initialized: Option<bool>,
    #[prost(string, optional, tag = "44")]
    pub internal_model: Option<String>,
    #[prost(bool, optional, tag = "47")]
    pub unlocked: Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Cancel {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ButtonRequest {
    #[prost(int32, optional, tag = "1")]
    pub code: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ButtonAck {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpPairingRequest {
    #[prost(string, optional, tag = "1")]
    pub host_name: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpPairingRequestApproved {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpSelectMethod {
    #[prost(enumeration = "ThpPairingMethod", optional, tag = "1")]
    pub selected_pairing_method: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpPairingPreparationsFinished {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpCodeEntryCommitment {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub commitment: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpCodeEntryChallenge {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub challenge: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpCodeEntryCpaceTrezor {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub cpace_trezor_public_key: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpCodeEntryCpaceHostTag {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub cpace_host_public_key: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub tag: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpCodeEntrySecret {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub secret: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpQrCodeTag {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub tag: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpQrCodeSecret {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub secret: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpNfcTagHost {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub tag: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpNfcTagTrezor {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub tag: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpCredentialRequest {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub host_static_pubkey: Option<Vec<u8>>,
    #[prost(bool, optional, tag = "2")]
    pub autoconnect: Option<bool>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub credential: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpCredentialResponse {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub trezor_static_pubkey: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub credential: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpEndRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThpEndResponse {}

macro_rules! impl_thp_message {
    ($($message:ident => $message_type:expr),* $(,)?) => {
        $(
            impl ThpMessage for $message {
                const MESSAGE_TYPE: u16 = $message_type;
                const NAME: &'static str = stringify!($message);
            }
        )*
    };
}

impl_thp_message! {
    Initialize => MESSAGE_TYPE_INITIALIZE,
    Success => MESSAGE_TYPE_SUCCESS,
    Failure => MESSAGE_TYPE_FAILURE,
    Features => MESSAGE_TYPE_FEATURES,
    Cancel => MESSAGE_TYPE_CANCEL,
    ButtonRequest => MESSAGE_TYPE_BUTTON_REQUEST,
    ButtonAck => MESSAGE_TYPE_BUTTON_ACK,
    GetFeatures => MESSAGE_TYPE_GET_FEATURES,
    ThpPairingRequest => MESSAGE_TYPE_PAIRING_REQUEST,
    ThpPairingRequestApproved => MESSAGE_TYPE_PAIRING_REQUEST_APPROVED,
    ThpSelectMethod => MESSAGE_TYPE_SELECT_METHOD,
    ThpPairingPreparationsFinished => MESSAGE_TYPE_PAIRING_PREPARATIONS_FINISHED,
    ThpCredentialRequest => MESSAGE_TYPE_CREDENTIAL_REQUEST,
    ThpCredentialResponse => MESSAGE_TYPE_CREDENTIAL_RESPONSE,
    ThpEndRequest => MESSAGE_TYPE_END_REQUEST,
    ThpEndResponse => MESSAGE_TYPE_END_RESPONSE,
    ThpCodeEntryCommitment => MESSAGE_TYPE_CODE_ENTRY_COMMITMENT,
    ThpCodeEntryChallenge => MESSAGE_TYPE_CODE_ENTRY_CHALLENGE,
    ThpCodeEntryCpaceTrezor => MESSAGE_TYPE_CODE_ENTRY_CPACE_TREZOR,
    ThpCodeEntryCpaceHostTag => MESSAGE_TYPE_CODE_ENTRY_CPACE_HOST_TAG,
    ThpCodeEntrySecret => MESSAGE_TYPE_CODE_ENTRY_SECRET,
    ThpQrCodeTag => MESSAGE_TYPE_QR_CODE_TAG,
    ThpQrCodeSecret => MESSAGE_TYPE_QR_CODE_SECRET,
    ThpNfcTagHost => MESSAGE_TYPE_NFC_TAG_HOST,
    ThpNfcTagTrezor => MESSAGE_TYPE_NFC_TAG_TREZOR,
}
