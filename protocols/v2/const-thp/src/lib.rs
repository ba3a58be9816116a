//! Central repository for all the THP constants
#![cfg_attr(feature = "no_std", no_std)]

/// Size of the header of the first chunk of a message: ctrl byte, channel id, length.
pub const INIT_HEADER_SIZE: usize = 5;
/// Size of the header of a continuation chunk: ctrl byte, channel id.
pub const CONT_HEADER_SIZE: usize = 3;
pub const CHECKSUM_LENGTH: usize = 4;
/// Largest value the 2 byte length field can declare.
pub const MAX_PAYLOAD_LENGTH: usize = u16::MAX as usize;

pub const BROADCAST_CHANNEL_ID: u16 = 0xFFFF;
/// Channel ids above this value (other than broadcast) are never assigned.
pub const MAX_CHANNEL_ID: u16 = 0xFFEF;

pub const ALLOCATION_NONCE_SIZE: usize = 8;
pub const PING_NONCE_SIZE: usize = 8;

// Control bytes
pub const CODEC_V1: u8 = 0x3F;
pub const HANDSHAKE_INIT_REQ: u8 = 0x00;
pub const HANDSHAKE_INIT_RES: u8 = 0x01;
pub const HANDSHAKE_COMP_REQ: u8 = 0x02;
pub const HANDSHAKE_COMP_RES: u8 = 0x03;
pub const ENCRYPTED_TRANSPORT: u8 = 0x04;
pub const ACK_MESSAGE: u8 = 0x20;
pub const CHANNEL_ALLOCATION_REQ: u8 = 0x40;
pub const CHANNEL_ALLOCATION_RES: u8 = 0x41;
pub const ERROR: u8 = 0x42;
pub const PING: u8 = 0x43;
pub const PONG: u8 = 0x44;
pub const CONTINUATION_PACKET: u8 = 0x80;

/// Masks out both the sequence and the ack bit.
pub const DATA_MASK: u8 = 0xE7;
/// Masks out only the sequence bit.
pub const ACK_MASK: u8 = 0xF7;
pub const SEQ_BIT_OFFSET: u8 = 4;
pub const ACK_BIT_OFFSET: u8 = 3;

// Error codes carried as the single payload byte of an ERROR frame
pub const TRANSPORT_BUSY: u8 = 1;
pub const UNALLOCATED_CHANNEL: u8 = 2;
pub const DECRYPTION_FAILED: u8 = 3;
pub const INVALID_DATA: u8 = 4;
pub const DEVICE_LOCKED: u8 = 5;

// Failure codes sent in a `Failure` message
pub const FAILURE_UNEXPECTED_MESSAGE: i32 = 1;
pub const FAILURE_DATA_ERROR: i32 = 3;
pub const FAILURE_ACTION_CANCELLED: i32 = 4;
pub const FAILURE_PROCESS_ERROR: i32 = 9;

// Trezor state returned in the handshake completion response
pub const TREZOR_STATE_UNPAIRED: u8 = 0x00;
pub const TREZOR_STATE_PAIRED: u8 = 0x01;
pub const TREZOR_STATE_PAIRED_AUTOCONNECT: u8 = 0x02;

// Noise
pub const NOISE_PROTOCOL_NAME: &[u8] = b"Noise_XX_25519_AESGCM_SHA256";
pub const X25519_KEY_SIZE: usize = 32;
pub const AEAD_TAG_SIZE: usize = 16;
pub const HASH_LEN: usize = 32;
/// Ephemeral key of the initiator.
pub const HANDSHAKE_INIT_REQ_SIZE: usize = X25519_KEY_SIZE;
/// Ephemeral key, encrypted static key, encrypted empty payload.
pub const HANDSHAKE_INIT_RES_SIZE: usize = X25519_KEY_SIZE + X25519_KEY_SIZE + 2 * AEAD_TAG_SIZE;

/// Encrypted payload prefix: session id and message type.
pub const SESSION_ID_SIZE: usize = 1;
pub const MESSAGE_TYPE_SIZE: usize = 2;

// Legacy v1
pub const V1_CHUNK_SIZE: usize = 64;
pub const V1_MAGIC: u8 = b'?';
pub const V1_HEADER_MAGIC: &[u8; 2] = b"##";

// Pairing secrets
pub const PAIRING_SECRET_SIZE: usize = 16;
pub const CODE_ENTRY_MODULUS: u32 = 1_000_000;

/// Domain separators of the CPace exchange.
pub const CPACE_GENERATOR_LABEL: &[u8] = b"THP-CPace";
pub const CPACE_ISK_LABEL: &[u8] = b"THP-CPace-ISK";

/// Label used in the credential authentication key derivation path.
pub const CREDENTIAL_AUTH_KEY_LABEL: &[u8] = b"Credential authentication key";

// Message types carried inside encrypted transport frames
pub const MESSAGE_TYPE_INITIALIZE: u16 = 0;
pub const MESSAGE_TYPE_SUCCESS: u16 = 2;
pub const MESSAGE_TYPE_FAILURE: u16 = 3;
pub const MESSAGE_TYPE_FEATURES: u16 = 17;
pub const MESSAGE_TYPE_CANCEL: u16 = 20;
pub const MESSAGE_TYPE_BUTTON_REQUEST: u16 = 26;
pub const MESSAGE_TYPE_BUTTON_ACK: u16 = 27;
pub const MESSAGE_TYPE_GET_FEATURES: u16 = 55;
pub const MESSAGE_TYPE_PAIRING_REQUEST: u16 = 1008;
pub const MESSAGE_TYPE_PAIRING_REQUEST_APPROVED: u16 = 1009;
pub const MESSAGE_TYPE_SELECT_METHOD: u16 = 1010;
pub const MESSAGE_TYPE_PAIRING_PREPARATIONS_FINISHED: u16 = 1011;
pub const MESSAGE_TYPE_CREDENTIAL_REQUEST: u16 = 1016;
pub const MESSAGE_TYPE_CREDENTIAL_RESPONSE: u16 = 1017;
pub const MESSAGE_TYPE_END_REQUEST: u16 = 1018;
pub const MESSAGE_TYPE_END_RESPONSE: u16 = 1019;
pub const MESSAGE_TYPE_CODE_ENTRY_COMMITMENT: u16 = 1024;
pub const MESSAGE_TYPE_CODE_ENTRY_CHALLENGE: u16 = 1025;
pub const MESSAGE_TYPE_CODE_ENTRY_CPACE_TREZOR: u16 = 1026;
pub const MESSAGE_TYPE_CODE_ENTRY_CPACE_HOST_TAG: u16 = 1027;
pub const MESSAGE_TYPE_CODE_ENTRY_SECRET: u16 = 1028;
pub const MESSAGE_TYPE_QR_CODE_TAG: u16 = 1032;
pub const MESSAGE_TYPE_QR_CODE_SECRET: u16 = 1033;
pub const MESSAGE_TYPE_NFC_TAG_HOST: u16 = 1040;
pub const MESSAGE_TYPE_NFC_TAG_TREZOR: u16 = 1041;
