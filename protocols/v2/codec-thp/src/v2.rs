//! Host side of a THP channel.

use crate::{
    config::ChannelConfig,
    decode_transport_payload, encode_transport_payload,
    sync::{error_from_payload, FrameIo},
    Channel, ChannelData, ChannelState, Error, Result, TrezorState,
};
use const_thp::{
    ALLOCATION_NONCE_SIZE, BROADCAST_CHANNEL_ID, CHANNEL_ALLOCATION_REQ, ENCRYPTED_TRANSPORT,
    HANDSHAKE_COMP_REQ, HANDSHAKE_COMP_RES, HANDSHAKE_INIT_REQ, HANDSHAKE_INIT_RES,
    MAX_CHANNEL_ID, PING, PING_NONCE_SIZE,
};
use framing_thp::{
    control_byte, read_until_valid_crc, write_payload_to_wire_and_add_checksum, Transport,
};
use messages_thp::{
    Failure, Features, GetFeatures, Outcome, RawMessage, ThpDeviceProperties,
    ThpHandshakeCompletionReqNoisePayload, ThpMessage,
};
use noise_thp::{Initiator, NoiseCodec};
use prost::Message;
use rand::RngCore;
use tracing::{debug, info, warn};

/// Session used for management messages such as `GetFeatures`.
pub const MANAGEMENT_SESSION_ID: u8 = 0;

const DEFAULT_PROTOCOL_VERSION: (u32, u32) = (2, 0);

pub struct ProtocolV2Channel<T> {
    io: FrameIo<T>,
    state: ChannelState,
    device_properties: Vec<u8>,
    properties: Option<ThpDeviceProperties>,
    codec: Option<NoiseCodec>,
    handshake_hash: Option<[u8; 32]>,
    trezor_state: Option<TrezorState>,
    host_static_pubkey: Option<[u8; 32]>,
    trezor_static_pubkey: Option<[u8; 32]>,
    credential: Option<Vec<u8>>,
    features: Option<Features>,
}

impl<T: Transport> ProtocolV2Channel<T> {
    /// Allocates a channel with a fresh random nonce.
    pub fn allocate(transport: T, config: &ChannelConfig) -> Result<Self> {
        let mut nonce = [0_u8; ALLOCATION_NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);
        Self::allocate_with_nonce(transport, config, nonce)
    }

    /// Sends `CHANNEL_ALLOCATION_REQ` on the broadcast channel and adopts the channel id of a
    /// response that echoes `nonce`. Responses with another nonce are rejected, they belong to
    /// a different (possibly replayed) allocation round.
    pub fn allocate_with_nonce(
        mut transport: T,
        config: &ChannelConfig,
        nonce: [u8; ALLOCATION_NONCE_SIZE],
    ) -> Result<Self> {
        write_payload_to_wire_and_add_checksum(
            &mut transport,
            CHANNEL_ALLOCATION_REQ,
            BROADCAST_CHANNEL_ID,
            &nonce,
        )?;

        let mut skipped = 0;
        let payload = loop {
            let frame = read_until_valid_crc(&mut transport)?;
            let ctrl_byte = frame.ctrl_byte();
            if frame.header.is_broadcast() && control_byte::is_channel_allocation_res(ctrl_byte) {
                break frame.payload;
            }
            if frame.header.is_broadcast() && control_byte::is_error(ctrl_byte) {
                return Err(error_from_payload(&frame.payload));
            }
            if skipped >= config.allocation_retries() {
                return Err(Error::UnexpectedControlByte {
                    expected: const_thp::CHANNEL_ALLOCATION_RES,
                    actual: ctrl_byte,
                });
            }
            skipped += 1;
            warn!(ctrl_byte, skipped, "Skipping frame while waiting for allocation");
        };

        let header_len = ALLOCATION_NONCE_SIZE + 2;
        if payload.len() < header_len || payload[..ALLOCATION_NONCE_SIZE] != nonce {
            return Err(Error::InvalidAllocationResponse(payload));
        }
        let channel_id = u16::from_be_bytes([payload[8], payload[9]]);
        if channel_id > MAX_CHANNEL_ID {
            return Err(Error::InvalidAllocationResponse(payload));
        }
        let device_properties = payload[header_len..].to_vec();
        let properties = ThpDeviceProperties::decode(device_properties.as_slice()).ok();
        info!(channel_id, path = transport.path(), "Channel allocated");

        let mut io = FrameIo::new(transport, channel_id);
        io.busy_retries = config.busy_retries();
        io.busy_backoff = config.busy_backoff();
        Ok(Self {
            io,
            state: ChannelState::NoiseHandshakeInProgress,
            device_properties,
            properties,
            codec: None,
            handshake_hash: None,
            trezor_state: None,
            host_static_pubkey: None,
            trezor_static_pubkey: None,
            credential: None,
            features: None,
        })
    }

    /// Allocation followed by the handshake with a fresh static key.
    pub fn connect(transport: T, config: &ChannelConfig, credential: Option<Vec<u8>>) -> Result<Self> {
        let mut channel = Self::allocate(transport, config)?;
        channel.handshake(None, credential)?;
        Ok(channel)
    }

    /// Drains whatever an earlier session left in the transport: sends a `PING` with a random
    /// nonce and drops every frame until the matching `PONG`.
    pub fn sync_responses(transport: &mut T) -> Result<()> {
        let mut nonce = [0_u8; PING_NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);
        write_payload_to_wire_and_add_checksum(transport, PING, BROADCAST_CHANNEL_ID, &nonce)?;
        loop {
            let frame = read_until_valid_crc(transport)?;
            if frame.header.is_broadcast()
                && control_byte::is_pong(frame.ctrl_byte())
                && frame.payload == nonce
            {
                return Ok(());
            }
            debug!(ctrl_byte = frame.ctrl_byte(), "Dropping stale frame");
        }
    }

    /// Runs the Noise XX handshake as initiator with the device properties as prologue.
    ///
    /// `static_key` is the host static private key, a fresh one is generated when `None`. A
    /// stored pairing `credential` is presented in the completion request. On
    /// [`Error::DeviceLocked`] the channel stays usable for another attempt.
    pub fn handshake(
        &mut self,
        static_key: Option<[u8; 32]>,
        credential: Option<Vec<u8>>,
    ) -> Result<TrezorState> {
        if self.state != ChannelState::NoiseHandshakeInProgress {
            return Err(Error::InvalidState("handshake requires a freshly allocated channel"));
        }
        let result = self.run_handshake(static_key, credential);
        self.invalidate_on_fatal(&result);
        result
    }

    fn run_handshake(
        &mut self,
        static_key: Option<[u8; 32]>,
        credential: Option<Vec<u8>>,
    ) -> Result<TrezorState> {
        let static_key = static_key.unwrap_or_else(noise_thp::generate_private_key);
        let mut initiator = Initiator::new(static_key, &self.device_properties);

        let ephemeral = initiator.step_0()?;
        self.io.send(HANDSHAKE_INIT_REQ, &ephemeral)?;
        let init_res = self.io.read_message_frame(HANDSHAKE_INIT_RES)?;
        self.io.accept(&init_res)?;
        debug!(channel_id = self.io.channel_id, "Handshake init response received");

        let payload = ThpHandshakeCompletionReqNoisePayload {
            host_pairing_credential: credential.clone(),
        }
        .encode_to_vec();
        let (completion, mut codec) = initiator.step_2(&init_res.payload, &payload)?;
        let handshake_hash = initiator.handshake_hash();
        self.io.send(HANDSHAKE_COMP_REQ, &completion)?;

        let comp_res = self.io.read_message_frame(HANDSHAKE_COMP_RES)?;
        let mut state = comp_res.payload.clone();
        codec.decrypt(&mut state)?;
        let trezor_state = TrezorState::try_from(state.as_slice())?;
        self.state = ChannelState::HandshakeComplete;
        self.io.accept(&comp_res)?;

        self.codec = Some(codec);
        self.handshake_hash = Some(handshake_hash);
        self.trezor_state = Some(trezor_state);
        self.host_static_pubkey = Some(initiator.static_public_key());
        self.trezor_static_pubkey = initiator.remote_static_key();
        self.credential = credential;
        self.state = ChannelState::Ready;
        info!(
            channel_id = self.io.channel_id,
            trezor_state = ?trezor_state,
            "Handshake complete"
        );
        Ok(trezor_state)
    }

    /// Rebuilds a ready channel from a persisted record, without a new handshake.
    pub fn resume(transport: T, config: &ChannelConfig, data: &ChannelData) -> Result<Self> {
        if data.transport_path != transport.path() {
            return Err(Error::InvalidChannelData(format!(
                "record for `{}` used on `{}`",
                data.transport_path,
                transport.path()
            )));
        }
        data.check_sync_bits()?;
        let codec = NoiseCodec::from_keys(
            data.key_request_bytes()?,
            data.nonce_request,
            data.key_response_bytes()?,
            data.nonce_response,
        );
        let mut io = FrameIo::new(transport, data.channel_id);
        io.sync_bit_send = data.sync_bit_send;
        io.sync_bit_receive = data.sync_bit_receive;
        io.busy_retries = config.busy_retries();
        io.busy_backoff = config.busy_backoff();
        info!(channel_id = data.channel_id, "Channel resumed");
        Ok(Self {
            io,
            state: ChannelState::Ready,
            device_properties: Vec::new(),
            properties: None,
            codec: Some(codec),
            handshake_hash: Some(data.handshake_hash_bytes()?),
            trezor_state: None,
            host_static_pubkey: None,
            trezor_static_pubkey: None,
            credential: None,
            features: None,
        })
    }

    /// Snapshot of the durable channel state, keyed by the transport path.
    pub fn channel_data(&self) -> Result<ChannelData> {
        let (codec, handshake_hash) = match (&self.codec, self.handshake_hash) {
            (Some(codec), Some(hash)) if self.state == ChannelState::Ready => (codec, hash),
            _ => return Err(Error::InvalidState("only a ready channel can be persisted")),
        };
        let (key_request, key_response) = match (codec.encrypt_key(), codec.decrypt_key()) {
            (Some(request), Some(response)) => (request, response),
            _ => return Err(Error::InvalidState("transport keys erased")),
        };
        let (major, minor) = self.protocol_version();
        Ok(ChannelData {
            protocol_version_major: major,
            protocol_version_minor: minor,
            transport_path: self.io.transport.path().to_string(),
            channel_id: self.io.channel_id,
            key_request: hex::encode(key_request),
            key_response: hex::encode(key_response),
            nonce_request: codec.encrypt_nonce(),
            nonce_response: codec.decrypt_nonce(),
            sync_bit_send: self.io.sync_bit_send,
            sync_bit_receive: self.io.sync_bit_receive,
            handshake_hash: hex::encode(handshake_hash),
        })
    }

    /// Encrypts `session_id || message_type || data` and sends it as `ENCRYPTED_TRANSPORT`.
    pub fn write_raw(&mut self, session_id: u8, message: &RawMessage) -> Result<()> {
        let result = self.encrypt_and_send(session_id, message);
        self.invalidate_on_fatal(&result);
        result
    }

    fn encrypt_and_send(&mut self, session_id: u8, message: &RawMessage) -> Result<()> {
        let codec = self.ready_codec()?;
        let mut payload = encode_transport_payload(session_id, message);
        codec.encrypt(&mut payload)?;
        self.io.send(ENCRYPTED_TRANSPORT, &payload)?;
        debug!(
            channel_id = self.io.channel_id,
            session_id,
            message_type = message.message_type,
            "Message sent"
        );
        Ok(())
    }

    pub fn write_message<M: ThpMessage>(&mut self, session_id: u8, message: &M) -> Result<()> {
        self.write_raw(session_id, &RawMessage::from_message(message))
    }

    /// Next message of any session. ACKs are consumed here, the frame is acknowledged only
    /// after it decrypted.
    pub fn read_and_decrypt(&mut self) -> Result<(u8, RawMessage)> {
        let result = self.receive_and_decrypt();
        self.invalidate_on_fatal(&result);
        result
    }

    fn receive_and_decrypt(&mut self) -> Result<(u8, RawMessage)> {
        self.ready_codec()?;
        let frame = self.io.read_message_frame(ENCRYPTED_TRANSPORT)?;
        let mut payload = frame.payload.clone();
        if let Some(codec) = self.codec.as_mut() {
            codec.decrypt(&mut payload)?;
        }
        self.io.accept(&frame)?;
        decode_transport_payload(payload)
    }

    /// Next message, which must belong to `session_id`. A message of another session is
    /// consumed and reported as [`Error::SessionMismatch`], never handed out.
    pub fn read_raw(&mut self, session_id: u8) -> Result<RawMessage> {
        let (actual, message) = self.read_and_decrypt()?;
        if actual != session_id {
            warn!(
                expected = session_id,
                actual, "Rejecting message addressed to another session"
            );
            return Err(Error::SessionMismatch {
                expected: session_id,
                actual,
            });
        }
        Ok(message)
    }

    pub fn read_message<M: ThpMessage>(&mut self, session_id: u8) -> Result<Outcome<M>> {
        Ok(self.read_raw(session_id)?.into_outcome()?)
    }

    /// Reads a message of type `M`. A `Failure` from the device becomes [`Error::Failure`].
    pub fn read_expected<M: ThpMessage>(&mut self, session_id: u8) -> Result<M> {
        match self.read_message::<M>(session_id)? {
            Outcome::Expected(message) => Ok(message),
            Outcome::Unexpected(raw) if raw.is::<Failure>() => {
                let failure = raw.decode::<Failure>()?;
                Err(Error::Failure {
                    code: failure.code,
                    message: failure.message,
                })
            }
            Outcome::Unexpected(raw) => Err(Error::Message(
                messages_thp::Error::UnexpectedMessageType {
                    expected: M::MESSAGE_TYPE,
                    actual: raw.message_type,
                },
            )),
        }
    }

    /// Writes `request` and reads the response of type `R` on the same session.
    pub fn call<M: ThpMessage, R: ThpMessage>(&mut self, session_id: u8, request: &M) -> Result<R> {
        self.write_message(session_id, request)?;
        self.read_expected(session_id)
    }

    fn ready_codec(&mut self) -> Result<&mut NoiseCodec> {
        if self.state != ChannelState::Ready {
            return Err(Error::InvalidState("encrypted transport requires a ready channel"));
        }
        self.codec
            .as_mut()
            .ok_or(Error::InvalidState("encrypted transport requires a ready channel"))
    }

    fn invalidate_on_fatal<R>(&mut self, result: &Result<R>) {
        if let Err(e) = result {
            if e.is_fatal() {
                warn!(channel_id = self.io.channel_id, error = %e, "Channel invalidated");
                self.state = ChannelState::Invalidated;
            }
        }
    }

    /// Records the pairing outcome, typically after a successful pairing run.
    pub fn set_paired(&mut self, trezor_state: TrezorState) {
        self.trezor_state = Some(trezor_state);
    }

    pub fn set_credential(&mut self, credential: Option<Vec<u8>>) {
        self.credential = credential;
    }

    pub fn channel_id(&self) -> u16 {
        self.io.channel_id
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn trezor_state(&self) -> Option<TrezorState> {
        self.trezor_state
    }

    pub fn handshake_hash(&self) -> Option<[u8; 32]> {
        self.handshake_hash
    }

    /// Opaque device properties, the handshake prologue.
    pub fn device_properties(&self) -> &[u8] {
        &self.device_properties
    }

    /// Device properties, when they decode.
    pub fn properties(&self) -> Option<&ThpDeviceProperties> {
        self.properties.as_ref()
    }

    pub fn protocol_version(&self) -> (u32, u32) {
        match &self.properties {
            Some(ThpDeviceProperties {
                protocol_version_major: Some(major),
                protocol_version_minor: Some(minor),
                ..
            }) => (*major, *minor),
            _ => DEFAULT_PROTOCOL_VERSION,
        }
    }

    pub fn host_static_pubkey(&self) -> Option<[u8; 32]> {
        self.host_static_pubkey
    }

    pub fn trezor_static_pubkey(&self) -> Option<[u8; 32]> {
        self.trezor_static_pubkey
    }

    pub fn credential(&self) -> Option<&[u8]> {
        self.credential.as_deref()
    }

    pub fn sync_bit_send(&self) -> u8 {
        self.io.sync_bit_send
    }

    pub fn sync_bit_receive(&self) -> u8 {
        self.io.sync_bit_receive
    }

    pub fn transport(&self) -> &T {
        &self.io.transport
    }

    pub fn into_transport(self) -> T {
        self.io.transport
    }
}

impl<T: Transport> Channel for ProtocolV2Channel<T> {
    fn get_features(&mut self) -> Result<Features> {
        if let Some(features) = &self.features {
            return Ok(features.clone());
        }
        self.update_features()?;
        self.features
            .clone()
            .ok_or(Error::InvalidState("features not available"))
    }

    fn update_features(&mut self) -> Result<()> {
        let features: Features = self.call(MANAGEMENT_SESSION_ID, &GetFeatures {})?;
        self.features = Some(features);
        Ok(())
    }

    fn read(&mut self, session_id: u8) -> Result<RawMessage> {
        self.read_raw(session_id)
    }

    fn write(&mut self, session_id: u8, message: &RawMessage) -> Result<()> {
        self.write_raw(session_id, message)
    }
}
