//! Device side of a THP channel.
//!
//! Mirrors [`crate::ProtocolV2Channel`]: answers allocation and pings on the broadcast channel,
//! runs the handshake as Noise responder and exposes what the pairing state machine needs (host
//! static key, presented credential, handshake hash, channel state).

use crate::{
    decode_transport_payload, encode_transport_payload,
    sync::FrameIo,
    DeviceChannelState, Error, Result, ThpErrorCode, TrezorState,
};
use const_thp::{
    ALLOCATION_NONCE_SIZE, BROADCAST_CHANNEL_ID, CHANNEL_ALLOCATION_RES, ENCRYPTED_TRANSPORT,
    HANDSHAKE_COMP_REQ, HANDSHAKE_COMP_RES, HANDSHAKE_INIT_REQ, HANDSHAKE_INIT_RES, PONG,
};
use framing_thp::{
    control_byte, read_until_valid_crc, write_payload_to_wire_and_add_checksum, Transport,
};
use messages_thp::{RawMessage, ThpHandshakeCompletionReqNoisePayload, ThpMessage};
use noise_thp::{NoiseCodec, Responder};
use prost::Message;
use tracing::{debug, info, warn};

pub struct DeviceChannel<T> {
    io: FrameIo<T>,
    state: DeviceChannelState,
    device_properties: Vec<u8>,
    static_key: [u8; 32],
    locked: bool,
    codec: Option<NoiseCodec>,
    handshake_hash: Option<[u8; 32]>,
    host_static_pubkey: Option<[u8; 32]>,
    credential: Option<Vec<u8>>,
}

impl<T: Transport> DeviceChannel<T> {
    /// Serves the broadcast channel until an allocation request arrives, answering pings on
    /// the way. The request nonce is echoed, followed by `channel_id` and the properties.
    pub fn accept(
        mut transport: T,
        channel_id: u16,
        device_properties: Vec<u8>,
        static_key: [u8; 32],
    ) -> Result<Self> {
        loop {
            let frame = read_until_valid_crc(&mut transport)?;
            if !frame.header.is_broadcast() {
                debug!(channel_id = frame.channel_id(), "Ignoring frame before allocation");
                continue;
            }
            let ctrl_byte = frame.ctrl_byte();
            if control_byte::is_ping(ctrl_byte) {
                write_payload_to_wire_and_add_checksum(
                    &mut transport,
                    PONG,
                    BROADCAST_CHANNEL_ID,
                    &frame.payload,
                )?;
                continue;
            }
            if !control_byte::is_channel_allocation_req(ctrl_byte)
                || frame.payload.len() != ALLOCATION_NONCE_SIZE
            {
                warn!(ctrl_byte, "Ignoring broadcast frame");
                continue;
            }
            let mut response = frame.payload;
            response.extend_from_slice(&channel_id.to_be_bytes());
            response.extend_from_slice(&device_properties);
            write_payload_to_wire_and_add_checksum(
                &mut transport,
                CHANNEL_ALLOCATION_RES,
                BROADCAST_CHANNEL_ID,
                &response,
            )?;
            info!(channel_id, "Channel allocated to host");
            return Ok(Self {
                io: FrameIo::new(transport, channel_id),
                state: DeviceChannelState::Th1,
                device_properties,
                static_key,
                locked: false,
                codec: None,
                handshake_hash: None,
                host_static_pubkey: None,
                credential: None,
            });
        }
    }

    /// A locked device refuses handshakes with `DEVICE_LOCKED` and stays in `Th1`.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Answers the host handshake.
    ///
    /// `validate` receives the host static key and the credential the host presented, and
    /// decides the reported pairing state. A paired channel goes straight to the credential
    /// phase `Tc1`, an unpaired one to `Tp0`.
    pub fn handshake<F>(&mut self, validate: F) -> Result<TrezorState>
    where
        F: FnOnce(&[u8; 32], Option<&[u8]>) -> TrezorState,
    {
        if self.state != DeviceChannelState::Th1 {
            return Err(Error::InvalidDeviceState(self.state));
        }
        let init_req = self.io.read_message_frame(HANDSHAKE_INIT_REQ)?;
        if self.locked {
            warn!(channel_id = self.io.channel_id, "Handshake refused, device locked");
            self.io.send_error(ThpErrorCode::DeviceLocked)?;
            return Err(Error::DeviceLocked);
        }
        self.io.accept(&init_req)?;

        let mut responder = Responder::new(self.static_key, &self.device_properties);
        let init_res = responder.step_1(&init_req.payload)?;
        self.io.send(HANDSHAKE_INIT_RES, &init_res)?;
        self.state = DeviceChannelState::Th2;

        let comp_req = self.io.read_message_frame(HANDSHAKE_COMP_REQ)?;
        let (payload, mut codec) = match responder.step_3(&comp_req.payload) {
            Ok(done) => done,
            Err(e) => {
                self.io.send_error(ThpErrorCode::DecryptionFailed)?;
                self.state = DeviceChannelState::Invalidated;
                return Err(e.into());
            }
        };
        self.io.accept(&comp_req)?;

        let payload = match ThpHandshakeCompletionReqNoisePayload::decode(payload.as_slice()) {
            Ok(payload) => payload,
            Err(e) => {
                self.io.send_error(ThpErrorCode::InvalidData)?;
                self.state = DeviceChannelState::Invalidated;
                return Err(messages_thp::Error::Decode(e).into());
            }
        };
        let host_static_pubkey = responder
            .remote_static_key()
            .ok_or(Error::InvalidState("host static key missing after handshake"))?;
        let credential = payload.host_pairing_credential;
        let trezor_state = validate(&host_static_pubkey, credential.as_deref());

        let mut state = vec![u8::from(trezor_state)];
        codec.encrypt(&mut state)?;
        self.io.send(HANDSHAKE_COMP_RES, &state)?;

        self.codec = Some(codec);
        self.handshake_hash = Some(responder.handshake_hash());
        self.host_static_pubkey = Some(host_static_pubkey);
        if trezor_state.is_paired() {
            self.credential = credential;
            self.state = DeviceChannelState::Tc1;
        } else {
            self.state = DeviceChannelState::Tp0;
        }
        info!(
            channel_id = self.io.channel_id,
            trezor_state = ?trezor_state,
            "Handshake answered"
        );
        Ok(trezor_state)
    }

    /// Next `(session_id, message)` from the host. An undecryptable frame is answered with
    /// `DECRYPTION_FAILED` and invalidates the channel.
    pub fn read_message(&mut self) -> Result<(u8, RawMessage)> {
        self.check_established()?;
        let frame = self.io.read_message_frame(ENCRYPTED_TRANSPORT)?;
        let mut payload = frame.payload.clone();
        let decrypted = match self.codec.as_mut() {
            Some(codec) => codec.decrypt(&mut payload),
            None => return Err(Error::InvalidDeviceState(self.state)),
        };
        if let Err(e) = decrypted {
            warn!(channel_id = self.io.channel_id, "Cannot decrypt frame");
            self.io.send_error(ThpErrorCode::DecryptionFailed)?;
            self.state = DeviceChannelState::Invalidated;
            return Err(e.into());
        }
        self.io.accept(&frame)?;
        decode_transport_payload(payload)
    }

    pub fn write_message(&mut self, session_id: u8, message: &RawMessage) -> Result<()> {
        self.check_established()?;
        let mut payload = encode_transport_payload(session_id, message);
        match self.codec.as_mut() {
            Some(codec) => codec.encrypt(&mut payload)?,
            None => return Err(Error::InvalidDeviceState(self.state)),
        }
        self.io.send(ENCRYPTED_TRANSPORT, &payload)
    }

    pub fn write<M: ThpMessage>(&mut self, session_id: u8, message: &M) -> Result<()> {
        self.write_message(session_id, &RawMessage::from_message(message))
    }

    /// Reports an error to the host without touching the sync bits.
    pub fn send_error(&mut self, code: ThpErrorCode) -> Result<()> {
        self.io.send_error(code)
    }

    fn check_established(&self) -> Result<()> {
        match self.state {
            DeviceChannelState::Th1 | DeviceChannelState::Th2 | DeviceChannelState::Invalidated => {
                Err(Error::InvalidDeviceState(self.state))
            }
            _ => Ok(()),
        }
    }

    pub fn state(&self) -> DeviceChannelState {
        self.state
    }

    pub fn set_state(&mut self, state: DeviceChannelState) {
        debug!(channel_id = self.io.channel_id, from = ?self.state, to = ?state, "Channel state");
        self.state = state;
    }

    pub fn channel_id(&self) -> u16 {
        self.io.channel_id
    }

    pub fn handshake_hash(&self) -> Option<[u8; 32]> {
        self.handshake_hash
    }

    pub fn host_static_pubkey(&self) -> Option<[u8; 32]> {
        self.host_static_pubkey
    }

    pub fn trezor_static_pubkey(&self) -> [u8; 32] {
        noise_thp::public_key(&self.static_key)
    }

    /// Credential presented by the host in the handshake, kept only when it was accepted.
    pub fn credential(&self) -> Option<&[u8]> {
        self.credential.as_deref()
    }

    pub fn set_credential(&mut self, credential: Option<Vec<u8>>) {
        self.credential = credential;
    }

    pub fn sync_bit_send(&self) -> u8 {
        self.io.sync_bit_send
    }

    pub fn sync_bit_receive(&self) -> u8 {
        self.io.sync_bit_receive
    }

    pub fn into_transport(self) -> T {
        self.io.transport
    }
}
