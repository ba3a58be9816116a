// Channel allocation, handshake and encrypted transport between a host and a simulated device.
use codec_thp::{
    Channel, ChannelConfig, ChannelState, DeviceChannelState, Error, ProtocolV1Channel,
    ProtocolV2Channel, ThpErrorCode, TrezorState,
};
use const_thp::{
    ACK_MESSAGE, CHANNEL_ALLOCATION_RES, ENCRYPTED_TRANSPORT, MESSAGE_TYPE_GET_FEATURES, PING,
    PONG, V1_CHUNK_SIZE,
};
use framing_thp::memory::MemoryTransport;
use integration_tests_thp::{
    interceptor::{DuplicateFrame, MessageDirection, ReplaceFrame},
    mock_device::{mock_ui, DeviceSimulator, DEFAULT_CHANNEL_ID, INTERNAL_MODEL},
    utils::{allocation_response, encode_frame},
    *,
};
use messages_thp::{Features, GetFeatures, Initialize};
use pairing_thp::PairingConfig;
use std::thread;

fn simulator() -> DeviceSimulator {
    let (ui, _user) = mock_ui(true);
    DeviceSimulator::new(PairingConfig::default(), ui)
}

#[test]
fn allocation_adopts_device_channel_id() {
    start_tracing();
    let (transport, handle) = start_device("mem:allocation", simulator().with_channel_id(0x0102));

    let mut channel = ProtocolV2Channel::allocate(transport, &ChannelConfig::default()).unwrap();
    assert_eq!(channel.channel_id(), 0x0102);
    assert_eq!(channel.state(), ChannelState::NoiseHandshakeInProgress);
    assert_eq!(
        channel.properties().and_then(|p| p.internal_model.as_deref()),
        Some(INTERNAL_MODEL)
    );
    assert_eq!(channel.protocol_version(), (2, 0));

    assert_eq!(channel.handshake(None, None).unwrap(), TrezorState::Unpaired);
    let (_, report) = finish_device(channel, handle);
    assert_eq!(report.channel_id, 0x0102);
    assert_eq!(report.trezor_state, Some(TrezorState::Unpaired));
}

// A host that may have left frames behind pings first, the device answers before allocating.
#[test]
fn ping_before_allocation() {
    start_tracing();
    let (mut sniffer, handle) = start_sniffed_device("mem:ping", simulator(), vec![]);
    let frames_to_device = sniffer.frames_to_device();
    let frames_to_host = sniffer.frames_to_host();

    ProtocolV2Channel::sync_responses(&mut sniffer).unwrap();
    assert_eq!(frames_to_device.count_kind(PING), 1);
    assert_eq!(frames_to_host.count_kind(PONG), 1);

    let mut channel = ProtocolV2Channel::connect(sniffer, &ChannelConfig::default(), None).unwrap();
    assert_eq!(channel.channel_id(), DEFAULT_CHANNEL_ID);
    assert!(channel.get_features().is_ok());
    let (_, report) = finish_device(channel, handle);
    assert_eq!(report.served, vec![MESSAGE_TYPE_GET_FEATURES]);
}

// A response carrying a nonce we never sent belongs to someone else's allocation.
#[test]
fn foreign_allocation_response_is_rejected() {
    start_tracing();
    let foreign = ReplaceFrame::new(
        MessageDirection::ToHost,
        CHANNEL_ALLOCATION_RES,
        allocation_response([0xAA; 8], 0x0103, &[]),
    );
    let (sniffer, handle) =
        start_sniffed_device("mem:foreign-nonce", simulator(), vec![foreign.into()]);
    let frames_to_host = sniffer.frames_to_host();

    let result = ProtocolV2Channel::allocate_with_nonce(sniffer, &ChannelConfig::default(), [1; 8]);
    match result {
        Err(Error::InvalidAllocationResponse(payload)) => assert_eq!(payload[..8], [0xAA; 8]),
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("foreign allocation response accepted"),
    }
    assert_eq!(frames_to_host.count_kind(CHANNEL_ALLOCATION_RES), 1);

    // the transport went down with the failed allocation
    let (_, report) = handle.join().unwrap();
    assert_eq!(report.trezor_state, None);
}

#[test]
fn both_ends_agree_on_the_handshake() {
    start_tracing();
    let device = simulator();
    let device_key = device.static_pubkey();
    let (transport, handle) = start_device("mem:handshake", device);

    let channel = connect_host(transport);
    assert_eq!(channel.state(), ChannelState::Ready);
    assert_eq!(channel.trezor_static_pubkey(), Some(device_key));
    let host_hash = channel.handshake_hash();
    let host_key = channel.host_static_pubkey();

    let (_, report) = finish_device(channel, handle);
    assert!(host_hash.is_some());
    assert_eq!(report.handshake_hash, host_hash);
    assert_eq!(report.host_static_pubkey, host_key);
    assert_eq!(report.final_state, Some(DeviceChannelState::Tp0));
}

// A retransmitted frame is acknowledged again but reaches the device only once.
#[test]
fn duplicated_frame_is_processed_once() {
    start_tracing();
    let duplicate = DuplicateFrame::new(MessageDirection::ToDevice, ENCRYPTED_TRANSPORT);
    let (sniffer, handle) =
        start_sniffed_device("mem:duplicate", simulator(), vec![duplicate.into()]);
    let frames_to_device = sniffer.frames_to_device();
    let frames_to_host = sniffer.frames_to_host();

    let mut channel = ProtocolV2Channel::connect(sniffer, &ChannelConfig::default(), None).unwrap();
    let features = channel.get_features().unwrap();
    assert_eq!(features.vendor.as_deref(), Some("trezor.io"));
    channel.update_features().unwrap();
    assert_eq!(channel.state(), ChannelState::Ready);

    assert_eq!(frames_to_device.count_kind(ENCRYPTED_TRANSPORT), 3);
    assert!(frames_to_host.count_kind(ACK_MESSAGE) >= 3);

    let (_, report) = finish_device(channel, handle);
    assert_eq!(
        report.served,
        vec![MESSAGE_TYPE_GET_FEATURES, MESSAGE_TYPE_GET_FEATURES]
    );
}

#[test]
fn sessions_are_isolated() {
    start_tracing();
    let (transport, handle) = start_device("mem:sessions", simulator());
    let mut channel = connect_host(transport);

    channel.write_message(1, &GetFeatures {}).unwrap();
    match channel.read_raw(2) {
        Err(Error::SessionMismatch { expected, actual }) => {
            assert_eq!(expected, 2);
            assert_eq!(actual, 1);
        }
        other => panic!("message of session 1 handed to session 2: {:?}", other),
    }
    assert_eq!(channel.state(), ChannelState::Ready);

    let features: Features = channel.call(2, &GetFeatures {}).unwrap();
    assert_eq!(features.internal_model.as_deref(), Some(INTERNAL_MODEL));

    let (_, report) = finish_device(channel, handle);
    assert_eq!(report.served.len(), 2);
}

#[test]
fn locked_device_accepts_after_unlock() {
    start_tracing();
    let (transport, handle) = start_device("mem:locked", simulator().with_locked_handshakes(1));

    let mut channel = ProtocolV2Channel::allocate(transport, &ChannelConfig::default()).unwrap();
    assert!(matches!(channel.handshake(None, None), Err(Error::DeviceLocked)));
    assert_eq!(channel.state(), ChannelState::NoiseHandshakeInProgress);
    assert_eq!(channel.handshake(None, None).unwrap(), TrezorState::Unpaired);
    assert_eq!(channel.state(), ChannelState::Ready);

    let (_, report) = finish_device(channel, handle);
    assert_eq!(report.locked_refusals, 1);
    assert_eq!(report.trezor_state, Some(TrezorState::Unpaired));
}

#[test]
fn undecryptable_frame_invalidates_both_ends() {
    start_tracing();
    // first transport frame after the handshake, sequence bit 0
    let garbage = ReplaceFrame::new(
        MessageDirection::ToDevice,
        ENCRYPTED_TRANSPORT,
        encode_frame(ENCRYPTED_TRANSPORT, DEFAULT_CHANNEL_ID, &[0x5A; 40]),
    );
    let (sniffer, handle) = start_sniffed_device("mem:garbage", simulator(), vec![garbage.into()]);

    let mut channel = ProtocolV2Channel::connect(sniffer, &ChannelConfig::default(), None).unwrap();
    let result: codec_thp::Result<Features> = channel.call(0, &GetFeatures {});
    assert!(matches!(
        result,
        Err(Error::Thp(ThpErrorCode::DecryptionFailed))
    ));
    assert_eq!(channel.state(), ChannelState::Invalidated);
    assert!(channel.channel_data().is_err());

    let (_, report) = finish_device(channel, handle);
    assert_eq!(report.final_state, Some(DeviceChannelState::Invalidated));
    assert!(report.served.is_empty());
}

fn vendor<C: Channel>(channel: &mut C) -> Option<String> {
    channel.get_features().unwrap().vendor
}

// Both protocol generations answer the same capability calls.
#[test]
fn legacy_and_thp_channels_share_capabilities() {
    start_tracing();
    let (host, device) = MemoryTransport::pair("hid:legacy", Some(V1_CHUNK_SIZE));
    let legacy_device = thread::spawn(move || {
        let mut device = ProtocolV1Channel::new(device);
        device.read_expected::<Initialize>().unwrap();
        device
            .write_message(&Features {
                vendor: Some("trezor.io".to_string()),
                major_version: Some(1),
                ..Default::default()
            })
            .unwrap();
    });
    let mut legacy = ProtocolV1Channel::new(host);
    assert_eq!(vendor(&mut legacy).as_deref(), Some("trezor.io"));
    // cached, no second round trip
    assert_eq!(vendor(&mut legacy).as_deref(), Some("trezor.io"));
    legacy_device.join().unwrap();

    let (transport, handle) = start_device("mem:thp", simulator());
    let mut channel = connect_host(transport);
    assert_eq!(vendor(&mut channel).as_deref(), Some("trezor.io"));
    assert_eq!(vendor(&mut channel).as_deref(), Some("trezor.io"));
    let (_, report) = finish_device(channel, handle);
    assert_eq!(report.served, vec![MESSAGE_TYPE_GET_FEATURES]);
}
