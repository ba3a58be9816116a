// Configuration files and persisted channels driving a host and a device.
use channel_store_thp::{ChannelStore, JsonChannelStore};
use codec_thp::{Channel, ChannelConfig, ChannelState, DeviceChannelState, ProtocolV2Channel};
use config_helpers_thp::config::{load_config, ThpConfig};
use const_thp::MESSAGE_TYPE_GET_FEATURES;
use framing_thp::Transport;
use integration_tests_thp::{
    mock_device::{mock_ui, Dialog, DeviceSimulator},
    *,
};
use messages_thp::{Features, GetFeatures, ThpPairingMethod};
use pairing_thp::{HostPairing, PairingConfig};
use std::io::Write;

// The host restarts: it reloads the channel from disk and goes on without a handshake.
#[test]
fn stored_channel_is_resumed() {
    start_tracing();
    let dir = tempfile::tempdir().unwrap();
    let (ui, _user) = mock_ui(true);
    let (transport, handle) =
        start_device("hid:0001", DeviceSimulator::new(PairingConfig::default(), ui));
    let config = ChannelConfig::default();

    let mut channel = ProtocolV2Channel::connect(transport, &config, None).unwrap();
    let mut pairing = HostPairing::new(&mut channel);
    pairing.request_pairing("laptop").unwrap();
    pairing.select_method(ThpPairingMethod::SkipPairing).unwrap();
    channel.get_features().unwrap();

    let mut store = JsonChannelStore::new(dir.path().join("channels.json"));
    store.save_channel(&channel.channel_data().unwrap()).unwrap();
    let handshake_hash = channel.handshake_hash();
    let transport = channel.into_transport();

    let store = JsonChannelStore::new(dir.path().join("channels.json"));
    let record = store.find_channel(transport.path()).unwrap().unwrap();
    assert_eq!(record.channel_id, mock_device::DEFAULT_CHANNEL_ID);
    let mut channel = ProtocolV2Channel::resume(transport, &config, &record).unwrap();
    assert_eq!(channel.state(), ChannelState::Ready);
    assert_eq!(channel.handshake_hash(), handshake_hash);
    let features: Features = channel.call(0, &GetFeatures {}).unwrap();
    assert_eq!(features.vendor.as_deref(), Some("trezor.io"));

    let (_, report) = finish_device(channel, handle);
    assert_eq!(
        report.served,
        vec![MESSAGE_TYPE_GET_FEATURES, MESSAGE_TYPE_GET_FEATURES]
    );
    assert_eq!(report.final_state, Some(DeviceChannelState::EncryptedTransport));
}

#[test]
fn record_of_another_transport_is_refused() {
    start_tracing();
    let dir = tempfile::tempdir().unwrap();
    let (ui, _user) = mock_ui(true);
    let (transport, handle) =
        start_device("hid:0001", DeviceSimulator::new(PairingConfig::default(), ui));
    let channel = connect_host(transport);
    let mut store = JsonChannelStore::new(dir.path().join("channels.json"));
    let mut record = channel.channel_data().unwrap();
    record.transport_path = "hid:0002".to_string();
    store.save_channel(&record).unwrap();

    assert!(store.find_channel("hid:0001").unwrap().is_none());
    let transport = channel.into_transport();
    let found = store.find_channel("hid:0002").unwrap().unwrap();
    assert!(ProtocolV2Channel::resume(transport, &ChannelConfig::default(), &found).is_err());

    store.remove_channel("hid:0002").unwrap();
    assert!(store.load_stored_channels().unwrap().is_empty());
    // the failed resume dropped the link
    handle.join().unwrap();
}

// Host and device read the same file: allowed methods on one side, host name on the other.
#[test]
fn configuration_file_drives_both_ends() {
    start_tracing();
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(
        br#"
        host_name = "workstation"

        [channel]
        busy_retries = 2

        [pairing]
        allowed_methods = ["QrCode"]
        "#,
    )
    .unwrap();
    let config: ThpConfig = load_config(file.path()).unwrap();

    let (ui, user) = mock_ui(true);
    let device = DeviceSimulator::from_config(&config, ui);
    let (transport, handle) = start_device("mem:config", device);
    let mut channel = ProtocolV2Channel::connect(transport, config.channel(), None).unwrap();
    assert_eq!(
        channel.properties().map(|p| p.pairing_methods.clone()),
        Some(vec![ThpPairingMethod::QrCode as i32])
    );

    let mut pairing = HostPairing::new(&mut channel);
    pairing.request_pairing(config.host_name()).unwrap();
    assert!(pairing.select_method(ThpPairingMethod::CodeEntry).is_err());
    pairing.request_pairing(config.host_name()).unwrap();
    pairing.select_method(ThpPairingMethod::QrCode).unwrap();
    let code = user.qr_code();
    user.wait_for_host();
    pairing.qr_code(&code).unwrap();
    pairing.end().unwrap();

    let (_, report) = finish_device(channel, handle);
    assert_eq!(report.pairing_results.len(), 2);
    assert_eq!(report.final_state, Some(DeviceChannelState::EncryptedTransport));
    assert_eq!(
        user.dialogs(),
        vec![
            Dialog::Pairing("workstation".to_string()),
            Dialog::Pairing("workstation".to_string())
        ]
    );
}
