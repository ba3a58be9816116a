// Every pairing method end to end, from the pairing request to encrypted transport.
use codec_thp::{Channel, DeviceChannelState, Error as CodecError, TrezorState};
use const_thp::{FAILURE_PROCESS_ERROR, FAILURE_UNEXPECTED_MESSAGE};
use integration_tests_thp::{
    mock_device::{mock_ui, Dialog, DeviceSimulator, User},
    *,
};
use messages_thp::{Features, Initialize, ThpPairingMethod};
use pairing_thp::{Error, HostPairing, PairingConfig};

const HOST_NAME: &str = "laptop";

fn simulator(config: PairingConfig) -> (DeviceSimulator, User) {
    let (ui, user) = mock_ui(true);
    (DeviceSimulator::new(config, ui), user)
}

#[test]
fn code_entry_pairing() {
    start_tracing();
    let (device, user) = simulator(PairingConfig::default());
    let (transport, handle) = start_device("mem:code-entry", device);
    let mut channel = connect_host(transport);
    assert_eq!(channel.trezor_state(), Some(TrezorState::Unpaired));

    let mut pairing = HostPairing::new(&mut channel);
    pairing.request_pairing(HOST_NAME).unwrap();
    pairing.select_method(ThpPairingMethod::CodeEntry).unwrap();
    let code = user.code_entry_code();
    assert!(code < 1_000_000);
    user.wait_for_host();
    pairing.code_entry(code).unwrap();
    let response = pairing.request_credential(false).unwrap();
    assert!(response.credential.is_some());
    pairing.end().unwrap();

    assert_eq!(channel.trezor_state(), Some(TrezorState::Paired));
    assert!(channel.credential().is_some());
    let features = channel.get_features().unwrap();
    assert_eq!(features.unlocked, Some(true));

    let (device, report) = finish_device(channel, handle);
    assert!(matches!(report.last_pairing_result(), Some(Ok(()))));
    assert_eq!(report.final_state, Some(DeviceChannelState::EncryptedTransport));
    assert!(device.registry().contains(report.channel_id));
    assert_eq!(user.dialogs(), vec![Dialog::Pairing(HOST_NAME.to_string())]);
}

#[test]
fn qr_code_pairing() {
    start_tracing();
    let (device, user) = simulator(PairingConfig::default());
    let device_key = device.static_pubkey();
    let (transport, handle) = start_device("mem:qr-code", device);
    let mut channel = connect_host(transport);

    let mut pairing = HostPairing::new(&mut channel);
    pairing.request_pairing(HOST_NAME).unwrap();
    pairing.select_method(ThpPairingMethod::QrCode).unwrap();
    let code = user.qr_code();
    user.wait_for_host();
    pairing.qr_code(&code).unwrap();
    let response = pairing.request_credential(false).unwrap();
    assert_eq!(response.trezor_static_pubkey, Some(device_key.to_vec()));
    pairing.end().unwrap();

    let (_, report) = finish_device(channel, handle);
    assert!(matches!(report.last_pairing_result(), Some(Ok(()))));
    assert_eq!(report.final_state, Some(DeviceChannelState::EncryptedTransport));
}

#[test]
fn nfc_pairing() {
    start_tracing();
    let (device, user) = simulator(PairingConfig::default());
    let (transport, handle) = start_device("mem:nfc", device);
    let mut channel = connect_host(transport);

    let mut pairing = HostPairing::new(&mut channel);
    pairing.request_pairing(HOST_NAME).unwrap();
    pairing.select_method(ThpPairingMethod::Nfc).unwrap();
    let secret = user.nfc_secret();
    user.tap_nfc(pairing.nfc_host_data().unwrap());
    user.wait_for_host();
    pairing.nfc(&secret).unwrap();
    pairing.end().unwrap();

    let (_, report) = finish_device(channel, handle);
    assert!(matches!(report.last_pairing_result(), Some(Ok(()))));
    assert_eq!(report.final_state, Some(DeviceChannelState::EncryptedTransport));
}

// The host reads a tag over NFC, then claims a different handshake than the device saw.
#[test]
fn nfc_with_foreign_handshake_hash() {
    start_tracing();
    let (device, user) = simulator(PairingConfig::default());
    let (transport, handle) = start_device("mem:nfc-hash", device);
    let mut channel = connect_host(transport);

    let mut pairing = HostPairing::new(&mut channel);
    pairing.request_pairing(HOST_NAME).unwrap();
    pairing.select_method(ThpPairingMethod::Nfc).unwrap();
    let secret = user.nfc_secret();
    let mut host_data = pairing.nfc_host_data().unwrap();
    host_data.handshake_hash[0] ^= 0x01;
    user.tap_nfc(host_data);
    user.wait_for_host();
    match pairing.nfc(&secret) {
        Err(Error::Channel(CodecError::Failure { code, .. })) => {
            assert_eq!(code, Some(FAILURE_PROCESS_ERROR))
        }
        other => panic!("foreign handshake hash accepted: {:?}", other),
    }

    let (_, report) = finish_device(channel, handle);
    assert!(matches!(
        report.last_pairing_result(),
        Some(Err(Error::HandshakeHashMismatch))
    ));
    assert_eq!(report.final_state, Some(DeviceChannelState::Tp0));
}

#[test]
fn skip_pairing() {
    start_tracing();
    let (device, user) = simulator(PairingConfig::default());
    let (transport, handle) = start_device("mem:skip", device);
    let mut channel = connect_host(transport);

    let mut pairing = HostPairing::new(&mut channel);
    pairing.request_pairing(HOST_NAME).unwrap();
    pairing.select_method(ThpPairingMethod::SkipPairing).unwrap();
    assert_eq!(channel.trezor_state(), Some(TrezorState::Paired));
    assert!(channel.get_features().is_ok());

    let (_, report) = finish_device(channel, handle);
    assert_eq!(report.final_state, Some(DeviceChannelState::EncryptedTransport));
    assert_eq!(user.dialogs().len(), 1);
}

#[test]
fn restricted_methods_are_refused() {
    start_tracing();
    let config = PairingConfig::new(vec![ThpPairingMethod::QrCode]);
    let (device, _user) = simulator(config);
    assert_eq!(
        device.properties().pairing_methods,
        vec![ThpPairingMethod::QrCode as i32]
    );
    let (transport, handle) = start_device("mem:restricted", device);
    let mut channel = connect_host(transport);

    let mut pairing = HostPairing::new(&mut channel);
    pairing.request_pairing(HOST_NAME).unwrap();
    assert!(pairing.select_method(ThpPairingMethod::SkipPairing).is_err());

    let (_, report) = finish_device(channel, handle);
    assert!(matches!(
        report.last_pairing_result(),
        Some(Err(Error::MethodNotAllowed(ThpPairingMethod::SkipPairing)))
    ));
    assert_eq!(report.final_state, Some(DeviceChannelState::Tp0));
}

// After a cancellation the channel is back in Tp0, a new pairing starts from scratch.
#[test]
fn cancelled_pairing_can_start_again() {
    start_tracing();
    let (device, user) = simulator(PairingConfig::default());
    let (transport, handle) = start_device("mem:cancel", device);
    let mut channel = connect_host(transport);

    let mut pairing = HostPairing::new(&mut channel);
    pairing.request_pairing(HOST_NAME).unwrap();
    pairing.select_method(ThpPairingMethod::CodeEntry).unwrap();
    user.code_entry_code();
    user.wait_for_host();
    pairing.cancel().unwrap();

    let mut pairing = HostPairing::new(&mut channel);
    pairing.request_pairing(HOST_NAME).unwrap();
    pairing.select_method(ThpPairingMethod::QrCode).unwrap();
    let code = user.qr_code();
    user.wait_for_host();
    pairing.qr_code(&code).unwrap();
    pairing.end().unwrap();

    let (_, report) = finish_device(channel, handle);
    assert_eq!(report.pairing_results.len(), 2);
    assert!(report.pairing_results[0]
        .as_ref()
        .is_err_and(|e| e.is_cancellation()));
    assert!(report.pairing_results[1].is_ok());
    assert_eq!(report.final_state, Some(DeviceChannelState::EncryptedTransport));
}

#[test]
fn user_rejects_pairing() {
    start_tracing();
    let (ui, user) = mock_ui(false);
    let device = DeviceSimulator::new(PairingConfig::default(), ui);
    let (transport, handle) = start_device("mem:reject", device);
    let mut channel = connect_host(transport);

    let mut pairing = HostPairing::new(&mut channel);
    assert!(pairing
        .request_pairing(HOST_NAME)
        .unwrap_err()
        .is_cancellation());

    let (_, report) = finish_device(channel, handle);
    assert_eq!(report.final_state, Some(DeviceChannelState::Tp0));
    assert_eq!(user.dialogs(), vec![Dialog::Pairing(HOST_NAME.to_string())]);
}

#[test]
fn paired_channel_rejects_unknown_messages() {
    start_tracing();
    let (device, _user) = simulator(PairingConfig::default());
    let (transport, handle) = start_device("mem:unknown", device);
    let mut channel = connect_host(transport);

    let mut pairing = HostPairing::new(&mut channel);
    pairing.request_pairing(HOST_NAME).unwrap();
    pairing.select_method(ThpPairingMethod::SkipPairing).unwrap();

    let result: codec_thp::Result<Features> = channel.call(0, &Initialize {});
    match result {
        Err(CodecError::Failure { code, .. }) => assert_eq!(code, Some(FAILURE_UNEXPECTED_MESSAGE)),
        other => panic!("unexpected answer {:?}", other),
    }
    let (_, report) = finish_device(channel, handle);
    assert_eq!(report.final_state, Some(DeviceChannelState::EncryptedTransport));
}
