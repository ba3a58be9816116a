//! An active attacker between host and device.
//!
//! The relay completes one handshake with the host, posing as the device, and another one with
//! the device, posing as a host. Pairing messages are decrypted on one channel and encrypted
//! again on the other, so each end sees a different handshake hash. Pairing is what must catch
//! this.

use codec_thp::{device::DeviceChannel, ChannelConfig, ProtocolV2Channel, TrezorState};
use framing_thp::Transport;
use messages_thp::{Failure, ThpEndResponse};
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct RelayReport {
    /// Handshake hash of the channel with the host
    pub host_side_hash: Option<[u8; 32]>,
    /// Handshake hash of the channel with the device
    pub device_side_hash: Option<[u8; 32]>,
    /// Messages relayed in each direction
    pub relayed: usize,
    pub error: Option<codec_thp::Error>,
}

/// Connects to the device on `to_device` first, then serves the host on `to_host` with the
/// device's channel id and properties.
pub fn spawn_relay<H, D>(to_host: H, to_device: D) -> JoinHandle<RelayReport>
where
    H: Transport + Send + 'static,
    D: Transport + Send + 'static,
{
    thread::spawn(move || {
        let mut report = RelayReport::default();
        if let Err(e) = relay(to_host, to_device, &mut report) {
            warn!(error = %e, "Relay stopped");
            report.error = Some(e);
        }
        report
    })
}

fn relay<H: Transport, D: Transport>(
    to_host: H,
    to_device: D,
    report: &mut RelayReport,
) -> codec_thp::Result<()> {
    let mut device = ProtocolV2Channel::connect(to_device, &ChannelConfig::default(), None)?;
    report.device_side_hash = device.handshake_hash();

    let mut host = DeviceChannel::accept(
        to_host,
        device.channel_id(),
        device.device_properties().to_vec(),
        noise_thp::generate_private_key(),
    )?;
    host.handshake(|_, _| TrezorState::Unpaired)?;
    report.host_side_hash = host.handshake_hash();
    info!("Relay in place");

    // every pairing request gets exactly one response
    loop {
        let (session_id, request) = host.read_message()?;
        device.write_raw(session_id, &request)?;
        let response = device.read_raw(session_id)?;
        host.write_message(session_id, &response)?;
        report.relayed += 1;
        if response.is::<Failure>() || response.is::<ThpEndResponse>() {
            return Ok(());
        }
    }
}
