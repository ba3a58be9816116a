use crate::{interceptor::InterceptAction, mock_device::DeviceSimulator, sniffer::Sniffer};
use codec_thp::{ChannelConfig, ProtocolV2Channel};
use framing_thp::memory::MemoryTransport;
use mock_device::ConnectionReport;
use once_cell::sync::OnceCell;
use std::thread::JoinHandle;
use std::path::PathBuf;

pub mod interceptor;
pub mod mock_device;
pub mod relay;

static LOGGER: OnceCell<()> = OnceCell::new();

/// Each test function should call `start_tracing()` to enable logging. `THP_TEST_LOG` names an
/// optional file the logs are copied to.
pub fn start_tracing() {
    LOGGER.get_or_init(|| {
        let log_file = std::env::var_os("THP_TEST_LOG").map(PathBuf::from);
        config_helpers_thp::init_logging(log_file.as_deref())
            .expect("Failed to initialize logging");
    });
}

/// Device thread handle, returns the simulator for the next connection together with the
/// report of this one.
pub type DeviceHandle = JoinHandle<(DeviceSimulator, ConnectionReport)>;

/// Starts `device` on one end of a fresh in-memory link and returns the host end.
pub fn start_device(path: &str, device: DeviceSimulator) -> (MemoryTransport, DeviceHandle) {
    let (host, device_end) = MemoryTransport::pair(path, None);
    (host, device.spawn(device_end))
}

/// Same as [`start_device`], with the host end wrapped in a [`Sniffer`].
pub fn start_sniffed_device(
    path: &str,
    device: DeviceSimulator,
    actions: Vec<InterceptAction>,
) -> (Sniffer<MemoryTransport>, DeviceHandle) {
    let (host, handle) = start_device(path, device);
    (Sniffer::new(host, actions), handle)
}

/// Allocation and handshake with a fresh host key and no credential.
pub fn connect_host(transport: MemoryTransport) -> ProtocolV2Channel<MemoryTransport> {
    ProtocolV2Channel::connect(transport, &ChannelConfig::default(), None)
        .expect("Failed to connect to the device")
}

/// Lets the device thread see the end of the link and collects its report.
pub fn finish_device<T>(channel: ProtocolV2Channel<T>, handle: DeviceHandle) -> (DeviceSimulator, ConnectionReport)
where
    T: framing_thp::Transport + Closable,
{
    channel.into_transport().close_link();
    handle.join().expect("Device thread panicked")
}

/// Transports a test can hang up.
pub trait Closable {
    fn close_link(&self);
}

impl Closable for MemoryTransport {
    fn close_link(&self) {
        self.close();
    }
}

impl<T: Closable> Closable for Sniffer<T> {
    fn close_link(&self) {
        self.inner().close_link();
    }
}
