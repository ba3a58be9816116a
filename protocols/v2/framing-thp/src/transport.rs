use std::io;

/// A blocking, half-duplex byte pipe to a device.
///
/// Chunked transports (USB HID, BLE) move fixed size reports and return `Some(size)` from
/// [`Transport::chunk_size`]. Stream transports return `None`, and every frame is written and
/// read as one unit.
pub trait Transport {
    fn chunk_size(&self) -> Option<usize>;

    /// Writes exactly one chunk.
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// Blocks until one chunk is available. Read timeouts are the transport's business.
    fn read_chunk(&mut self) -> io::Result<Vec<u8>>;

    /// Stable identifier of the physical connection, used to key persisted channels.
    fn path(&self) -> &str;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn chunk_size(&self) -> Option<usize> {
        (**self).chunk_size()
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        (**self).write_chunk(chunk)
    }

    fn read_chunk(&mut self) -> io::Result<Vec<u8>> {
        (**self).read_chunk()
    }

    fn path(&self) -> &str {
        (**self).path()
    }
}
