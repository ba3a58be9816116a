//! In-process transport made of two `async_channel` queues, one per direction.

use crate::Transport;
use async_channel::{unbounded, Receiver, Sender};
use std::io;

pub struct MemoryTransport {
    path: String,
    chunk_size: Option<usize>,
    sender: Sender<Vec<u8>>,
    receiver: Receiver<Vec<u8>>,
}

impl MemoryTransport {
    /// Two connected ends: what one writes the other reads.
    pub fn pair(path: &str, chunk_size: Option<usize>) -> (Self, Self) {
        let (a_sender, b_receiver) = unbounded();
        let (b_sender, a_receiver) = unbounded();
        (
            Self {
                path: path.to_string(),
                chunk_size,
                sender: a_sender,
                receiver: a_receiver,
            },
            Self {
                path: path.to_string(),
                chunk_size,
                sender: b_sender,
                receiver: b_receiver,
            },
        )
    }

    /// Number of chunks waiting to be read on this end.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    pub fn close(&self) {
        self.sender.close();
        self.receiver.close();
    }
}

impl Transport for MemoryTransport {
    fn chunk_size(&self) -> Option<usize> {
        self.chunk_size
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        if let Some(size) = self.chunk_size {
            if chunk.len() != size {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("chunk of {} bytes, transport expects {}", chunk.len(), size),
                ));
            }
        }
        self.sender
            .send_blocking(chunk.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "memory transport closed"))
    }

    fn read_chunk(&mut self) -> io::Result<Vec<u8>> {
        self.receiver
            .recv_blocking()
            .map_err(|_| io::Error::new(io::ErrorKind::UnexpectedEof, "memory transport closed"))
    }

    fn path(&self) -> &str {
        &self.path
    }
}
