//! Stop-and-wait discipline shared by both ends of a channel.
//!
//! Every handshake or encrypted transport frame carries the sender's sequence bit and must be
//! acknowledged with an ACK whose ack bit equals it before the next frame goes out. The
//! receiver flips its expected bit for each accepted frame, a frame with the other bit is a
//! retransmission: it is acknowledged again and dropped.

use crate::{Error, Result, ThpErrorCode};
use const_thp::{ACK_MESSAGE, DATA_MASK, ERROR};
use framing_thp::{
    chunks::add_checksum, control_byte, read_until_valid_crc, write_payload_to_wire,
    write_payload_to_wire_and_add_checksum, Frame, MessageHeader, Transport,
};
use std::time::Duration;
use tracing::{debug, warn};

pub(crate) struct FrameIo<T> {
    pub transport: T,
    pub channel_id: u16,
    pub sync_bit_send: u8,
    pub sync_bit_receive: u8,
    pub busy_retries: u32,
    pub busy_backoff: Duration,
}

impl<T: Transport> FrameIo<T> {
    pub fn new(transport: T, channel_id: u16) -> Self {
        Self {
            transport,
            channel_id,
            sync_bit_send: 0,
            sync_bit_receive: 0,
            busy_retries: 0,
            busy_backoff: Duration::from_millis(0),
        }
    }

    /// Sends a frame of kind `ctrl_kind` with the current sequence bit and waits for its ACK.
    /// A TRANSPORT_BUSY answer triggers a resend after the back-off.
    pub fn send(&mut self, ctrl_kind: u8, payload: &[u8]) -> Result<()> {
        let seq_bit = self.sync_bit_send;
        let ctrl_byte = control_byte::add_seq_bit_to_ctrl_byte(ctrl_kind, seq_bit);
        let mut attempt = 0;
        loop {
            write_payload_to_wire_and_add_checksum(
                &mut self.transport,
                ctrl_byte,
                self.channel_id,
                payload,
            )?;
            match self.read_ack(seq_bit) {
                Ok(()) => {
                    self.sync_bit_send ^= 1;
                    return Ok(());
                }
                Err(Error::Thp(ThpErrorCode::TransportBusy)) => {
                    if attempt >= self.busy_retries {
                        return Err(Error::RetriesExhausted);
                    }
                    attempt += 1;
                    warn!(
                        channel_id = self.channel_id,
                        attempt, "Device busy, resending frame"
                    );
                    std::thread::sleep(self.busy_backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Waits for the ACK of the frame sent with `seq_bit`. An ACK carrying the other bit is a
    /// stale acknowledgement of an earlier frame and is dropped, any other frame is fatal.
    pub fn read_ack(&mut self, seq_bit: u8) -> Result<()> {
        loop {
            let frame = self.read_frame()?;
            let ctrl_byte = frame.ctrl_byte();
            if !control_byte::is_ack(ctrl_byte) {
                return Err(Error::UnexpectedControlByte {
                    expected: control_byte::add_ack_bit_to_ctrl_byte(ACK_MESSAGE, seq_bit),
                    actual: ctrl_byte,
                });
            }
            if control_byte::get_ack_bit(ctrl_byte) != seq_bit {
                warn!(
                    channel_id = self.channel_id,
                    ack_bit = control_byte::get_ack_bit(ctrl_byte),
                    "Dropping stale ACK"
                );
                continue;
            }
            debug!(channel_id = self.channel_id, ack_bit = seq_bit, "ACK received");
            return Ok(());
        }
    }

    /// Next frame for this channel with a valid checksum. Error frames become errors and
    /// retransmitted frames are acknowledged again and skipped.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            let frame = read_until_valid_crc(&mut self.transport)?;
            if frame.channel_id() != self.channel_id {
                debug!(
                    channel_id = frame.channel_id(),
                    own_channel_id = self.channel_id,
                    "Ignoring frame for another channel"
                );
                continue;
            }
            let ctrl_byte = frame.ctrl_byte();
            if control_byte::is_error(ctrl_byte) {
                return Err(error_from_payload(&frame.payload));
            }
            if control_byte::has_seq_bit(ctrl_byte)
                && control_byte::get_seq_bit(ctrl_byte) != self.sync_bit_receive
            {
                warn!(
                    channel_id = self.channel_id,
                    ctrl_byte, "Retransmitted frame, acknowledging again and dropping it"
                );
                self.send_ack(control_byte::get_seq_bit(ctrl_byte))?;
                continue;
            }
            return Ok(frame);
        }
    }

    /// Like [`FrameIo::read_frame`], skipping ACKs. Used where a message is expected, a late
    /// duplicate ACK is harmless there.
    pub fn read_message_frame(&mut self, kind: u8) -> Result<Frame> {
        loop {
            let frame = self.read_frame()?;
            if control_byte::is_ack(frame.ctrl_byte()) {
                debug!(channel_id = self.channel_id, "Skipping ACK while reading a message");
                continue;
            }
            expect_kind(&frame, kind)?;
            return Ok(frame);
        }
    }

    /// Acknowledges a frame returned by [`FrameIo::read_frame`] once it has been processed.
    pub fn accept(&mut self, frame: &Frame) -> Result<()> {
        self.send_ack(control_byte::get_seq_bit(frame.ctrl_byte()))?;
        self.sync_bit_receive ^= 1;
        Ok(())
    }

    pub fn send_ack(&mut self, ack_bit: u8) -> Result<()> {
        let header = MessageHeader::for_ack(self.channel_id, ack_bit);
        let data = add_checksum(&header, &[]);
        write_payload_to_wire(&mut self.transport, &header, &data)?;
        Ok(())
    }

    pub fn send_error(&mut self, code: ThpErrorCode) -> Result<()> {
        write_payload_to_wire_and_add_checksum(
            &mut self.transport,
            ERROR,
            self.channel_id,
            &[u8::from(code)],
        )?;
        Ok(())
    }
}

/// Checks the message kind of `frame`, ignoring sequence and ack bits.
pub(crate) fn expect_kind(frame: &Frame, kind: u8) -> Result<()> {
    if frame.ctrl_byte() & DATA_MASK != kind {
        return Err(Error::UnexpectedControlByte {
            expected: kind,
            actual: frame.ctrl_byte(),
        });
    }
    Ok(())
}

pub(crate) fn error_from_payload(payload: &[u8]) -> Error {
    match ThpErrorCode::from(payload.first().copied().unwrap_or_default()) {
        ThpErrorCode::DeviceLocked => Error::DeviceLocked,
        code => Error::Thp(code),
    }
}
