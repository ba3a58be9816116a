//! The control byte carries the kind of a frame in its low bits plus two flags: the sequence bit
//! (bit 4) and the ack bit (bit 3). Kind comparisons always mask the flags out first.

use const_thp::*;

pub fn add_seq_bit_to_ctrl_byte(ctrl_byte: u8, seq_bit: u8) -> u8 {
    (ctrl_byte & !(1 << SEQ_BIT_OFFSET)) | ((seq_bit & 1) << SEQ_BIT_OFFSET)
}

pub fn add_ack_bit_to_ctrl_byte(ctrl_byte: u8, ack_bit: u8) -> u8 {
    (ctrl_byte & !(1 << ACK_BIT_OFFSET)) | ((ack_bit & 1) << ACK_BIT_OFFSET)
}

pub fn get_seq_bit(ctrl_byte: u8) -> u8 {
    (ctrl_byte >> SEQ_BIT_OFFSET) & 1
}

pub fn get_ack_bit(ctrl_byte: u8) -> u8 {
    (ctrl_byte >> ACK_BIT_OFFSET) & 1
}

/// Handshake and encrypted transport frames take part in the sequence bit alternation. ACKs,
/// errors, allocation and ping frames do not.
pub fn has_seq_bit(ctrl_byte: u8) -> bool {
    !is_continuation(ctrl_byte) && (ctrl_byte & DATA_MASK) <= ENCRYPTED_TRANSPORT
}

pub fn is_ack(ctrl_byte: u8) -> bool {
    ctrl_byte & ACK_MASK == ACK_MESSAGE
}

pub fn is_error(ctrl_byte: u8) -> bool {
    ctrl_byte == ERROR
}

pub fn is_continuation(ctrl_byte: u8) -> bool {
    ctrl_byte & CONTINUATION_PACKET == CONTINUATION_PACKET
}

pub fn is_encrypted_transport(ctrl_byte: u8) -> bool {
    ctrl_byte & DATA_MASK == ENCRYPTED_TRANSPORT
}

pub fn is_handshake_init_req(ctrl_byte: u8) -> bool {
    ctrl_byte & DATA_MASK == HANDSHAKE_INIT_REQ
}

pub fn is_handshake_init_res(ctrl_byte: u8) -> bool {
    ctrl_byte & DATA_MASK == HANDSHAKE_INIT_RES
}

pub fn is_handshake_comp_req(ctrl_byte: u8) -> bool {
    ctrl_byte & DATA_MASK == HANDSHAKE_COMP_REQ
}

pub fn is_handshake_comp_res(ctrl_byte: u8) -> bool {
    ctrl_byte & DATA_MASK == HANDSHAKE_COMP_RES
}

pub fn is_channel_allocation_req(ctrl_byte: u8) -> bool {
    ctrl_byte == CHANNEL_ALLOCATION_REQ
}

pub fn is_channel_allocation_res(ctrl_byte: u8) -> bool {
    ctrl_byte == CHANNEL_ALLOCATION_RES
}

pub fn is_ping(ctrl_byte: u8) -> bool {
    ctrl_byte == PING
}

pub fn is_pong(ctrl_byte: u8) -> bool {
    ctrl_byte == PONG
}

pub fn is_codec_v1(ctrl_byte: u8) -> bool {
    ctrl_byte == CODEC_V1
}
