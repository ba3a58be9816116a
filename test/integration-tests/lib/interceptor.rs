use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    ToDevice,
    ToHost,
}

impl fmt::Display for MessageDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageDirection::ToDevice => write!(f, "device"),
            MessageDirection::ToHost => write!(f, "host"),
        }
    }
}

/// Represents an action that [`crate::sniffer::Sniffer`] takes on an intercepted frame.
///
/// Frames are matched by direction and kind, the control byte without its sequence and ack
/// bits. Every action fires once, on the first matching frame.
#[derive(Debug, Clone)]
pub enum InterceptAction {
    /// Drops the frame.
    IgnoreFrame(IgnoreFrame),
    /// Delivers the frame twice, like a sender retransmitting after a lost ACK.
    DuplicateFrame(DuplicateFrame),
    /// Delivers other bytes instead of the frame.
    ReplaceFrame(Box<ReplaceFrame>),
}

impl InterceptAction {
    pub fn matches(&self, kind: u8, direction: MessageDirection) -> bool {
        let (expected_direction, expected_kind) = match self {
            InterceptAction::IgnoreFrame(a) => (a.direction, a.expected_kind),
            InterceptAction::DuplicateFrame(a) => (a.direction, a.expected_kind),
            InterceptAction::ReplaceFrame(a) => (a.direction, a.expected_kind),
        };
        expected_direction == direction && expected_kind == kind
    }
}

#[derive(Debug, Clone)]
pub struct IgnoreFrame {
    direction: MessageDirection,
    expected_kind: u8,
}

impl IgnoreFrame {
    pub fn new(direction: MessageDirection, expected_kind: u8) -> Self {
        Self {
            direction,
            expected_kind,
        }
    }
}

impl From<IgnoreFrame> for InterceptAction {
    fn from(value: IgnoreFrame) -> Self {
        InterceptAction::IgnoreFrame(value)
    }
}

#[derive(Debug, Clone)]
pub struct DuplicateFrame {
    direction: MessageDirection,
    expected_kind: u8,
}

impl DuplicateFrame {
    pub fn new(direction: MessageDirection, expected_kind: u8) -> Self {
        Self {
            direction,
            expected_kind,
        }
    }
}

impl From<DuplicateFrame> for InterceptAction {
    fn from(value: DuplicateFrame) -> Self {
        InterceptAction::DuplicateFrame(value)
    }
}

#[derive(Debug, Clone)]
pub struct ReplaceFrame {
    direction: MessageDirection,
    expected_kind: u8,
    pub(crate) replacement: Vec<u8>,
}

impl ReplaceFrame {
    /// `replacement` is a complete encoded frame, see [`crate::utils::encode_frame`].
    pub fn new(direction: MessageDirection, expected_kind: u8, replacement: Vec<u8>) -> Self {
        Self {
            direction,
            expected_kind,
            replacement,
        }
    }
}

impl From<ReplaceFrame> for InterceptAction {
    fn from(value: ReplaceFrame) -> Self {
        InterceptAction::ReplaceFrame(Box::new(value))
    }
}
