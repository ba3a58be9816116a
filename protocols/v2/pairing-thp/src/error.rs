use codec_thp::DeviceChannelState;
use core::fmt;
use messages_thp::ThpPairingMethod;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// The user or the host cancelled the pairing
    Cancelled,
    /// The tag of the selected method does not match, the exchange may be relayed
    TagMismatch(ThpPairingMethod),
    /// The host's handshake hash received out of band differs from ours
    HandshakeHashMismatch,
    /// Revealed code entry secret does not open the commitment
    CommitmentMismatch,
    /// Revealed secret does not reproduce the displayed code
    CodeMismatch,
    /// CPace peer key is malformed or yields the identity point
    InvalidCpaceKey,
    /// A message of another type arrived
    UnexpectedMessage { expected: Option<u16>, actual: u16 },
    /// Pairing step not allowed in the current channel state
    InvalidState(DeviceChannelState),
    /// Method is valid but disabled by configuration
    MethodNotAllowed(ThpPairingMethod),
    /// Method tag does not belong to the selected method
    MethodNotSelected(ThpPairingMethod),
    UnknownMethod(i32),
    /// Autoconnect credentials are issued only to hosts that presented a valid credential
    AutoconnectWithoutCredential,
    /// NFC tag arrived before the host data was read from the NFC interface
    MissingNfcHostData,
    /// The credential key counter cannot be bumped any further
    CredentialCounterExhausted,
    /// Host side step attempted out of order
    OutOfOrder(&'static str),
    Channel(codec_thp::Error),
    Message(messages_thp::Error),
}

impl Error {
    /// Neutral outcome, the pairing can simply be started again.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Failures that may indicate an active relay or a MITM, and must be presented as such.
    pub fn is_security_relevant(&self) -> bool {
        matches!(
            self,
            Error::TagMismatch(_)
                | Error::HandshakeHashMismatch
                | Error::CommitmentMismatch
                | Error::CodeMismatch
                | Error::InvalidCpaceKey
        )
    }

    /// Code of the `Failure` the device answers with.
    pub fn failure_code(&self) -> i32 {
        use Error::*;
        match self {
            Cancelled => const_thp::FAILURE_ACTION_CANCELLED,
            UnexpectedMessage { .. } | InvalidState(_) => const_thp::FAILURE_UNEXPECTED_MESSAGE,
            Message(_) | UnknownMethod(_) => const_thp::FAILURE_DATA_ERROR,
            _ => const_thp::FAILURE_PROCESS_ERROR,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;
        match self {
            Cancelled => write!(f, "Pairing cancelled"),
            TagMismatch(method) => write!(f, "Unexpected {:?} tag", method),
            HandshakeHashMismatch => write!(f, "Handshake hash mismatch"),
            CommitmentMismatch => write!(f, "Revealed secret does not match the commitment"),
            CodeMismatch => write!(f, "Revealed secret does not match the displayed code"),
            InvalidCpaceKey => write!(f, "Invalid CPace public key"),
            UnexpectedMessage { expected, actual } => write!(
                f,
                "Unexpected message: expected `{:?}`, received `{}`",
                expected, actual
            ),
            InvalidState(state) => write!(f, "Pairing step not allowed in state `{:?}`", state),
            MethodNotAllowed(method) => write!(f, "Pairing method `{:?}` not allowed", method),
            MethodNotSelected(method) => write!(f, "Pairing method `{:?}` not selected", method),
            UnknownMethod(value) => write!(f, "Unknown pairing method `{}`", value),
            AutoconnectWithoutCredential => {
                write!(f, "Cannot ask for autoconnect credential without a valid credential")
            }
            MissingNfcHostData => write!(f, "NFC host data not available"),
            CredentialCounterExhausted => write!(f, "Credential key counter exhausted"),
            OutOfOrder(step) => write!(f, "Pairing step out of order: `{}`", step),
            Channel(e) => write!(f, "Channel error: `{}`", e),
            Message(e) => write!(f, "Message error: `{}`", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<codec_thp::Error> for Error {
    fn from(e: codec_thp::Error) -> Self {
        match e {
            codec_thp::Error::Failure {
                code: Some(const_thp::FAILURE_ACTION_CANCELLED),
                ..
            } => Error::Cancelled,
            e => Error::Channel(e),
        }
    }
}

impl From<messages_thp::Error> for Error {
    fn from(e: messages_thp::Error) -> Self {
        Error::Message(e)
    }
}
