use core::fmt;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// Encryption or authentication failed
    AeadError(aes_gcm::Error),
    /// A handshake message has the wrong size
    InvalidMessageLength { expected: usize, actual: usize },
    /// The peer key yields a non contributory Diffie-Hellman result
    InvalidPublicKey,
    /// The 64 bit nonce cannot be incremented any further
    NonceExhausted,
    /// The handshake was driven out of order
    InvalidHandshakeStep,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;
        match self {
            AeadError(e) => write!(f, "Aead error: `{:?}`", e),
            InvalidMessageLength { expected, actual } => write!(
                f,
                "Invalid handshake message length: expected `{}`, got `{}`",
                expected, actual
            ),
            InvalidPublicKey => write!(f, "Invalid public key"),
            NonceExhausted => write!(f, "Nonce exhausted, the channel must be reallocated"),
            InvalidHandshakeStep => write!(f, "Handshake step called out of order"),
        }
    }
}

impl std::error::Error for Error {}

impl From<aes_gcm::Error> for Error {
    fn from(e: aes_gcm::Error) -> Self {
        Error::AeadError(e)
    }
}
