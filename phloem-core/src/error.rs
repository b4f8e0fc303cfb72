use std::fmt;

/// Result type alias for phloem core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for phloem core operations
#[derive(Debug)]
pub enum Error {
    /// I/O errors
    Io(std::io::Error),

    /// Channel errors from the transport layer
    Transport(phloem_transport::Error),

    /// Malformed wire messages
    Protocol(String),

    /// Configuration errors
    Config(String),

    /// Other errors
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Transport(e) => write!(f, "Transport error: {e}"),
            Error::Protocol(msg) => write!(f, "Protocol error: {msg}"),
            Error::Config(msg) => write!(f, "Configuration error: {msg}"),
            Error::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<phloem_transport::Error> for Error {
    fn from(err: phloem_transport::Error) -> Self {
        match err {
            phloem_transport::Error::Io(e) => Error::Io(e),
            other => Error::Transport(other),
        }
    }
}
