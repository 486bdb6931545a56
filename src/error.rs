//! Error handling module.
use thiserror::Error;

/// BIRD client error enum.
///
/// Lookups that find nothing (route, AS path, origin, ROA status) are not errors; they return
/// `Ok(None)` instead.
#[derive(Error, Debug)]
pub enum BirdError {
    /// The control socket could not be reached.
    #[error("ConnectionError: failed to connect to socket {path}: {source}")]
    ConnectionError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The daemon did not greet with a `0001` ready line.
    #[error("ProtocolError: {0}")]
    ProtocolError(String),

    /// Writing the command or reading the response failed, including deadline expiry.
    #[error("TransportError: {0}")]
    TransportError(String),

    /// The daemon answered with an 8xxx (runtime) or 9xxx (parse) status line.
    #[error("DaemonError: {0}")]
    DaemonError(String),

    /// The daemon output could not be decoded into the expected value.
    #[error("DecodeError: {0}")]
    DecodeError(String),
}

impl BirdError {
    /// Checks if the error was reported by the daemon itself rather than by the client.
    pub fn is_daemon_error(&self) -> bool {
        matches!(self, BirdError::DaemonError(_))
    }
}

impl From<std::num::ParseIntError> for BirdError {
    fn from(e: std::num::ParseIntError) -> Self {
        BirdError::DecodeError(e.to_string())
    }
}

impl From<ipnet::AddrParseError> for BirdError {
    fn from(e: ipnet::AddrParseError) -> Self {
        BirdError::DecodeError(e.to_string())
    }
}
