//! Configuration management for the BIRD client.
//!
//! Settings are passed explicitly into [crate::BirdClient]; the only implicit source is
//! [ClientConfig::from_env], which reads a couple of environment variables once at
//! construction time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default control socket of a BIRD 2 daemon.
pub const DEFAULT_BIRD2_SOCKET: &str = "/run/bird.ctl";

/// Default control socket of a BIRD 3 daemon.
pub const DEFAULT_BIRD3_SOCKET: &str = "/run/bird3.ctl";

/// Default absolute deadline for one connect/query/close exchange.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// BIRD daemon major version.
///
/// Both versions speak the same control protocol; the version only selects the default socket
/// path.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, Default)]
pub enum DaemonVersion {
    #[default]
    Bird2,
    Bird3,
}

impl DaemonVersion {
    /// The socket path a daemon of this version listens on by default.
    pub fn default_socket(&self) -> &'static str {
        match self {
            DaemonVersion::Bird2 => DEFAULT_BIRD2_SOCKET,
            DaemonVersion::Bird3 => DEFAULT_BIRD3_SOCKET,
        }
    }
}

impl fmt::Display for DaemonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonVersion::Bird2 => write!(f, "bird2"),
            DaemonVersion::Bird3 => write!(f, "bird3"),
        }
    }
}

/// Client configuration settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ClientConfig {
    /// Path of the daemon's control socket.
    /// Environment variable: `BIRDC_SOCKET_PATH`
    pub socket_path: String,

    /// Absolute deadline covering handshake, command and the full response.
    /// Environment variable: `BIRDC_TIMEOUT_SECS`
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_daemon(DaemonVersion::default())
    }
}

impl ClientConfig {
    /// Configuration with the default socket path of the given daemon version.
    pub fn for_daemon(version: DaemonVersion) -> Self {
        Self {
            socket_path: version.default_socket().to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables, falling back to the BIRD 2 defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            socket_path: std::env::var("BIRDC_SOCKET_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.socket_path),
            timeout: std::env::var("BIRDC_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

impl fmt::Display for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "socket_path={}, timeout_secs={}",
            self.socket_path,
            self.timeout.as_secs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.socket_path, "/run/bird.ctl");
        assert_eq!(config.timeout, Duration::from_secs(10));

        let config = ClientConfig::for_daemon(DaemonVersion::Bird3);
        assert_eq!(config.socket_path, "/run/bird3.ctl");
    }

    #[test]
    fn test_display() {
        let config = ClientConfig::default();
        assert_eq!(config.to_string(), "socket_path=/run/bird.ctl, timeout_secs=10");
        assert_eq!(DaemonVersion::Bird3.to_string(), "bird3");
    }
}
