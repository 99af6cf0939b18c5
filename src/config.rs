use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, DEFAULT_HOST, DEFAULT_PORT};

/// Maximum number of concurrent connections the server accepts.
///
/// When this limit is reached, the server stops accepting connections until
/// an active connection terminates.
pub const DEFAULT_MAX_CONNECTIONS: usize = 250;

/// Bound on each handshake reply and on the wait for the snapshot.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Leader to replicate from. Starts the server in the follower role.
    pub replicaof: Option<LeaderAddr>,
    pub max_connections: usize,
    pub handshake_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            replicaof: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

/// Upstream leader address, written `"<host> <port>"` on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderAddr {
    pub host: String,
    pub port: u16,
}

impl FromStr for LeaderAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(host), Some(port), None) => {
                let port = port
                    .parse()
                    .map_err(|_| Error::InvalidArgument(format!("invalid leader port `{port}`")))?;
                Ok(LeaderAddr {
                    host: host.to_string(),
                    port,
                })
            }
            _ => Err(Error::InvalidArgument(format!(
                "expected `<host> <port>`, got `{s}`"
            ))),
        }
    }
}

impl fmt::Display for LeaderAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
