use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::poller::{DEFAULT_POLL_INTERVAL, PollStrategy};
use crate::transport::{SNAPD_SNAP_SOCKET, SNAPD_SOCKET};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// snapd socket; a leading `@` selects the abstract namespace
    pub socket_path: String,

    /// Socket used for snapctl
    pub snapctl_socket_path: String,

    /// Sent as `User-Agent` when set
    pub user_agent: Option<String>,

    /// Let the daemon ask for authorization interactively (polkit)
    pub allow_interaction: bool,

    /// Give up connecting after this long; no limit when unset
    pub connect_timeout_ms: Option<u64>,

    /// Delay between change polls
    pub poll_interval_ms: u64,

    /// Wait on change-update notices instead of polling on an interval
    pub long_poll: bool,

    /// How long the daemon may hold one notices request
    pub long_poll_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: SNAPD_SOCKET.to_string(),
            snapctl_socket_path: SNAPD_SNAP_SOCKET.to_string(),
            user_agent: None,
            allow_interaction: false,
            connect_timeout_ms: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            long_poll: false,
            long_poll_timeout_ms: 30_000,
        }
    }
}

impl ClientConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ClientConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn poll_strategy(&self) -> PollStrategy {
        if self.long_poll {
            PollStrategy::LongPoll {
                timeout: Duration::from_millis(self.long_poll_timeout_ms),
            }
        } else {
            PollStrategy::Interval(Duration::from_millis(self.poll_interval_ms))
        }
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "socket_path = \"@snapd-test\"\nlong_poll = true").unwrap();
        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.socket_path, "@snapd-test");
        assert_eq!(config.snapctl_socket_path, SNAPD_SNAP_SOCKET);
        assert_eq!(
            config.poll_strategy(),
            PollStrategy::LongPoll {
                timeout: Duration::from_secs(30)
            }
        );
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.socket_path, "/run/snapd.socket");
        assert_eq!(
            config.poll_strategy(),
            PollStrategy::Interval(Duration::from_millis(100))
        );
        assert_eq!(config.connect_timeout(), None);
    }

    #[test]
    fn missing_file() {
        let err = ClientConfig::from_file(Path::new("/nonexistent/snapd-client.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "poll_interval_ms = \"soon\"").unwrap();
        let err = ClientConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
