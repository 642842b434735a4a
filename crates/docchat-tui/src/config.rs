//! Runtime configuration.

use std::path::PathBuf;
use std::time::Duration;

use docchat_client::{origin_from_base_url, ClientError};
use docchat_core::{BuildEnvironment, SessionOptions};

/// Default backend base URL.
pub const DEFAULT_SERVER: &str = "http://localhost:8000";

/// Default documents polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default log file. Logs never go to the terminal.
pub const DEFAULT_LOG_FILE: &str = "/tmp/docchat.log";

/// Configuration for one run of the terminal client.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL used for HTTP calls and, outside production, the chat channel.
    pub server: String,

    /// Build flavor deciding the chat channel host.
    pub environment: BuildEnvironment,

    /// How often the document listing is refreshed.
    pub poll_interval: Duration,

    /// Where tracing output is written.
    pub log_file: PathBuf,

    /// Chat session behavior switches.
    pub session: SessionOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            environment: BuildEnvironment::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            session: SessionOptions::default(),
        }
    }
}

impl Config {
    /// Websocket URL of the chat channel.
    pub fn chat_url(&self) -> Result<String, ClientError> {
        Ok(origin_from_base_url(&self.server)?.chat_url(self.environment))
    }
}
