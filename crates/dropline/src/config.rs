//! Server configuration.

use std::time::Duration;

/// Port the server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 8001;

/// Configuration for a [`DroplineServer`](crate::DroplineServer).
///
/// Sensible defaults are provided; override the fields you care about
/// through [`DroplineServerBuilder`](crate::DroplineServerBuilder).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on, e.g. `"0.0.0.0:8001"`.
    pub bind_addr: String,

    /// How long a new connection may take to send its `init` message
    /// before it is dropped. `None` waits forever.
    ///
    /// Only the first message is timed; once a connection plays or
    /// watches, it may stay idle indefinitely.
    pub init_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            init_timeout: Some(Duration::from_secs(30)),
        }
    }
}
