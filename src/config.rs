//! Configuration for the Iggy dissector
//!
//! Centralized configuration with sensible defaults.

/// Default TCP port of an Iggy server
pub const DEFAULT_SERVER_PORT: u16 = 8090;

/// Main configuration for a dissector instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// TCP port of the server endpoint.
    /// Traffic towards it is a request, traffic from it is a response.
    pub server_port: u16,

    /// Largest length field accepted before framing gives up (in bytes)
    pub max_message_size: u32,

    /// Attach a diagnostic when a payload decoder consumes a different
    /// number of bytes than the header declared
    pub check_payload_length: bool,

    // -------------------------------------------------------------------------
    // Tap Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address of the tap
    pub listen_addr: String,

    /// Address of the real server the tap forwards to
    pub upstream_addr: String,

    /// Max concurrent tapped connections
    pub max_connections: usize,

    /// Socket read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Socket write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_SERVER_PORT,
            max_message_size: 64 * 1024 * 1024, // 64 MB
            check_payload_length: true,
            listen_addr: "127.0.0.1:8091".to_string(),
            upstream_addr: format!("127.0.0.1:{}", DEFAULT_SERVER_PORT),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the server port used to classify direction
    pub fn server_port(mut self, port: u16) -> Self {
        self.config.server_port = port;
        self
    }

    /// Set the maximum accepted message length (in bytes)
    pub fn max_message_size(mut self, size: u32) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// Enable or disable the payload consumption check
    pub fn check_payload_length(mut self, enabled: bool) -> Self {
        self.config.check_payload_length = enabled;
        self
    }

    /// Set the tap listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the upstream server address
    pub fn upstream_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.upstream_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
