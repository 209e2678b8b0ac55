/// Configuration for the realtime parameter channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Host carrying the channel, normally the device the panel talks to.
    /// A value containing `://` is taken as a full URL override.
    pub host: String,
    /// Channel port on the device.
    pub port: u16,
    /// Whether to use TLS (wss:// vs ws://).
    pub use_tls: bool,
}

impl ChannelConfig {
    /// The device firmware serves the parameter channel on this port.
    pub const DEFAULT_PORT: u16 = 9002;

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            use_tls: false,
        }
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Builds the full channel URL.
    pub fn build_url(&self) -> String {
        if self.host.contains("://") {
            return self.host.clone();
        }

        // Normalize localhost to avoid IPv6 issues
        let host = if self.host == "localhost" {
            "127.0.0.1"
        } else {
            self.host.as_str()
        };

        let scheme = if self.use_tls { "wss" } else { "ws" };
        format!("{scheme}://{host}:{port}", port = self.port)
    }
}
