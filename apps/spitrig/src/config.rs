use std::env;
#[cfg(test)]
use std::sync::Mutex;

/// Control-panel client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address of the device session broker (defaults to the device itself)
    pub session_server: String,
    /// Application id started through the broker's bazaar
    pub app_id: String,
    /// Query string forwarded verbatim to the start endpoint
    pub extra_query: Option<String>,
    /// Host serving the realtime channel; defaults to the broker host
    pub channel_host: Option<String>,
    /// Port of the realtime parameter channel
    pub channel_port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let server =
            env::var("SPITRIG_SESSION_SERVER").unwrap_or_else(|_| "127.0.0.1".to_string());
        // Normalize localhost to IPv4 to avoid IPv6 (::1) preference on macOS
        let server = if server.starts_with("localhost") {
            server.replacen("localhost", "127.0.0.1", 1)
        } else {
            server
        };
        let app_id = env::var("SPITRIG_APP_ID").unwrap_or_else(|_| "SpiTrig".to_string());
        let extra_query = env::var("SPITRIG_START_QUERY").ok().filter(|q| !q.is_empty());
        let channel_host = env::var("SPITRIG_CHANNEL_HOST").ok().filter(|h| !h.is_empty());
        let channel_port = env::var("SPITRIG_CHANNEL_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(crate::channel::ChannelConfig::DEFAULT_PORT);
        Self {
            session_server: server,
            app_id,
            extra_query,
            channel_host,
            channel_port,
        }
    }

    /// Host carrying the realtime channel: the configured override, or the
    /// broker's host with any scheme, port, and path stripped.
    pub fn channel_host(&self) -> String {
        if let Some(host) = &self.channel_host {
            return host.clone();
        }
        host_of(&self.session_server)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_server: "127.0.0.1".to_string(),
            app_id: "SpiTrig".to_string(),
            extra_query: None,
            channel_host: None,
            channel_port: crate::channel::ChannelConfig::DEFAULT_PORT,
        }
    }
}

fn host_of(server: &str) -> String {
    let without_scheme = server
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(server);
    let without_path = without_scheme
        .split_once('/')
        .map(|(host, _)| host)
        .unwrap_or(without_scheme);
    let without_port = without_path
        .rsplit_once(':')
        .map(|(host, _)| host)
        .unwrap_or(without_path);
    without_port.to_string()
}
