use clap::{Args, Parser};

use crate::config::Config;
use crate::telemetry::logging::{LogConfig, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "spitrig",
    about = "Control panel client for the SPI bus trigger/simulator",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "SPITRIG_SESSION_SERVER",
        default_value = "127.0.0.1",
        help = "Address of the device session broker"
    )]
    pub session_server: String,

    #[arg(
        long,
        env = "SPITRIG_APP_ID",
        default_value = "SpiTrig",
        help = "Application id started through the broker's bazaar"
    )]
    pub app_id: String,

    #[arg(
        long = "start-query",
        env = "SPITRIG_START_QUERY",
        value_name = "QUERY",
        help = "Extra query string forwarded to the start endpoint"
    )]
    pub start_query: Option<String>,

    #[arg(
        long = "channel-host",
        env = "SPITRIG_CHANNEL_HOST",
        value_name = "HOST",
        help = "Host serving the realtime channel (defaults to the broker host)"
    )]
    pub channel_host: Option<String>,

    #[arg(
        long = "channel-port",
        env = "SPITRIG_CHANNEL_PORT",
        default_value_t = crate::channel::ChannelConfig::DEFAULT_PORT,
        help = "Port of the realtime parameter channel"
    )]
    pub channel_port: u16,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        value_enum,
        env = "SPITRIG_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        env = "SPITRIG_LOG_FILE",
        help = "Write structured logs to the specified file"
    )]
    pub file: Option<std::path::PathBuf>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}

impl Cli {
    pub fn to_config(&self) -> Config {
        Config {
            session_server: self.session_server.clone(),
            app_id: self.app_id.clone(),
            extra_query: self.start_query.clone().filter(|q| !q.is_empty()),
            channel_host: self.channel_host.clone().filter(|h| !h.is_empty()),
            channel_port: self.channel_port,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_the_device_itself() {
        let cli = Cli::parse_from(["spitrig"]);
        let config = cli.to_config();
        assert_eq!(config.session_server, "127.0.0.1");
        assert_eq!(config.app_id, "SpiTrig");
        assert_eq!(config.channel_port, 9002);
        assert_eq!(cli.logging.level, LogLevel::Warn);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "spitrig",
            "--session-server",
            "192.168.1.100",
            "--channel-port",
            "9102",
            "--log-level",
            "debug",
        ]);
        let config = cli.to_config();
        assert_eq!(config.session_server, "192.168.1.100");
        assert_eq!(config.channel_port, 9102);
        assert_eq!(cli.logging.level, LogLevel::Debug);
    }
}
