pub mod logging {
    use clap::ValueEnum;
    use std::fmt::Write as _;
    use std::fs::OpenOptions;
    use std::path::PathBuf;
    use tracing_appender::non_blocking::WorkerGuard;
    use tracing_subscriber::EnvFilter;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
    pub enum LogLevel {
        Error,
        #[default]
        Warn,
        Info,
        Debug,
        Trace,
    }

    impl LogLevel {
        pub fn as_str(self) -> &'static str {
            match self {
                LogLevel::Error => "error",
                LogLevel::Warn => "warn",
                LogLevel::Info => "info",
                LogLevel::Debug => "debug",
                LogLevel::Trace => "trace",
            }
        }

        fn verbose(self) -> bool {
            matches!(self, LogLevel::Debug | LogLevel::Trace)
        }
    }

    #[derive(Clone, Debug, Default)]
    pub struct LogConfig {
        pub level: LogLevel,
        pub file: Option<PathBuf>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum InitError {
        #[error("cannot open log file {path:?}: {source}")]
        LogFile {
            path: PathBuf,
            source: std::io::Error,
        },
        #[error("logger already installed: {0}")]
        Install(String),
    }

    /// Keeps the non-blocking writer flushing. The binary holds this for
    /// the life of the process; dropping it loses buffered lines.
    pub struct LogGuard {
        _worker: WorkerGuard,
    }

    /// Installs the global subscriber, writing to stderr or the configured
    /// file. `SPITRIG_LOG_FILTER` replaces the computed filter with a raw
    /// tracing directive string.
    pub fn init(config: &LogConfig) -> Result<LogGuard, InitError> {
        let (writer, worker) = match &config.file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| InitError::LogFile {
                        path: path.clone(),
                        source,
                    })?;
                tracing_appender::non_blocking(file)
            }
            None => tracing_appender::non_blocking(std::io::stderr()),
        };

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(directives(config.level)))
            .with_target(config.level.verbose())
            .with_ansi(config.file.is_none())
            .with_writer(writer)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|err| InitError::Install(err.to_string()))?;

        Ok(LogGuard { _worker: worker })
    }

    fn directives(level: LogLevel) -> String {
        build_directives(
            level,
            std::env::var("SPITRIG_LOG_FILTER").ok(),
            std::env::var_os("SPITRIG_TRACE_DEPS").is_some(),
        )
    }

    fn build_directives(level: LogLevel, custom: Option<String>, trace_deps: bool) -> String {
        if let Some(custom) = custom {
            return custom;
        }
        let own = level.as_str();
        if level.verbose() && !trace_deps {
            // Verbose runs pin the HTTP and WebSocket stacks to info;
            // below that they bury the panel's own frames.
            format!("info,spitrig={own},spitrig_core={own}")
        } else {
            own.to_owned()
        }
    }

    /// One-line preview of an inbound frame for trace logs. Frames are
    /// JSON text in practice, so printable ASCII passes through and
    /// anything else becomes a `\xNN` escape; long frames are cut off.
    pub fn frame_preview(bytes: &[u8]) -> String {
        const CUTOFF: usize = 256;
        let mut out = String::with_capacity(bytes.len().min(CUTOFF));
        for &byte in bytes.iter().take(CUTOFF) {
            match byte {
                b' '..=b'~' => out.push(byte as char),
                _ => {
                    let _ = write!(out, "\\x{byte:02x}");
                }
            }
        }
        if bytes.len() > CUTOFF {
            let _ = write!(out, " [+{} bytes]", bytes.len() - CUTOFF);
        }
        out
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn quiet_levels_use_one_directive() {
            assert_eq!(build_directives(LogLevel::Warn, None, false), "warn");
            assert_eq!(build_directives(LogLevel::Info, None, false), "info");
        }

        #[test]
        fn verbose_levels_pin_dependencies_to_info() {
            assert_eq!(
                build_directives(LogLevel::Trace, None, false),
                "info,spitrig=trace,spitrig_core=trace"
            );
            assert_eq!(build_directives(LogLevel::Trace, None, true), "trace");
        }

        #[test]
        fn custom_filter_wins() {
            assert_eq!(
                build_directives(LogLevel::Warn, Some("spitrig_core=debug".into()), false),
                "spitrig_core=debug"
            );
        }

        #[test]
        fn frame_preview_passes_json_through() {
            let frame = br#"{"parameters":{"SPI_SIM_BITS":{"value":16}}}"#;
            assert_eq!(frame_preview(frame), String::from_utf8_lossy(frame));
        }

        #[test]
        fn frame_preview_escapes_binary() {
            assert_eq!(frame_preview(&[0x00, b'A', 0xff]), "\\x00A\\xff");
        }

        #[test]
        fn frame_preview_truncates_long_frames() {
            let long = vec![b'a'; 300];
            let preview = frame_preview(&long);
            assert!(preview.starts_with(&"a".repeat(256)));
            assert!(preview.ends_with("[+44 bytes]"));
        }
    }
}
