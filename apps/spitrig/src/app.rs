use std::io;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncBufReadExt;

use crate::channel::{ChannelConfig, ChannelError, ChannelManager};
use crate::config::Config;
use crate::panel::{LogSurface, Panel, PanelSurface};
use crate::params::{ParamError, ParamKey, Parameters, RawInput};
use crate::session::{BootstrapSequencer, SessionConfig, SessionError};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("{0}")]
    Channel(#[from] ChannelError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Starts the session, connects the channel, then forwards edits read from
/// stdin as `KEY=VALUE` lines until EOF.
pub async fn run(config: Config) -> Result<(), CliError> {
    let surface: Arc<dyn PanelSurface> = Arc::new(LogSurface);

    let session_config = SessionConfig::new(&config.session_server, config.app_id.clone())?
        .with_extra_query(config.extra_query.clone());
    let sequencer = BootstrapSequencer::new(session_config)?;
    // Unbounded policy: this resolves only once the session has started.
    sequencer.run().await?;

    let channel_config = ChannelConfig::new(config.channel_host(), config.channel_port);
    let manager = ChannelManager::connect(&channel_config, surface.clone()).await?;

    let mut panel = Panel::new(Parameters::default(), manager.handle(), surface);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_edit(line) {
            Ok((key, raw)) => {
                if let Err(err) = panel.edit(key, raw) {
                    tracing::warn!(target: "spitrig", error = %err, "edit rejected");
                }
            }
            Err(err) => {
                tracing::warn!(target: "spitrig", error = %err, line, "unparseable edit");
            }
        }
    }

    Ok(())
}

/// Parses one `KEY=VALUE` edit line into a tracked key and its raw input.
fn parse_edit(line: &str) -> Result<(ParamKey, RawInput), ParamError> {
    let (key, value) = line
        .split_once('=')
        .ok_or_else(|| ParamError::UnknownKey(line.to_string()))?;
    let key = key.trim();
    let key = ParamKey::from_protocol_key(key)
        .ok_or_else(|| ParamError::UnknownKey(key.to_string()))?;
    Ok((key, RawInput::Text(value.trim().to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    #[test]
    fn parses_key_value_lines() {
        let (key, raw) = parse_edit("SPI_TR_MOSI=AB12").unwrap();
        assert_eq!(key, ParamKey::TrMosi);
        assert_eq!(raw, RawInput::Text("AB12".into()));

        let (key, raw) = parse_edit(" SPI_SIM_FLAG = true ").unwrap();
        assert_eq!(key, ParamKey::SimFlag);
        assert_eq!(
            crate::params::coerce(key, &raw).unwrap(),
            ParamValue::Flag(true)
        );
    }

    #[test]
    fn rejects_unknown_keys_and_bare_lines() {
        assert!(matches!(
            parse_edit("SPI_BOGUS=1"),
            Err(ParamError::UnknownKey(_))
        ));
        assert!(matches!(
            parse_edit("just a line"),
            Err(ParamError::UnknownKey(_))
        ));
    }
}
