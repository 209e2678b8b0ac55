use std::sync::Arc;
use thiserror::Error;

use crate::channel::{ChannelError, ChannelHandle};
use crate::params::{self, ParamError, ParamValue, Parameters};
use crate::params::{ParamKey, PanelRegion, RawInput};
use crate::protocol::UpdateEnvelope;

/// The one observable UI side channel: status text, dependent region
/// visibility, and the period's hex mirror. The rendering layer implements
/// this; the core never touches widgets directly.
pub trait PanelSurface: Send + Sync {
    fn set_status(&self, text: &str);
    fn set_region_visible(&self, region: PanelRegion, visible: bool);
    fn set_period_hex(&self, text: &str);
}

/// Surface for the headless binary: side effects land in the log stream
/// instead of on widgets.
#[derive(Debug, Default)]
pub struct LogSurface;

impl PanelSurface for LogSurface {
    fn set_status(&self, text: &str) {
        tracing::info!(target: "spitrig::panel", status = %text, "status message");
    }

    fn set_region_visible(&self, region: PanelRegion, visible: bool) {
        tracing::info!(target: "spitrig::panel", ?region, visible, "region visibility");
    }

    fn set_period_hex(&self, text: &str) {
        tracing::debug!(target: "spitrig::panel", hex = %text, "period hex mirror");
    }
}

#[derive(Debug, Error)]
pub enum PanelError {
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Binds the parameter mirror to the channel and the surface.
///
/// Every edit runs the same path for every field: coerce, store, apply
/// dependent UI rules, emit exactly one envelope. The wiring table in
/// [`crate::params::BINDINGS`] decides what the field needs.
pub struct Panel {
    params: Parameters,
    channel: ChannelHandle,
    surface: Arc<dyn PanelSurface>,
}

impl Panel {
    pub fn new(params: Parameters, channel: ChannelHandle, surface: Arc<dyn PanelSurface>) -> Self {
        Self {
            params,
            channel,
            surface,
        }
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Handles one change event from the control bound to `key`.
    ///
    /// The envelope goes out before this returns, so send order matches
    /// edit order. Each call emits exactly one envelope; a period field
    /// firing per keystroke sends one frame per keystroke.
    pub fn edit(&mut self, key: ParamKey, raw: RawInput) -> Result<(), PanelError> {
        let binding = key.binding();
        let value = params::coerce(key, &raw)?;
        self.params.apply(key, value.clone())?;

        if let (Some(region), ParamValue::Flag(visible)) = (binding.shows_region, &value) {
            self.surface.set_region_visible(region, *visible);
        }
        if binding.hex_mirror {
            if let ParamValue::Uint(period) = &value {
                self.surface.set_period_hex(&format!("{period:x}"));
            }
        }

        let envelope = UpdateEnvelope::single(key, value);
        self.channel.send(&envelope)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Surface that records every call for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingSurface {
        statuses: Mutex<Vec<String>>,
        regions: Mutex<Vec<(PanelRegion, bool)>>,
        period_hex: Mutex<Vec<String>>,
    }

    impl RecordingSurface {
        pub fn statuses(&self) -> Vec<String> {
            self.statuses.lock().unwrap().clone()
        }

        pub fn regions(&self) -> Vec<(PanelRegion, bool)> {
            self.regions.lock().unwrap().clone()
        }

        pub fn period_hex(&self) -> Vec<String> {
            self.period_hex.lock().unwrap().clone()
        }
    }

    impl PanelSurface for RecordingSurface {
        fn set_status(&self, text: &str) {
            self.statuses.lock().unwrap().push(text.to_string());
        }

        fn set_region_visible(&self, region: PanelRegion, visible: bool) {
            self.regions.lock().unwrap().push((region, visible));
        }

        fn set_period_hex(&self, text: &str) {
            self.period_hex.lock().unwrap().push(text.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSurface;
    use super::*;
    use crate::channel::{ChannelStatus, testing::handle_at};
    use serde_json::{Value, json};

    fn panel_with_captures() -> (
        Panel,
        tokio::sync::mpsc::UnboundedReceiver<String>,
        Arc<RecordingSurface>,
    ) {
        let (handle, frames) = handle_at(ChannelStatus::Open);
        let surface = Arc::new(RecordingSurface::default());
        let panel = Panel::new(Parameters::default(), handle, surface.clone());
        (panel, frames, surface)
    }

    fn decoded(frame: &str) -> Value {
        serde_json::from_str(frame).unwrap()
    }

    #[tokio::test]
    async fn each_edit_sends_exactly_one_envelope() {
        let (mut panel, mut frames, _surface) = panel_with_captures();

        panel
            .edit(ParamKey::TrMosi, RawInput::Text("AB12".into()))
            .unwrap();
        panel
            .edit(ParamKey::TrMosi, RawInput::Text("AB12".into()))
            .unwrap();

        assert_eq!(
            decoded(&frames.try_recv().unwrap()),
            json!({"parameters": {"SPI_TR_MOSI": {"value": "AB12"}}})
        );
        assert_eq!(
            decoded(&frames.try_recv().unwrap()),
            json!({"parameters": {"SPI_TR_MOSI": {"value": "AB12"}}})
        );
        assert!(frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn every_tracked_key_emits_only_its_own_entry() {
        let (mut panel, mut frames, _surface) = panel_with_captures();

        for key in ParamKey::ALL {
            let raw = match key.binding().kind {
                crate::params::ParamKind::Flag => RawInput::Checked(true),
                crate::params::ParamKind::Uint => RawInput::Text("42".into()),
                crate::params::ParamKind::Hex => RawInput::Text("FF07".into()),
            };
            panel.edit(key, raw).unwrap();

            let value = decoded(&frames.try_recv().unwrap());
            let parameters = value["parameters"].as_object().unwrap();
            assert_eq!(parameters.len(), 1);
            assert!(parameters.contains_key(key.protocol_key()));
        }
        assert!(frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn sim_flag_mirrors_visibility_on_every_toggle() {
        let (mut panel, mut frames, surface) = panel_with_captures();

        for checked in [false, true, false] {
            panel
                .edit(ParamKey::SimFlag, RawInput::Checked(checked))
                .unwrap();
            assert_eq!(panel.params().sim_flag, checked);
            let _ = frames.try_recv().unwrap();
        }

        assert_eq!(
            surface.regions(),
            vec![
                (PanelRegion::SimDetail, false),
                (PanelRegion::SimDetail, true),
                (PanelRegion::SimDetail, false),
            ]
        );
    }

    #[tokio::test]
    async fn miso_flag_drives_its_own_region() {
        let (mut panel, _frames, surface) = panel_with_captures();

        panel
            .edit(ParamKey::TrMisoFlag, RawInput::Checked(false))
            .unwrap();

        assert_eq!(surface.regions(), vec![(PanelRegion::MisoTriggerDetail, false)]);
    }

    #[tokio::test]
    async fn period_renders_hex_mirror() {
        let (mut panel, mut frames, surface) = panel_with_captures();

        panel
            .edit(ParamKey::SimPeriod, RawInput::Text("600".into()))
            .unwrap();
        panel
            .edit(ParamKey::SimPeriod, RawInput::Text("0".into()))
            .unwrap();

        assert_eq!(surface.period_hex(), vec!["258".to_string(), "0".to_string()]);
        assert_eq!(
            decoded(&frames.try_recv().unwrap()),
            json!({"parameters": {"SPI_SIM_PERIOD": {"value": 600}}})
        );
        assert_eq!(
            decoded(&frames.try_recv().unwrap()),
            json!({"parameters": {"SPI_SIM_PERIOD": {"value": 0}}})
        );
    }

    #[tokio::test]
    async fn bits_edit_has_no_dependent_behavior() {
        let (mut panel, mut frames, surface) = panel_with_captures();

        panel
            .edit(ParamKey::SimBits, RawInput::Text("32".into()))
            .unwrap();

        assert_eq!(panel.params().sim_bits, 32);
        assert!(surface.regions().is_empty());
        assert!(surface.period_hex().is_empty());
        assert_eq!(
            decoded(&frames.try_recv().unwrap()),
            json!({"parameters": {"SPI_SIM_BITS": {"value": 32}}})
        );
    }

    #[tokio::test]
    async fn malformed_hex_is_forwarded_as_is() {
        let (mut panel, mut frames, _surface) = panel_with_captures();

        panel
            .edit(ParamKey::TrMisoMask, RawInput::Text("ZZZZ".into()))
            .unwrap();

        assert_eq!(
            decoded(&frames.try_recv().unwrap()),
            json!({"parameters": {"SPI_TR_MISO_MASK": {"value": "ZZZZ"}}})
        );
    }

    #[tokio::test]
    async fn malformed_integer_sends_nothing() {
        let (mut panel, mut frames, _surface) = panel_with_captures();

        let err = panel
            .edit(ParamKey::SimPeriod, RawInput::Text("abc".into()))
            .unwrap_err();

        assert!(matches!(err, PanelError::Param(_)));
        assert_eq!(panel.params().sim_period, 600);
        assert!(frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn edit_on_unopened_channel_is_refused() {
        let (handle, mut frames) = handle_at(ChannelStatus::Connecting);
        let surface = Arc::new(RecordingSurface::default());
        let mut panel = Panel::new(Parameters::default(), handle, surface);

        let err = panel
            .edit(ParamKey::TrMosi, RawInput::Text("AB12".into()))
            .unwrap_err();

        assert!(matches!(err, PanelError::Channel(ChannelError::NotOpen)));
        assert!(frames.try_recv().is_err());
    }
}
