use serde::Serialize;
use thiserror::Error;

/// Protocol keys understood by the device-side application.
///
/// Discriminants index into [`BINDINGS`], so both must stay in the same
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    SimFlag,
    SimPeriod,
    SimBits,
    TrMisoFlag,
    TrMosiMask,
    TrMosi,
    TrMisoMask,
    TrMiso,
}

impl ParamKey {
    pub const ALL: [ParamKey; 8] = [
        ParamKey::SimFlag,
        ParamKey::SimPeriod,
        ParamKey::SimBits,
        ParamKey::TrMisoFlag,
        ParamKey::TrMosiMask,
        ParamKey::TrMosi,
        ParamKey::TrMisoMask,
        ParamKey::TrMiso,
    ];

    pub fn protocol_key(self) -> &'static str {
        match self {
            ParamKey::SimFlag => "SPI_SIM_FLAG",
            ParamKey::SimPeriod => "SPI_SIM_PERIOD",
            ParamKey::SimBits => "SPI_SIM_BITS",
            ParamKey::TrMisoFlag => "SPI_TR_MISO_FLAG",
            ParamKey::TrMosiMask => "SPI_TR_MOSI_MASK",
            ParamKey::TrMosi => "SPI_TR_MOSI",
            ParamKey::TrMisoMask => "SPI_TR_MISO_MASK",
            ParamKey::TrMiso => "SPI_TR_MISO",
        }
    }

    pub fn from_protocol_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.protocol_key() == key)
    }

    pub fn binding(self) -> &'static Binding {
        &BINDINGS[self as usize]
    }
}

/// Value type a control produces for its parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Flag,
    Uint,
    Hex,
}

impl ParamKind {
    fn expects(self) -> &'static str {
        match self {
            ParamKind::Flag => "boolean",
            ParamKind::Uint => "unsigned integer",
            ParamKind::Hex => "hex string",
        }
    }
}

/// A typed parameter value as it travels to the device.
///
/// Serializes untagged, so a flag lands as a JSON bool, a count as a JSON
/// number, and a mask as a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Uint(u32),
    Hex(String),
}

/// A secondary panel region whose visibility follows a flag parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelRegion {
    SimDetail,
    MisoTriggerDetail,
}

/// One row of the field-to-protocol wiring table.
#[derive(Debug)]
pub struct Binding {
    pub key: ParamKey,
    pub kind: ParamKind,
    /// Region shown while the flag is set and hidden while it is clear.
    pub shows_region: Option<PanelRegion>,
    /// Whether the raw decimal value is also rendered as lower hex.
    pub hex_mirror: bool,
}

/// Wiring for every tracked parameter. Order matches [`ParamKey`]
/// discriminants.
pub const BINDINGS: &[Binding] = &[
    Binding {
        key: ParamKey::SimFlag,
        kind: ParamKind::Flag,
        shows_region: Some(PanelRegion::SimDetail),
        hex_mirror: false,
    },
    Binding {
        key: ParamKey::SimPeriod,
        kind: ParamKind::Uint,
        shows_region: None,
        hex_mirror: true,
    },
    Binding {
        key: ParamKey::SimBits,
        kind: ParamKind::Uint,
        shows_region: None,
        hex_mirror: false,
    },
    Binding {
        key: ParamKey::TrMisoFlag,
        kind: ParamKind::Flag,
        shows_region: Some(PanelRegion::MisoTriggerDetail),
        hex_mirror: false,
    },
    Binding {
        key: ParamKey::TrMosiMask,
        kind: ParamKind::Hex,
        shows_region: None,
        hex_mirror: false,
    },
    Binding {
        key: ParamKey::TrMosi,
        kind: ParamKind::Hex,
        shows_region: None,
        hex_mirror: false,
    },
    Binding {
        key: ParamKey::TrMisoMask,
        kind: ParamKind::Hex,
        shows_region: None,
        hex_mirror: false,
    },
    Binding {
        key: ParamKey::TrMiso,
        kind: ParamKind::Hex,
        shows_region: None,
        hex_mirror: false,
    },
];

/// Raw state read from a UI control at change time.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    Checked(bool),
    Text(String),
}

#[derive(Debug, Error)]
pub enum ParamError {
    #[error("unknown parameter key '{0}'")]
    UnknownKey(String),
    #[error("{key}: expected a {expected} value, got '{raw}'")]
    Coerce {
        key: &'static str,
        expected: &'static str,
        raw: String,
    },
}

/// Coerces a raw control reading into the declared value type.
///
/// Hex fields forward their text untouched; the device is the validator.
pub fn coerce(key: ParamKey, raw: &RawInput) -> Result<ParamValue, ParamError> {
    let kind = key.binding().kind;
    match (kind, raw) {
        (ParamKind::Flag, RawInput::Checked(state)) => Ok(ParamValue::Flag(*state)),
        (ParamKind::Flag, RawInput::Text(text)) => match text.trim() {
            "true" | "1" | "on" => Ok(ParamValue::Flag(true)),
            "false" | "0" | "off" => Ok(ParamValue::Flag(false)),
            other => Err(coerce_error(key, kind, other)),
        },
        (ParamKind::Uint, RawInput::Text(text)) => text
            .trim()
            .parse::<u32>()
            .map(ParamValue::Uint)
            .map_err(|_| coerce_error(key, kind, text)),
        (ParamKind::Hex, RawInput::Text(text)) => Ok(ParamValue::Hex(text.clone())),
        (_, RawInput::Checked(state)) => Err(coerce_error(key, kind, &state.to_string())),
    }
}

fn coerce_error(key: ParamKey, kind: ParamKind, raw: &str) -> ParamError {
    ParamError::Coerce {
        key: key.protocol_key(),
        expected: kind.expects(),
        raw: raw.to_string(),
    }
}

/// Local mirror of the device configuration. One owned instance travels
/// through the panel; nothing is shared or global.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub sim_flag: bool,
    pub sim_period: u32,
    pub sim_bits: u32,
    pub tr_miso_flag: bool,
    pub tr_mosi_mask: String,
    pub tr_mosi: String,
    pub tr_miso_mask: String,
    pub tr_miso: String,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            sim_flag: true,
            sim_period: 600,
            sim_bits: 16,
            tr_miso_flag: true,
            tr_mosi_mask: "FFFF".to_string(),
            tr_mosi: "33AA".to_string(),
            tr_miso_mask: "FFFF".to_string(),
            tr_miso: "3001".to_string(),
        }
    }
}

impl Parameters {
    pub fn get(&self, key: ParamKey) -> ParamValue {
        match key {
            ParamKey::SimFlag => ParamValue::Flag(self.sim_flag),
            ParamKey::SimPeriod => ParamValue::Uint(self.sim_period),
            ParamKey::SimBits => ParamValue::Uint(self.sim_bits),
            ParamKey::TrMisoFlag => ParamValue::Flag(self.tr_miso_flag),
            ParamKey::TrMosiMask => ParamValue::Hex(self.tr_mosi_mask.clone()),
            ParamKey::TrMosi => ParamValue::Hex(self.tr_mosi.clone()),
            ParamKey::TrMisoMask => ParamValue::Hex(self.tr_miso_mask.clone()),
            ParamKey::TrMiso => ParamValue::Hex(self.tr_miso.clone()),
        }
    }

    pub fn apply(&mut self, key: ParamKey, value: ParamValue) -> Result<(), ParamError> {
        match (key, value) {
            (ParamKey::SimFlag, ParamValue::Flag(state)) => self.sim_flag = state,
            (ParamKey::SimPeriod, ParamValue::Uint(period)) => self.sim_period = period,
            (ParamKey::SimBits, ParamValue::Uint(bits)) => self.sim_bits = bits,
            (ParamKey::TrMisoFlag, ParamValue::Flag(state)) => self.tr_miso_flag = state,
            (ParamKey::TrMosiMask, ParamValue::Hex(mask)) => self.tr_mosi_mask = mask,
            (ParamKey::TrMosi, ParamValue::Hex(pattern)) => self.tr_mosi = pattern,
            (ParamKey::TrMisoMask, ParamValue::Hex(mask)) => self.tr_miso_mask = mask,
            (ParamKey::TrMiso, ParamValue::Hex(pattern)) => self.tr_miso = pattern,
            (key, value) => {
                return Err(ParamError::Coerce {
                    key: key.protocol_key(),
                    expected: key.binding().kind.expects(),
                    raw: format!("{value:?}"),
                });
            }
        }
        Ok(())
    }
}
