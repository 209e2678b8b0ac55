use serde::Serialize;
use std::collections::BTreeMap;

use crate::params::{ParamKey, ParamValue};

/// Wire envelope for one parameter update:
/// `{"parameters":{"<KEY>":{"value":<bool|number|string>}}}`.
///
/// One key per envelope. Rapid successive edits each produce their own
/// envelope; nothing is batched or coalesced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateEnvelope {
    parameters: BTreeMap<&'static str, ParamSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ParamSlot {
    value: ParamValue,
}

impl UpdateEnvelope {
    pub fn single(key: ParamKey, value: ParamValue) -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert(key.protocol_key(), ParamSlot { value });
        Self { parameters }
    }

    /// Renders the envelope as the text frame that goes on the wire.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
