//! Versioned on-disk model format.
//!
//! A saved model is the parameter copy the training loop already produces
//! (`Parameters`, rows per neuron) plus the dew-point range needed to read outputs in °C.
//! Internal `Layer` storage is never serialized directly, so the file format stays put
//! if the in-memory layout changes.
//!
//! Loading validates the format version, the shapes against the fixed architecture, and
//! that every value is finite.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dewpoint::TargetRange;
use crate::snapshot::Parameters;
use crate::{Error, Network, Result};

pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedModel {
    pub format_version: u32,
    pub parameters: Parameters,
    /// Present when the model was trained on a generated dew-point corpus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_range: Option<TargetRange>,
}

impl SavedModel {
    pub fn new(network: &Network, target_range: Option<TargetRange>) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            parameters: network.parameters(),
            target_range,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "unsupported model format_version {}; expected {MODEL_FORMAT_VERSION}",
                self.format_version
            )));
        }
        if let Some(range) = self.target_range {
            if !(range.min.is_finite() && range.max.is_finite()) || range.min > range.max {
                return Err(Error::InvalidData(format!(
                    "invalid target range [{}, {}]",
                    range.min, range.max
                )));
            }
        }
        // Shape and finiteness checks live in one place.
        Network::from_parameters(&self.parameters).map(|_| ())
    }

    pub fn into_network(self) -> Result<Network> {
        self.validate()?;
        Network::from_parameters(&self.parameters)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(s)?;
        model.validate()?;
        Ok(model)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }
}
