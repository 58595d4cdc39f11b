//! Instrument descriptor: the nested region tree a sampler is built from.
//!
//! ```json
//! {
//!   "instrument": {
//!     "control": { "opcodes": { "default_path": "piano/" } },
//!     "regions": [
//!       { "opcodes": { "volume": -3 }, "regions": [
//!         { "opcodes": { "sample": "C4.wav", "lokey": 58, "hikey": 62 } }
//!       ] }
//!     ]
//!   }
//! }
//! ```

use crate::error::Result;
use crate::opcodes::Opcodes;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level descriptor document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentDescriptor {
    pub instrument: Instrument,
}

/// An instrument: control settings plus the region tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    #[serde(default)]
    pub control: Control,
    /// Top-level tree nodes. `null` entries are accepted and skipped.
    #[serde(default)]
    pub regions: Vec<Option<RegionNode>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Control {
    #[serde(default)]
    pub opcodes: ControlOpcodes,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlOpcodes {
    /// Directory prefix for every sample reference.
    #[serde(default)]
    pub default_path: String,
}

/// One node of the region tree.
///
/// A node with `regions` is a group whose opcodes are inherited by its
/// children; a node without is a leaf region.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionNode {
    #[serde(default)]
    pub opcodes: Opcodes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<Option<RegionNode>>>,
}

impl RegionNode {
    /// Create a leaf node.
    pub fn leaf(opcodes: Opcodes) -> Self {
        Self {
            opcodes,
            regions: None,
        }
    }

    /// Create a group node.
    pub fn group(opcodes: Opcodes, children: Vec<RegionNode>) -> Self {
        Self {
            opcodes,
            regions: Some(children.into_iter().map(Some).collect()),
        }
    }
}

impl InstrumentDescriptor {
    /// Build a descriptor from a default path and top-level nodes.
    pub fn new(default_path: impl Into<String>, regions: Vec<RegionNode>) -> Self {
        Self {
            instrument: Instrument {
                control: Control {
                    opcodes: ControlOpcodes {
                        default_path: default_path.into(),
                    },
                },
                regions: regions.into_iter().map(Some).collect(),
            },
        }
    }

    /// Parse a descriptor from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a descriptor from a file.
    ///
    /// Files with an `.sfz` extension go through the SFZ front-end, anything
    /// else is read as JSON.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_sfz = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("sfz"))
            .unwrap_or(false);
        if is_sfz {
            crate::parser::parse_sfz_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Directory prefix for every sample reference.
    pub fn default_path(&self) -> &str {
        &self.instrument.control.opcodes.default_path
    }

    /// Base URL that every sample reference is appended to.
    pub fn base_url(&self) -> String {
        format!("/{}", self.default_path())
    }
}
