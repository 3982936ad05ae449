//! The script component an object carries to run a graph asset.

use crate::error::{DecodeError, GraphError};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Asset index written when the referenced graph is not part of the build.
pub const MISSING_ASSET_INDEX: u16 = 0xDEAD;

/// Editor-side properties of a script component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScriptComponent {
    /// UUID of the graph asset to run.
    pub asset: u64,
    /// Start the script as soon as the object spawns.
    pub auto_run: bool,
    /// Allow the script to be started again once it has finished.
    pub repeatable: bool,
}

impl Default for ScriptComponent {
    fn default() -> Self {
        Self {
            asset: 0,
            auto_run: true,
            repeatable: false,
        }
    }
}

impl ScriptComponent {
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        serde_json::from_str(json).map_err(|e| GraphError::Json(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        serde_json::to_string(self).map_err(|e| GraphError::Json(e.to_string()))
    }

    /// Resolves the asset against the build's UUID to index table. An unknown asset is
    /// logged and replaced by `MISSING_ASSET_INDEX` so the rest of the scene still builds.
    pub fn build(&self, asset_indices: &AHashMap<u64, u16>) -> ComponentRecord {
        let asset_index = match asset_indices.get(&self.asset) {
            Some(&index) => index,
            None => {
                error!("Script component: asset UUID {:016X} not found", self.asset);
                MISSING_ASSET_INDEX
            }
        };
        ComponentRecord {
            asset_index,
            auto_run: self.auto_run,
            repeatable: self.repeatable,
        }
    }
}

/// The packed form of a script component, as loaded by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub asset_index: u16,
    pub auto_run: bool,
    pub repeatable: bool,
}

impl ComponentRecord {
    pub const LEN: usize = 4;

    pub fn is_resolved(&self) -> bool {
        self.asset_index != MISSING_ASSET_INDEX
    }

    /// `u16 asset_index, u8 auto_run, u8 repeatable`, big-endian.
    pub fn encode(&self) -> [u8; Self::LEN] {
        let [hi, lo] = self.asset_index.to_be_bytes();
        [hi, lo, self.auto_run as u8, self.repeatable as u8]
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        match bytes {
            [hi, lo, auto_run, repeatable, ..] => Ok(Self {
                asset_index: u16::from_be_bytes([*hi, *lo]),
                auto_run: *auto_run != 0,
                repeatable: *repeatable != 0,
            }),
            _ => Err(DecodeError::Truncated {
                offset: bytes.len(),
                what: "script component",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_keys() {
        let comp = ScriptComponent::from_json(r#"{ "asset": 12 }"#).unwrap();
        assert_eq!(comp.asset, 12);
        assert!(comp.auto_run);
        assert!(!comp.repeatable);

        let json = comp.to_json().unwrap();
        assert!(json.contains("\"autoRun\":true"));
    }

    #[test]
    fn unknown_asset_gets_the_sentinel() {
        let mut indices = AHashMap::new();
        indices.insert(7u64, 3u16);

        let found = ScriptComponent {
            asset: 7,
            ..Default::default()
        }
        .build(&indices);
        assert_eq!(found.asset_index, 3);
        assert!(found.is_resolved());

        let missing = ScriptComponent {
            asset: 8,
            auto_run: false,
            repeatable: true,
        }
        .build(&indices);
        assert_eq!(missing.encode(), [0xDE, 0xAD, 0, 1]);
        assert!(!missing.is_resolved());
    }

    #[test]
    fn record_decodes_what_it_encodes() {
        let record = ComponentRecord {
            asset_index: 0x0102,
            auto_run: true,
            repeatable: false,
        };
        assert_eq!(ComponentRecord::decode(&record.encode()), Ok(record));
        assert!(ComponentRecord::decode(&[1, 2]).is_err());
    }
}
