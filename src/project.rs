//! Project manifest: the list of graph assets a build covers.

use crate::compiler::GraphAsset;
use crate::error::ArtifactError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEntry {
    pub uuid: u64,
    pub name: String,
    /// Path of the graph JSON, relative to the manifest.
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectManifest {
    #[serde(default)]
    pub graphs: Vec<GraphEntry>,
}

impl ProjectManifest {
    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        serde_json::from_str(json).map_err(|e| ArtifactError::Decode(e.to_string()))
    }

    pub fn from_file(path: &str) -> Result<Self, ArtifactError> {
        Self::from_json(&read(Path::new(path))?)
    }

    /// Reads every listed graph, resolving paths against `base_dir`.
    pub fn load_assets(&self, base_dir: &Path) -> Result<Vec<GraphAsset>, ArtifactError> {
        self.graphs
            .iter()
            .map(|entry| {
                Ok(GraphAsset {
                    uuid: entry.uuid,
                    name: entry.name.clone(),
                    json: read(&base_dir.join(&entry.path))?,
                })
            })
            .collect()
    }
}

fn read(path: &Path) -> Result<String, ArtifactError> {
    fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_manifest() {
        let manifest = ProjectManifest::from_json(
            r#"{ "graphs": [ { "uuid": 5, "name": "door", "path": "graphs/door.json" } ] }"#,
        )
        .unwrap();
        assert_eq!(manifest.graphs.len(), 1);
        assert_eq!(manifest.graphs[0].name, "door");

        let err = manifest.load_assets(Path::new("/nonexistent")).unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }
}
