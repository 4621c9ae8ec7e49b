//! tessl.json dependency manifest.

use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// A declared tile dependency. `eval` is reserved for evaluation results and
/// is always empty here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TesslTile {
    pub name: String,
    pub version: String,
    pub eval: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    dependencies: BTreeMap<String, DependencySpec>,
}

#[derive(Debug, Default, Deserialize)]
struct DependencySpec {
    #[serde(default)]
    version: Option<String>,
}

/// Parse the `dependencies` map. Malformed JSON yields no tiles.
pub fn parse_tile_manifest(content: &str) -> Vec<TesslTile> {
    let manifest: Manifest = match serde_json::from_str(content) {
        Ok(manifest) => manifest,
        Err(err) => {
            tracing::debug!("ignoring malformed tile manifest: {err}");
            return Vec::new();
        }
    };
    manifest
        .dependencies
        .into_iter()
        .map(|(name, spec)| TesslTile {
            name,
            version: spec.version.unwrap_or_default(),
            eval: None,
        })
        .collect()
}
