//! Shapes of the JSON a registry's package metadata endpoint returns.
//!
//! Grounded on pacquet's `package.rs`/`package_version.rs`/
//! `package_distribution.rs`, collapsed into the subset this rewrite
//! resolves against plus the `os`/`cpu` arrays platform filtering needs
//! (pacquet's own snapshot never modeled those).

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: HashMap<String, String>,
    pub versions: HashMap<String, VersionMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionMetadata {
    pub name: String,
    pub version: node_semver::Version,
    pub dist: Dist,
    #[serde(default)]
    pub dependencies: HashMap<String, String>,
    #[serde(rename = "devDependencies", default)]
    pub dev_dependencies: HashMap<String, String>,
    #[serde(rename = "peerDependencies", default)]
    pub peer_dependencies: HashMap<String, String>,
    #[serde(rename = "peerDependenciesMeta", default)]
    pub peer_dependencies_meta: HashMap<String, PeerDependencyMeta>,
    #[serde(rename = "optionalDependencies", default)]
    pub optional_dependencies: HashMap<String, String>,
    /// Platforms this version is allowed to install on, npm's `os` field.
    /// `None` means no restriction.
    pub os: Option<Vec<String>>,
    /// CPU architectures this version is allowed to install on.
    pub cpu: Option<Vec<String>>,
    #[serde(default)]
    pub bin: Bin,
    #[serde(default)]
    pub scripts: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeerDependencyMeta {
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dist {
    pub integrity: Option<String>,
    pub shasum: Option<String>,
    pub tarball: String,
}

/// npm's `bin` field is either a single string (the package's own name is
/// the bin name) or a map of bin name to script path.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
pub enum Bin {
    #[default]
    None,
    Single(String),
    Map(HashMap<String, String>),
}

impl VersionMetadata {
    /// Normalize [`Bin`] into `(shim name, script path)` pairs, resolving
    /// the single-string form against the package's own name.
    pub fn bin_entries(&self) -> Vec<(String, String)> {
        match &self.bin {
            Bin::None => Vec::new(),
            Bin::Single(path) => {
                let shim_name = self.name.rsplit('/').next().unwrap_or(&self.name);
                vec![(shim_name.to_string(), path.clone())]
            }
            Bin::Map(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_single_string_bin() {
        let metadata: VersionMetadata = serde_json::from_value(serde_json::json!({
            "name": "left-pad",
            "version": "1.3.0",
            "dist": { "tarball": "https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz" },
            "bin": "bin/left-pad.js",
        }))
        .unwrap();
        assert_eq!(metadata.bin_entries(), vec![("left-pad".to_string(), "bin/left-pad.js".to_string())]);
    }

    #[test]
    fn deserializes_map_bin() {
        let metadata: VersionMetadata = serde_json::from_value(serde_json::json!({
            "name": "foo",
            "version": "1.0.0",
            "dist": { "tarball": "https://registry.npmjs.org/foo/-/foo-1.0.0.tgz" },
            "bin": { "foo": "cli.js", "foo2": "cli2.js" },
        }))
        .unwrap();
        let mut entries = metadata.bin_entries();
        entries.sort();
        assert_eq!(
            entries,
            vec![("foo".to_string(), "cli.js".to_string()), ("foo2".to_string(), "cli2.js".to_string())]
        );
    }

    #[test]
    fn missing_bin_is_empty() {
        let metadata: VersionMetadata = serde_json::from_value(serde_json::json!({
            "name": "foo",
            "version": "1.0.0",
            "dist": { "tarball": "https://registry.npmjs.org/foo/-/foo-1.0.0.tgz" },
        }))
        .unwrap();
        assert!(metadata.bin_entries().is_empty());
    }
}
