//! Read, merge, and write `package.json`.
//!
//! Grounded on pacquet's `pacquet-package-manifest`, which keeps the
//! parsed document as a raw `serde_json::Value` rather than a typed struct
//! so that fields this rewrite doesn't understand (`description`, `license`,
//! `keywords`, ...) round-trip untouched. The core only reads and writes
//! `name`, `version`, `scripts`, `dependencies`, `devDependencies`, and
//! `publishConfig.registry`; every other key must survive a write unmodified.

mod error;

pub use error::ManifestError;

use serde_json::{json, Map, Value};
use std::{fs, path::Path};

pub const MANIFEST_FILE_NAME: &str = "package.json";

/// Which dependency map a direct package belongs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyGroup {
    Prod,
    Dev,
}

impl DependencyGroup {
    fn key(self) -> &'static str {
        match self {
            DependencyGroup::Prod => "dependencies",
            DependencyGroup::Dev => "devDependencies",
        }
    }
}

/// An in-memory `package.json`, backed by its path for a later [`Manifest::write`].
#[derive(Debug, Clone)]
pub struct Manifest {
    path: std::path::PathBuf,
    value: Value,
}

impl Manifest {
    /// Load `<project_dir>/package.json`, defaulting to an empty manifest
    /// (`{dependencies:{}, devDependencies:{}}`) if the file does not exist.
    pub fn load(project_dir: &Path) -> Result<Self, ManifestError> {
        let path = project_dir.join(MANIFEST_FILE_NAME);
        let value = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|error| ManifestError::Parse { path: path.clone(), error })?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => default_value(),
            Err(error) => return Err(ManifestError::Read { path: path.clone(), error }),
        };
        Ok(Manifest { path, value })
    }

    /// Create `<project_dir>/package.json` with a minimal default shape,
    /// failing if it already exists.
    pub fn init(project_dir: &Path) -> Result<Self, ManifestError> {
        let path = project_dir.join(MANIFEST_FILE_NAME);
        if path.exists() {
            return Err(ManifestError::AlreadyExists { path });
        }
        let name = project_dir.file_name().and_then(|n| n.to_str()).unwrap_or("project").to_string();
        let value = json!({
            "name": name,
            "version": "1.0.0",
            "scripts": {
                "test": "echo \"Error: no test specified\" && exit 1"
            },
        });
        let manifest = Manifest { path, value };
        manifest.write()?;
        Ok(manifest)
    }

    fn object(&self) -> &Map<String, Value> {
        self.value.as_object().expect("manifest root is always an object")
    }

    fn object_mut(&mut self) -> &mut Map<String, Value> {
        self.value.as_object_mut().expect("manifest root is always an object")
    }

    pub fn name(&self) -> Option<&str> {
        self.object().get("name").and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.object().get("version").and_then(Value::as_str)
    }

    /// `scripts.<name>`, if declared.
    pub fn script(&self, name: &str) -> Option<&str> {
        self.object().get("scripts")?.as_object()?.get(name)?.as_str()
    }

    /// `publishConfig.registry`, if declared.
    pub fn publish_registry(&self) -> Option<&str> {
        self.object().get("publishConfig")?.as_object()?.get("registry")?.as_str()
    }

    /// The `(name, range)` entries of `dependencies` or `devDependencies`,
    /// in their on-disk insertion order.
    pub fn dependencies(&self, group: DependencyGroup) -> Vec<(String, String)> {
        self.object()
            .get(group.key())
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every direct dependency name across both groups.
    pub fn all_dependency_names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.dependencies(DependencyGroup::Prod).into_iter().map(|(name, _)| name).collect();
        names.extend(self.dependencies(DependencyGroup::Dev).into_iter().map(|(name, _)| name));
        names
    }

    /// Record `name -> range` under `group`, creating the map if absent.
    /// Overwrites an existing entry for `name` in place; appends otherwise.
    pub fn set_dependency(&mut self, group: DependencyGroup, name: &str, range: &str) {
        let key = group.key();
        let entry = self.object_mut().entry(key).or_insert_with(|| Value::Object(Map::new()));
        let map = entry.as_object_mut().expect("dependency maps are always objects");
        map.insert(name.to_string(), Value::String(range.to_string()));
    }

    /// Remove `name` from `group`'s dependency map. Returns `true` if it was present.
    pub fn remove_dependency(&mut self, group: DependencyGroup, name: &str) -> bool {
        let key = group.key();
        let Some(map) = self.object_mut().get_mut(key).and_then(Value::as_object_mut) else {
            return false;
        };
        map.remove(name).is_some()
    }

    /// Write the manifest to disk, eliding empty `dependencies`/`devDependencies`
    /// maps and leaving every other key untouched.
    pub fn write(&self) -> Result<(), ManifestError> {
        let mut value = self.value.clone();
        if let Some(object) = value.as_object_mut() {
            for key in ["dependencies", "devDependencies"] {
                if object.get(key).and_then(Value::as_object).is_some_and(Map::is_empty) {
                    object.remove(key);
                }
            }
        }
        let content = serde_json::to_string_pretty(&value)
            .map_err(|error| ManifestError::Parse { path: self.path.clone(), error })?;
        pacm_fs::atomic_write(&self.path, content.as_bytes())?;
        Ok(())
    }
}

fn default_value() -> Value {
    json!({ "dependencies": {}, "devDependencies": {} })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_default_when_missing() {
        let dir = tempdir().unwrap();
        let manifest = Manifest::load(dir.path()).unwrap();
        assert!(manifest.dependencies(DependencyGroup::Prod).is_empty());
        assert!(manifest.dependencies(DependencyGroup::Dev).is_empty());
    }

    #[test]
    fn set_and_write_elides_empty_maps() {
        let dir = tempdir().unwrap();
        let mut manifest = Manifest::load(dir.path()).unwrap();
        manifest.set_dependency(DependencyGroup::Prod, "lodash", "^4.17.21");
        manifest.write().unwrap();

        let raw = fs::read_to_string(dir.path().join(MANIFEST_FILE_NAME)).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["dependencies"]["lodash"], "^4.17.21");
        assert!(value.get("devDependencies").is_none());
    }

    #[test]
    fn preserves_unrelated_fields() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE_NAME),
            r#"{"name":"demo","license":"MIT","dependencies":{}}"#,
        )
        .unwrap();
        let mut manifest = Manifest::load(dir.path()).unwrap();
        manifest.set_dependency(DependencyGroup::Prod, "chalk", "^5.0.0");
        manifest.write().unwrap();

        let raw = fs::read_to_string(dir.path().join(MANIFEST_FILE_NAME)).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["license"], "MIT");
        assert_eq!(value["name"], "demo");
        assert_eq!(value["dependencies"]["chalk"], "^5.0.0");
    }

    #[test]
    fn remove_dependency_reports_presence() {
        let dir = tempdir().unwrap();
        let mut manifest = Manifest::load(dir.path()).unwrap();
        manifest.set_dependency(DependencyGroup::Prod, "express", "^4.0.0");
        assert!(manifest.remove_dependency(DependencyGroup::Prod, "express"));
        assert!(!manifest.remove_dependency(DependencyGroup::Prod, "express"));
    }

    #[test]
    fn init_fails_if_manifest_exists() {
        let dir = tempdir().unwrap();
        Manifest::init(dir.path()).unwrap();
        assert!(Manifest::init(dir.path()).is_err());
    }

    #[test]
    fn reads_script_and_publish_registry() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE_NAME),
            r#"{"scripts":{"postinstall":"node ./setup.js"},"publishConfig":{"registry":"https://example.test/"}}"#,
        )
        .unwrap();
        let manifest = Manifest::load(dir.path()).unwrap();
        assert_eq!(manifest.script("postinstall"), Some("node ./setup.js"));
        assert_eq!(manifest.publish_registry(), Some("https://example.test/"));
    }
}
