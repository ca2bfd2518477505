//! Helpers for computing and inspecting `node_modules/<name>` directories.

use serde_json::Value;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

/// `projectDir/node_modules/<link_name>`. `link_name` may contain a `/` for
/// scoped packages (`@scope/name`); `Path::join` splits on it the same as
/// any other path component.
pub fn dest_dir(project_dir: &Path, link_name: &str) -> PathBuf {
    project_dir.join("node_modules").join(link_name)
}

pub fn bin_dir(project_dir: &Path) -> PathBuf {
    project_dir.join("node_modules").join(".bin")
}

/// `destDir/package.json`, parsed as a raw JSON value (real package.json
/// files commonly carry fields this rewrite doesn't model).
pub fn read_package_json(dest_dir: &Path) -> Option<Value> {
    let content = fs::read_to_string(dest_dir.join("package.json")).ok()?;
    serde_json::from_str(&content).ok()
}

pub fn installed_version(dest_dir: &Path) -> Option<String> {
    read_package_json(dest_dir)?.get("version")?.as_str().map(str::to_string)
}

/// npm's `bin` field is either a single string (the package's own name is
/// the bin name) or a map of bin name to script path, resolved relative to
/// `dest_dir`.
pub fn bin_entries(dest_dir: &Path, package_json: &Value, fallback_name: &str) -> Vec<(String, PathBuf)> {
    match package_json.get("bin") {
        Some(Value::String(path)) => {
            let shim_name = fallback_name.rsplit('/').next().unwrap_or(fallback_name);
            vec![(shim_name.to_string(), dest_dir.join(path))]
        }
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(name, path)| path.as_str().map(|path| (name.clone(), dest_dir.join(path))))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn postinstall_script(package_json: &Value) -> Option<String> {
    package_json.get("scripts")?.get("postinstall")?.as_str().map(str::to_string)
}

/// Every `(bin name, target path)` pair the package at `dest_dir` declares,
/// keyed for later shim removal when a package is uninstalled.
pub fn all_bin_names(package_json: &Value, fallback_name: &str) -> Vec<String> {
    match package_json.get("bin") {
        Some(Value::String(_)) => vec![fallback_name.rsplit('/').next().unwrap_or(fallback_name).to_string()],
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

/// Build `name -> declared range` for every dependency entry the installed
/// package's own `package.json` lists, independent of what the registry
/// metadata said (used when walking `remove`'s transitive cleanup).
pub fn declared_dependencies(package_json: &Value) -> HashMap<String, String> {
    package_json
        .get("dependencies")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter().filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string()))).collect()
        })
        .unwrap_or_default()
}
