//! Registry URL and cache directory discovery.
//!
//! Mirrors the `.npmrc` discovery chain of a real npm-compatible client:
//! project `.npmrc` → user-home `.npmrc` → `package.json`'s
//! `publishConfig.registry` → a hard default. Grounded on `pacquet-npmrc`'s
//! `Npmrc::current`, which takes the directory lookups as injected closures
//! so the fallback chain is unit-testable without touching the real
//! filesystem or `$HOME`.

use pipe_trait::Pipe;
use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf};

const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";
const CACHE_DIR_NAME: &str = ".pacm-cache";

/// Default number of attempts for a transient (TCP-reset) network failure,
/// tunable since flaky registries are common enough to warrant a retry budget.
pub const DEFAULT_FETCH_RETRIES: u8 = 3;

/// Resolved configuration for one `pacm` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base registry URL, always ending in `/`.
    pub registry: String,
    /// Root of the content-addressed tarball cache (`{HOME}/.pacm-cache`).
    pub cache_dir: PathBuf,
    /// Number of attempts made for a transient network failure.
    pub fetch_retries: u8,
}

/// Shape of an `.npmrc` file, as far as this rewrite cares.
#[derive(Debug, Default, Deserialize)]
struct NpmrcFile {
    registry: Option<String>,
}

fn normalize_registry(registry: String) -> String {
    if registry.ends_with('/') {
        registry
    } else {
        format!("{registry}/")
    }
}

fn load_npmrc_registry(dir: &Path) -> Option<String> {
    let content = fs::read_to_string(dir.join(".npmrc")).ok()?;
    let parsed: NpmrcFile = serde_ini::from_str(&content).ok()?;
    parsed.registry
}

impl Config {
    /// Resolve configuration using real `$PWD`/`$HOME` and no manifest hint.
    pub fn current() -> Self {
        Self::discover(env::current_dir, home::home_dir, || None)
    }

    /// Resolve configuration using real `$PWD`/`$HOME`, consulting
    /// `manifest_registry` (typically `package.json`'s
    /// `publishConfig.registry`) if neither `.npmrc` supplies one.
    pub fn current_with_manifest_registry(manifest_registry: Option<String>) -> Self {
        Self::discover(env::current_dir, home::home_dir, || manifest_registry.clone())
    }

    /// Dependency-injected resolution, used in tests to avoid touching the
    /// real filesystem or `$HOME`.
    pub fn discover<CurrentDir, HomeDir, ManifestRegistry>(
        current_dir: CurrentDir,
        home_dir: HomeDir,
        manifest_registry: ManifestRegistry,
    ) -> Self
    where
        CurrentDir: FnOnce() -> std::io::Result<PathBuf>,
        HomeDir: FnOnce() -> Option<PathBuf>,
        ManifestRegistry: FnOnce() -> Option<String>,
    {
        let home = home_dir();

        let registry = current_dir()
            .ok()
            .and_then(|dir| load_npmrc_registry(&dir))
            .or_else(|| home.as_deref().and_then(load_npmrc_registry))
            .or_else(manifest_registry)
            .unwrap_or_else(|| DEFAULT_REGISTRY.to_string())
            .pipe(normalize_registry);

        let cache_dir = home.unwrap_or_else(env::temp_dir).join(CACHE_DIR_NAME);

        Config { registry, cache_dir, fetch_retries: DEFAULT_FETCH_RETRIES }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn falls_back_to_default_registry() {
        let cwd = tempdir().unwrap();
        let home = tempdir().unwrap();
        let config = Config::discover(
            || Ok(cwd.path().to_path_buf()),
            || Some(home.path().to_path_buf()),
            || None,
        );
        assert_eq!(config.registry, DEFAULT_REGISTRY);
        assert_eq!(config.cache_dir, home.path().join(".pacm-cache"));
    }

    #[test]
    fn project_npmrc_wins_over_home_npmrc() {
        let cwd = tempdir().unwrap();
        let home = tempdir().unwrap();
        fs::write(cwd.path().join(".npmrc"), "registry = https://project.example/\n").unwrap();
        fs::write(home.path().join(".npmrc"), "registry = https://home.example/\n").unwrap();
        let config = Config::discover(
            || Ok(cwd.path().to_path_buf()),
            || Some(home.path().to_path_buf()),
            || None,
        );
        assert_eq!(config.registry, "https://project.example/");
    }

    #[test]
    fn home_npmrc_used_when_project_npmrc_absent() {
        let cwd = tempdir().unwrap();
        let home = tempdir().unwrap();
        fs::write(home.path().join(".npmrc"), "registry = https://home.example/\n").unwrap();
        let config = Config::discover(
            || Ok(cwd.path().to_path_buf()),
            || Some(home.path().to_path_buf()),
            || None,
        );
        assert_eq!(config.registry, "https://home.example/");
    }

    #[test]
    fn manifest_registry_used_when_no_npmrc() {
        let cwd = tempdir().unwrap();
        let home = tempdir().unwrap();
        let config = Config::discover(
            || Ok(cwd.path().to_path_buf()),
            || Some(home.path().to_path_buf()),
            || Some("https://manifest.example".to_string()),
        );
        assert_eq!(config.registry, "https://manifest.example/");
    }

    #[test]
    fn adds_trailing_slash() {
        let cwd = tempdir().unwrap();
        fs::write(cwd.path().join(".npmrc"), "registry = https://yagiz.co\n").unwrap();
        let config = Config::discover(|| Ok(cwd.path().to_path_buf()), || None, || None);
        assert_eq!(config.registry, "https://yagiz.co/");
    }
}
