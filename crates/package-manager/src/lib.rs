//! Top-level orchestration for the `install`/`update`/`remove`/`clean`
//! subcommands.
//!
//! Grounded on pacquet's `package_manager` crate, which wired the same
//! registry/cache/resolver trio behind a single struct passed around by the
//! CLI. This crate keeps that shape; the bodies of `install`/`update` are
//! rewritten around a flat `node_modules` layout and a single-lockfile
//! document, in [`install`] and [`remove`].

mod error;
mod install;
mod link;
mod remove;
mod types;

pub use error::PackageManagerError;
pub use types::{CleanReport, InstallReport, RemoveReport, Warning};

use pacm_cache::CacheStore;
use pacm_config::Config;
use pacm_registry::RegistryClient;
use std::{path::PathBuf, sync::Arc};

/// Owns everything an `install`/`update`/`remove`/`clean` operation needs:
/// the project directory, resolved configuration, and the process-wide
/// registry client and tarball cache (both internally memoized and
/// single-flighted, so sharing one instance across operations is cheap and
/// correct).
#[derive(Debug, Clone)]
pub struct PackageManager {
    project_dir: PathBuf,
    config: Config,
    registry: Arc<RegistryClient>,
    cache: Arc<CacheStore>,
}

impl PackageManager {
    pub fn new(project_dir: PathBuf, config: Config) -> Self {
        let registry = Arc::new(RegistryClient::new(config.registry.clone(), config.fetch_retries));
        let cache = Arc::new(CacheStore::new(config.cache_dir.clone(), config.fetch_retries));
        PackageManager { project_dir, config, registry, cache }
    }

    pub fn project_dir(&self) -> &std::path::Path {
        &self.project_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve `specs` (explicit CLI args, else the lockfile's direct
    /// entries, else the manifest's) and materialize them.
    pub async fn install(
        &self,
        specs: Vec<String>,
        dev: bool,
        force: bool,
    ) -> Result<InstallReport, PackageManagerError> {
        install::install(self, specs, dev, force).await
    }

    /// Like `install`, but a name absent from the manifest is reported
    /// *not-installed* instead of being added.
    pub async fn update(&self, names: Vec<String>, force: bool) -> Result<InstallReport, PackageManagerError> {
        install::update(self, names, force).await
    }

    /// Remove `names` and anything only they needed.
    pub async fn remove(&self, names: Vec<String>) -> Result<RemoveReport, PackageManagerError> {
        remove::remove(self, names).await
    }

    /// Remove the user-home tarball cache directory tree.
    pub fn clean(&self) -> Result<CleanReport, PackageManagerError> {
        let existed = self.config.cache_dir.is_dir();
        pacm_fs::remove_dir_all_if_exists(&self.config.cache_dir)
            .map_err(|error| PackageManagerError::Filesystem { path: self.config.cache_dir.clone(), error })?;
        Ok(if existed { CleanReport::Removed } else { CleanReport::AlreadyEmpty })
    }
}
