use derive_more::{Display, Error};
use miette::Diagnostic;
use std::{io, path::PathBuf};

/// The closed error taxonomy for this crate, mapped to `PACM_*` diagnostic
/// codes so the CLI boundary prints a tagged one-line message per failure.
#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum PackageManagerError {
    #[display("{_0}")]
    #[diagnostic(code(PACM_FETCH_METADATA_ERROR))]
    Registry(#[error(source)] std::sync::Arc<pacm_registry::RegistryError>),

    #[display("{_0}")]
    #[diagnostic(code(PACM_RESOLVE_ERROR))]
    Resolve(#[error(source)] pacm_resolver::ResolverError),

    #[display("{_0}")]
    #[diagnostic(code(PACM_CACHE_ERROR))]
    Cache(#[error(source)] std::sync::Arc<pacm_cache::CacheError>),

    #[display("{_0}")]
    #[diagnostic(code(PACM_MANIFEST_ERROR))]
    Manifest(#[error(source)] pacm_manifest::ManifestError),

    #[display("{_0}")]
    #[diagnostic(code(PACM_LOCKFILE_ERROR))]
    Lockfile(#[error(source)] pacm_lockfile::LockfileError),

    #[display("{_0}")]
    #[diagnostic(code(PACM_SHIM_ERROR))]
    CmdShim(#[error(source)] pacm_cmd_shim::CmdShimError),

    #[display("{name}@{version} has no integrity digest to verify against")]
    #[diagnostic(code(PACM_CACHE_ERROR))]
    MissingIntegrity { name: String, version: String },

    #[display("failed to read {path:?}: {error}")]
    #[diagnostic(code(PACM_FS_ERROR))]
    Filesystem { path: PathBuf, #[error(source)] error: io::Error },

    #[display("no packages to install: no arguments given, no lockfile, and an empty manifest")]
    #[diagnostic(code(PACM_ARGUMENT_ERROR))]
    NothingToInstall,

    #[display("failed to parse package spec {spec:?}: {reason}")]
    #[diagnostic(code(PACM_ARGUMENT_ERROR))]
    BadSpec { spec: String, reason: String },
}

impl From<std::sync::Arc<pacm_registry::RegistryError>> for PackageManagerError {
    fn from(error: std::sync::Arc<pacm_registry::RegistryError>) -> Self {
        PackageManagerError::Registry(error)
    }
}

impl From<std::sync::Arc<pacm_cache::CacheError>> for PackageManagerError {
    fn from(error: std::sync::Arc<pacm_cache::CacheError>) -> Self {
        PackageManagerError::Cache(error)
    }
}

impl From<pacm_cache::CacheError> for PackageManagerError {
    fn from(error: pacm_cache::CacheError) -> Self {
        PackageManagerError::Cache(std::sync::Arc::new(error))
    }
}

impl From<pacm_resolver::ResolverError> for PackageManagerError {
    fn from(error: pacm_resolver::ResolverError) -> Self {
        PackageManagerError::Resolve(error)
    }
}

impl From<pacm_manifest::ManifestError> for PackageManagerError {
    fn from(error: pacm_manifest::ManifestError) -> Self {
        PackageManagerError::Manifest(error)
    }
}

impl From<pacm_lockfile::LockfileError> for PackageManagerError {
    fn from(error: pacm_lockfile::LockfileError) -> Self {
        PackageManagerError::Lockfile(error)
    }
}

impl From<pacm_cmd_shim::CmdShimError> for PackageManagerError {
    fn from(error: pacm_cmd_shim::CmdShimError) -> Self {
        PackageManagerError::CmdShim(error)
    }
}
