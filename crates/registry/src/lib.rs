mod client;
mod error;
mod metadata;
mod spec;
mod version_selector;

pub use client::{is_transient_reset, RegistryClient};
pub use error::RegistryError;
pub use metadata::{Bin, Dist, PackageMetadata, PeerDependencyMeta, VersionMetadata};
pub use spec::PackageSpec;
pub use version_selector::select_version;
