use derive_more::{Display, Error};
use miette::Diagnostic;
use std::sync::Arc;

#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum ResolverError {
    #[display("{_0}")]
    Registry(#[error(source)] Arc<pacm_registry::RegistryError>),

    #[display("{name}@{range} is not installable on this platform")]
    PlatformIncompatible { name: String, range: String },
}

impl From<Arc<pacm_registry::RegistryError>> for ResolverError {
    fn from(error: Arc<pacm_registry::RegistryError>) -> Self {
        ResolverError::Registry(error)
    }
}

impl From<pacm_registry::RegistryError> for ResolverError {
    fn from(error: pacm_registry::RegistryError) -> Self {
        ResolverError::Registry(Arc::new(error))
    }
}
