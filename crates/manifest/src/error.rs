use derive_more::{Display, Error};
use miette::Diagnostic;
use std::{io, path::PathBuf};

#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum ManifestError {
    #[display("failed to read {path:?}: {error}")]
    #[diagnostic(code(pacm_manifest::read_error))]
    Read { path: PathBuf, #[error(source)] error: io::Error },

    #[display("failed to parse {path:?} as JSON: {error}")]
    #[diagnostic(code(pacm_manifest::parse_error))]
    Parse { path: PathBuf, #[error(source)] error: serde_json::Error },

    #[display("{path:?} already exists")]
    #[diagnostic(code(pacm_manifest::already_exists))]
    AlreadyExists { path: PathBuf },

    #[display("{_0}")]
    Write(#[error(source)] pacm_fs::AtomicWriteError),

    #[display("{name:?} is not a JSON object")]
    #[diagnostic(code(pacm_manifest::not_an_object))]
    NotAnObject { name: &'static str },
}

impl From<pacm_fs::AtomicWriteError> for ManifestError {
    fn from(error: pacm_fs::AtomicWriteError) -> Self {
        ManifestError::Write(error)
    }
}
