use derive_more::{Display, Error};
use miette::Diagnostic;
use std::{io, path::PathBuf};

#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum LockfileError {
    #[display("failed to read {path:?}: {error}")]
    #[diagnostic(code(pacm_lockfile::read_error))]
    Read { path: PathBuf, #[error(source)] error: io::Error },

    #[display("failed to parse {path:?} as JSON: {error}")]
    #[diagnostic(code(pacm_lockfile::parse_error))]
    Parse { path: PathBuf, #[error(source)] error: serde_json::Error },

    #[display("{_0}")]
    Write(#[error(source)] pacm_fs::AtomicWriteError),
}

impl From<pacm_fs::AtomicWriteError> for LockfileError {
    fn from(error: pacm_fs::AtomicWriteError) -> Self {
        LockfileError::Write(error)
    }
}
