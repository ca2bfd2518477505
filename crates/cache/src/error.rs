use derive_more::{Display, Error};
use miette::Diagnostic;
use std::{io, path::PathBuf};

#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum CacheError {
    #[display("failed to download {url}: {error}")]
    Download { url: String, #[error(source)] error: reqwest::Error },

    #[display("integrity check failed for {url}: expected {expected}, got {actual}")]
    IntegrityMismatch { url: String, expected: String, actual: String },

    #[display("{integrity:?} is not a recognized integrity string")]
    BadIntegrity { integrity: String },

    #[display("failed to decompress tarball at {path:?}: {message}")]
    Decompress { path: PathBuf, message: String },

    #[display("failed to extract tarball at {path:?}: {error}")]
    Extract { path: PathBuf, #[error(source)] error: io::Error },

    #[display("io error at {path:?}: {error}")]
    Io { path: PathBuf, #[error(source)] error: io::Error },

    #[display("{_0}")]
    AtomicWrite(#[error(source)] pacm_fs::AtomicWriteError),
}
