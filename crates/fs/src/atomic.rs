use derive_more::{Display, Error};
use miette::Diagnostic;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::unique_temp_path;

/// Error type of [`atomic_write`].
#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum AtomicWriteError {
    #[display("Failed to create the parent directory at {parent_dir:?}: {error}")]
    CreateDir {
        parent_dir: PathBuf,
        #[error(source)]
        error: io::Error,
    },
    #[display("Failed to write temporary file at {tmp_path:?}: {error}")]
    WriteTemp {
        tmp_path: PathBuf,
        #[error(source)]
        error: io::Error,
    },
    #[display("Failed to publish {tmp_path:?} to {file_path:?}: {error}")]
    Publish {
        tmp_path: PathBuf,
        file_path: PathBuf,
        #[error(source)]
        error: io::Error,
    },
}

/// Write `content` to `file_path` by writing to a sibling temporary file
/// first, then renaming it into place.
///
/// This guarantees that a reader of `file_path` never observes a partially
/// written file: `file_path` either has its old content or its new content,
/// never a mix. Used to persist the manifest and lockfile at the end of an
/// install operation (spec: "Atomic write").
pub fn atomic_write(file_path: &Path, content: &[u8]) -> Result<(), AtomicWriteError> {
    let parent_dir = file_path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent_dir)
        .map_err(|error| AtomicWriteError::CreateDir { parent_dir: parent_dir.to_path_buf(), error })?;

    let tmp_path = unique_temp_path(parent_dir, "atomic-write");
    fs::write(&tmp_path, content)
        .map_err(|error| AtomicWriteError::WriteTemp { tmp_path: tmp_path.clone(), error })?;

    fs::rename(&tmp_path, file_path).map_err(|error| AtomicWriteError::Publish {
        tmp_path: tmp_path.clone(),
        file_path: file_path.to_path_buf(),
        error,
    })
}
