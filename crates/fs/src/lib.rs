mod atomic;
mod ensure_file;
mod file_mode;
mod temp;

pub use atomic::{atomic_write, AtomicWriteError};
pub use ensure_file::{ensure_file, EnsureFileError};
pub use file_mode::{is_all_exec, make_file_executable, EXEC_MASK, EXEC_MODE};
pub use temp::unique_temp_path;

use std::{fs, io, path::Path};

/// Remove `path` and everything under it, succeeding if it was already absent.
pub fn remove_dir_all_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error),
    }
}

/// Remove `path` if it is a directory and contains no entries.
///
/// Returns `Ok(false)` without touching the filesystem if the directory is
/// missing or non-empty.
pub fn remove_dir_if_empty(path: &Path) -> io::Result<bool> {
    let mut entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(error) => return Err(error),
    };
    if entries.next().is_some() {
        return Ok(false);
    }
    fs::remove_dir(path)?;
    Ok(true)
}
