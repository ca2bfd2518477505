//! Runs a `package.json` script (`postinstall`, or a user `run`/`test`/`start`
//! invocation) in a given working directory, with `node_modules/.bin`
//! prepended to `PATH` so the script can call locally-installed bins by name
//! the way npm's own lifecycle runner does.
//!
//! Grounded on pacquet's `pacquet-executor`, generalized from "always
//! `sh -c`" to honor `cmd /C` on Windows, and from "fire and forget" to
//! return the child's exit status so callers can decide whether a
//! non-zero exit is fatal (post-install hook failures are warnings by
//! default, not halting errors).

use derive_more::{Display, Error};
use miette::Diagnostic;
use std::{
    env, io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};
use tracing::{debug, instrument};

#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum ExecutorError {
    #[display("failed to spawn script {script:?} in {cwd:?}: {error}")]
    #[diagnostic(code(pacm_executor::spawn_error))]
    Spawn { script: String, cwd: PathBuf, #[error(source)] error: io::Error },
}

/// Build the `PATH` a script run from `cwd` should see: `project_dir`'s own
/// `node_modules/.bin`, every ancestor's `node_modules/.bin` (npm walks up
/// the tree the same way module resolution does), then the ambient `PATH`.
fn script_path_env(project_dir: &Path) -> std::ffi::OsString {
    let mut entries = Vec::new();
    let mut dir = Some(project_dir);
    while let Some(current) = dir {
        entries.push(current.join("node_modules").join(".bin").into_os_string());
        dir = current.parent();
    }
    if let Ok(ambient) = env::var("PATH") {
        entries.push(ambient.into());
    }
    env::join_paths(entries).unwrap_or_else(|_| env::var_os("PATH").unwrap_or_default())
}

/// Run `script` (a shell command line, as found in `package.json`'s
/// `scripts` map) with `cwd` as the working directory and `project_dir`'s
/// `node_modules/.bin` (and ancestors') on `PATH`.
#[instrument(skip(script))]
pub fn run_script(project_dir: &Path, cwd: &Path, script: &str) -> Result<ExitStatus, ExecutorError> {
    debug!(%script, ?cwd, "running script");
    let path = script_path_env(project_dir);

    let mut command = if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.arg("/C").arg(script);
        command
    } else {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        command
    };

    command
        .current_dir(cwd)
        .env("PATH", path)
        .status()
        .map_err(|error| ExecutorError::Spawn { script: script.to_string(), cwd: cwd.to_path_buf(), error })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[cfg(unix)]
    #[test]
    fn runs_a_shell_command() {
        let dir = tempdir().unwrap();
        let status = run_script(dir.path(), dir.path(), "exit 0").unwrap();
        assert!(status.success());
    }

    #[cfg(unix)]
    #[test]
    fn reports_nonzero_exit_without_erroring() {
        let dir = tempdir().unwrap();
        let status = run_script(dir.path(), dir.path(), "exit 7").unwrap();
        assert_eq!(status.code(), Some(7));
    }

    #[cfg(unix)]
    #[test]
    fn prepends_local_bin_directory_to_path() {
        let dir = tempdir().unwrap();
        let bin_dir = dir.path().join("node_modules/.bin");
        std::fs::create_dir_all(&bin_dir).unwrap();
        let path = script_path_env(dir.path());
        let path = path.to_string_lossy();
        assert!(path.starts_with(&*bin_dir.to_string_lossy()));
    }
}
