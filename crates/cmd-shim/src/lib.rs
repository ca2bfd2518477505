//! Executable shim generation for `node_modules/.bin`.
//!
//! `pacquet-cmd-shim`'s own source was not present in the retrieved
//! snapshot, only its stated intent ("mirroring pnpm's
//! `@pnpm/bins.resolver`, `@pnpm/bins.linker`, and `@zkochan/cmd-shim`") —
//! this is a fresh implementation of the same idea: a POSIX shell shim that
//! execs the target file through its declared interpreter, plus a `.cmd`
//! companion on Windows.

mod error;

pub use error::CmdShimError;

use pacm_fs::make_file_executable;
use std::{
    fs::{self, File},
    io::{self, Write},
    path::Path,
};

/// Create (or overwrite) `<bin_dir>/<bin_name>` so invoking it runs
/// `target_path` through its declared interpreter. `bin_dir` is created if
/// missing. On Windows, also writes a `<bin_name>.cmd` companion.
pub fn create_shim(bin_dir: &Path, bin_name: &str, target_path: &Path) -> Result<(), CmdShimError> {
    fs::create_dir_all(bin_dir).map_err(|error| CmdShimError::Write { path: bin_dir.to_path_buf(), error })?;

    let interpreter = detect_interpreter(target_path);
    let target = target_path.display();

    let shim_path = bin_dir.join(bin_name);
    let script = format!("#!/bin/sh\nexec {interpreter} \"{target}\" \"$@\"\n");
    write_executable(&shim_path, script.as_bytes())?;

    if cfg!(windows) {
        let cmd_path = bin_dir.join(format!("{bin_name}.cmd"));
        let cmd_script = format!("@ECHO off\r\n{interpreter} \"{target}\" %*\r\n");
        write_executable(&cmd_path, cmd_script.as_bytes())?;
    }

    Ok(())
}

/// Remove `<bin_dir>/<bin_name>` (and its `.cmd` companion, if present),
/// succeeding if neither exists. Used by `remove` to drop shims that
/// pointed into an uninstalled package.
pub fn remove_shim(bin_dir: &Path, bin_name: &str) -> Result<(), CmdShimError> {
    remove_if_exists(&bin_dir.join(bin_name))?;
    remove_if_exists(&bin_dir.join(format!("{bin_name}.cmd")))
}

fn remove_if_exists(path: &Path) -> Result<(), CmdShimError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(CmdShimError::Remove { path: path.to_path_buf(), error }),
    }
}

/// The interpreter a shim should invoke `target_path` with: the command
/// named by the target's shebang line if it has one, else the ambient
/// `node` on `PATH`.
fn detect_interpreter(target_path: &Path) -> String {
    let first_line = fs::read_to_string(target_path).ok().and_then(|content| {
        content.lines().next().and_then(|line| line.strip_prefix("#!")).map(str::trim).map(str::to_string)
    });
    match first_line {
        Some(shebang) if !shebang.is_empty() => shebang,
        _ => "node".to_string(),
    }
}

fn write_executable(path: &Path, content: &[u8]) -> Result<(), CmdShimError> {
    let mut file =
        File::create(path).map_err(|error| CmdShimError::Write { path: path.to_path_buf(), error })?;
    file.write_all(content).map_err(|error| CmdShimError::Write { path: path.to_path_buf(), error })?;
    make_file_executable(&file).map_err(|error| CmdShimError::Write { path: path.to_path_buf(), error })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_executable_shim_invoking_node() {
        let dir = tempdir().unwrap();
        let bin_dir = dir.path().join("node_modules/.bin");
        let target = dir.path().join("node_modules/left-pad/index.js");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "module.exports = 1;\n").unwrap();

        create_shim(&bin_dir, "left-pad", &target).unwrap();

        let shim_path = bin_dir.join("left-pad");
        let content = fs::read_to_string(&shim_path).unwrap();
        assert!(content.starts_with("#!/bin/sh"));
        assert!(content.contains("exec node"));
        assert!(content.contains(&target.display().to_string()));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&shim_path).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn honors_declared_shebang() {
        let dir = tempdir().unwrap();
        let bin_dir = dir.path().join("node_modules/.bin");
        let target = dir.path().join("node_modules/ts-node/dist/bin.js");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "#!/usr/bin/env node\nconsole.log(1)\n").unwrap();

        create_shim(&bin_dir, "ts-node", &target).unwrap();
        let content = fs::read_to_string(bin_dir.join("ts-node")).unwrap();
        assert!(content.contains("exec /usr/bin/env node"));
    }

    #[test]
    fn remove_shim_is_idempotent() {
        let dir = tempdir().unwrap();
        let bin_dir = dir.path().join("node_modules/.bin");
        let target = dir.path().join("node_modules/pkg/cli.js");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "").unwrap();
        create_shim(&bin_dir, "pkg", &target).unwrap();

        assert!(bin_dir.join("pkg").exists());
        remove_shim(&bin_dir, "pkg").unwrap();
        assert!(!bin_dir.join("pkg").exists());
        // removing again should not error
        remove_shim(&bin_dir, "pkg").unwrap();
    }
}
