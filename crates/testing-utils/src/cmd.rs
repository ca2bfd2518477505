//! A temporary project directory wired to run the `pacm` binary against a
//! mocked registry, for `pacm-cli`'s integration tests.
//!
//! Grounded on pacquet's `CommandTempCwd` (spawn the built binary with
//! `assert_cmd` in a scratch directory), but the registry mock is
//! `mockito` rather than pacquet's verdaccio-shelling `registry-mock`
//! crate — this rewrite's registry client is a plain HTTP GET against
//! `{registry}/{name}`, which `mockito` models directly without needing a
//! real npm server process.

use assert_cmd::prelude::*;
use mockito::{Mock, Server, ServerGuard};
use std::{fs, path::PathBuf, process::Command};
use tempfile::{tempdir, TempDir};

/// A mocked npm-compatible registry endpoint.
pub struct MockRegistry {
    server: ServerGuard,
}

impl MockRegistry {
    pub fn start() -> Self {
        MockRegistry { server: Server::new() }
    }

    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Register a `GET /<name>` response returning `body` as the package's
    /// metadata document.
    pub fn mock_package(&mut self, name: &str, body: &serde_json::Value) -> Mock {
        self.server
            .mock("GET", format!("/{name}").as_str())
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create()
    }

    /// Register a `GET` response serving `bytes` as a package tarball.
    pub fn mock_tarball(&mut self, path: &str, bytes: &[u8]) -> Mock {
        self.server.mock("GET", path).with_body(bytes).create()
    }
}

/// Assets for an integration test that spawns the `pacm` binary in a
/// temporary project directory.
pub struct CommandTempCwd {
    /// Command of `pacm`, with [`Self::workspace`] as its working directory.
    pub pacm: Command,
    /// Temporary directory that contains [`Self::workspace`] and the cache.
    pub root: TempDir,
    /// The project directory `pacm` is invoked from.
    pub workspace: PathBuf,
}

impl CommandTempCwd {
    /// Create a temporary directory, a `workspace` sub-directory, and a
    /// `pacm` command with its working directory and `HOME` set so the
    /// tarball cache lands under the temporary root.
    pub fn init() -> Self {
        let root = tempdir().expect("create temporary directory");
        let workspace = root.path().join("workspace");
        fs::create_dir(&workspace).expect("create temporary workspace");
        let mut pacm = Command::cargo_bin("pacm").expect("find the pacm binary");
        pacm.current_dir(&workspace).env("HOME", root.path());
        CommandTempCwd { pacm, root, workspace }
    }

    /// Write a project `.npmrc` pointing `registry` at `registry_url`.
    pub fn with_registry(self, registry_url: &str) -> Self {
        fs::write(self.workspace.join(".npmrc"), format!("registry = {registry_url}\n"))
            .expect("write .npmrc");
        self
    }
}
