use derive_more::{Display, Error};
use miette::Diagnostic;
use std::{io, path::PathBuf};

#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum CmdShimError {
    #[display("failed to write shim at {path:?}: {error}")]
    #[diagnostic(code(pacm_cmd_shim::write_error))]
    Write { path: PathBuf, #[error(source)] error: io::Error },

    #[display("failed to remove shim at {path:?}: {error}")]
    #[diagnostic(code(pacm_cmd_shim::remove_error))]
    Remove { path: PathBuf, #[error(source)] error: io::Error },
}
