use derive_more::{Display, Error};
use miette::Diagnostic;

#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum RegistryError {
    #[display("failed to parse package spec {spec:?}: {reason}")]
    BadSpec { spec: String, reason: String },

    #[display("{name} has no dist-tag {tag:?}")]
    MissingTag { name: String, tag: String },

    #[display("no version of {name} satisfies {range}")]
    NoMatchingVersion { name: String, range: String },

    #[display("failed to fetch metadata for {name}: {error}")]
    Network { name: String, #[error(source)] error: reqwest::Error },

    #[display("registry returned {status} for {name}")]
    Status { name: String, status: reqwest::StatusCode },

    #[display("failed to parse metadata for {name}: {error}")]
    Deserialize { name: String, #[error(source)] error: reqwest::Error },
}
