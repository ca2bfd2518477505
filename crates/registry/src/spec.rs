//! Parsing for the two package-spec shapes this rewrite accepts:
//!
//! * `name[@range]` — install `name` from the registry, pinned to `range`
//!   (a semver range or a dist-tag such as `latest`), defaulting to `*`.
//! * `alias@npm:realName[@range]` — install `realName` from the registry but
//!   link it into `node_modules` under `alias`, npm's package-aliasing form.
//!
//! Scoped names (`@scope/name`) are handled by skipping the name's own
//! leading `@` before looking for the `@range` separator.

use crate::error::RegistryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// Key this dependency is recorded and linked under (`node_modules/<alias>`).
    pub alias: String,
    /// Registry package name to actually resolve.
    pub name: String,
    /// Semver range or dist-tag.
    pub range: String,
}

/// Split `input` into a name and an optional `@`-suffix, treating a leading
/// `@` (scoped package) as part of the name rather than a separator.
fn split_name_and_suffix(input: &str) -> (&str, Option<&str>) {
    let search_from = usize::from(input.starts_with('@'));
    match input[search_from..].find('@') {
        Some(offset) => {
            let at = search_from + offset;
            (&input[..at], Some(&input[at + 1..]))
        }
        None => (input, None),
    }
}

impl PackageSpec {
    pub fn parse(input: &str) -> Result<Self, RegistryError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RegistryError::BadSpec {
                spec: input.to_string(),
                reason: "empty package spec".to_string(),
            });
        }

        let (alias, suffix) = split_name_and_suffix(input);
        if alias.is_empty() {
            return Err(RegistryError::BadSpec {
                spec: input.to_string(),
                reason: "missing package name".to_string(),
            });
        }

        match suffix {
            None => Ok(PackageSpec {
                alias: alias.to_string(),
                name: alias.to_string(),
                range: "latest".to_string(),
            }),
            Some(suffix) if suffix.starts_with("npm:") => {
                let target = &suffix["npm:".len()..];
                let (name, range) = split_name_and_suffix(target);
                if name.is_empty() {
                    return Err(RegistryError::BadSpec {
                        spec: input.to_string(),
                        reason: "missing aliased package name after `npm:`".to_string(),
                    });
                }
                Ok(PackageSpec {
                    alias: alias.to_string(),
                    name: name.to_string(),
                    range: range.unwrap_or("latest").to_string(),
                })
            }
            Some(range) => Ok(PackageSpec {
                alias: alias.to_string(),
                name: alias.to_string(),
                range: range.to_string(),
            }),
        }
    }

    /// Parse a `package.json` dependency map entry (`key` the declared name,
    /// `value` its range), handling the `"alias": "npm:realName@range"`
    /// aliasing form the same way [`PackageSpec::parse`] handles it inline.
    pub fn from_manifest_entry(key: &str, value: &str) -> Self {
        match value.strip_prefix("npm:") {
            Some(target) => {
                let (name, range) = split_name_and_suffix(target);
                PackageSpec {
                    alias: key.to_string(),
                    name: name.to_string(),
                    range: range.unwrap_or("latest").to_string(),
                }
            }
            None => {
                PackageSpec { alias: key.to_string(), name: key.to_string(), range: value.to_string() }
            }
        }
    }
}
