//! Picks the version metadata for a spec's range (or dist-tag) out of a
//! package's registry metadata.

use crate::{
    error::RegistryError,
    metadata::{PackageMetadata, VersionMetadata},
};
use node_semver::Range;

/// Resolve `range_or_tag` against `metadata`. `range_or_tag` is first tried
/// as a dist-tag (so `"latest"` and any custom tag a publisher set up both
/// work), then as a semver range, picking the highest matching version.
pub fn select_version<'a>(
    metadata: &'a PackageMetadata,
    range_or_tag: &str,
) -> Result<&'a VersionMetadata, RegistryError> {
    if let Some(tagged_version) = metadata.dist_tags.get(range_or_tag) {
        return metadata.versions.get(tagged_version).ok_or_else(|| RegistryError::MissingTag {
            name: metadata.name.clone(),
            tag: range_or_tag.to_string(),
        });
    }

    let range: Range = range_or_tag.parse().map_err(|_| RegistryError::NoMatchingVersion {
        name: metadata.name.clone(),
        range: range_or_tag.to_string(),
    })?;

    metadata
        .versions
        .values()
        .filter(|version| range.satisfies(&version.version))
        .max_by(|a, b| a.version.cmp(&b.version))
        .ok_or_else(|| RegistryError::NoMatchingVersion {
            name: metadata.name.clone(),
            range: range_or_tag.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Dist;
    use std::collections::HashMap;

    fn version(version: &str) -> VersionMetadata {
        VersionMetadata {
            name: "left-pad".to_string(),
            version: version.parse().unwrap(),
            dist: Dist {
                integrity: None,
                shasum: None,
                tarball: format!("https://registry.npmjs.org/left-pad/-/left-pad-{version}.tgz"),
            },
            dependencies: HashMap::new(),
            dev_dependencies: HashMap::new(),
            peer_dependencies: HashMap::new(),
            peer_dependencies_meta: HashMap::new(),
            optional_dependencies: HashMap::new(),
            os: None,
            cpu: None,
            bin: Default::default(),
            scripts: HashMap::new(),
        }
    }

    fn metadata() -> PackageMetadata {
        PackageMetadata {
            name: "left-pad".to_string(),
            dist_tags: HashMap::from([("latest".to_string(), "1.3.0".to_string())]),
            versions: HashMap::from([
                ("1.0.0".to_string(), version("1.0.0")),
                ("1.2.0".to_string(), version("1.2.0")),
                ("1.3.0".to_string(), version("1.3.0")),
            ]),
        }
    }

    #[test]
    fn resolves_latest_dist_tag() {
        let metadata = metadata();
        let selected = select_version(&metadata, "latest").unwrap();
        assert_eq!(selected.version.to_string(), "1.3.0");
    }

    #[test]
    fn resolves_highest_matching_semver_range() {
        let metadata = metadata();
        let selected = select_version(&metadata, "^1.0.0").unwrap();
        assert_eq!(selected.version.to_string(), "1.3.0");
    }

    #[test]
    fn resolves_narrow_range() {
        let metadata = metadata();
        let selected = select_version(&metadata, "~1.2.0").unwrap();
        assert_eq!(selected.version.to_string(), "1.2.0");
    }

    #[test]
    fn errors_when_nothing_satisfies_range() {
        let metadata = metadata();
        assert!(select_version(&metadata, "^2.0.0").is_err());
    }

    #[test]
    fn errors_on_unknown_tag_that_is_not_a_valid_range() {
        let metadata = metadata();
        assert!(select_version(&metadata, "definitely-not-a-range-or-tag!!").is_err());
    }
}
