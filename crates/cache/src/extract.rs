//! Gzip inflate and tar unpack, stripping the leading `package/` path
//! component npm tarballs always wrap their contents in.
//!
//! Grounded on pacquet's tarball crate, with `libdeflater` (nightly-only,
//! `#![feature(error_generic_member_access, provide_any)]`) swapped for
//! `zune-inflate`, a pure-Rust decoder that needs no nightly features and is
//! already part of the workspace's stable dependency stack.

use crate::error::CacheError;
use std::{fs, io::Cursor, path::Path};
use zune_inflate::DeflateDecoder;

pub(crate) fn decompress_gzip(path: &Path, gz_data: &[u8]) -> Result<Vec<u8>, CacheError> {
    DeflateDecoder::new(gz_data).decode_gzip().map_err(|error| CacheError::Decompress {
        path: path.to_path_buf(),
        message: error.to_string(),
    })
}

/// Unpack a `package/`-prefixed tar archive into `dest`, which is created
/// (and any stale contents replaced) as part of the call.
pub(crate) fn extract_tar(path: &Path, data: &[u8], dest: &Path) -> Result<(), CacheError> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .map_err(|error| CacheError::Extract { path: path.to_path_buf(), error })?;

    let unpack_path = pacm_fs::unique_temp_path(parent, "pacm-extract");
    let mut archive = tar::Archive::new(Cursor::new(data));
    archive
        .unpack(&unpack_path)
        .map_err(|error| CacheError::Extract { path: path.to_path_buf(), error })?;

    let unpacked_root = unpack_path.join("package");
    let unpacked_root = if unpacked_root.is_dir() { unpacked_root } else { unpack_path.clone() };

    if dest.exists() {
        fs::remove_dir_all(dest)
            .map_err(|error| CacheError::Extract { path: path.to_path_buf(), error })?;
    }
    fs::rename(&unpacked_root, dest)
        .map_err(|error| CacheError::Extract { path: path.to_path_buf(), error })?;
    let _ = fs::remove_dir_all(&unpack_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, format!("package/{name}"), *content).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn extracts_stripping_package_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let tarball = build_tarball(&[("package.json", b"{}"), ("index.js", b"module.exports = 1;")]);
        let dest = dir.path().join("extracted");
        extract_tar(Path::new("fixture.tgz"), &tarball, &dest).unwrap();
        assert!(dest.join("package.json").is_file());
        assert!(dest.join("index.js").is_file());
    }

    #[test]
    fn decompresses_gzip_payload() {
        let raw = b"hello from a gzip payload".to_vec();
        let gz = gzip(&raw);
        let decompressed = decompress_gzip(Path::new("fixture.tgz"), &gz).unwrap();
        assert_eq!(decompressed, raw);
    }
}
