//! Local chaincode packaging for install.
//!
//! An uploaded source archive (gzip tarball with one top-level directory) is
//! unpacked into a private working directory and repacked as a deployable
//! gzip tarball:
//!
//! ```text
//! metadata.json   {"name", "version", "type", "path"}
//! src/...         the uploaded source tree
//! ```
//!
//! The working directory is a [`tempfile::TempDir`], so it is removed on
//! every return path.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use fabgate_core::{ChaincodeSpec, ChaincodeType};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const WORKDIR_PREFIX: &str = "fabgate-cc-";
const UPLOAD_FILE: &str = "upload.compressed";
const METADATA_FILE: &str = "metadata.json";
const SOURCE_DIR: &str = "src";

/// Packaging errors.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("archive contains no source directory")]
    NoSourceDirectory,

    #[error("failed to encode package metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("packaging task failed: {0}")]
    Task(String),
}

/// Descriptor written at the root of every package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub language: ChaincodeType,
    /// Name of the uploaded top-level source directory.
    pub path: String,
}

/// Build a deployable package from an uploaded source archive.
///
/// Runs on the blocking pool; `work_root` must be writable.
pub async fn package_chaincode(
    work_root: &Path,
    chaincode_id: &str,
    spec: &ChaincodeSpec,
    upload: Bytes,
) -> Result<Bytes, PackageError> {
    let work_root = work_root.to_path_buf();
    let name = chaincode_id.to_string();
    let spec = spec.clone();

    tokio::task::spawn_blocking(move || package_blocking(&work_root, &name, &spec, &upload))
        .await
        .map_err(|e| PackageError::Task(e.to_string()))?
}

fn package_blocking(
    work_root: &Path,
    name: &str,
    spec: &ChaincodeSpec,
    upload: &[u8],
) -> Result<Bytes, PackageError> {
    fs::create_dir_all(work_root)?;
    let workdir = tempfile::Builder::new()
        .prefix(WORKDIR_PREFIX)
        .tempdir_in(work_root)?;

    let upload_path = workdir.path().join(UPLOAD_FILE);
    fs::write(&upload_path, upload)?;

    let extract_dir = workdir.path().join("extract");
    fs::create_dir(&extract_dir)?;
    tar::Archive::new(GzDecoder::new(File::open(&upload_path)?)).unpack(&extract_dir)?;

    let source_root = source_root(&extract_dir)?;
    let metadata = PackageMetadata {
        name: name.to_string(),
        version: spec.version.clone(),
        language: spec.language,
        path: source_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    tracing::debug!(
        name = %metadata.name,
        version = %metadata.version,
        source = %metadata.path,
        "packaging chaincode"
    );

    let package = build_package(&metadata, &source_root)?;
    tracing::info!(name, bytes = package.len(), "chaincode packaged");
    Ok(Bytes::from(package))
}

/// First top-level directory of the unpacked archive, by name.
fn source_root(extract_dir: &Path) -> Result<PathBuf, PackageError> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(extract_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    dirs.into_iter().next().ok_or(PackageError::NoSourceDirectory)
}

fn build_package(metadata: &PackageMetadata, source_root: &Path) -> Result<Vec<u8>, PackageError> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

    let descriptor = serde_json::to_vec_pretty(metadata)?;
    let mut header = tar::Header::new_gnu();
    header.set_size(descriptor.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, METADATA_FILE, descriptor.as_slice())?;

    builder.append_dir_all(SOURCE_DIR, source_root)?;

    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Read;

    /// Gzip tarball with the given `(path, contents)` entries.
    fn archive(entries: &[(&str, &str)]) -> Bytes {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, contents) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, contents.as_bytes())
                .unwrap();
        }
        Bytes::from(builder.into_inner().unwrap().finish().unwrap())
    }

    fn unpack(package: &[u8]) -> BTreeMap<String, String> {
        let mut files = BTreeMap::new();
        let mut archive = tar::Archive::new(GzDecoder::new(package));
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let path = entry.path().unwrap().to_string_lossy().into_owned();
            let mut contents = String::new();
            entry.read_to_string(&mut contents).unwrap();
            files.insert(path, contents);
        }
        files
    }

    fn spec() -> ChaincodeSpec {
        ChaincodeSpec::new(ChaincodeType::Node, "1.0")
    }

    #[tokio::test]
    async fn test_repackages_source_with_metadata() {
        let work = tempfile::tempdir().unwrap();
        let upload = archive(&[
            ("fabcar/package.json", "{\"name\":\"fabcar\"}"),
            ("fabcar/lib/fabcar.js", "module.exports = {};"),
        ]);

        let package = package_chaincode(work.path(), "fabcar", &spec(), upload)
            .await
            .unwrap();
        let files = unpack(&package);

        assert_eq!(files["src/package.json"], "{\"name\":\"fabcar\"}");
        assert_eq!(files["src/lib/fabcar.js"], "module.exports = {};");

        let metadata: PackageMetadata = serde_json::from_str(&files["metadata.json"]).unwrap();
        assert_eq!(
            metadata,
            PackageMetadata {
                name: "fabcar".into(),
                version: "1.0".into(),
                language: ChaincodeType::Node,
                path: "fabcar".into(),
            }
        );
        assert!(files["metadata.json"].contains("\"type\": \"node\""));
    }

    #[tokio::test]
    async fn test_working_files_removed() {
        let work = tempfile::tempdir().unwrap();
        let upload = archive(&[("cc/main.go", "package main")]);

        package_chaincode(work.path(), "cc", &spec(), upload)
            .await
            .unwrap();
        assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_archive_without_directory_is_rejected() {
        let work = tempfile::tempdir().unwrap();
        let upload = archive(&[("main.go", "package main")]);

        let err = package_chaincode(work.path(), "cc", &spec(), upload)
            .await
            .unwrap_err();
        assert!(matches!(err, PackageError::NoSourceDirectory));
        assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_upload_is_io_error() {
        let work = tempfile::tempdir().unwrap();
        let err = package_chaincode(work.path(), "cc", &spec(), Bytes::from_static(b"not gzip"))
            .await
            .unwrap_err();
        assert!(matches!(err, PackageError::Io(_)));
        assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_source_root_picks_first_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("zeta")).unwrap();
        fs::create_dir(dir.path().join("alpha")).unwrap();
        fs::write(dir.path().join("README"), "x").unwrap();
        assert_eq!(source_root(dir.path()).unwrap(), dir.path().join("alpha"));
    }
}
