//! Registry directory access.
//!
//! A `RegistryStore` is the directory of canonical dApp documents. Reads
//! distinguish "no document yet" from "document present but unreadable";
//! writes go through a temporary file in the same directory that is then
//! persisted over the target, so a valid document is never replaced by a
//! half-written one.

use crate::core::error::RegistryError;
use crate::core::model::DApp;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Handle on a directory of canonical dApp documents.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    /// Absolute or working-directory-relative path to the registry directory
    pub root: PathBuf,
}

/// Outcome of a document write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub path: PathBuf,
    pub bytes: usize,
    /// Lowercase hex SHA-256 of the bytes written.
    pub content_hash: String,
}

impl RegistryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn document_path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Read a canonical document. `Ok(None)` when the file does not exist.
    pub fn read_dapp(&self, file_name: &str) -> Result<Option<DApp>, RegistryError> {
        let path = self.document_path(file_name);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).map_err(RegistryError::IoError)?;
        let dapp = serde_json::from_str(&raw).map_err(|e| {
            RegistryError::ValidationError(format!("invalid dApp document {}: {}", path.display(), e))
        })?;
        Ok(Some(dapp))
    }

    pub fn write_dapp(&self, file_name: &str, dapp: &DApp) -> Result<WriteReceipt, RegistryError> {
        fs::create_dir_all(&self.root).map_err(RegistryError::IoError)?;
        write_json_atomic(&self.document_path(file_name), dapp)
    }

    /// JSON document file names in the registry, sorted. `exclude` names are skipped.
    pub fn list_documents(&self, exclude: &[&str]) -> Result<Vec<String>, RegistryError> {
        list_json_files(&self.root, exclude)
    }
}

/// Sorted `*.json` file names directly under `dir`.
pub fn list_json_files(dir: &Path, exclude: &[&str]) -> Result<Vec<String>, RegistryError> {
    if !dir.is_dir() {
        return Err(RegistryError::NotFound(format!(
            "directory not found: {}",
            dir.display()
        )));
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(RegistryError::IoError)? {
        let entry = entry.map_err(RegistryError::IoError)?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if exclude.contains(&name.as_str()) {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

/// Pretty-printed JSON with a trailing newline.
pub fn to_pretty_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, RegistryError> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Serialize `value` and atomically replace `path` with it.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<WriteReceipt, RegistryError> {
    let bytes = to_pretty_bytes(value)?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(RegistryError::IoError)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(RegistryError::IoError)?;
    tmp.write_all(&bytes).map_err(RegistryError::IoError)?;
    tmp.as_file().sync_all().map_err(RegistryError::IoError)?;
    tmp.persist(path).map_err(|e| RegistryError::IoError(e.error))?;

    Ok(WriteReceipt {
        path: path.to_path_buf(),
        bytes: bytes.len(),
        content_hash: hash_bytes(&bytes),
    })
}
