// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content-addressed document spool.  Documents are stored under their
// SHA-256 digest, so resubmitting the same track reuses the same file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use spielwerk_core::error::Result;

/// Lowercase hex SHA-256 of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Reference to a spooled document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    path: PathBuf,
    digest: String,
    size: u64,
}

impl DocumentHandle {
    /// Wrap an existing file, hashing its contents.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = fs::read(&path)?;
        Ok(Self {
            digest: hash_bytes(&data),
            size: data.len() as u64,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// A spool directory.
#[derive(Debug, Clone)]
pub struct Spool {
    dir: PathBuf,
}

impl Spool {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `data` into the spool and return its handle.
    ///
    /// Each call writes its own uniquely named temporary file and renames it
    /// over the digest name, so concurrent stores of the same bytes all
    /// succeed and a reader never sees a partial file.
    pub fn store(&self, data: &[u8]) -> Result<DocumentHandle> {
        let digest = hash_bytes(data);
        let path = self.dir.join(&digest);
        if !path.exists() {
            let mut partial = NamedTempFile::new_in(&self.dir)?;
            partial.write_all(data)?;
            partial.flush()?;
            partial.persist(&path).map_err(|e| e.error)?;
            debug!(digest = %digest, size = data.len(), "document spooled");
        }
        Ok(DocumentHandle {
            path,
            digest,
            size: data.len() as u64,
        })
    }

    pub fn remove(&self, handle: &DocumentHandle) -> Result<()> {
        match fs::remove_file(handle.path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
