//! Snapshot Module
//!
//! Full-content snapshots of the cache, stored as a single JSON document in a
//! file that stays open for the life of the service.
//!
//! Every write truncates the file and rewrites it from the start. A crash in
//! between leaves a truncated or partial document behind; `load` then fails
//! with a serialization error rather than guessing.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::cache::Cache;
use crate::storage::item::{Item, Key};

// == Document Format ==
/// One persisted key and its item.
///
/// Byte strings are kept as plain arrays so any key or value survives JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// Unix nanoseconds, 0 = never expires
    pub expires_at: i64,
}

/// Top-level snapshot document.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub entries: Vec<SnapshotEntry>,
}

impl SnapshotDocument {
    /// Captures every entry currently in `cache`.
    pub fn capture(cache: &Cache) -> Self {
        let entries = cache
            .iter()
            .map(|(key, item)| SnapshotEntry {
                key: key.to_vec(),
                value: item.value.to_vec(),
                expires_at: item.expires_at,
            })
            .collect();
        Self { entries }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Consumes the document into `(key, item)` pairs.
    pub fn into_items(self) -> impl Iterator<Item = (Key, Item)> {
        self.entries.into_iter().map(|entry| {
            (
                Bytes::from(entry.key),
                Item {
                    value: Bytes::from(entry.value),
                    expires_at: entry.expires_at,
                },
            )
        })
    }
}

// == Snapshot File ==
/// The persistence medium: one read/write file handle.
#[derive(Debug)]
pub struct SnapshotFile {
    path: PathBuf,
    file: Option<File>,
}

impl SnapshotFile {
    /// Opens `path` for reading and writing, creating it if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // == Replace ==
    /// Replaces the whole file content with `contents`.
    pub fn replace(&mut self, contents: &[u8]) -> Result<()> {
        let file = self.handle()?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(contents)?;
        file.sync_data()?;
        Ok(())
    }

    // == Read All ==
    /// Reads the whole file content from the start.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let file = self.handle()?;
        file.seek(SeekFrom::Start(0))?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        Ok(contents)
    }

    /// Releases the file handle. Safe to call more than once.
    pub fn close(&mut self) -> bool {
        self.file.take().is_some()
    }

    fn handle(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotConnected,
                format!("snapshot file {} closed", self.path.display()),
            )
            .into()
        })
    }
}
