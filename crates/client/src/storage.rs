// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable string key-value storage backing the credential store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::ClientError;

/// Read/write strings by key.
///
/// Writes are batched so that related entries (an access/refresh token pair)
/// land in a single commit.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Delete `remove`, then write `set`, as one commit.
    fn apply(&self, set: &[(&str, &str)], remove: &[&str]) -> Result<(), ClientError>;

    fn set(&self, entries: &[(&str, &str)]) -> Result<(), ClientError> {
        self.apply(entries, &[])
    }

    fn remove(&self, keys: &[&str]) -> Result<(), ClientError> {
        self.apply(&[], keys)
    }
}

fn merge(map: &mut BTreeMap<String, String>, set: &[(&str, &str)], remove: &[&str]) {
    for k in remove {
        map.remove(*k);
    }
    for (k, v) in set {
        map.insert((*k).to_owned(), (*v).to_owned());
    }
}

/// Process-lifetime store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn apply(&self, set: &[(&str, &str)], remove: &[&str]) -> Result<(), ClientError> {
        merge(&mut self.entries.lock(), set, remove);
        Ok(())
    }
}

/// JSON-file store that survives restarts.
///
/// The whole map is held in memory and rewritten atomically (tmp + rename)
/// on every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                ClientError::Storage(format!("failed to parse {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(ClientError::Storage(format!("failed to read {}: {e}", path.display())))
            }
        };
        Ok(Self { path, entries: Mutex::new(entries) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit(&self, entries: &BTreeMap<String, String>) -> Result<(), ClientError> {
        save(&self.path, entries)
            .map_err(|e| ClientError::Storage(format!("failed to write {}: {e}", self.path.display())))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn apply(&self, set: &[(&str, &str)], remove: &[&str]) -> Result<(), ClientError> {
        let mut map = self.entries.lock();
        let mut next = map.clone();
        merge(&mut next, set, remove);
        if next == *map {
            return Ok(());
        }
        self.commit(&next)?;
        *map = next;
        Ok(())
    }
}

/// Write `entries` to `path` atomically (write tmp + rename).
///
/// The temp name carries the PID and a counter so concurrent saves never
/// share a tmp file.
fn save(path: &Path, entries: &BTreeMap<String, String>) -> std::io::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let json = serde_json::to_string_pretty(entries)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
