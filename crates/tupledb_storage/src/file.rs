//! File-based storage backend persisting rows as newline-delimited JSON.

use crate::backend::{apply_writes, StorageBackend};
use crate::error::{StorageError, StorageResult};
use crate::sorted;
use crate::types::{KeyValuePair, ScanQuery, WriteOps};
use parking_lot::RwLock;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tupledb_codec::{value_from_json, value_to_json};

/// A file-based storage backend.
///
/// Rows live in memory in a sorted vector and are persisted as one JSON
/// object per line (`{"key": [...], "value": ...}`). A missing file reads
/// as an empty dataset rather than an error; the parent directory is
/// created on open. Every commit rewrites the file through a temporary
/// sibling and an atomic rename.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use tupledb_storage::FileBackend;
///
/// let backend = FileBackend::open(Path::new("data/people.ndjson")).unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    rows: RwLock<Vec<KeyValuePair>>,
    closed: bool,
}

impl FileBackend {
    /// Opens a file backend, loading any existing rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created, the file
    /// cannot be read, or a persisted row fails to parse.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut rows = Vec::new();
        match fs::File::open(path) {
            Ok(file) => {
                for line in BufReader::new(file).lines() {
                    let line = line?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    sorted::upsert(&mut rows, parse_row(&line)?);
                }
            }
            // A database that was never written is just empty.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        Ok(Self {
            path: path.to_path_buf(),
            rows: RwLock::new(rows),
            closed: false,
        })
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }

    fn persist(&self, rows: &[KeyValuePair]) -> StorageResult<()> {
        let tmp_path = self.path.with_extension("tmp");
        {
            let file = fs::File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            for row in rows {
                let line = serialize_row(row)?;
                writer.write_all(line.as_bytes())?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn serialize_row(row: &KeyValuePair) -> StorageResult<String> {
    let key: Vec<serde_json::Value> = row
        .key
        .iter()
        .map(value_to_json)
        .collect::<Result<_, _>>()
        .map_err(|err| StorageError::Corrupted(format!("unencodable key: {err}")))?;
    let value = value_to_json(&row.value)
        .map_err(|err| StorageError::Corrupted(format!("unencodable value: {err}")))?;
    let json = serde_json::json!({ "key": key, "value": value });
    serde_json::to_string(&json).map_err(|err| StorageError::Corrupted(err.to_string()))
}

fn parse_row(line: &str) -> StorageResult<KeyValuePair> {
    let json: serde_json::Value = serde_json::from_str(line)
        .map_err(|err| StorageError::Corrupted(format!("malformed row: {err}")))?;
    let key_json = json
        .get("key")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| StorageError::Corrupted("row is missing a key array".to_string()))?;
    let value_json = json
        .get("value")
        .ok_or_else(|| StorageError::Corrupted("row is missing a value".to_string()))?;

    let key = key_json
        .iter()
        .map(value_from_json)
        .collect::<Result<_, _>>()
        .map_err(|err| StorageError::Corrupted(format!("bad key element: {err}")))?;
    let value = value_from_json(value_json)
        .map_err(|err| StorageError::Corrupted(format!("bad value: {err}")))?;
    Ok(KeyValuePair { key, value })
}

impl StorageBackend for FileBackend {
    fn scan(&self, query: &ScanQuery) -> StorageResult<Vec<KeyValuePair>> {
        self.ensure_open()?;
        let rows = self.rows.read();
        Ok(sorted::scan(&rows, query)?.into_iter().cloned().collect())
    }

    fn commit(&mut self, writes: &WriteOps) -> StorageResult<()> {
        self.ensure_open()?;
        let mut rows = self.rows.write();
        // Apply to a copy so a failed persist leaves memory and file agreeing.
        let mut next = rows.clone();
        apply_writes(&mut next, writes);
        self.persist(&next)?;
        *rows = next;
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        self.closed = true;
        Ok(())
    }
}
