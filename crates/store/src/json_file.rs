//! JSON-file-backed adapter.
//!
//! The whole database lives in one file shaped as `{ "<table>": [document, ...] }`. Every
//! mutating call rewrites the file through a sibling temporary file and a rename, so a crash
//! mid-write leaves either the previous or the new contents on disk.

use crate::tables::Tables;
use crate::{Document, DocumentStore, Query, StoreError, StoreResult, WriteOutcome};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Document store persisted to a single JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    tables: RwLock<Tables>,
}

impl JsonFileStore {
    /// Opens the store at `path`, creating the file (and its parent directories) if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file or directories cannot be read or created, and
    /// [`StoreError::Corrupt`] if the existing file is not a valid store.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let tables = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if contents.trim().is_empty() {
                Tables::default()
            } else {
                serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            let tables = Tables::default();
            write_atomically(&path, &tables)?;
            tables
        };

        tracing::debug!("opened document store at {}", path.display());

        Ok(Self {
            path,
            tables: RwLock::new(tables),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy of the tables under the write lock, persists the copy and
    /// only then makes it visible.
    ///
    /// If `change` or the write fails, readers keep seeing the previous contents.
    fn mutate<T>(&self, change: impl FnOnce(&mut Tables) -> StoreResult<T>) -> StoreResult<T> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut next = tables.clone();
        let result = change(&mut next)?;
        write_atomically(&self.path, &next)?;
        *tables = next;
        Ok(result)
    }
}

impl DocumentStore for JsonFileStore {
    fn insert(&self, table: &str, document: Document) -> StoreResult<()> {
        self.mutate(|tables| tables.insert(table, document))
    }

    fn update(&self, table: &str, document: Document, matching: &Query) -> StoreResult<usize> {
        self.mutate(|tables| tables.update(table, document, matching))
    }

    fn upsert(
        &self,
        table: &str,
        document: Document,
        matching: &Query,
    ) -> StoreResult<WriteOutcome> {
        self.mutate(|tables| tables.upsert(table, document, matching))
    }

    fn search(&self, table: &str, query: &Query) -> StoreResult<Vec<Document>> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables.search(table, query))
    }

    fn len(&self, table: &str) -> StoreResult<usize> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables.len(table))
    }

    fn drop_table(&self, table: &str) -> StoreResult<()> {
        self.mutate(|tables| {
            tables.drop_table(table);
            Ok(())
        })
    }
}

fn write_atomically(path: &Path, tables: &Tables) -> StoreResult<()> {
    let contents = serde_json::to_string_pretty(tables).map_err(StoreError::Serialization)?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, contents).map_err(|source| StoreError::Io {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}
