//! In-memory adapter.

use crate::tables::Tables;
use crate::{Document, DocumentStore, Query, StoreError, StoreResult, WriteOutcome};
use std::sync::RwLock;

/// Process-local document store. Contents are lost when the value is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn insert(&self, table: &str, document: Document) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        tables.insert(table, document)
    }

    fn update(&self, table: &str, document: Document, matching: &Query) -> StoreResult<usize> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        tables.update(table, document, matching)
    }

    fn upsert(
        &self,
        table: &str,
        document: Document,
        matching: &Query,
    ) -> StoreResult<WriteOutcome> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        tables.upsert(table, document, matching)
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
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        tables.drop_table(table);
        Ok(())
    }
}
