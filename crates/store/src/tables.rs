//! Table storage shared by the adapters.

use crate::{Document, Query, StoreError, StoreResult, WriteOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named tables of documents, each kept in insertion order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Tables(BTreeMap<String, Vec<Document>>);

impl Tables {
    pub(crate) fn insert(&mut self, table: &str, document: Document) -> StoreResult<()> {
        ensure_document(table, &document)?;
        self.0.entry(table.to_owned()).or_default().push(document);
        Ok(())
    }

    pub(crate) fn update(
        &mut self,
        table: &str,
        document: Document,
        matching: &Query,
    ) -> StoreResult<usize> {
        ensure_document(table, &document)?;
        let Some(rows) = self.0.get_mut(table) else {
            return Ok(0);
        };

        let mut replaced = 0;
        for row in rows.iter_mut().filter(|row| matching.matches(row)) {
            *row = document.clone();
            replaced += 1;
        }
        Ok(replaced)
    }

    pub(crate) fn upsert(
        &mut self,
        table: &str,
        document: Document,
        matching: &Query,
    ) -> StoreResult<WriteOutcome> {
        match self.update(table, document.clone(), matching)? {
            0 => {
                self.insert(table, document)?;
                Ok(WriteOutcome::Inserted)
            }
            n => Ok(WriteOutcome::Replaced(n)),
        }
    }

    pub(crate) fn search(&self, table: &str, query: &Query) -> Vec<Document> {
        self.0
            .get(table)
            .map(|rows| rows.iter().filter(|row| query.matches(row)).cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn len(&self, table: &str) -> usize {
        self.0.get(table).map_or(0, Vec::len)
    }

    pub(crate) fn drop_table(&mut self, table: &str) {
        self.0.remove(table);
    }
}

fn ensure_document(table: &str, document: &Document) -> StoreResult<()> {
    if document.is_object() {
        Ok(())
    } else {
        Err(StoreError::NotADocument {
            table: table.to_owned(),
        })
    }
}
