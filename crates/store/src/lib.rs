//! # Clinic Store
//!
//! A small embedded document store used by the clinic crates.
//!
//! Documents are JSON objects grouped into named tables. Callers select documents with a
//! [`Query`] expression (field equality, array membership, boolean combinators) which each
//! adapter evaluates itself, so the reconciliation logic never depends on a particular
//! engine's query DSL.
//!
//! Two adapters are provided:
//! - [`MemoryStore`]: process-local tables, used for tests and one-shot runs.
//! - [`JsonFileStore`]: the same tables persisted to a single JSON file after every write.
//!
//! **No cross-document transactions**: every call is applied on its own. A caller that
//! performs several writes must tolerate a failure part-way through.

mod json_file;
mod memory;
pub mod query;
mod tables;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use query::{field, Field, Query};

use std::path::PathBuf;

/// A stored record: always a JSON object.
pub type Document = serde_json::Value;

/// Errors returned by store adapters.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store file I/O failed ({path}): {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store file is corrupt ({path}): {source}", path = path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize store contents: {0}")]
    Serialization(serde_json::Error),
    #[error("store lock poisoned")]
    LockPoisoned,
    #[error("documents in table '{table}' must be JSON objects")]
    NotADocument { table: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result of an upsert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No document matched; the document was appended.
    Inserted,
    /// This many matching documents were replaced.
    Replaced(usize),
}

/// Keyed document storage with query-by-predicate.
///
/// Implementations are shared behind `Arc<dyn DocumentStore>` and use interior locking, but
/// they do not coordinate multi-step read-modify-write sequences. Callers must serialise
/// writers themselves.
pub trait DocumentStore: Send + Sync {
    /// Appends a document to `table`, creating the table if needed.
    fn insert(&self, table: &str, document: Document) -> StoreResult<()>;

    /// Replaces every document matching `matching` with `document`.
    ///
    /// Returns the number of replaced documents (zero when nothing matched).
    fn update(&self, table: &str, document: Document, matching: &Query) -> StoreResult<usize>;

    /// Replaces matching documents, or inserts `document` when nothing matches.
    fn upsert(&self, table: &str, document: Document, matching: &Query)
        -> StoreResult<WriteOutcome>;

    /// Returns all documents in `table` matching `query`, in insertion order.
    fn search(&self, table: &str, query: &Query) -> StoreResult<Vec<Document>>;

    /// Returns the first document matching `query`.
    ///
    /// The store does not check uniqueness; callers that expect at most one match should
    /// use [`DocumentStore::search`] and inspect the count.
    fn get(&self, table: &str, query: &Query) -> StoreResult<Option<Document>> {
        Ok(self.search(table, query)?.into_iter().next())
    }

    /// Returns every document in `table`.
    fn all(&self, table: &str) -> StoreResult<Vec<Document>> {
        self.search(table, &Query::All)
    }

    /// Number of documents in `table` (zero for unknown tables).
    fn len(&self, table: &str) -> StoreResult<usize>;

    /// Removes `table` and all of its documents.
    fn drop_table(&self, table: &str) -> StoreResult<()>;
}
