//! Query expressions over JSON documents.
//!
//! A [`Query`] is a plain sum type so that adapters can evaluate it directly and callers
//! can build it without knowing which adapter is in use:
//!
//! ```
//! use clinic_store::{field, Query};
//!
//! let open_for_patient = field("patient_id").eq("patient1") & field("status").eq("Open");
//! let owns_task = field("task_ids").contains("task1") & !field("id").eq("req-1");
//! assert!(matches!(open_for_patient, Query::And(_)));
//! assert!(matches!(owns_task, Query::And(_)));
//! ```
//!
//! Field paths are dot-separated (`"meta.source"`) and only traverse JSON objects.

use serde_json::Value;
use std::ops::{BitAnd, BitOr, Not};

/// A predicate over a single document.
#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    /// Matches every document.
    All,
    /// The field exists and equals the value.
    Eq(String, Value),
    /// The field exists and differs from the value.
    Ne(String, Value),
    /// The field is an array containing the value.
    Contains(String, Value),
    /// The field exists and equals one of the values.
    OneOf(String, Vec<Value>),
    /// Every sub-query matches (an empty conjunction matches everything).
    And(Vec<Query>),
    /// At least one sub-query matches (an empty disjunction matches nothing).
    Or(Vec<Query>),
    /// The sub-query does not match.
    Not(Box<Query>),
}

/// Starts a query on the field at `path`.
pub fn field(path: impl Into<String>) -> Field {
    Field(path.into())
}

/// A field path awaiting a comparison.
#[derive(Clone, Debug)]
pub struct Field(String);

impl Field {
    pub fn eq(self, value: impl Into<Value>) -> Query {
        Query::Eq(self.0, value.into())
    }

    pub fn ne(self, value: impl Into<Value>) -> Query {
        Query::Ne(self.0, value.into())
    }

    pub fn contains(self, value: impl Into<Value>) -> Query {
        Query::Contains(self.0, value.into())
    }

    pub fn one_of<I, V>(self, values: I) -> Query
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Query::OneOf(self.0, values.into_iter().map(Into::into).collect())
    }
}

impl Query {
    /// Conjunction of `self` and `other`, flattening nested conjunctions.
    pub fn and(self, other: Query) -> Query {
        match (self, other) {
            (Query::And(mut left), Query::And(right)) => {
                left.extend(right);
                Query::And(left)
            }
            (Query::And(mut left), right) => {
                left.push(right);
                Query::And(left)
            }
            (left, Query::And(mut right)) => {
                right.insert(0, left);
                Query::And(right)
            }
            (left, right) => Query::And(vec![left, right]),
        }
    }

    /// Disjunction of `self` and `other`, flattening nested disjunctions.
    pub fn or(self, other: Query) -> Query {
        match (self, other) {
            (Query::Or(mut left), Query::Or(right)) => {
                left.extend(right);
                Query::Or(left)
            }
            (Query::Or(mut left), right) => {
                left.push(right);
                Query::Or(left)
            }
            (left, Query::Or(mut right)) => {
                right.insert(0, left);
                Query::Or(right)
            }
            (left, right) => Query::Or(vec![left, right]),
        }
    }

    /// Evaluates the query against one document.
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Query::All => true,
            Query::Eq(path, value) => lookup(document, path) == Some(value),
            Query::Ne(path, value) => lookup(document, path).is_some_and(|v| v != value),
            Query::Contains(path, value) => match lookup(document, path) {
                Some(Value::Array(items)) => items.contains(value),
                _ => false,
            },
            Query::OneOf(path, values) => {
                lookup(document, path).is_some_and(|found| values.contains(found))
            }
            Query::And(queries) => queries.iter().all(|q| q.matches(document)),
            Query::Or(queries) => queries.iter().any(|q| q.matches(document)),
            Query::Not(query) => !query.matches(document),
        }
    }
}

impl BitAnd for Query {
    type Output = Query;

    fn bitand(self, rhs: Query) -> Query {
        self.and(rhs)
    }
}

impl BitOr for Query {
    type Output = Query;

    fn bitor(self, rhs: Query) -> Query {
        self.or(rhs)
    }
}

impl Not for Query {
    type Output = Query;

    fn not(self) -> Query {
        match self {
            Query::Not(inner) => *inner,
            other => Query::Not(Box::new(other)),
        }
    }
}

/// Resolves a dot-separated path inside nested objects.
fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}
