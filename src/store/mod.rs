//! Tabular record storage.
//!
//! The pipeline only needs two operations from its store: list every record in
//! a table, and append a small batch of records. [`RecordStore`] captures
//! exactly that; [`airtable::AirtableStore`] is the production backend.
//!
//! A single store handle is built at startup and shared by the source
//! registry and the persist gate.

pub mod airtable;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Column name → value for one row.
pub type Fields = Map<String, Value>;

/// Upper bound on records per `create_records` call.
pub const MAX_BATCH: usize = 10;

/// A row as returned by the store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
}

impl StoredRecord {
    /// String value of `field`, if present and non-blank.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

pub trait RecordStore {
    /// Every record in `table`, following pagination to the end.
    async fn list_records(&self, table: &str) -> Result<Vec<StoredRecord>, StoreError>;

    /// Append up to [`MAX_BATCH`] records to `table`.
    async fn create_records(&self, table: &str, records: &[Fields]) -> Result<(), StoreError>;
}
