//! Source registry backed by the sources table.
//!
//! Rows carry `Name`, `URL` and optional `Category`. Extraction rules are not
//! stored; they are derived from the URL when the row is read.

use tracing::{info, instrument, warn};

use crate::error::StoreError;
use crate::models::Source;
use crate::store::RecordStore;

pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// Read all usable sources, in table order.
///
/// Rows missing a name or URL are skipped. An unreachable store is an error.
#[instrument(level = "info", skip(store))]
pub async fn fetch_sources<S: RecordStore>(store: &S, table: &str) -> Result<Vec<Source>, StoreError> {
    let rows = store.list_records(table).await?;

    let sources: Vec<Source> = rows
        .iter()
        .filter_map(|row| match (row.text("Name"), row.text("URL")) {
            (Some(name), Some(url)) => {
                let category = row.text("Category").unwrap_or(DEFAULT_CATEGORY);
                Some(Source::new(name, url, category))
            }
            _ => {
                warn!(id = %row.id, "Skipping source row without Name or URL");
                None
            }
        })
        .collect();

    info!(count = sources.len(), "Fetched sources");
    Ok(sources)
}
