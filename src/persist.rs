//! Dedup/persist gate for the articles table.
//!
//! Every call scans the full table for existing URLs, drops records already
//! stored (or repeated within the call), and appends the rest in batches of
//! [`MAX_BATCH`]. There is no lock between the scan and the writes: two runs
//! overlapping in time can both write the same URL.

use std::collections::HashSet;

use itertools::Itertools;
use serde_json::{Value, json};
use tracing::{error, info, instrument};

use crate::error::StoreError;
use crate::models::CuratedRecord;
use crate::store::{Fields, MAX_BATCH, RecordStore};
use crate::utils::today_utc;

/// Column names of the articles table.
pub mod field {
    pub const INDEX: &str = "Article #";
    pub const PUBLISH_DATE: &str = "Publish Date";
    pub const TITLE: &str = "Title";
    pub const SUMMARY: &str = "Summary";
    pub const TAGS: &str = "Tags";
    pub const SOURCE: &str = "Source";
    pub const URL: &str = "URL";
}

/// Write the records whose URL is not yet stored. Returns how many were written.
///
/// A failing batch aborts the remaining ones; batches already written stay.
#[instrument(level = "info", skip(store, records), fields(candidates = records.len()))]
pub async fn persist<S: RecordStore>(
    store: &S,
    table: &str,
    records: &[CuratedRecord],
) -> Result<usize, StoreError> {
    let existing = store.list_records(table).await?;
    let existing_urls: HashSet<&str> = existing.iter().filter_map(|row| row.text(field::URL)).collect();

    let fresh: Vec<&CuratedRecord> = records
        .iter()
        .filter(|record| !existing_urls.contains(record.url()))
        .unique_by(|&record| record.url())
        .collect();

    if fresh.is_empty() {
        info!(existing = existing.len(), "No new articles to add");
        return Ok(0);
    }

    let today = today_utc();
    let rows: Vec<Fields> = fresh
        .iter()
        .enumerate()
        .map(|(i, record)| to_fields(record, existing.len() + i + 1, &today))
        .collect();

    for (batch_no, batch) in rows.chunks(MAX_BATCH).enumerate() {
        if let Err(e) = store.create_records(table, batch).await {
            error!(batch = batch_no, written = batch_no * MAX_BATCH, error = %e, "Batch write failed");
            return Err(e);
        }
    }

    info!(
        written = rows.len(),
        skipped = records.len() - rows.len(),
        "Added new articles"
    );
    Ok(rows.len())
}

fn to_fields(record: &CuratedRecord, index: usize, today: &str) -> Fields {
    let stub = &record.article.stub;
    let publish_date = if stub.publish_date.is_empty() {
        today.to_string()
    } else {
        stub.publish_date.clone()
    };

    let mut fields = Fields::new();
    fields.insert(field::INDEX.to_string(), json!(index));
    fields.insert(field::PUBLISH_DATE.to_string(), Value::String(publish_date));
    fields.insert(field::TITLE.to_string(), Value::String(stub.title.clone()));
    fields.insert(field::SUMMARY.to_string(), Value::String(record.summary.clone()));
    fields.insert(field::TAGS.to_string(), json!(record.tags));
    fields.insert(field::SOURCE.to_string(), Value::String(stub.source_name.clone()));
    fields.insert(field::URL.to_string(), Value::String(stub.url.clone()));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, ArticleStub};
    use crate::store::testing::MemoryStore;

    const TABLE: &str = "Articles";

    fn record(n: usize) -> CuratedRecord {
        CuratedRecord {
            article: Article::new(
                ArticleStub {
                    title: format!("Story {n}"),
                    url: format!("https://news.example.com/{n}"),
                    source_name: "Example".to_string(),
                    category: "Tech".to_string(),
                    publish_date: if n % 2 == 0 { "2025-05-06".to_string() } else { String::new() },
                },
                "body".to_string(),
            ),
            summary: format!("Summary {n}"),
            tags: vec!["AI".to_string(), "Chips".to_string()],
        }
    }

    fn urls(store: &MemoryStore) -> Vec<String> {
        store
            .rows(TABLE)
            .iter()
            .filter_map(|r| r.text(field::URL).map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn test_twelve_records_write_two_batches_in_order() {
        let store = MemoryStore::default();
        let records: Vec<_> = (1..=12).map(record).collect();

        let written = persist(&store, TABLE, &records).await.unwrap();
        assert_eq!(written, 12);
        assert_eq!(*store.batches.borrow(), vec![10, 2]);

        let expected: Vec<_> = (1..=12).map(|n| format!("https://news.example.com/{n}")).collect();
        assert_eq!(urls(&store), expected);
    }

    #[tokio::test]
    async fn test_skips_existing_and_continues_index() {
        let store = MemoryStore::default();
        persist(&store, TABLE, &[record(1), record(2)]).await.unwrap();

        let written = persist(&store, TABLE, &[record(2), record(3)]).await.unwrap();
        assert_eq!(written, 1);

        let rows = store.rows(TABLE);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].fields[field::INDEX], json!(3));
        assert_eq!(rows[2].text(field::URL), Some("https://news.example.com/3"));
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let store = MemoryStore::default();
        let records: Vec<_> = (1..=4).map(record).collect();

        assert_eq!(persist(&store, TABLE, &records).await.unwrap(), 4);
        assert_eq!(persist(&store, TABLE, &records).await.unwrap(), 0);
        assert_eq!(store.rows(TABLE).len(), 4);
        assert_eq!(store.batches.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicates_within_one_call_are_written_once() {
        let store = MemoryStore::default();
        let written = persist(&store, TABLE, &[record(1), record(1), record(2)])
            .await
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(urls(&store).len(), 2);
    }

    #[tokio::test]
    async fn test_fields_mapping() {
        let store = MemoryStore::default();
        persist(&store, TABLE, &[record(1), record(2)]).await.unwrap();

        let rows = store.rows(TABLE);
        let first = &rows[0].fields;
        assert_eq!(first[field::INDEX], json!(1));
        assert_eq!(first[field::TITLE], json!("Story 1"));
        assert_eq!(first[field::SUMMARY], json!("Summary 1"));
        assert_eq!(first[field::TAGS], json!(["AI", "Chips"]));
        assert_eq!(first[field::SOURCE], json!("Example"));
        assert_eq!(first[field::PUBLISH_DATE], json!(today_utc()));
        assert_eq!(rows[1].fields[field::PUBLISH_DATE], json!("2025-05-06"));
    }

    #[tokio::test]
    async fn test_failed_batch_aborts_rest_and_keeps_written() {
        let store = MemoryStore::default().failing_create_at(1);
        let records: Vec<_> = (1..=25).map(record).collect();

        let err = persist(&store, TABLE, &records).await.unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 422, .. }));
        assert_eq!(*store.batches.borrow(), vec![10]);
        assert_eq!(store.rows(TABLE).len(), 10);
    }

    #[tokio::test]
    async fn test_scan_failure_propagates() {
        let store = MemoryStore::default().failing_list();
        assert!(persist(&store, TABLE, &[record(1)]).await.is_err());
        assert!(store.batches.borrow().is_empty());
    }
}
