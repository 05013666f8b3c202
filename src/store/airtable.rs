//! Airtable REST backend.
//!
//! Uses the `v0` records API:
//!
//! - `GET  {api}/v0/{base}/{table}?pageSize=100&offset=..` pages through rows
//! - `POST {api}/v0/{base}/{table}` with `{"records": [{"fields": ..}], "typecast": true}`
//!
//! Airtable accepts at most ten records per create request.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::{Fields, MAX_BATCH, RecordStore, StoredRecord};
use crate::error::StoreError;

pub const DEFAULT_API_URL: &str = "https://api.airtable.com";

#[derive(Debug, Clone)]
pub struct AirtableStore {
    client: reqwest::Client,
    api_url: String,
    base_id: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    records: Vec<StoredRecord>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewRecord<'a> {
    fields: &'a Fields,
}

#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    records: Vec<NewRecord<'a>>,
    typecast: bool,
}

impl AirtableStore {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        base_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            base_id: base_id.into(),
            api_key: api_key.into(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/v0/{}/{}",
            self.api_url,
            urlencoding::encode(&self.base_id),
            urlencoding::encode(table)
        )
    }
}

/// Pass successful responses through; turn anything else into [`StoreError::Status`].
async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

impl RecordStore for AirtableStore {
    #[instrument(level = "info", skip(self))]
    async fn list_records(&self, table: &str) -> Result<Vec<StoredRecord>, StoreError> {
        let url = self.table_url(table);
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .bearer_auth(&self.api_key)
                .query(&[("pageSize", "100")]);
            if let Some(ref cursor) = offset {
                request = request.query(&[("offset", cursor.as_str())]);
            }

            let page: ListResponse = check(request.send().await?)
                .await?
                .json()
                .await
                .map_err(|e| StoreError::Decode(e.to_string()))?;
            debug!(rows = page.records.len(), "Fetched page");
            records.extend(page.records);

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        info!(count = records.len(), "Listed records");
        Ok(records)
    }

    #[instrument(level = "info", skip(self, records), fields(count = records.len()))]
    async fn create_records(&self, table: &str, records: &[Fields]) -> Result<(), StoreError> {
        if records.len() > MAX_BATCH {
            return Err(StoreError::BatchTooLarge(records.len()));
        }
        if records.is_empty() {
            return Ok(());
        }

        let body = CreateRequest {
            records: records.iter().map(|fields| NewRecord { fields }).collect(),
            typecast: true,
        };
        check(
            self.client
                .post(self.table_url(table))
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await?,
        )
        .await?;

        info!("Created records");
        Ok(())
    }
}
