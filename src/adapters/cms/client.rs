use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::types::{CollectionNames, StoreConfig};
use crate::domain::dates::format_iso_date;
use crate::domain::resource::{BlockRecord, BookingRecord, BookingStatus, Resource, ResourceId};
use crate::error::{RentalError, Result};
use crate::ports::store::{BlockStore, BookingStore, ResourceStore};

/// List response of a collection endpoint.
#[derive(Debug, Deserialize)]
struct DocsEnvelope {
    #[serde(default)]
    docs: Vec<serde_json::Value>,
}

/// Reads resources, bookings and blocks from a headless CMS REST API
/// (`GET {base}/api/{collection}?where[...]`).
pub struct CmsStore {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    collections: CollectionNames,
}

fn join_ids(ids: &[ResourceId]) -> String {
    ids.iter()
        .map(ResourceId::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

impl CmsStore {
    pub fn new(config: &StoreConfig) -> std::result::Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            collections: config.collections.clone(),
        })
    }

    /// Fetches every matching document of `collection`. Documents that do not
    /// decode as `T` are skipped with a warning.
    async fn find<T: DeserializeOwned>(
        &self,
        collection: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut url = Url::parse(&format!("{}/api/{collection}", self.base_url))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in filters {
                query.append_pair(key, value);
            }
            query
                .append_pair("depth", "0")
                .append_pair("limit", "0")
                .append_pair("pagination", "false");
        }
        debug!(url = %url, "CMS GET request");

        let mut request = self
            .http
            .get(url.as_str())
            .header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(RentalError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RentalError::Store {
                reason: format!("{collection} query returned HTTP {status}"),
            });
        }

        let body = response.text().await.map_err(RentalError::Http)?;
        trace!(collection, body = %body, "CMS raw response");
        let envelope: DocsEnvelope =
            serde_json::from_str(&body).map_err(|e| RentalError::Store {
                reason: format!("{collection} response is not a document list: {e}"),
            })?;

        let total = envelope.docs.len();
        let docs: Vec<T> = envelope
            .docs
            .into_iter()
            .filter_map(|doc| match serde_json::from_value(doc) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    warn!(collection, error = %e, "skipping undecodable document");
                    None
                }
            })
            .collect();
        debug!(collection, total, decoded = docs.len(), "CMS documents received");
        Ok(docs)
    }
}

#[async_trait]
impl ResourceStore for CmsStore {
    async fn get_resource(&self, id: &ResourceId) -> Result<Option<Resource>> {
        Ok(self
            .get_resources(std::slice::from_ref(id))
            .await?
            .into_iter()
            .find(|r| &r.id == id))
    }

    async fn get_resources(&self, ids: &[ResourceId]) -> Result<Vec<Resource>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let resources: Vec<Resource> = self
            .find(
                &self.collections.resources,
                &[
                    ("where[id][in]", join_ids(ids)),
                    ("where[active][equals]", "true".into()),
                ],
            )
            .await?;
        Ok(resources.into_iter().filter(|r| r.active).collect())
    }
}

#[async_trait]
impl BookingStore for CmsStore {
    async fn occupying_bookings(
        &self,
        resource_ids: &[ResourceId],
        from: NaiveDate,
        to_exclusive: NaiveDate,
    ) -> Result<Vec<BookingRecord>> {
        if resource_ids.is_empty() {
            return Ok(Vec::new());
        }
        let statuses = BookingStatus::OCCUPYING
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let bookings: Vec<BookingRecord> = self
            .find(
                &self.collections.bookings,
                &[
                    ("where[resource][in]", join_ids(resource_ids)),
                    ("where[status][in]", statuses),
                    ("where[startDate][less_than]", format_iso_date(to_exclusive)),
                    ("where[endDate][greater_than]", format_iso_date(from)),
                ],
            )
            .await?;
        // The server filter is trusted for dates only; status is rechecked.
        Ok(bookings
            .into_iter()
            .filter(|b| b.status.is_occupying())
            .collect())
    }
}

#[async_trait]
impl BlockStore for CmsStore {
    async fn active_blocks(
        &self,
        resource_ids: &[ResourceId],
        from: NaiveDate,
        to_exclusive: NaiveDate,
    ) -> Result<Vec<BlockRecord>> {
        if resource_ids.is_empty() {
            return Ok(Vec::new());
        }
        let blocks: Vec<BlockRecord> = self
            .find(
                &self.collections.blocks,
                &[
                    ("where[resource][in]", join_ids(resource_ids)),
                    ("where[active][equals]", "true".into()),
                    ("where[dateFrom][less_than]", format_iso_date(to_exclusive)),
                    ("where[dateTo][greater_than]", format_iso_date(from)),
                ],
            )
            .await?;
        Ok(blocks.into_iter().filter(|b| b.active).collect())
    }
}
