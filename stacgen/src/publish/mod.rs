//! Delivery of items to the catalog API.
//!
//! Items are created with `POST {base}/collections/{collection}/items`. When
//! the item already exists (409) it is replaced with
//! `PUT {base}/collections/{collection}/items/{id}`. Any status other than
//! 200/201 is retried after a fixed delay, up to a bounded number of
//! attempts. Transport errors end the publish immediately.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::CatalogSettings;
use crate::error::{Classify, ErrorClass};
use crate::http::{AsyncHttpClient, HttpError};
use crate::item::CatalogItem;

/// Errors raised while publishing.
#[derive(Debug, Error)]
pub enum PublishError {
    /// No catalog API URL is configured
    #[error("catalog API URL is not configured")]
    ConfigMissing,

    /// Every attempt got a non-success status
    #[error("publishing {item_id} failed after {attempts} attempt(s), last status {last_status}")]
    PublishExhausted {
        item_id: String,
        attempts: u32,
        last_status: u16,
    },

    /// The catalog API could not be reached
    #[error(transparent)]
    Transport(#[from] HttpError),

    /// The item could not be serialized
    #[error("failed to serialize item: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Classify for PublishError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::ConfigMissing => ErrorClass::FatalToJob,
            Self::PublishExhausted { .. } => ErrorClass::Retryable,
            Self::Transport(e) => e.class(),
            Self::Serialize(_) => ErrorClass::FatalToJob,
        }
    }
}

/// Publishes items to a STAC transaction API.
#[derive(Debug, Clone)]
pub struct CatalogPublisher<C> {
    client: C,
    base_url: Option<String>,
    max_retries: u32,
    retry_delay: Duration,
}

impl<C: AsyncHttpClient> CatalogPublisher<C> {
    pub fn new(client: C, settings: &CatalogSettings) -> Self {
        Self {
            client,
            base_url: settings
                .api_url
                .as_deref()
                .map(|url| url.trim_end_matches('/').to_string()),
            max_retries: settings.max_retries.max(1),
            retry_delay: settings.retry_delay(),
        }
    }

    /// Whether an API URL is configured.
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// URL of the collection's items endpoint.
    pub fn items_url(&self, collection: &str) -> Result<String, PublishError> {
        let base = self.base_url.as_deref().ok_or(PublishError::ConfigMissing)?;
        Ok(format!("{}/collections/{}/items", base, collection))
    }

    /// URL of one item.
    pub fn item_url(&self, collection: &str, item_id: &str) -> Result<String, PublishError> {
        Ok(format!("{}/{}", self.items_url(collection)?, item_id))
    }

    /// Creates or replaces the item and returns its URL.
    pub async fn publish(
        &self,
        item: &CatalogItem,
        collection: &str,
    ) -> Result<String, PublishError> {
        let items_url = self.items_url(collection)?;
        let item_url = self.item_url(collection, &item.id)?;

        let mut document = item.to_document();
        if let Some(doc) = document.as_object_mut() {
            doc.insert(
                "collection".to_string(),
                serde_json::Value::String(collection.to_string()),
            );
        }
        let body = serde_json::to_string(&document)?;

        let mut last_status = 0;
        for attempt in 1..=self.max_retries {
            debug!(item_id = %item.id, attempt, url = %items_url, "Publishing item");

            let mut response = self.client.post_json(&items_url, &body).await?;
            if response.status == 409 {
                debug!(item_id = %item.id, url = %item_url, "Item exists, updating");
                response = self.client.put_json(&item_url, &body).await?;
            }

            if matches!(response.status, 200 | 201) {
                info!(item_id = %item.id, url = %item_url, attempt, "Item published");
                return Ok(item_url);
            }

            last_status = response.status;
            warn!(
                item_id = %item.id,
                status = response.status,
                attempt,
                max_retries = self.max_retries,
                "Publish attempt failed"
            );
            if attempt < self.max_retries {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(PublishError::PublishExhausted {
            item_id: item.id.clone(),
            attempts: self.max_retries,
            last_status,
        })
    }
}
