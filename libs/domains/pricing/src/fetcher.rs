//! Bulk Price List API client.
//!
//! https://docs.aws.amazon.com/awsaccountbilling/latest/aboutv2/using-the-aws-price-list-bulk-api.html

use async_trait::async_trait;
use observability::{CatalogMetrics, FetchOutcome};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::PricingConfig;
use crate::error::FetchError;
use crate::models::PriceListUrls;

/// Public bulk pricing endpoint
pub const DEFAULT_BASE_URL: &str = "https://pricing.us-east-1.amazonaws.com";

/// Location of one bulk file for a service/region
pub fn price_list_url(base_url: &str, service_code: &str, region: &str, extension: &str) -> String {
    format!("{base_url}/offers/v1.0/aws/{service_code}/current/{region}/index.{extension}")
}

/// Both bulk file formats for a service/region; no network access
pub fn price_list_urls(base_url: &str, service_code: &str, region: &str) -> PriceListUrls {
    PriceListUrls {
        service_code: service_code.to_string(),
        region: region.to_string(),
        csv: price_list_url(base_url, service_code, region, "csv"),
        json: price_list_url(base_url, service_code, region, "json"),
    }
}

/// Source of raw bulk pricing documents
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceListFetcher: Send + Sync {
    /// Retrieve one region's price list for a service
    async fn fetch_price_list(&self, service_code: &str, region: &str) -> Result<Value, FetchError>;

    /// Service codes with a published price list, in index order
    async fn fetch_service_index(&self) -> Result<Vec<String>, FetchError>;

    /// Regions a service publishes price lists for
    async fn fetch_region_index(&self, service_code: &str) -> Result<Vec<String>, FetchError>;
}

/// `PriceListFetcher` backed by the public HTTP bulk API
pub struct HttpPriceListFetcher {
    client: Client,
    base_url: String,
    fetch_timeout: Duration,
    index_timeout: Duration,
}

impl HttpPriceListFetcher {
    pub fn new(config: &PricingConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.clone(),
            fetch_timeout: config.fetch_timeout,
            index_timeout: config.index_timeout,
        }
    }

    /// GET a JSON document; 403/404 become `not_found`.
    async fn get_json(
        &self,
        url: &str,
        timeout: Duration,
        not_found: impl FnOnce() -> FetchError,
    ) -> Result<Value, FetchError> {
        debug!(url = url, "Fetching pricing document");

        let transport = |message: String| FetchError::Transport {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
            return Err(not_found());
        }
        if !status.is_success() {
            warn!(status = %status, url = url, "Pricing API returned non-success status");
            return Err(transport(format!("unexpected status {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| FetchError::Malformed {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Keys of a top-level object member, in document order
    fn object_keys(document: &Value, member: &str, url: &str) -> Result<Vec<String>, FetchError> {
        document
            .get(member)
            .and_then(Value::as_object)
            .map(|object| object.keys().cloned().collect())
            .ok_or_else(|| FetchError::Malformed {
                url: url.to_string(),
                message: format!("missing '{member}' object"),
            })
    }
}

#[async_trait]
impl PriceListFetcher for HttpPriceListFetcher {
    async fn fetch_price_list(&self, service_code: &str, region: &str) -> Result<Value, FetchError> {
        let url = price_list_url(&self.base_url, service_code, region, "json");
        info!(service_code = service_code, region = region, "Fetching bulk price list");

        let started = Instant::now();
        let result = self
            .get_json(&url, self.fetch_timeout, || FetchError::NotFound {
                service_code: service_code.to_string(),
                region: Some(region.to_string()),
            })
            .await;

        let outcome = match &result {
            Ok(_) => FetchOutcome::Success,
            Err(FetchError::NotFound { .. }) => FetchOutcome::NotFound,
            Err(FetchError::Transport { .. }) => FetchOutcome::Transport,
            Err(FetchError::Malformed { .. }) => FetchOutcome::Malformed,
        };
        CatalogMetrics::record_fetch(service_code, region, outcome, started.elapsed());

        result
    }

    async fn fetch_service_index(&self) -> Result<Vec<String>, FetchError> {
        let url = format!("{}/offers/v1.0/aws/index.json", self.base_url);
        let document = self
            .get_json(&url, self.index_timeout, || FetchError::NotFound {
                service_code: "service index".to_string(),
                region: None,
            })
            .await?;

        Self::object_keys(&document, "offers", &url)
    }

    async fn fetch_region_index(&self, service_code: &str) -> Result<Vec<String>, FetchError> {
        let url = format!(
            "{}/offers/v1.0/aws/{service_code}/current/region_index.json",
            self.base_url
        );
        let document = self
            .get_json(&url, self.index_timeout, || FetchError::NotFound {
                service_code: service_code.to_string(),
                region: None,
            })
            .await?;

        Self::object_keys(&document, "regions", &url)
    }
}
