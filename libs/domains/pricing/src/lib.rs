//! Pricing Domain
//!
//! Local query engine over the AWS bulk Price List documents. Each
//! (service, region) price list is fetched once, indexed in memory and
//! answered from the cache until its TTL expires.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← REST router + OpenAPI
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Filters, paging, discovery, comparison, export
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │    Cache    │  ← TTL + LRU, single-flight builds, stale fallback
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Catalog   │  ← Normalized records + attribute index
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Fetcher   │  ← Bulk API client (trait + HTTP implementation)
//! └─────────────┘
//! ```

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod filter;
pub mod handlers;
pub mod models;
pub mod pager;
pub mod region;
pub mod service;

#[cfg(test)]
mod test_fixtures;

// Re-export commonly used types
pub use cache::{CacheStats, CatalogCache, CatalogSnapshot};
pub use catalog::CatalogIndex;
pub use config::{PricingConfig, WarmTarget};
pub use error::{CatalogError, FetchError, ParseError, PricingError, PricingResult, QueryError};
pub use fetcher::{HttpPriceListFetcher, PriceListFetcher};
pub use filter::{FilterClause, FilterSet, FilterType, FilterValue};
pub use handlers::ApiDoc;
pub use models::{
    AttributeValuesRequest, AttributeValuesResponse, CompareRequest, CompareResponse,
    ExportFormat, ExportOutput, ExportRequest, Freshness, PriceListUrls, PriceRecord,
    QueryOptions, QueryRequest, QueryResponse, TermType,
};
pub use pager::Page;
pub use service::PricingService;
