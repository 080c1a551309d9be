use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::PriceRecord;

/// Result type for pricing operations
pub type PricingResult<T> = Result<T, PricingError>;

/// Errors raised while retrieving a bulk pricing document
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The service/region combination has no published price list
    #[error("No published price list for {service_code} in {}", .region.as_deref().unwrap_or("any region"))]
    NotFound {
        service_code: String,
        region: Option<String>,
    },

    /// Connectivity, timeout or upstream availability failure
    #[error("Transport failure fetching {url}: {message}")]
    Transport { url: String, message: String },

    /// The document was retrieved but is not JSON
    #[error("Malformed document at {url}: {message}")]
    Malformed { url: String, message: String },
}

impl FetchError {
    /// Only transport failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transport { .. })
    }
}

/// The document is JSON but not a price list we can index
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to parse price list for {service_code}/{region}: {message}")]
pub struct ParseError {
    pub service_code: String,
    pub region: String,
    pub message: String,
}

/// Outcome of a catalog build, shared by every caller waiting on it
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The build task panicked or was cancelled
    #[error("Catalog build for {service_code}/{region} aborted: {message}")]
    BuildAborted {
        service_code: String,
        region: String,
        message: String,
    },
}

/// Request errors detected before any index is touched
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid filter {clause}: {reason}")]
    InvalidFilter { clause: String, reason: String },

    #[error("Invalid pagination: limit must be at least 1, got {limit}")]
    InvalidPagination { limit: usize },

    #[error("Invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("At least one attribute name is required")]
    EmptyAttributeList,

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Errors surfaced by the pricing service
#[derive(Debug, Error)]
pub enum PricingError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Query(#[from] QueryError),

    /// A discovery call found nothing to return
    #[error("No matches: {0}")]
    NoMatches(String),

    /// A requested attribute has no values anywhere in the catalog
    #[error("Attribute '{attribute}' has no values for {service_code}")]
    NoAttributeValues {
        service_code: String,
        attribute: String,
    },

    #[error("Response of {chars} characters exceeds the limit of {limit}")]
    ResultTooLarge {
        chars: usize,
        limit: usize,
        sample: Vec<PriceRecord>,
    },

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<FetchError> for PricingError {
    fn from(err: FetchError) -> Self {
        PricingError::Catalog(CatalogError::Fetch(err))
    }
}

impl From<validator::ValidationErrors> for PricingError {
    fn from(err: validator::ValidationErrors) -> Self {
        PricingError::Query(QueryError::Validation(err.to_string()))
    }
}

impl PricingError {
    /// HTTP status used when this error crosses the REST boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            PricingError::Catalog(CatalogError::Fetch(FetchError::NotFound { .. })) => {
                StatusCode::NOT_FOUND
            }
            PricingError::Catalog(CatalogError::Fetch(FetchError::Transport { .. })) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            PricingError::Catalog(CatalogError::Fetch(FetchError::Malformed { .. }))
            | PricingError::Catalog(CatalogError::Parse(_)) => StatusCode::BAD_GATEWAY,
            PricingError::Catalog(CatalogError::BuildAborted { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            PricingError::Query(_) => StatusCode::BAD_REQUEST,
            PricingError::NoMatches(_) | PricingError::NoAttributeValues { .. } => {
                StatusCode::NOT_FOUND
            }
            PricingError::ResultTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            PricingError::Export(_) | PricingError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PricingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            PricingError::Catalog(CatalogError::BuildAborted { .. }) | PricingError::Internal(_) => {
                "Internal error".to_string()
            }
            _ => self.to_string(),
        };

        let body = match self {
            PricingError::ResultTooLarge { limit, sample, .. } => json!({
                "error": message,
                "code": status.as_u16(),
                "limit": limit,
                "sample_records": sample,
            }),
            _ => json!({
                "error": message,
                "code": status.as_u16()
            }),
        };

        (status, Json(body)).into_response()
    }
}
