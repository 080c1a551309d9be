//! Tool errors and their JSON-RPC codes

use domain_pricing::PricingError;
use serde_json::{json, Value};
use thiserror::Error;

/// Result type alias for MCP tool execution
pub type Result<T> = std::result::Result<T, Error>;

/// JSON-RPC error codes used by the handler
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const TOOL_ERROR: i32 = -32000;
}

/// Error types for MCP tool execution
#[derive(Debug, Error)]
pub enum Error {
    /// Arguments missing or of the wrong shape
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidParams { tool: String, message: String },

    /// The pricing engine rejected or failed the call
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Serialization error in {context}: {source}")]
    Serialization {
        context: String,
        source: serde_json::Error,
    },
}

impl Error {
    pub fn code(&self) -> i32 {
        match self {
            Error::InvalidParams { .. } => codes::INVALID_PARAMS,
            Error::Pricing(_) | Error::Serialization { .. } => codes::TOOL_ERROR,
        }
    }

    /// Structured detail attached to the JSON-RPC error object
    pub fn data(&self) -> Option<Value> {
        match self {
            Error::Pricing(PricingError::ResultTooLarge {
                chars,
                limit,
                sample,
            }) => Some(json!({
                "chars": chars,
                "limit": limit,
                "sample_records": sample,
                "hint": "narrow the filters, lower the limit, or use export_pricing_data",
            })),
            Error::Pricing(err) => Some(json!({ "status": err.status_code().as_u16() })),
            _ => None,
        }
    }
}

/// Extension trait for adding context to serialization errors
pub trait ErrorContext<T> {
    fn with_context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ErrorContext<T> for std::result::Result<T, serde_json::Error> {
    fn with_context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Serialization {
            context: context.into(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_pricing::QueryError;

    #[test]
    fn test_codes() {
        let invalid = Error::InvalidParams {
            tool: "get_pricing".to_string(),
            message: "missing field `service_code`".to_string(),
        };
        assert_eq!(invalid.code(), codes::INVALID_PARAMS);
        assert!(invalid.data().is_none());

        let pricing = Error::from(PricingError::Query(QueryError::EmptyAttributeList));
        assert_eq!(pricing.code(), codes::TOOL_ERROR);
        assert_eq!(pricing.data().unwrap()["status"], 400);
    }

    #[test]
    fn test_result_too_large_carries_sample() {
        let err = Error::from(PricingError::ResultTooLarge {
            chars: 120,
            limit: 100,
            sample: vec![],
        });
        let data = err.data().unwrap();
        assert_eq!(data["limit"], 100);
        assert!(data["sample_records"].as_array().unwrap().is_empty());
    }
}
