//! Pricing tools exposed over MCP
//!
//! Uses sealed traits to control which tools can be registered.

use async_trait::async_trait;
use domain_pricing::{
    AttributeValuesRequest, CompareRequest, ExportFormat, FilterClause, PriceListFetcher,
    PricingService, QueryRequest,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::error::{Error, ErrorContext, Result};

// ============================================================================
// Sealed Trait Pattern - Prevents external implementations
// ============================================================================

mod sealed {
    pub trait Sealed {}
}

/// Trait for MCP tools - sealed to prevent external implementations
#[async_trait]
pub trait Tool: sealed::Sealed + Send + Sync {
    /// Tool name
    fn name(&self) -> &'static str;

    /// Tool description for the AI model
    fn description(&self) -> &'static str;

    /// JSON schema for input parameters
    fn input_schema(&self) -> Value;

    /// Execute the tool with given parameters
    async fn execute(&self, params: Value) -> Result<Value>;
}

/// Deserialize tool arguments, reporting shape errors as invalid params
fn arguments<T: DeserializeOwned>(tool: &str, params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|e| Error::InvalidParams {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

fn filters_schema() -> Value {
    json!({
        "type": "array",
        "description": "Filters ANDed together. Type is EQUALS (default), ANY_OF, CONTAINS or NONE_OF; ANY_OF and NONE_OF take a list of values.",
        "items": {
            "type": "object",
            "properties": {
                "Field": { "type": "string" },
                "Type": { "type": "string", "enum": ["EQUALS", "ANY_OF", "CONTAINS", "NONE_OF"] },
                "Value": {
                    "oneOf": [
                        { "type": "string" },
                        { "type": "array", "items": { "type": "string" } }
                    ]
                }
            },
            "required": ["Field", "Value"]
        }
    })
}

fn options_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "pricing_terms": {
                "type": "array",
                "items": { "type": "string", "enum": ["OnDemand", "Reserved"] }
            },
            "exclude_free_products": { "type": "boolean" },
            "max_response_chars": {
                "type": "integer",
                "description": "Cap on the serialized page; -1 disables it"
            }
        }
    })
}

// ============================================================================
// Discovery Tools
// ============================================================================

#[derive(Deserialize)]
struct ServiceCodesArgs {
    #[serde(default)]
    filter: Option<String>,
}

/// Tool to list service codes
pub struct ServiceCodesTool<F: PriceListFetcher> {
    service: PricingService<F>,
}

impl<F: PriceListFetcher> sealed::Sealed for ServiceCodesTool<F> {}

#[async_trait]
impl<F: PriceListFetcher + 'static> Tool for ServiceCodesTool<F> {
    fn name(&self) -> &'static str {
        "get_pricing_service_codes"
    }

    fn description(&self) -> &'static str {
        "Lists AWS service codes that publish a bulk price list. The optional filter is a case-insensitive regex."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filter": { "type": "string", "description": "Regex, e.g. 'bedrock|sagemaker'" }
            }
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let args: ServiceCodesArgs = arguments(self.name(), params)?;
        let codes = self.service.service_codes(args.filter.as_deref()).await?;
        Ok(json!(codes))
    }
}

#[derive(Deserialize)]
struct ServiceAttributesArgs {
    service_code: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    filter: Option<String>,
}

/// Tool to list the attribute names of a service
pub struct ServiceAttributesTool<F: PriceListFetcher> {
    service: PricingService<F>,
}

impl<F: PriceListFetcher> sealed::Sealed for ServiceAttributesTool<F> {}

#[async_trait]
impl<F: PriceListFetcher + 'static> Tool for ServiceAttributesTool<F> {
    fn name(&self) -> &'static str {
        "get_pricing_service_attributes"
    }

    fn description(&self) -> &'static str {
        "Lists the filterable attribute names of a service's price list, sorted. The optional filter is a case-insensitive regex."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "service_code": { "type": "string", "description": "e.g. AmazonEC2" },
                "region": { "type": "string" },
                "filter": { "type": "string" }
            },
            "required": ["service_code"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let args: ServiceAttributesArgs = arguments(self.name(), params)?;
        let names = self
            .service
            .service_attributes(
                &args.service_code,
                args.region.as_deref(),
                args.filter.as_deref(),
            )
            .await?;
        Ok(json!(names))
    }
}

#[derive(Deserialize)]
struct AttributeValuesArgs {
    service_code: String,
    attribute_names: Vec<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    filters: BTreeMap<String, String>,
}

/// Tool to list the distinct values of attributes
pub struct AttributeValuesTool<F: PriceListFetcher> {
    service: PricingService<F>,
}

impl<F: PriceListFetcher> sealed::Sealed for AttributeValuesTool<F> {}

#[async_trait]
impl<F: PriceListFetcher + 'static> Tool for AttributeValuesTool<F> {
    fn name(&self) -> &'static str {
        "get_pricing_attribute_values"
    }

    fn description(&self) -> &'static str {
        "Returns the distinct values of each requested attribute. Fails if any attribute has no values; per-attribute regex filters may narrow a list to empty."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "service_code": { "type": "string" },
                "attribute_names": { "type": "array", "items": { "type": "string" }, "minItems": 1 },
                "region": { "type": "string" },
                "filters": {
                    "type": "object",
                    "description": "Attribute name to case-insensitive regex",
                    "additionalProperties": { "type": "string" }
                }
            },
            "required": ["service_code", "attribute_names"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let args: AttributeValuesArgs = arguments(self.name(), params)?;
        let response = self
            .service
            .attribute_values(
                &args.service_code,
                AttributeValuesRequest {
                    region: args.region,
                    attribute_names: args.attribute_names,
                    filters: args.filters,
                },
            )
            .await?;
        serde_json::to_value(response).with_context("attribute values serialization")
    }
}

// ============================================================================
// Query Tools
// ============================================================================

/// Tool to query one region's price list
pub struct PricingQueryTool<F: PriceListFetcher> {
    service: PricingService<F>,
}

impl<F: PriceListFetcher> sealed::Sealed for PricingQueryTool<F> {}

#[async_trait]
impl<F: PriceListFetcher + 'static> Tool for PricingQueryTool<F> {
    fn name(&self) -> &'static str {
        "get_pricing"
    }

    fn description(&self) -> &'static str {
        "Returns one page of price records matching all filters. Pass next_offset back as offset to continue."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "service_code": { "type": "string" },
                "region": { "type": "string" },
                "filters": filters_schema(),
                "offset": { "type": "integer", "minimum": 0 },
                "limit": { "type": "integer", "minimum": 1 },
                "options": options_schema()
            },
            "required": ["service_code"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let request: QueryRequest = arguments(self.name(), params)?;
        let response = self.service.query(request).await?;
        serde_json::to_value(response).with_context("query response serialization")
    }
}

/// Tool to run one query across several regions
pub struct MultiRegionTool<F: PriceListFetcher> {
    service: PricingService<F>,
}

impl<F: PriceListFetcher> sealed::Sealed for MultiRegionTool<F> {}

#[async_trait]
impl<F: PriceListFetcher + 'static> Tool for MultiRegionTool<F> {
    fn name(&self) -> &'static str {
        "get_pricing_multi_region"
    }

    fn description(&self) -> &'static str {
        "Runs the same filters in several regions and reports the first page, match count and lowest OnDemand price per region."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "service_code": { "type": "string" },
                "regions": { "type": "array", "items": { "type": "string" }, "minItems": 1 },
                "filters": filters_schema(),
                "limit": { "type": "integer", "minimum": 1 },
                "options": options_schema()
            },
            "required": ["service_code", "regions"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let request: CompareRequest = arguments(self.name(), params)?;
        let response = self.service.compare_regions(request).await?;
        serde_json::to_value(response).with_context("comparison serialization")
    }
}

// ============================================================================
// Bulk Data Tools
// ============================================================================

#[derive(Deserialize)]
struct PriceListUrlsArgs {
    service_code: String,
    #[serde(default)]
    region: Option<String>,
}

/// Tool to build bulk file URLs
pub struct PriceListUrlsTool<F: PriceListFetcher> {
    service: PricingService<F>,
}

impl<F: PriceListFetcher> sealed::Sealed for PriceListUrlsTool<F> {}

#[async_trait]
impl<F: PriceListFetcher + 'static> Tool for PriceListUrlsTool<F> {
    fn name(&self) -> &'static str {
        "get_price_list_urls"
    }

    fn description(&self) -> &'static str {
        "Returns the CSV and JSON bulk price list URLs for a service and region without downloading them."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "service_code": { "type": "string" },
                "region": { "type": "string" }
            },
            "required": ["service_code"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let args: PriceListUrlsArgs = arguments(self.name(), params)?;
        let urls = self
            .service
            .price_list_urls(&args.service_code, args.region.as_deref());
        serde_json::to_value(urls).with_context("price list urls serialization")
    }
}

#[derive(Deserialize)]
struct ExportArgs {
    service_code: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    filters: Vec<FilterClause>,
    #[serde(default)]
    format: ExportFormat,
}

/// Tool to serialize a whole catalog
pub struct ExportTool<F: PriceListFetcher> {
    service: PricingService<F>,
}

impl<F: PriceListFetcher> sealed::Sealed for ExportTool<F> {}

#[async_trait]
impl<F: PriceListFetcher + 'static> Tool for ExportTool<F> {
    fn name(&self) -> &'static str {
        "export_pricing_data"
    }

    fn description(&self) -> &'static str {
        "Serializes every matching record as CSV (one row per price dimension) or JSON lines."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "service_code": { "type": "string" },
                "region": { "type": "string" },
                "filters": filters_schema(),
                "format": { "type": "string", "enum": ["csv", "jsonl"], "default": "csv" }
            },
            "required": ["service_code"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let args: ExportArgs = arguments(self.name(), params)?;
        let output = self
            .service
            .export(
                &args.service_code,
                args.region.as_deref(),
                &args.filters,
                args.format,
            )
            .await?;
        serde_json::to_value(output).with_context("export serialization")
    }
}

/// Every pricing tool, in listing order
pub(crate) fn all<F: PriceListFetcher + 'static>(service: &PricingService<F>) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(ServiceCodesTool {
            service: service.clone(),
        }),
        Box::new(ServiceAttributesTool {
            service: service.clone(),
        }),
        Box::new(AttributeValuesTool {
            service: service.clone(),
        }),
        Box::new(PricingQueryTool {
            service: service.clone(),
        }),
        Box::new(MultiRegionTool {
            service: service.clone(),
        }),
        Box::new(PriceListUrlsTool {
            service: service.clone(),
        }),
        Box::new(ExportTool {
            service: service.clone(),
        }),
    ]
}
