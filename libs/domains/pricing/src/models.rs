use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::filter::FilterClause;

/// Offer term section of a bulk price list
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum TermType {
    OnDemand,
    Reserved,
}

/// Reserved-term metadata (only present on `Reserved` terms)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub struct ReservedTerm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_contract_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offering_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_option: Option<String>,
}

/// The offer term a record's price dimensions belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PriceTerm {
    pub term_type: TermType,
    pub offer_term_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved: Option<ReservedTerm>,
}

/// A currency-tagged amount, carried exactly as published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UnitPrice {
    pub currency: String,
    #[schema(value_type = String, example = "0.0104")]
    pub amount: Decimal,
}

/// One tier/unit of pricing within a term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PriceDimension {
    pub rate_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub begin_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_range: Option<String>,
    pub price_per_unit: Vec<UnitPrice>,
}

/// One SKU joined with one of its offer terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PriceRecord {
    pub sku: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_family: Option<String>,
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term: Option<PriceTerm>,
    pub price_dimensions: Vec<PriceDimension>,
}

impl PriceRecord {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn term_type(&self) -> Option<TermType> {
        self.term.as_ref().map(|t| t.term_type)
    }

    /// True when the record has prices and every one of them is zero
    pub fn is_free(&self) -> bool {
        let mut amounts = self
            .price_dimensions
            .iter()
            .flat_map(|d| d.price_per_unit.iter())
            .peekable();

        amounts.peek().is_some() && amounts.all(|p| p.amount.is_zero())
    }

    /// Lowest amount quoted in `currency` across all dimensions
    pub fn lowest_price(&self, currency: &str) -> Option<Decimal> {
        self.price_dimensions
            .iter()
            .flat_map(|d| d.price_per_unit.iter())
            .filter(|p| p.currency == currency)
            .map(|p| p.amount)
            .min()
    }
}

/// How current the catalog behind a response is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Freshness {
    pub fetched_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    /// Set when a refresh failed and a previously built catalog was served
    pub stale: bool,
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

/// Result shaping applied after filter evaluation
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct QueryOptions {
    /// Keep only records with one of these term types (empty keeps all)
    #[serde(default)]
    pub pricing_terms: Vec<TermType>,
    /// Drop records whose every unit price is zero
    #[serde(default)]
    pub exclude_free_products: bool,
    /// Cap on the serialized page size; -1 disables the cap
    #[serde(default)]
    pub max_response_chars: Option<i64>,
}

/// Filtered price query
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, message = "service_code must not be empty"))]
    pub service_code: String,
    /// Falls back to the configured default region
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub filters: Vec<FilterClause>,
    #[serde(default)]
    pub offset: usize,
    /// Defaults to the configured page size, clamped to the maximum page size
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub options: QueryOptions,
}

/// One page of matching records plus catalog freshness
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueryResponse {
    pub service_code: String,
    pub region: String,
    pub records: Vec<PriceRecord>,
    pub next_offset: Option<usize>,
    pub total_matches: usize,
    pub freshness: Freshness,
}

/// Distinct values requested for attribute discovery
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttributeValuesRequest {
    #[serde(default)]
    pub region: Option<String>,
    pub attribute_names: Vec<String>,
    /// Attribute name to case-insensitive regex; names not requested are ignored
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttributeValues {
    pub attribute: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttributeValuesResponse {
    pub service_code: String,
    pub region: String,
    pub attributes: Vec<AttributeValues>,
}

/// Same query evaluated in several regions
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CompareRequest {
    #[validate(length(min = 1, message = "service_code must not be empty"))]
    pub service_code: String,
    #[validate(length(min = 1, message = "at least one region is required"))]
    pub regions: Vec<String>,
    #[serde(default)]
    pub filters: Vec<FilterClause>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub options: QueryOptions,
}

/// Per-region outcome; a failing region does not fail the comparison
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegionComparison {
    pub region: String,
    pub currency: String,
    /// Lowest OnDemand price in the region's currency among matching records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lowest_on_demand: Option<UnitPrice>,
    pub total_matches: usize,
    pub records: Vec<PriceRecord>,
    pub next_offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freshness: Option<Freshness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompareResponse {
    pub service_code: String,
    pub regions: Vec<RegionComparison>,
}

/// Bulk export serialization
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Jsonl,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Jsonl => "application/x-ndjson",
        }
    }
}

/// Serialized record set of one catalog
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExportOutput {
    pub format: ExportFormat,
    pub records: usize,
    pub body: String,
}

/// Bulk file locations for a service/region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PriceListUrls {
    pub service_code: String,
    pub region: String,
    pub csv: String,
    pub json: String,
}

/// Query-string parameters shared by discovery endpoints
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DiscoveryParams {
    /// Case-insensitive regex applied to the returned names
    pub filter: Option<String>,
    /// Region to read the catalog from
    pub region: Option<String>,
}

/// Query-string region selector
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RegionParams {
    pub region: Option<String>,
}

/// Filtered export of one catalog
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ExportRequest {
    pub region: Option<String>,
    /// Clauses combined with AND; empty exports every record
    #[serde(default)]
    pub filters: Vec<FilterClause>,
    #[serde(default)]
    pub format: ExportFormat,
}

/// Whole-catalog export selector
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportParams {
    pub region: Option<String>,
    #[serde(default)]
    pub format: ExportFormat,
}
