//! In-memory index over one bulk price list.
//!
//! A [`CatalogIndex`] is built in two passes: every product is parsed and joined
//! with its offer terms into [`PriceRecord`]s, then the attribute-value index is
//! derived from the finished record set. Any structural error aborts the whole
//! build, so a partially parsed catalog is never observable.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::models::{
    Freshness, PriceDimension, PriceRecord, PriceTerm, ReservedTerm, TermType, UnitPrice,
};

/// Term sections are joined in this order for every product.
const TERM_SECTIONS: [(&str, TermType); 2] = [
    ("OnDemand", TermType::OnDemand),
    ("Reserved", TermType::Reserved),
];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    publication_date: Option<String>,
    products: Map<String, Value>,
    #[serde(default)]
    terms: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProduct {
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    product_family: Option<String>,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTerm {
    offer_term_code: String,
    #[serde(default)]
    effective_date: Option<String>,
    #[serde(default)]
    price_dimensions: Map<String, Value>,
    #[serde(default)]
    term_attributes: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDimension {
    #[serde(default)]
    rate_code: Option<String>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    begin_range: Option<String>,
    #[serde(default)]
    end_range: Option<String>,
    #[serde(default)]
    price_per_unit: Map<String, Value>,
}

/// Queryable snapshot of one (service, region) price list
#[derive(Debug)]
pub struct CatalogIndex {
    service_code: String,
    region: String,
    records: Vec<PriceRecord>,
    attribute_values: BTreeMap<String, BTreeSet<String>>,
    fetched_at: DateTime<Utc>,
    publication_date: Option<String>,
    version: Option<String>,
    skipped_term_sections: Vec<String>,
}

impl CatalogIndex {
    /// Parse a raw bulk document into an index, atomically.
    pub fn build(service_code: &str, region: &str, document: Value) -> Result<Self, ParseError> {
        let parse_error = |message: String| ParseError {
            service_code: service_code.to_string(),
            region: region.to_string(),
            message,
        };

        let raw: RawDocument = serde_json::from_value(document)
            .map_err(|e| parse_error(format!("invalid document: {e}")))?;

        let mut skipped_term_sections = Vec::new();
        let mut terms_by_sku: HashMap<String, Vec<(PriceTerm, Vec<PriceDimension>)>> =
            HashMap::new();
        let mut sections = raw.terms;

        for name in sections.keys() {
            if !TERM_SECTIONS.iter().any(|(known, _)| *known == name.as_str()) {
                warn!(
                    service_code = service_code,
                    region = region,
                    section = %name,
                    "Skipping unsupported term section"
                );
                skipped_term_sections.push(name.clone());
            }
        }

        for (name, term_type) in TERM_SECTIONS {
            let Some(section) = sections.remove(name) else {
                continue;
            };
            let section: Map<String, Value> =
                from_value(section).map_err(|e| parse_error(format!("terms.{name}: {e}")))?;

            for (sku, offers) in section {
                let offers: Map<String, Value> = from_value(offers)
                    .map_err(|e| parse_error(format!("terms.{name}.{sku}: {e}")))?;

                for (offer_key, offer) in offers {
                    let term = parse_term(term_type, offer).map_err(|e| {
                        parse_error(format!("terms.{name}.{sku}.{offer_key}: {e}"))
                    })?;
                    terms_by_sku.entry(sku.clone()).or_default().push(term);
                }
            }
        }

        let mut records = Vec::with_capacity(raw.products.len());
        for (key, product) in raw.products {
            let product: RawProduct =
                from_value(product).map_err(|e| parse_error(format!("products.{key}: {e}")))?;
            let sku = product.sku.unwrap_or(key);

            match terms_by_sku.remove(&sku) {
                Some(terms) => {
                    for (term, price_dimensions) in terms {
                        records.push(PriceRecord {
                            sku: sku.clone(),
                            product_family: product.product_family.clone(),
                            attributes: product.attributes.clone(),
                            term: Some(term),
                            price_dimensions,
                        });
                    }
                }
                None => records.push(PriceRecord {
                    sku,
                    product_family: product.product_family,
                    attributes: product.attributes,
                    term: None,
                    price_dimensions: Vec::new(),
                }),
            }
        }

        if !terms_by_sku.is_empty() {
            debug!(
                service_code = service_code,
                region = region,
                orphaned = terms_by_sku.len(),
                "Ignoring terms for SKUs without a product entry"
            );
        }

        let mut index = Self::from_records(service_code, region, records);
        index.publication_date = raw.publication_date;
        index.version = raw.version;
        index.skipped_term_sections = skipped_term_sections;

        Ok(index)
    }

    /// Second pass: derive the attribute index from the finished record set.
    fn from_records(service_code: &str, region: &str, records: Vec<PriceRecord>) -> Self {
        let mut attribute_values: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for record in &records {
            for (name, value) in &record.attributes {
                attribute_values
                    .entry(name.clone())
                    .or_default()
                    .insert(value.clone());
            }
        }

        Self {
            service_code: service_code.to_string(),
            region: region.to_string(),
            records,
            attribute_values,
            fetched_at: Utc::now(),
            publication_date: None,
            version: None,
            skipped_term_sections: Vec::new(),
        }
    }

    pub fn service_code(&self) -> &str {
        &self.service_code
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// All records in document order. Restartable: every call begins again.
    pub fn records(&self) -> std::slice::Iter<'_, PriceRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Attribute names in sorted order
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.attribute_values.keys().map(String::as_str)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute_values.contains_key(name)
    }

    /// Distinct values observed for an attribute, sorted
    pub fn values_of(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.attribute_values.get(name)
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn publication_date(&self) -> Option<&str> {
        self.publication_date.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Term sections present in the document but not indexed
    pub fn skipped_term_sections(&self) -> &[String] {
        &self.skipped_term_sections
    }

    pub fn freshness(&self, stale: bool) -> Freshness {
        Freshness {
            fetched_at: self.fetched_at,
            publication_date: self.publication_date.clone(),
            stale,
        }
    }
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn parse_term(term_type: TermType, value: Value) -> Result<(PriceTerm, Vec<PriceDimension>), String> {
    let raw: RawTerm = from_value(value)?;

    let reserved = match term_type {
        TermType::Reserved => Some(ReservedTerm {
            lease_contract_length: raw.term_attributes.get("LeaseContractLength").cloned(),
            offering_class: raw.term_attributes.get("OfferingClass").cloned(),
            purchase_option: raw.term_attributes.get("PurchaseOption").cloned(),
        }),
        TermType::OnDemand => None,
    };

    let price_dimensions = raw
        .price_dimensions
        .into_iter()
        .map(|(key, dimension)| parse_dimension(key, dimension))
        .collect::<Result<Vec<_>, _>>()?;

    let term = PriceTerm {
        term_type,
        offer_term_code: raw.offer_term_code,
        effective_date: raw.effective_date,
        reserved,
    };

    Ok((term, price_dimensions))
}

fn parse_dimension(key: String, value: Value) -> Result<PriceDimension, String> {
    let raw: RawDimension = from_value(value).map_err(|e| format!("{key}: {e}"))?;

    let price_per_unit = raw
        .price_per_unit
        .into_iter()
        .map(|(currency, amount)| {
            let text = amount
                .as_str()
                .ok_or_else(|| format!("{key}: price for {currency} is not a string"))?;
            let amount = Decimal::from_str(text)
                .map_err(|e| format!("{key}: invalid {currency} amount '{text}': {e}"))?;
            Ok(UnitPrice { currency, amount })
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok(PriceDimension {
        rate_code: raw.rate_code.unwrap_or(key),
        unit: raw.unit,
        description: raw.description,
        begin_range: raw.begin_range,
        end_range: raw.end_range,
        price_per_unit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{ec2_document, ec2_index};
    use serde_json::json;

    #[test]
    fn test_one_record_per_product_term() {
        let index = ec2_index();
        let keys: Vec<(String, Option<TermType>)> = index
            .records()
            .map(|r| (r.sku.clone(), r.term_type()))
            .collect();

        assert_eq!(
            keys,
            vec![
                ("T3MICRO".to_string(), Some(TermType::OnDemand)),
                ("T3MICRO".to_string(), Some(TermType::Reserved)),
                ("T3MICROWIN".to_string(), Some(TermType::OnDemand)),
                ("M5LARGE".to_string(), Some(TermType::OnDemand)),
                ("EBSGP2".to_string(), Some(TermType::OnDemand)),
                ("DTFREE".to_string(), Some(TermType::OnDemand)),
                ("FEENOTERMS".to_string(), None),
            ]
        );
        assert_eq!(index.len(), 7);
    }

    #[test]
    fn test_document_metadata() {
        let index = ec2_index();
        assert_eq!(index.service_code(), "AmazonEC2");
        assert_eq!(index.region(), "us-east-1");
        assert_eq!(index.publication_date(), Some("2024-06-11T00:00:00Z"));
        assert_eq!(index.version(), Some("20240611000000"));
        assert_eq!(index.skipped_term_sections(), ["Spot".to_string()]);

        let freshness = index.freshness(true);
        assert!(freshness.stale);
        assert_eq!(freshness.fetched_at, index.fetched_at());
    }

    #[test]
    fn test_reserved_term_metadata() {
        let index = ec2_index();
        let reserved = index
            .records()
            .find(|r| r.term_type() == Some(TermType::Reserved))
            .and_then(|r| r.term.clone())
            .unwrap();

        assert_eq!(reserved.offer_term_code, "4NA7Y494T4");
        let meta = reserved.reserved.unwrap();
        assert_eq!(meta.lease_contract_length.as_deref(), Some("1yr"));
        assert_eq!(meta.offering_class.as_deref(), Some("standard"));
        assert_eq!(meta.purchase_option.as_deref(), Some("No Upfront"));
    }

    #[test]
    fn test_tiers_keep_source_order_and_currency() {
        let index = ec2_index();
        let storage = index.records().find(|r| r.sku == "EBSGP2").unwrap();

        let ranges: Vec<_> = storage
            .price_dimensions
            .iter()
            .map(|d| d.begin_range.clone().unwrap())
            .collect();
        assert_eq!(ranges, vec!["1024", "0"]);

        let price = &storage.price_dimensions[0].price_per_unit[0];
        assert_eq!(price.currency, "USD");
        assert_eq!(price.amount, Decimal::from_str("0.0800000000").unwrap());
    }

    #[test]
    fn test_missing_attributes_stay_absent() {
        let index = ec2_index();
        let storage = index.records().find(|r| r.sku == "EBSGP2").unwrap();
        assert!(storage.attribute("instanceType").is_none());
        assert_eq!(storage.product_family.as_deref(), Some("Storage"));
    }

    #[test]
    fn test_attribute_index_is_projection_of_records() {
        let index = ec2_index();

        let mut expected: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for record in index.records() {
            for (name, value) in &record.attributes {
                expected.entry(name.clone()).or_default().insert(value.clone());
            }
        }

        let names: Vec<&str> = index.attribute_names().collect();
        assert_eq!(names, expected.keys().map(String::as_str).collect::<Vec<_>>());
        for (name, values) in &expected {
            assert_eq!(index.values_of(name), Some(values));
        }
        assert_eq!(
            index.values_of("instanceType").unwrap().iter().collect::<Vec<_>>(),
            vec!["m5.large", "t3.micro"]
        );
    }

    #[test]
    fn test_records_iterator_is_restartable() {
        let index = ec2_index();
        assert_eq!(index.records().count(), index.records().count());
    }

    #[test]
    fn test_missing_products_fails() {
        let err = CatalogIndex::build("AmazonEC2", "us-east-1", json!({"terms": {}})).unwrap_err();
        assert_eq!(err.service_code, "AmazonEC2");
        assert_eq!(err.region, "us-east-1");
        assert!(err.message.contains("products"));
    }

    #[test]
    fn test_bad_amount_fails_whole_build() {
        let mut document = ec2_document();
        document["terms"]["OnDemand"]["M5LARGE"]["M5LARGE.JRTCKXETXF"]["priceDimensions"]
            ["M5LARGE.JRTCKXETXF.6YS6EN2CT7"]["pricePerUnit"]["USD"] = json!("not-a-number");

        let err = CatalogIndex::build("AmazonEC2", "us-east-1", document).unwrap_err();
        assert!(err.message.contains("M5LARGE"));
    }

    #[test]
    fn test_product_that_is_not_an_object_fails() {
        let mut document = ec2_document();
        document["products"]["T3MICRO"] = json!("oops");

        assert!(CatalogIndex::build("AmazonEC2", "us-east-1", document).is_err());
    }

    #[test]
    fn test_empty_document_builds_empty_index() {
        let index =
            CatalogIndex::build("AmazonFoo", "eu-west-1", json!({"products": {}})).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.attribute_names().count(), 0);
    }
}
