//! Shared fixtures for pricing integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use domain_pricing::{FetchError, PriceListFetcher, PricingConfig, PricingService};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Serves a fixed RDS-like price list for every region except `unavailable_region`
#[derive(Clone, Default)]
pub struct StaticFetcher {
    pub price_list_calls: Arc<AtomicUsize>,
    pub unavailable_region: Option<String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_region(region: &str) -> Self {
        Self {
            unavailable_region: Some(region.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.price_list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceListFetcher for StaticFetcher {
    async fn fetch_price_list(&self, service_code: &str, region: &str) -> Result<Value, FetchError> {
        self.price_list_calls.fetch_add(1, Ordering::SeqCst);
        if service_code != "AmazonRDS" || self.unavailable_region.as_deref() == Some(region) {
            return Err(FetchError::NotFound {
                service_code: service_code.to_string(),
                region: Some(region.to_string()),
            });
        }
        Ok(rds_document(region))
    }

    async fn fetch_service_index(&self) -> Result<Vec<String>, FetchError> {
        Ok(vec![
            "AmazonEC2".to_string(),
            "AmazonRDS".to_string(),
            "AmazonS3".to_string(),
            "AWSLambda".to_string(),
        ])
    }

    async fn fetch_region_index(&self, service_code: &str) -> Result<Vec<String>, FetchError> {
        match service_code {
            "AmazonRDS" => Ok(vec![
                "us-east-1".to_string(),
                "eu-west-1".to_string(),
                "cn-north-1".to_string(),
            ]),
            _ => Err(FetchError::NotFound {
                service_code: service_code.to_string(),
                region: None,
            }),
        }
    }
}

pub fn service(fetcher: StaticFetcher) -> PricingService<StaticFetcher> {
    PricingService::new(fetcher, PricingConfig::default())
}

fn on_demand(sku: &str, code: &str, currency: &str, amount: &str) -> Value {
    json!({
        format!("{sku}.{code}"): {
            "offerTermCode": code,
            "sku": sku,
            "effectiveDate": "2024-05-01T00:00:00Z",
            "priceDimensions": {
                format!("{sku}.{code}.6YS6EN2CT7"): {
                    "rateCode": format!("{sku}.{code}.6YS6EN2CT7"),
                    "description": format!("{sku} per hour"),
                    "beginRange": "0",
                    "endRange": "Inf",
                    "unit": "Hrs",
                    "pricePerUnit": { currency: amount },
                    "appliesTo": []
                }
            },
            "termAttributes": {}
        }
    })
}

/// Four database products; prices in CNY for China regions
pub fn rds_document(region: &str) -> Value {
    let currency = if region.starts_with("cn-") { "CNY" } else { "USD" };

    json!({
        "formatVersion": "v1.0",
        "offerCode": "AmazonRDS",
        "version": "20240520000000",
        "publicationDate": "2024-05-20T00:00:00Z",
        "products": {
            "PGSMALL": {
                "sku": "PGSMALL",
                "productFamily": "Database Instance",
                "attributes": {
                    "instanceType": "db.t3.small",
                    "databaseEngine": "PostgreSQL",
                    "deploymentOption": "Single-AZ"
                }
            },
            "PGSMALLMAZ": {
                "sku": "PGSMALLMAZ",
                "productFamily": "Database Instance",
                "attributes": {
                    "instanceType": "db.t3.small",
                    "databaseEngine": "PostgreSQL",
                    "deploymentOption": "Multi-AZ"
                }
            },
            "MYSQLLARGE": {
                "sku": "MYSQLLARGE",
                "productFamily": "Database Instance",
                "attributes": {
                    "instanceType": "db.m5.large",
                    "databaseEngine": "MySQL",
                    "deploymentOption": "Single-AZ"
                }
            },
            "GP3STORAGE": {
                "sku": "GP3STORAGE",
                "productFamily": "Database Storage",
                "attributes": {
                    "volumeType": "General Purpose-GP3",
                    "databaseEngine": "Any"
                }
            }
        },
        "terms": {
            "OnDemand": {
                "PGSMALL": on_demand("PGSMALL", "JRTCKXETXF", currency, "0.0360000000"),
                "PGSMALLMAZ": on_demand("PGSMALLMAZ", "JRTCKXETXF", currency, "0.0720000000"),
                "MYSQLLARGE": on_demand("MYSQLLARGE", "JRTCKXETXF", currency, "0.1710000000"),
                "GP3STORAGE": on_demand("GP3STORAGE", "JRTCKXETXF", currency, "0.1150000000")
            }
        }
    })
}
