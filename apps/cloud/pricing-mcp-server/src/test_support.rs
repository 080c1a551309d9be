//! In-memory fetcher for transport tests

use async_trait::async_trait;
use domain_pricing::{FetchError, PriceListFetcher};
use serde_json::{Value, json};

/// Serves a one-product AmazonEC2 price list; every other service is missing
pub struct FixtureFetcher;

#[async_trait]
impl PriceListFetcher for FixtureFetcher {
    async fn fetch_price_list(&self, service_code: &str, region: &str) -> Result<Value, FetchError> {
        if service_code != "AmazonEC2" {
            return Err(FetchError::NotFound {
                service_code: service_code.to_string(),
                region: Some(region.to_string()),
            });
        }

        Ok(json!({
            "publicationDate": "2024-06-11T00:00:00Z",
            "products": {
                "T3MICRO": {
                    "sku": "T3MICRO",
                    "productFamily": "Compute Instance",
                    "attributes": { "instanceType": "t3.micro" }
                }
            },
            "terms": {
                "OnDemand": {
                    "T3MICRO": { "T3MICRO.JRTCKXETXF": {
                        "offerTermCode": "JRTCKXETXF",
                        "priceDimensions": { "T3MICRO.JRTCKXETXF.6YS6EN2CT7": {
                            "rateCode": "T3MICRO.JRTCKXETXF.6YS6EN2CT7",
                            "unit": "Hrs",
                            "pricePerUnit": { "USD": "0.0104000000" }
                        }}
                    }}
                }
            }
        }))
    }

    async fn fetch_service_index(&self) -> Result<Vec<String>, FetchError> {
        Ok(vec!["AmazonEC2".to_string()])
    }

    async fn fetch_region_index(&self, _: &str) -> Result<Vec<String>, FetchError> {
        Ok(vec!["us-east-1".to_string()])
    }
}
