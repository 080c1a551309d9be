use core_config::{env_list, env_or_default, env_parse, ConfigError, FromEnv};
use std::time::Duration;

use crate::fetcher::DEFAULT_BASE_URL;
use crate::region::DEFAULT_REGION;

/// A (service, region) catalog kept warm by the refresh scheduler
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WarmTarget {
    pub service_code: String,
    pub region: String,
}

impl std::str::FromStr for WarmTarget {
    type Err = String;

    /// Parses `service@region`, e.g. `AmazonEC2@us-east-1`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('@') {
            Some((service, region)) if !service.is_empty() && !region.is_empty() => Ok(Self {
                service_code: service.to_string(),
                region: region.to_string(),
            }),
            _ => Err(format!("expected service@region, got '{s}'")),
        }
    }
}

/// Pricing engine configuration
#[derive(Clone, Debug)]
pub struct PricingConfig {
    /// Bulk pricing API endpoint
    pub base_url: String,
    /// Region used when a request omits one
    pub default_region: String,
    pub fetch_timeout: Duration,
    pub index_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    /// How long a stale catalog is served without refetching after a transport failure
    pub failure_backoff: Duration,
    pub default_page_size: usize,
    pub max_page_size: usize,
    /// Serialized page size cap; `None` disables it
    pub max_response_chars: Option<usize>,
    pub warm_targets: Vec<WarmTarget>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_region: DEFAULT_REGION.to_string(),
            fetch_timeout: Duration::from_secs(120),
            index_timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(3600),
            cache_max_entries: 16,
            failure_backoff: Duration::from_secs(60),
            default_page_size: 100,
            max_page_size: 1000,
            max_response_chars: Some(100_000),
            warm_targets: Vec::new(),
        }
    }
}

impl FromEnv for PricingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let default_page_size = env_parse("PRICING_DEFAULT_PAGE_SIZE", defaults.default_page_size)?;
        let max_page_size = env_parse("PRICING_MAX_PAGE_SIZE", defaults.max_page_size)?;
        if default_page_size == 0 || max_page_size == 0 {
            return Err(ConfigError::ParseError {
                key: "PRICING_DEFAULT_PAGE_SIZE".to_string(),
                details: "page sizes must be at least 1".to_string(),
            });
        }

        let cache_max_entries = env_parse("PRICING_CACHE_MAX_ENTRIES", defaults.cache_max_entries)?;
        if cache_max_entries == 0 {
            return Err(ConfigError::ParseError {
                key: "PRICING_CACHE_MAX_ENTRIES".to_string(),
                details: "cache must hold at least one entry".to_string(),
            });
        }

        let max_response_chars = match env_parse("PRICING_MAX_RESPONSE_CHARS", 100_000i64)? {
            -1 => None,
            n if n > 0 => Some(n as usize),
            n => {
                return Err(ConfigError::ParseError {
                    key: "PRICING_MAX_RESPONSE_CHARS".to_string(),
                    details: format!("expected a positive number or -1, got {n}"),
                });
            }
        };

        let warm_targets = env_list("PRICING_WARM_TARGETS")
            .iter()
            .map(|item| item.parse())
            .collect::<Result<Vec<WarmTarget>, String>>()
            .map_err(|details| ConfigError::ParseError {
                key: "PRICING_WARM_TARGETS".to_string(),
                details,
            })?;

        Ok(Self {
            base_url: env_or_default("PRICING_BASE_URL", &defaults.base_url)
                .trim_end_matches('/')
                .to_string(),
            default_region: env_or_default("AWS_REGION", &defaults.default_region),
            fetch_timeout: Duration::from_secs(env_parse("PRICING_FETCH_TIMEOUT_SECS", 120u64)?),
            index_timeout: Duration::from_secs(env_parse("PRICING_INDEX_TIMEOUT_SECS", 30u64)?),
            cache_ttl: Duration::from_secs(env_parse("PRICING_CACHE_TTL_SECS", 3600u64)?),
            cache_max_entries,
            failure_backoff: Duration::from_secs(env_parse("PRICING_FAILURE_BACKOFF_SECS", 60u64)?),
            default_page_size,
            max_page_size,
            max_response_chars,
            warm_targets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 11] = [
        "PRICING_BASE_URL",
        "AWS_REGION",
        "PRICING_FETCH_TIMEOUT_SECS",
        "PRICING_INDEX_TIMEOUT_SECS",
        "PRICING_CACHE_TTL_SECS",
        "PRICING_CACHE_MAX_ENTRIES",
        "PRICING_FAILURE_BACKOFF_SECS",
        "PRICING_DEFAULT_PAGE_SIZE",
        "PRICING_MAX_PAGE_SIZE",
        "PRICING_MAX_RESPONSE_CHARS",
        "PRICING_WARM_TARGETS",
    ];

    fn unset_all() -> Vec<(&'static str, Option<&'static str>)> {
        KEYS.iter().map(|k| (*k, None)).collect()
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars(unset_all(), || {
            let config = PricingConfig::from_env().unwrap();
            assert_eq!(config.base_url, "https://pricing.us-east-1.amazonaws.com");
            assert_eq!(config.default_region, "us-east-1");
            assert_eq!(config.fetch_timeout, Duration::from_secs(120));
            assert_eq!(config.index_timeout, Duration::from_secs(30));
            assert_eq!(config.cache_ttl, Duration::from_secs(3600));
            assert_eq!(config.cache_max_entries, 16);
            assert_eq!(config.failure_backoff, Duration::from_secs(60));
            assert_eq!(config.default_page_size, 100);
            assert_eq!(config.max_page_size, 1000);
            assert_eq!(config.max_response_chars, Some(100_000));
            assert!(config.warm_targets.is_empty());
        });
    }

    #[test]
    fn test_custom_values() {
        temp_env::with_vars(
            [
                ("PRICING_BASE_URL", Some("http://localhost:9000/")),
                ("AWS_REGION", Some("eu-west-1")),
                ("PRICING_CACHE_TTL_SECS", Some("60")),
                ("PRICING_FAILURE_BACKOFF_SECS", Some("5")),
                ("PRICING_MAX_RESPONSE_CHARS", Some("-1")),
                (
                    "PRICING_WARM_TARGETS",
                    Some("AmazonEC2@us-east-1, AmazonS3@eu-west-1"),
                ),
            ],
            || {
                let config = PricingConfig::from_env().unwrap();
                assert_eq!(config.base_url, "http://localhost:9000");
                assert_eq!(config.default_region, "eu-west-1");
                assert_eq!(config.cache_ttl, Duration::from_secs(60));
                assert_eq!(config.failure_backoff, Duration::from_secs(5));
                assert_eq!(config.max_response_chars, None);
                assert_eq!(
                    config.warm_targets,
                    vec![
                        WarmTarget {
                            service_code: "AmazonEC2".to_string(),
                            region: "us-east-1".to_string()
                        },
                        WarmTarget {
                            service_code: "AmazonS3".to_string(),
                            region: "eu-west-1".to_string()
                        },
                    ]
                );
            },
        );
    }

    #[test]
    fn test_invalid_values_are_errors() {
        temp_env::with_var("PRICING_CACHE_TTL_SECS", Some("soon"), || {
            let err = PricingConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("PRICING_CACHE_TTL_SECS"));
        });

        temp_env::with_var("PRICING_WARM_TARGETS", Some("AmazonEC2"), || {
            let err = PricingConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("service@region"));
        });

        temp_env::with_var("PRICING_MAX_RESPONSE_CHARS", Some("0"), || {
            assert!(PricingConfig::from_env().is_err());
        });

        temp_env::with_var("PRICING_CACHE_MAX_ENTRIES", Some("0"), || {
            assert!(PricingConfig::from_env().is_err());
        });
    }
}
