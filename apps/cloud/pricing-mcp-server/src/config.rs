//! Configuration for the pricing MCP server

use core_config::server::ServerConfig;
use core_config::{Environment, FromEnv};
use domain_pricing::PricingConfig;
use eyre::Result;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub server: ServerConfig,
    pub pricing: PricingConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            environment: Environment::from_env(),
            server: ServerConfig::from_env()?,
            pricing: PricingConfig::from_env()?,
        })
    }
}
