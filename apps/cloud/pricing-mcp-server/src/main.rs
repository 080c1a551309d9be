//! Pricing MCP Server
//!
//! Answers AWS pricing questions from locally cached bulk price lists.
//! Runs as an MCP server on stdio (for desktop clients) or as an HTTP
//! service exposing the REST API, an MCP endpoint and Prometheus metrics.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_pricing::{HttpPriceListFetcher, PricingService};
use eyre::{Result, WrapErr};
use pricing_mcp::McpHandler;
use tracing::info;

mod config;
mod scheduler;
mod server;
mod stdio;
#[cfg(test)]
mod test_support;

use config::Config;

#[derive(Parser)]
#[command(name = "pricing-mcp-server")]
#[command(about = "Query AWS bulk price lists over MCP or HTTP")]
struct Cli {
    /// Cron expression for refreshing PRICING_WARM_TARGETS (e.g. "0 0 */6 * * *")
    #[arg(long, global = true)]
    refresh_cron: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP as newline-delimited JSON-RPC on stdin/stdout
    Stdio,

    /// Serve the REST API, POST /mcp, /health and /metrics
    Http,

    /// Build the configured warm targets once and exit
    Warm,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    observability::init_metrics().wrap_err("failed to install metrics recorder")?;

    let cli = Cli::parse();

    let fetcher = HttpPriceListFetcher::new(&config.pricing);
    let warm_targets = config.pricing.warm_targets.clone();
    let service = PricingService::new(fetcher, config.pricing.clone());

    let _scheduler = match (&cli.refresh_cron, warm_targets.is_empty()) {
        (Some(cron), false) => {
            Some(scheduler::start(service.clone(), warm_targets.clone(), cron).await?)
        }
        (Some(_), true) => {
            tracing::warn!("--refresh-cron given but PRICING_WARM_TARGETS is empty");
            None
        }
        (None, _) => None,
    };

    match cli.command {
        Commands::Stdio => {
            let handler = McpHandler::new(service);
            stdio::run(&handler).await?;
        }

        Commands::Http => {
            let router = server::router(service, &config.server);
            server::serve(router, &config.server).await?;
        }

        Commands::Warm => {
            let refreshed = scheduler::refresh_targets(&service, &warm_targets).await;
            info!(
                refreshed = refreshed,
                total = warm_targets.len(),
                "Warm-up complete"
            );
        }
    }

    Ok(())
}
