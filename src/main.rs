//! CLI entry point.
//!
//! `catalog-sync <input_file> <mode>` where mode is `screen-N` (preview N
//! rows, no mutation), `api-N` (create/sync N rows against the live API) or
//! `update-N` (push field updates from an export CSV for N rows).

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use catalog_sync::application::{SyncOrchestrator, SyncSettings, UpdateOrchestrator};
use catalog_sync::domain::CatalogApi;
use catalog_sync::infrastructure::csv_loader::load_rows;
use catalog_sync::infrastructure::logging::init_logging;
use catalog_sync::infrastructure::{AppConfig, DatabaseConnection, MappingRepository, ShopifyClient};

/// Execution mode: what to do with the first N rows of the input file.
#[derive(Debug, Clone, Copy)]
enum RunMode {
    /// Preview only; no remote or local mutation.
    Screen(usize),
    /// Create/sync products against the live API.
    Api(usize),
    /// Push updates from an export-format CSV.
    Update(usize),
}

impl RunMode {
    fn limit(self) -> usize {
        match self {
            Self::Screen(n) | Self::Api(n) | Self::Update(n) => n,
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, count) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid mode '{s}': expected screen-N, api-N or update-N"))?;
        let count: usize = count
            .parse()
            .map_err(|_| format!("invalid row count in mode '{s}'"))?;
        if count == 0 {
            return Err("row count must be greater than 0".to_string());
        }
        match kind {
            "screen" => Ok(Self::Screen(count)),
            "api" => Ok(Self::Api(count)),
            "update" => Ok(Self::Update(count)),
            _ => Err(format!("unknown mode '{kind}': expected screen, api or update")),
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "catalog-sync",
    about = "Synchronize product catalog CSV files with a Shopify shop",
    after_help = "Examples:\n  catalog-sync productos.csv screen-10\n  catalog-sync productos.csv api-50\n  catalog-sync export.csv update-100"
)]
struct Cli {
    /// Input CSV file
    input_file: PathBuf,
    /// Execution mode: screen-N, api-N or update-N
    mode: RunMode,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let _guard = match init_logging() {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("failed to initialize logging: {err}");
            None
        }
    };

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // clap renders usage/help itself; argument errors exit with 1.
            let _ = err.print();
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(err) = run(cli).await {
        error!("execution failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::from_env()?;

    let rows = load_rows(&cli.input_file, cli.mode.limit()).await?;
    info!("loaded {} row(s) from {}", rows.len(), cli.input_file.display());

    let db = DatabaseConnection::new(&config.database_url)
        .await
        .context("failed to open mapping database")?;
    db.migrate().await.context("failed to migrate mapping database")?;
    let store = MappingRepository::new(db.pool().clone());

    let api: Arc<dyn CatalogApi> = Arc::new(ShopifyClient::new(
        &config.shopify,
        Duration::from_secs(config.request_timeout_secs),
    )?);

    let live = matches!(cli.mode, RunMode::Api(_) | RunMode::Update(_));
    if live {
        let shop = api.shop_name().await.context("Shopify connection check failed")?;
        info!("connected to shop: {shop}");
    }

    match cli.mode {
        RunMode::Screen(_) | RunMode::Api(_) => {
            let orchestrator = SyncOrchestrator::new(
                api,
                store,
                SyncSettings {
                    vendor: config.vendor.clone(),
                    price_multiplier: config.price_multiplier,
                    request_delay: Duration::from_millis(config.request_delay_ms),
                },
            );
            orchestrator.run(&rows, !live).await?;
        }
        RunMode::Update(_) => {
            let orchestrator = UpdateOrchestrator::new(
                api,
                store,
                Duration::from_millis(config.request_delay_ms),
            );
            orchestrator.run(&rows, false).await?;
        }
    }

    Ok(())
}
