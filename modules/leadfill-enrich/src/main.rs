use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::Claude;
use leadfill_core::Config;
use leadfill_enrich::orchestrator::{EnrichStats, Orchestrator};
use leadfill_enrich::pipeline::RowPipeline;
use leadfill_enrich::scraper::{BrowserlessFetcher, PageFetcher};
use leadfill_enrich::store::{CsvRowStore, SheetRowStore};
use sheets_client::SheetsClient;

/// Enrich tabular business records with contacts discovered from their
/// public web presence.
#[derive(Parser, Debug)]
#[command(name = "leadfill-enrich")]
struct Args {
    /// Run against a local CSV file instead of the configured Google
    /// Sheet.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Override the concurrent pipeline limit.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Override the per-run row cap.
    #[arg(long)]
    max_rows: Option<usize>,

    /// Override the per-row timeout in seconds.
    #[arg(long)]
    row_timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("Leadfill enrichment starting...");

    let mut config = if args.csv.is_some() {
        Config::csv_from_env()?
    } else {
        Config::sheet_from_env()?
    };
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency.clamp(1, 5);
    }
    if let Some(max_rows) = args.max_rows {
        config.max_rows = max_rows;
    }
    if let Some(secs) = args.row_timeout {
        config.row_timeout = Duration::from_secs(secs);
    }
    config.log_redacted();

    let fetcher: Arc<dyn PageFetcher> = Arc::new(BrowserlessFetcher::new(
        &config.browserless_url,
        config.browserless_token.as_deref(),
    ));
    let inference = config.anthropic_api_key.as_deref().map(Claude::new);
    let pipeline = RowPipeline::new(fetcher, inference, &config);

    let stats: EnrichStats = match args.csv {
        Some(path) => {
            let store = Arc::new(CsvRowStore::load(&path)?);
            Orchestrator::new(store, pipeline, &config).run().await?
        }
        None => {
            let client = SheetsClient::new(&config.sheets_token, &config.spreadsheet_id);
            let store = Arc::new(SheetRowStore::new(client, &config.sheet_name));
            Orchestrator::new(store, pipeline, &config).run().await?
        }
    };

    info!("{stats}");

    Ok(())
}
