use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use etf_holdings::api::EtfSecuritiesClient;
use etf_holdings::collector::HoldingsCollector;
use etf_holdings::export;
use etf_holdings::fetch::HttpFetcher;
use etf_holdings::models::{Config, Issuer};
use etf_holdings::runlog::RunLog;

/// ETF Securities holdings extract, optionally refreshing the issuer's
/// product list first.
#[derive(Parser)]
#[command(name = "etf_securities", version)]
struct Args {
    /// Products page URL; when set, the scraped product table is written to
    /// the output directory before the holdings run.
    #[arg(long)]
    products_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let args = Args::parse();
    let config = Config::from_env()?;
    let mut log = RunLog::create(&config.logs_dir, "etf_securities")?;
    log.rule();

    if let Some(products_url) = &args.products_url {
        let client = EtfSecuritiesClient::new(HttpFetcher::new(&config)?);
        match client.refresh_product_list(products_url).await {
            Ok(products) => {
                let path = Path::new(&config.output_dir).join("Investment Products.xlsx");
                let bytes = export::write_workbook(&products, &path, "Investment_Products")?;
                log.line(&format!(
                    "Refreshed product list {} ({} products, {bytes} bytes)",
                    path.display(),
                    products.len()
                ));
            }
            Err(e) => log.line(&format!("Could not refresh the product list: {e}")),
        }
    }

    let collector = HoldingsCollector::new(config)?;
    collector.run(Some(Issuer::EtfSecurities), &mut log).await?;

    println!("Log has been generated at: {}", log.path().display());
    Ok(())
}
