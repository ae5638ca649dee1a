use anyhow::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use etf_holdings::collector::HoldingsCollector;
use etf_holdings::models::{Config, Issuer};
use etf_holdings::runlog::RunLog;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    println!("======================================================================");
    println!("           BlackRock - iShares - Holdings EXTRACT: STARTED            ");
    println!("======================================================================");

    let config = Config::from_env()?;
    let mut log = RunLog::create(&config.logs_dir, "ishares")?;
    log.rule();

    let collector = HoldingsCollector::new(config)?;
    collector.run(Some(Issuer::IShares), &mut log).await?;

    println!("\n***********************************************************************");
    println!("           BlackRock - iShares - Holdings EXTRACT : COMPLETED          ");
    println!("***********************************************************************");
    Ok(())
}
