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

    let config = Config::from_env()?;
    let mut log = RunLog::create(&config.logs_dir, "betashares")?;
    log.rule();

    let collector = HoldingsCollector::new(config)?;
    collector.run(Some(Issuer::BetaShares), &mut log).await?;

    println!("Log has been generated at: {}", log.path().display());
    Ok(())
}
