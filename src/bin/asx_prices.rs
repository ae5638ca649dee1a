use anyhow::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use etf_holdings::asx_prices;
use etf_holdings::models::Config;
use etf_holdings::runlog::RunLog;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let config = Config::from_env()?;
    let mut log = RunLog::create(&config.logs_dir, "asx_prices")?;
    log.banner("==================================================================");
    log.banner("                   ASX SHARES PRICE : STARTED");
    log.banner("==================================================================");

    asx_prices::run_share_prices(&config, &mut log).await?;

    log.banner("***********************************************************************");
    log.banner("                   ASX SHARES PRICE : COMPLETED");
    log.banner("***********************************************************************");
    println!("Log has been generated at: {}", log.path().display());
    Ok(())
}
