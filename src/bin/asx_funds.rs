use anyhow::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use etf_holdings::asx_funds;
use etf_holdings::models::Config;
use etf_holdings::runlog::RunLog;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let config = Config::from_env()?;
    let mut log = RunLog::create(&config.logs_dir, "asx_funds")?;
    log.banner("==================================================================");
    log.banner("                      ASX FUNDS : STARTED");
    log.banner("==================================================================");
    log.banner(&format!("FILTER YEARS (ASX_FILTER_YEARS) : {:?}", config.filter_years));

    asx_funds::run_funds_statistics(&config, &mut log).await?;

    log.banner("***********************************************************************");
    log.banner("                      ASX FUNDS : COMPLETED");
    log.banner("***********************************************************************");
    println!("Log has been generated at: {}", log.path().display());
    Ok(())
}
