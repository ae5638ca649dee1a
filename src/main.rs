use anyhow::Result;
use clap::Parser;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use etf_holdings::collector::HoldingsCollector;
use etf_holdings::models::Config;
use etf_holdings::runlog::RunLog;

/// Fetch published ETF holdings from every recognised issuer in the fund
/// list and write the combined spreadsheet/CSV outputs.
#[derive(Parser)]
#[command(name = "etf-holdings", version)]
struct Args {
    /// Fund list file (.xlsx or .csv); overrides FUND_LIST_PATH.
    #[arg(long)]
    list: Option<String>,

    /// Output directory; overrides OUTPUT_DIR.
    #[arg(long)]
    output_dir: Option<String>,

    /// Also write one workbook per fund.
    #[arg(long)]
    individual: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter("etf_holdings=info")
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let args = Args::parse();
    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };
    if let Some(list) = args.list {
        config.fund_list_path = list;
    }
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    if args.individual {
        config.save_individual_files = true;
    }

    let mut log = RunLog::create(&config.logs_dir, "etf-holdings")?;
    log.rule();
    log.banner("======================================================================");
    log.banner("                  ETF HOLDINGS EXTRACT : STARTED");
    log.banner("======================================================================");

    let collector = HoldingsCollector::new(config)?;
    let summary = collector.run(None, &mut log).await?;

    log.banner("***********************************************************************");
    log.banner("                  ETF HOLDINGS EXTRACT : COMPLETED");
    log.banner("***********************************************************************");
    println!(
        "{} of {} funds returned holdings ({} rows)",
        summary.funds_with_rows, summary.funds_listed, summary.rows
    );
    println!("Log has been generated at: {}", log.path().display());
    Ok(())
}
