use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use chrono::Local;
use tracing::info;

use crate::api::{
    BetaSharesClient, EtfSecuritiesClient, HoldingsProvider, ISharesClient, StateStreetClient,
};
use crate::export;
use crate::fetch::HttpFetcher;
use crate::list::{self, is_valid_link};
use crate::models::{Config, FundEntry, Issuer, RunSummary};
use crate::runlog::RunLog;
use crate::table::Table;

/// Combined output stem when no issuer filter is in force.
const COMBINED_STEM: &str = "ETF Holdings";
const SHEET_NAME: &str = "ETF";

/// The holdings run orchestrator: loops the fund list strictly in input
/// order, dispatches each entry to its issuer's client, tags and appends
/// the normalized rows, and writes the combined outputs once at the end.
/// One entry failing never aborts the run.
pub struct HoldingsCollector {
    config: Config,
    betashares: BetaSharesClient,
    ishares: ISharesClient,
    state_street: StateStreetClient,
    etf_securities: EtfSecuritiesClient,
}

impl HoldingsCollector {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self {
            betashares: BetaSharesClient::new(fetcher.clone()),
            ishares: ISharesClient::new(fetcher.clone()),
            state_street: StateStreetClient::new(fetcher.clone()),
            etf_securities: EtfSecuritiesClient::new(fetcher),
            config,
        })
    }

    fn provider(&self, issuer: Issuer) -> &dyn HoldingsProvider {
        match issuer {
            Issuer::BetaShares => &self.betashares,
            Issuer::IShares => &self.ishares,
            Issuer::StateStreet => &self.state_street,
            Issuer::EtfSecurities => &self.etf_securities,
        }
    }

    /// Run the extract. With `only` set, entries of other issuers are
    /// treated as unrecognised, mirroring the single-issuer runs.
    pub async fn run(&self, only: Option<Issuer>, log: &mut RunLog) -> Result<RunSummary> {
        let started = Instant::now();
        let run_day = Local::now().format("%Y%m%d").to_string();
        let entries = list::load_fund_list(Path::new(&self.config.fund_list_path))?;

        let mut summary = RunSummary { funds_listed: entries.len(), ..Default::default() };
        let mut combined = Table::default();

        for entry in &entries {
            log.line(&format!("{}\t{}\tStarting...", entry.code, entry.issuer));
            if !is_valid_link(&entry.link) {
                log.line(&format!(
                    "{}\t{}\tSKIPPING, not a valid link",
                    entry.code, entry.issuer
                ));
                continue;
            }
            let issuer = match Issuer::from_label(&entry.issuer) {
                Some(issuer) if only.map_or(true, |o| o == issuer) => issuer,
                _ => {
                    log.line(&format!(
                        "{}\t{}\tDid not recognise this issuer",
                        entry.code, entry.issuer
                    ));
                    continue;
                }
            };

            let holdings = match self
                .provider(issuer)
                .fetch_holdings(&entry.code, &entry.link)
                .await
            {
                Ok(table) => table,
                Err(e) => {
                    log.line(&format!("{}\t{e}", entry.code));
                    Table::default()
                }
            };
            if holdings.is_empty() {
                log.line(&format!(
                    "{}\t{}\tFailed to get holdings",
                    entry.code, entry.issuer
                ));
                continue;
            }

            let holdings = self.tag_holdings(holdings, entry);
            if self.config.save_individual_files {
                let path = export::individual_workbook_path(
                    Path::new(&self.config.output_dir),
                    &run_day,
                    &entry.code,
                );
                export::write_workbook(&holdings, &path, &entry.code)?;
            }
            info!("{}: adding {} rows", entry.code, holdings.len());
            summary.funds_with_rows += 1;
            summary.rows += holdings.len();
            combined.append(holdings);
        }

        self.write_combined(&combined, only, log)?;

        summary.elapsed_secs = started.elapsed().as_secs();
        let (minutes, seconds) = summary.minutes_seconds();
        log.line(&format!(
            "This took {minutes} minutes, {seconds} seconds for {} funds",
            summary.funds_listed
        ));
        Ok(summary)
    }

    /// Tag rows with the owning entry's category and issuer label. The
    /// label overwrites any issuer constant a client stamped.
    fn tag_holdings(&self, mut holdings: Table, entry: &FundEntry) -> Table {
        holdings.add_constant_column("ETF Category", &entry.category);
        holdings.add_constant_column("Issuer", &entry.issuer);
        holdings
    }

    fn write_combined(
        &self,
        combined: &Table,
        only: Option<Issuer>,
        log: &mut RunLog,
    ) -> Result<()> {
        let stem = only.map_or(COMBINED_STEM, |issuer| issuer.output_stem());
        let base = Path::new(&self.config.output_dir).join(stem);

        let xlsx = base.with_extension("xlsx");
        let bytes = export::write_workbook(combined, &xlsx, SHEET_NAME)?;
        log.line(&format!(
            "Saved the combined file {} size {}x{} ({bytes} bytes)",
            xlsx.display(),
            combined.len(),
            combined.columns().len()
        ));

        let csv = base.with_extension("csv");
        let bytes = export::write_csv(combined, &csv)?;
        log.line(&format!(
            "Saved the combined file {} size {}x{} ({bytes} bytes)",
            csv.display(),
            combined.len(),
            combined.columns().len()
        ));
        Ok(())
    }
}
