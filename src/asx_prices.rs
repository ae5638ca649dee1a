//! Share-price pipeline: one JSON endpoint per code returning recent daily
//! bars under a `data` array; rows aggregate across codes.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use serde_json::Value;

use crate::error::ExtractError;
use crate::export;
use crate::fetch::HttpFetcher;
use crate::list::{self, is_valid_link};
use crate::models::{Config, RunSummary};
use crate::runlog::RunLog;
use crate::table::{Row, Table};

const RENAME: &[(&str, &str)] = &[
    ("close_date", "close date"),
    ("close_price", "close price"),
    ("change_price", "change price"),
    ("day_high_price", "day high price"),
    ("day_low_price", "day low price"),
    ("change_in_percent", "change in percent"),
];

const KEEP: &[&str] = &[
    "etf ticker",
    "close date",
    "close price",
    "change price",
    "volume",
    "day high price",
    "day low price",
    "change in percent",
];

const OUTPUT_STEM: &str = "ASX_Shares_price";
const SHEET_NAME: &str = "ASX Shares Price";

pub struct SharePriceClient {
    fetcher: HttpFetcher,
}

impl SharePriceClient {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }

    /// The endpoint echoes the code per record, so the link is all that is
    /// needed here.
    pub async fn fetch_prices(&self, link: &str) -> Result<Table> {
        let json = self
            .fetcher
            .get_json(link)
            .await
            .map_err(|e| ExtractError::download(link, e))?;
        let mut table = prices_from_json(&json)?;
        table.copy_column("code", "etf ticker");
        table.rename_columns(RENAME);
        table.project(KEEP);
        Ok(table)
    }
}

/// Flatten the `data` array of records into a table. Columns are the union
/// of the record keys (serde keeps them sorted, which is stable across
/// runs); nulls stay null, everything else renders as its JSON text.
pub fn prices_from_json(value: &Value) -> Result<Table> {
    let records = value
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| ExtractError::MissingColumn("data".into()))?;

    let mut columns: Vec<String> = Vec::new();
    for record in records {
        if let Some(object) = record.as_object() {
            for key in object.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    let mut table = Table::new(columns.clone());
    for record in records {
        let Some(object) = record.as_object() else { continue };
        let row: Row = columns
            .iter()
            .map(|key| object.get(key).and_then(json_cell))
            .collect();
        table.push_row(row);
    }
    Ok(table)
}

fn json_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        other => Some(other.to_string()),
    }
}

/// Full pipeline: loop the fund list, fetch each code's recent prices,
/// aggregate and write one combined XLSX+CSV pair.
pub async fn run_share_prices(config: &Config, log: &mut RunLog) -> Result<RunSummary> {
    let started = Instant::now();
    let client = SharePriceClient::new(HttpFetcher::new(config)?);
    let entries = list::load_fund_list(Path::new(&config.fund_list_path))?;

    let mut summary = RunSummary { funds_listed: entries.len(), ..Default::default() };
    let mut combined = Table::default();

    for entry in &entries {
        log.line(&format!("{}\tStarting...", entry.code));
        if !is_valid_link(&entry.link) {
            log.line(&format!("{}\tSKIPPING, not a valid link", entry.code));
            continue;
        }
        let prices = match client.fetch_prices(&entry.link).await {
            Ok(table) => table,
            Err(e) => {
                log.line(&format!("{}\t{e}", entry.code));
                Table::default()
            }
        };
        if prices.is_empty() {
            log.line(&format!("{}\tFailed to get prices", entry.code));
            continue;
        }
        summary.funds_with_rows += 1;
        summary.rows += prices.len();
        combined.append(prices);
    }

    let stem = Path::new(&config.output_dir).join(OUTPUT_STEM);
    let xlsx = stem.with_extension("xlsx");
    let bytes = export::write_workbook(&combined, &xlsx, SHEET_NAME)?;
    log.line(&format!(
        "Saved the combined file {} size {}x{} ({bytes} bytes)",
        xlsx.display(),
        combined.len(),
        combined.columns().len()
    ));
    let csv = stem.with_extension("csv");
    let bytes = export::write_csv(&combined, &csv)?;
    log.line(&format!(
        "Saved the combined file {} size {}x{} ({bytes} bytes)",
        csv.display(),
        combined.len(),
        combined.columns().len()
    ));

    summary.elapsed_secs = started.elapsed().as_secs();
    let (minutes, seconds) = summary.minutes_seconds();
    log.line("");
    log.line(&format!(
        "Application took {minutes} minutes, {seconds} seconds for execution."
    ));
    Ok(summary)
}
