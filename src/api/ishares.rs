use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::error::ExtractError;
use crate::fetch::{absolutize, find_anchor_href_by_text, HttpFetcher};
use crate::table::Table;

use super::{parse_csv_table, HoldingsProvider};

const BASE_URL: &str = "https://www.blackrock.com/";

/// Every holdings download starts with a 9-line fund summary preamble.
const PREAMBLE_LINES: usize = 9;

const RENAME: &[(&str, &str)] = &[
    ("Name", "Security Name"),
    ("Weight (%)", "Weight %"),
    ("Ticker", "Security Ticker"),
    ("Location", "Country"),
];

const KEEP: &[&str] = &[
    "Issuer",
    "etf ticker",
    "Security Ticker",
    "Security Name",
    "Weight %",
    "Market Value",
    "Rate",
    "Maturity date",
    "Country",
];

/// BlackRock iShares: the fund page carries a "Download Holdings" anchor.
/// Funds-of-funds repeat the column header mid-file before the look-through
/// holdings; the last repeat marks where the real table starts.
pub struct ISharesClient {
    fetcher: HttpFetcher,
}

impl ISharesClient {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl HoldingsProvider for ISharesClient {
    async fn fetch_holdings(&self, code: &str, link: &str) -> Result<Table> {
        let page = self
            .fetcher
            .get_text(link)
            .await
            .map_err(|e| ExtractError::page(link, e))?;
        let href = find_anchor_href_by_text(&page, "Download Holdings")
            .ok_or_else(|| ExtractError::MissingLink { page: link.to_string() })?;
        let file_url = absolutize(BASE_URL, &href);
        debug!("{code}: downloading {file_url}");
        let csv_text = self
            .fetcher
            .get_text(&file_url)
            .await
            .map_err(|e| ExtractError::download(&file_url, e))?;
        holdings_from_csv(&csv_text, code)
    }
}

fn holdings_from_csv(csv_text: &str, code: &str) -> Result<Table> {
    let mut table = parse_csv_table(csv_text, PREAMBLE_LINES)?;

    // A data row whose Ticker cell reads "Ticker" is a repeated header;
    // reparse from just past the last repeat so only the final table stays.
    if let Some(last_repeat) = last_repeated_header(&table) {
        let skip = PREAMBLE_LINES + last_repeat + 1;
        debug!("{code}: repeated header found, reparsing from line {skip}");
        table = parse_csv_table(csv_text, skip)?;
    }

    table.drop_sparse_rows(5);
    table.rename_columns(RENAME);
    table.add_constant_column("etf ticker", code);
    table.project(KEEP);
    Ok(table)
}

fn last_repeated_header(table: &Table) -> Option<usize> {
    let idx = table.column_index("Ticker")?;
    table
        .rows()
        .iter()
        .rposition(|row| row[idx].as_deref() == Some("Ticker"))
}
