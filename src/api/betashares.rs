use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::error::ExtractError;
use crate::fetch::{absolutize, find_anchor_href_containing, HttpFetcher};
use crate::table::Table;

use super::{parse_csv_table, trim_lines, HoldingsProvider};

const BASE_URL: &str = "https://www.betashares.com.au/";

/// The downloaded CSV wraps the holdings in a 6-line preamble and a
/// 5-line disclaimer footer.
const PREAMBLE_LINES: usize = 6;
const FOOTER_LINES: usize = 5;

const RENAME: &[(&str, &str)] = &[
    ("Name", "Security Name"),
    ("Weight (%)", "Weight %"),
    ("Ticker", "Security Ticker"),
    ("Market Value (AUD)", "Market Value"),
];

/// After renaming, keep only these columns. This also fixes the column
/// order in the combined output.
const KEEP: &[&str] = &[
    "Issuer",
    "etf ticker",
    "Security Ticker",
    "Security Name",
    "Weight %",
    "Market Value",
    "Rate",
    "Maturity date",
    "Sector",
    "Country",
];

/// Betashares: the fund page links a `…Holdings.csv` download.
pub struct BetaSharesClient {
    fetcher: HttpFetcher,
}

impl BetaSharesClient {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl HoldingsProvider for BetaSharesClient {
    async fn fetch_holdings(&self, code: &str, link: &str) -> Result<Table> {
        let page = self
            .fetcher
            .get_text(link)
            .await
            .map_err(|e| ExtractError::page(link, e))?;
        let href = find_anchor_href_containing(&page, "Holdings.csv")
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
    let body = trim_lines(csv_text, PREAMBLE_LINES, FOOTER_LINES);
    let mut table = parse_csv_table(&body, 0)?;
    table.drop_sparse_rows(5);
    table.rename_columns(RENAME);
    table.add_constant_column("etf ticker", code);
    table.project(KEEP);
    Ok(table)
}
