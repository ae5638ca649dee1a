use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::error::ExtractError;
use crate::fetch::HttpFetcher;
use crate::table::Table;
use crate::workbook;

use super::HoldingsProvider;

/// The daily-holdings workbook lives at a code-derived URL; the list's
/// link column is not used for this issuer.
fn holdings_url(code: &str) -> String {
    format!(
        "https://www.ssga.com/au/en_gb/individual/etfs/library-content/products/fund-data/etfs/apac/holdings-daily-au-en-{}.xlsx",
        code.to_lowercase()
    )
}

/// Four rows of fund facts sit above the holdings header.
const PREAMBLE_ROWS: usize = 4;

const RENAME: &[(&str, &str)] = &[("Name", "Security Name"), ("Weight (%)", "Weight %")];

const KEEP: &[&str] = &[
    "Issuer",
    "etf ticker",
    "Security Ticker",
    "Country Code",
    "Security Name",
    "Weight %",
    "Market Value",
    "Rate",
    "Maturity date",
    "Sector",
    "Country",
    "Number of Shares",
    "Local Price",
];

/// State Street SPDR: `Ticker` is either plain or `TICKER-COUNTRY`;
/// split only when the hyphen actually occurs in the data.
pub struct StateStreetClient {
    fetcher: HttpFetcher,
}

impl StateStreetClient {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl HoldingsProvider for StateStreetClient {
    async fn fetch_holdings(&self, code: &str, _link: &str) -> Result<Table> {
        let file_url = holdings_url(code);
        debug!("{code}: downloading {file_url}");
        let bytes = self
            .fetcher
            .get_bytes(&file_url)
            .await
            .map_err(|e| ExtractError::download(&file_url, e))?;
        holdings_from_workbook(&bytes, code)
    }
}

fn holdings_from_workbook(bytes: &[u8], code: &str) -> Result<Table> {
    let mut table = workbook::first_sheet_table(bytes, PREAMBLE_ROWS)?;
    table.drop_sparse_rows(5);
    if table.column_index("Ticker").is_some() {
        if table.column_contains("Ticker", "-") {
            table.split_column("Ticker", '-', &["Security Ticker", "Country Code"]);
        } else {
            table.copy_column("Ticker", "Security Ticker");
            table.add_null_column("Country Code");
        }
    }
    table.rename_columns(RENAME);
    table.add_constant_column("Issuer", "State Street");
    table.add_constant_column("etf ticker", code);
    table.project(KEEP);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_xlsxwriter::Workbook;

    fn sample_workbook(tickers: &[&str]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("holdings").unwrap();
        for r in 0..PREAMBLE_ROWS as u32 {
            sheet.write_string(r, 0, "Fund Name: SPDR S&P/ASX 200").unwrap();
        }
        let header = ["Name", "Ticker", "Weight (%)", "Sector", "Number of Shares", "Local Price"];
        for (c, name) in header.iter().enumerate() {
            sheet.write_string(PREAMBLE_ROWS as u32, c as u16, *name).unwrap();
        }
        for (r, ticker) in tickers.iter().enumerate() {
            let row = PREAMBLE_ROWS as u32 + 1 + r as u32;
            sheet.write_string(row, 0, format!("Security {r}")).unwrap();
            sheet.write_string(row, 1, *ticker).unwrap();
            sheet.write_number(row, 2, 1.5).unwrap();
            sheet.write_string(row, 3, "Materials").unwrap();
            sheet.write_number(row, 4, 100.0).unwrap();
            sheet.write_number(row, 5, 42.5).unwrap();
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_hyphenated_tickers_split() {
        let bytes = sample_workbook(&["BHP-AU", "RIO-AU"]);
        let table = holdings_from_workbook(&bytes, "STW").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "Security Ticker"), Some("BHP"));
        assert_eq!(table.cell(0, "Country Code"), Some("AU"));
        assert_eq!(table.cell(0, "Issuer"), Some("State Street"));
        assert_eq!(table.cell(0, "etf ticker"), Some("STW"));
        assert_eq!(table.cell(1, "Local Price"), Some("42.5"));
    }

    #[test]
    fn test_plain_tickers_copy_whole_field() {
        let bytes = sample_workbook(&["BHP", "RIO"]);
        let table = holdings_from_workbook(&bytes, "STW").unwrap();
        assert_eq!(table.cell(0, "Security Ticker"), Some("BHP"));
        assert_eq!(table.cell(0, "Country Code"), None);
        assert_eq!(table.cell(1, "Security Ticker"), Some("RIO"));
    }

    #[test]
    fn test_holdings_url_is_code_derived() {
        assert!(holdings_url("STW").ends_with("holdings-daily-au-en-stw.xlsx"));
    }
}
