use anyhow::Result;
use async_trait::async_trait;

use crate::table::{Row, Table};

pub mod betashares;
pub mod etf_securities;
pub mod ishares;
pub mod state_street;

pub use betashares::BetaSharesClient;
pub use etf_securities::EtfSecuritiesClient;
pub use ishares::ISharesClient;
pub use state_street::StateStreetClient;

/// Common trait for the per-issuer holdings clients: fetch one fund's
/// published holdings and return them normalized onto the issuer's keep
/// list, tagged with the fund code. Errors carry the upstream failure
/// message; the caller decides that every error means "empty, log, next".
#[async_trait]
pub trait HoldingsProvider {
    async fn fetch_holdings(&self, code: &str, link: &str) -> Result<Table>;
}

/// Parse CSV text into a `Table` after skipping `skip_lines` preamble
/// lines. The first parsed record becomes the header.
pub(crate) fn parse_csv_table(text: &str, skip_lines: usize) -> Result<Table> {
    let body: String = text
        .lines()
        .skip(skip_lines)
        .collect::<Vec<_>>()
        .join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());
    let mut records = reader.records();
    let Some(header) = records.next().transpose()? else {
        return Ok(Table::default());
    };
    let mut table = Table::new(header.iter().map(|h| h.trim().to_string()).collect());
    for record in records {
        let record = record?;
        table.push_row(record.iter().map(|v| Some(v.to_string())).collect::<Row>());
    }
    Ok(table)
}

/// Drop `head` lines from the top and `tail` lines from the bottom. Some
/// issuer CSV downloads wrap the holdings in disclaimer preambles and
/// footers that break the parser.
pub(crate) fn trim_lines(text: &str, head: usize, tail: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= head + tail {
        return String::new();
    }
    lines[head..lines.len() - tail].join("\n")
}
