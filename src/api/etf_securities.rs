use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

use crate::error::ExtractError;
use crate::fetch::{absolutize, find_anchor_href_containing, HttpFetcher};
use crate::table::{Row, Table};
use crate::workbook;

use super::HoldingsProvider;

const BASE_URL: &str = "https://www.etfsecurities.com.au";

/// The holdings workbook opens with an 18-row fund fact sheet.
const PREAMBLE_ROWS: usize = 18;

const RENAME: &[(&str, &str)] = &[
    ("Component Name", "Security Name"),
    ("Weight", "Weight %"),
    ("Market Value (Base CCY)", "Market Value"),
];

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
];

/// ETF Securities: the fund page links an `.xlsx` workbook whose
/// `Bloomberg Ticker` column packs ticker, country and security type into
/// one space-delimited field.
pub struct EtfSecuritiesClient {
    fetcher: HttpFetcher,
}

impl EtfSecuritiesClient {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }

    /// Refresh the issuer's product list from its products page: the first
    /// HTML table, with per-product links derived from the `Code` column.
    /// The refreshed list feeds the next run's fund list.
    pub async fn refresh_product_list(&self, product_url: &str) -> Result<Table> {
        let page = self
            .fetcher
            .get_text(product_url)
            .await
            .map_err(|e| ExtractError::page(product_url, e))?;
        product_table(&page, product_url)
    }
}

#[async_trait]
impl HoldingsProvider for EtfSecuritiesClient {
    async fn fetch_holdings(&self, code: &str, link: &str) -> Result<Table> {
        let page = self
            .fetcher
            .get_text(link)
            .await
            .map_err(|e| ExtractError::page(link, e))?;
        let href = find_anchor_href_containing(&page, ".xlsx")
            .ok_or_else(|| ExtractError::MissingLink { page: link.to_string() })?;
        let file_url = absolutize(BASE_URL, &href);
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
    if table.column_index("Bloomberg Ticker").is_some() {
        table.split_column(
            "Bloomberg Ticker",
            ' ',
            &["Security Ticker", "Country Code", "Security Type"],
        );
    }
    table.rename_columns(RENAME);
    table.add_constant_column("etf ticker", code);
    table.project(KEEP);
    Ok(table)
}

/// Parse the first table of the products page. Cell text is cleaned of
/// non-breaking spaces, newlines and thousands commas; a cell containing an
/// anchor contributes the absolutized link instead of its text.
pub fn product_table(html: &str, product_url: &str) -> Result<Table> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse("table").expect("static selector");
    let tr_sel = Selector::parse("tr").expect("static selector");
    let th_sel = Selector::parse("th").expect("static selector");
    let td_sel = Selector::parse("td").expect("static selector");
    let a_sel = Selector::parse("a[href]").expect("static selector");

    let table_el = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| ExtractError::MissingLink { page: product_url.to_string() })?;
    let mut rows = table_el.select(&tr_sel);
    let header = rows
        .next()
        .ok_or_else(|| ExtractError::MissingColumn("Code".into()))?;
    let headings: Vec<String> = header
        .select(&th_sel)
        .map(|th| clean_cell(&th.text().collect::<String>()))
        .collect();

    let mut table = Table::new(headings);
    for row in rows {
        let cells: Row = row
            .select(&td_sel)
            .map(|td| {
                if let Some(anchor) = td.select(&a_sel).next() {
                    let href = anchor.value().attr("href").unwrap_or_default();
                    Some(absolutize(BASE_URL, href))
                } else {
                    Some(clean_cell(&td.text().collect::<String>()))
                }
            })
            .collect();
        if !cells.is_empty() {
            table.push_row(cells);
        }
    }

    if table.column_index("Code").is_none() {
        return Err(ExtractError::MissingColumn("Code".into()).into());
    }
    let links: Vec<Option<String>> = (0..table.len())
        .map(|row| {
            table
                .cell(row, "Code")
                .map(|code| format!("{product_url}/{code}").to_lowercase())
        })
        .collect();
    table.set_column_values("Link", links);

    // The sortable-header artifacts and unnamed columns carry no data.
    let keep: Vec<String> = table
        .columns()
        .iter()
        .filter(|name| !name.contains("Sort:") && !name.trim().is_empty())
        .cloned()
        .collect();
    let keep_refs: Vec<&str> = keep.iter().map(String::as_str).collect();
    table.project(&keep_refs);
    Ok(table)
}

fn clean_cell(raw: &str) -> String {
    raw.replace('\u{a0}', "").replace(['\n', ','], "").trim().to_string()
}
