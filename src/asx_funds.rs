//! Exchange funds-statistics pipeline: the ASX publishes one workbook per
//! month behind a year-tabbed page; each workbook carries one sheet per
//! product kind (ETPs, LICs, ...). Rows aggregate per kind across months.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use scraper::{Html, Selector};
use tracing::warn;

use crate::error::ExtractError;
use crate::export;
use crate::fetch::{absolutize, HttpFetcher};
use crate::models::{Config, MonthlyStatement, RunSummary};
use crate::runlog::RunLog;
use crate::table::{detect_header_row, Table};
use crate::workbook;

pub const BASE_URL: &str = "https://www2.asx.com.au";
pub const FUND_LIST_URL: &str =
    "https://www2.asx.com.au/issuers/investment-products/asx-funds-statistics";

/// Sheet kinds worth extracting, in match-priority order. A sheet maps to
/// the first kind its upper-cased name contains.
pub const SHEET_KINDS: &[&str] = &["ETP", "LIC", "REIT", "MFSA", "MFUND", "INFRA"];

const OUTPUT_STEM: &str = "ASX Investment Products";

/// One sheet pulled out of a monthly workbook.
#[derive(Debug)]
pub struct SheetExtract {
    pub sheet: String,
    pub kind: Option<&'static str>,
    pub table: Table,
}

pub struct FundsStatisticsClient {
    fetcher: HttpFetcher,
}

impl FundsStatisticsClient {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }

    /// Scrape the statistics page into one entry per monthly workbook.
    pub async fn monthly_statements(&self) -> Result<Vec<MonthlyStatement>> {
        let page = self
            .fetcher
            .get_text(FUND_LIST_URL)
            .await
            .map_err(|e| ExtractError::page(FUND_LIST_URL, e))?;
        Ok(statements_from_page(&page))
    }

    /// Download one monthly workbook and extract every recognised sheet.
    pub async fn statement_tables(&self, statement: &MonthlyStatement) -> Result<Vec<SheetExtract>> {
        let bytes = self
            .fetcher
            .get_bytes(&statement.link)
            .await
            .map_err(|e| ExtractError::download(&statement.link, e))?;
        tables_from_workbook(&bytes, &statement.period)
    }
}

/// Walk the year tab panels: each holds a table of monthly links whose text
/// ends in "- {Month} {Year}".
pub fn statements_from_page(html: &str) -> Vec<MonthlyStatement> {
    let document = Html::parse_document(html);
    let panel_sel =
        Selector::parse("div.tabs-component div.cmp-tabs__tabpanel").expect("static selector");
    let anchor_sel = Selector::parse("#multi-column-1 table a[href]").expect("static selector");

    let mut statements = Vec::new();
    for panel in document.select(&panel_sel) {
        for anchor in panel.select(&anchor_sel) {
            let description: String = anchor.text().collect::<String>().trim().to_string();
            let Some(href) = anchor.value().attr("href") else { continue };
            match statement_from_link(&description, href) {
                Some(statement) => statements.push(statement),
                None => warn!("could not parse statement link text '{description}'"),
            }
        }
    }
    statements
}

fn statement_from_link(description: &str, href: &str) -> Option<MonthlyStatement> {
    let month_year = description.rsplit('-').next()?.trim();
    let year = month_year.split_whitespace().last()?.to_string();
    let period = NaiveDate::parse_from_str(&format!("1 {month_year}"), "%d %B %Y")
        .ok()?
        .format("%d/%m/%Y")
        .to_string();
    let exchange = description.split_whitespace().next()?.to_string();
    Some(MonthlyStatement {
        period,
        description: description.to_string(),
        exchange,
        link: absolutize(BASE_URL, href),
        year,
    })
}

/// Keep only statements of the configured years; `ALL` keeps everything.
pub fn filter_statements(
    statements: Vec<MonthlyStatement>,
    years: &[String],
) -> Vec<MonthlyStatement> {
    if years.first().map(|y| y.eq_ignore_ascii_case("all")).unwrap_or(true) {
        return statements;
    }
    statements
        .into_iter()
        .filter(|s| years.contains(&s.year))
        .collect()
}

/// Map a sheet name to its product kind, if any.
pub fn sheet_kind(sheet_name: &str) -> Option<&'static str> {
    let upper = sheet_name.to_uppercase();
    SHEET_KINDS.iter().find(|kind| upper.contains(*kind)).copied()
}

pub fn tables_from_workbook(bytes: &[u8], period: &str) -> Result<Vec<SheetExtract>> {
    let names = workbook::sheet_names(bytes)?;
    let mut extracts = Vec::with_capacity(names.len());
    for name in names {
        let kind = sheet_kind(&name);
        let table = match kind {
            Some(kind) => {
                let raw = workbook::sheet_table(bytes, &name, 0)?;
                normalize_statement_sheet(kind, raw, period)
            }
            None => Table::default(),
        };
        extracts.push(SheetExtract { sheet: name, kind, table });
    }
    Ok(extracts)
}

/// Per-sheet normalization. ETP sheets are the one layout whose header can
/// float a row down (a merged banner takes row 0 in some months), detected
/// by sniffing for the `ASX Code` marker.
pub fn normalize_statement_sheet(kind: &str, mut table: Table, period: &str) -> Table {
    table.drop_sparse_rows(5);
    table.drop_empty_columns();

    let header_idx = if kind == "ETP" {
        detect_header_row(table.rows(), &[0, 1], &["ASX Code"])
    } else {
        0
    };
    table.promote_header(header_idx);

    match kind {
        // The month's as-of date is baked into the header; collapse it so
        // months aggregate under one column.
        "LIC" => table
            .rename_columns_containing("Prem/Disc % NTA (pre-tax)", "Prem/Disc % NTA (pre-tax)"),
        "MFUND" => {
            table.rename_columns(&[("FUM", "FUM ($m)#")]);
            // Only ever published in 2017.
            table.drop_column("Historical Distribution Yield");
        }
        "INFRA" => table.rename_columns_containing("Mkt Cap ($m)", "Mkt Cap ($m)"),
        _ => {}
    }

    table.drop_unnamed_columns();
    table.add_constant_column("Period", period);
    table
}

/// Full pipeline: discover the monthly workbooks, filter by year, extract
/// and aggregate per kind, write one combined XLSX+CSV pair per kind.
pub async fn run_funds_statistics(config: &Config, log: &mut RunLog) -> Result<RunSummary> {
    let started = Instant::now();
    let client = FundsStatisticsClient::new(HttpFetcher::new(config)?);

    let statements = client.monthly_statements().await?;
    let filtered = filter_statements(statements, &config.filter_years);
    let mut summary = RunSummary { funds_listed: filtered.len(), ..Default::default() };

    if filtered.is_empty() {
        log.line(&format!(
            "Your ASX_FILTER_YEARS : {:?} is not valid. Please re-configure ASX_FILTER_YEARS.",
            config.filter_years
        ));
        summary.elapsed_secs = started.elapsed().as_secs();
        return Ok(summary);
    }

    let run_day = Local::now().format("%Y-%m-%d").to_string();
    let mut aggregates: Vec<(&'static str, Table)> =
        SHEET_KINDS.iter().map(|kind| (*kind, Table::default())).collect();

    for statement in &filtered {
        log.line(&format!("{}\tStarting .........", statement.description));
        let extracts = match client.statement_tables(statement).await {
            Ok(extracts) => extracts,
            Err(e) => {
                log.line(&format!("{}\t{e}", statement.description));
                continue;
            }
        };
        let mut contributed = 0;
        for extract in extracts {
            let Some(kind) = extract.kind else {
                log.line(&format!(
                    "\t\t\t {} is not listed in {:?}",
                    extract.sheet, SHEET_KINDS
                ));
                continue;
            };
            if extract.table.is_empty() {
                continue;
            }
            if config.save_individual_files {
                let path = Path::new(&config.output_dir).join(format!(
                    "{run_day}-{kind}-{}.xlsx",
                    statement.description
                ));
                export::write_workbook(&extract.table, &path, kind)?;
            }
            log.line(&format!(
                "{}\t Sheet({kind})\t\t : completed.",
                statement.description
            ));
            contributed += extract.table.len();
            if let Some((_, aggregate)) = aggregates.iter_mut().find(|(k, _)| *k == kind) {
                aggregate.append(extract.table);
            }
        }
        if contributed > 0 {
            summary.funds_with_rows += 1;
            summary.rows += contributed;
        }
    }

    for (kind, aggregate) in &aggregates {
        if aggregate.is_empty() {
            continue;
        }
        let stem = Path::new(&config.output_dir).join(format!("{OUTPUT_STEM}-{kind}"));
        let xlsx = stem.with_extension("xlsx");
        let bytes = export::write_workbook(aggregate, &xlsx, kind)?;
        log.line("");
        log.line(&format!(
            "Saved the combined file {} size {:.0} KB",
            xlsx.display(),
            bytes as f64 / 1024.0
        ));
        let csv = stem.with_extension("csv");
        let bytes = export::write_csv(aggregate, &csv)?;
        log.line(&format!(
            "Saved the combined file {} size {:.0} KB",
            csv.display(),
            bytes as f64 / 1024.0
        ));
    }

    summary.elapsed_secs = started.elapsed().as_secs();
    let (minutes, seconds) = summary.minutes_seconds();
    log.line("");
    log.line(&format!(
        "Application took {minutes} minutes, {seconds} seconds for execution."
    ));
    Ok(summary)
}
