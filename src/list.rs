use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::warn;

use crate::error::ExtractError;
use crate::models::FundEntry;
use crate::table::Table;
use crate::{export, workbook};

/// Links shorter than 5 characters are blank-cell residue ("", "NA", "-")
/// and mark the entity as not fetchable.
pub fn is_valid_link(link: &str) -> bool {
    link.trim().len() > 4
}

/// Load the input fund list from an XLSX or CSV file (by extension).
/// Expected columns: `ASX Code` (or `Code`), `Link`, `Issuer`, and an
/// optional `ETF Category`. Blanks normalize to empty strings. A malformed
/// list is fatal: it is the one input the run cannot continue without.
pub fn load_fund_list(path: &Path) -> Result<Vec<FundEntry>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    let table = match extension.as_str() {
        "csv" => export::read_csv_table(path)?,
        _ => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("could not read fund list {}", path.display()))?;
            workbook::first_sheet_table(&bytes, 0)?
        }
    };
    entries_from_table(&table).with_context(|| format!("malformed fund list {}", path.display()))
}

fn entries_from_table(table: &Table) -> Result<Vec<FundEntry>> {
    let code_column = ["ASX Code", "Code"]
        .iter()
        .find(|c| table.column_index(c).is_some())
        .copied()
        .ok_or_else(|| ExtractError::MissingColumn("ASX Code".into()))?;
    if table.column_index("Link").is_none() {
        bail!(ExtractError::MissingColumn("Link".into()));
    }
    if table.column_index("Issuer").is_none() {
        bail!(ExtractError::MissingColumn("Issuer".into()));
    }

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let cell = |column: &str| table.cell(row, column).unwrap_or("").to_string();
        let entry = FundEntry {
            code: cell(code_column),
            link: cell("Link"),
            issuer: cell("Issuer"),
            category: cell("ETF Category"),
        };
        if !entry.code.is_empty() && !seen.insert(entry.code.clone()) {
            warn!("duplicate code {} in fund list", entry.code);
        }
        entries.push(entry);
    }
    Ok(entries)
}
