use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_xlsxwriter::Workbook;

use crate::table::{Row, Table};

/// Write the combined table as CSV. Returns the written byte size.
pub fn write_csv(table: &Table, path: &Path) -> Result<u64> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("could not create {}", path.display()))?;
    if !table.columns().is_empty() {
        writer.write_record(table.columns())?;
        for row in table.rows() {
            writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
        }
    }
    writer.flush()?;
    Ok(fs::metadata(path)?.len())
}

/// Write the combined table as a single-sheet workbook with the header row
/// frozen, numbers written as numbers. Returns the written byte size.
pub fn write_workbook(table: &Table, path: &Path, sheet: &str) -> Result<u64> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet)?;
    for (col, name) in table.columns().iter().enumerate() {
        worksheet.write_string(0, col as u16, name)?;
    }
    for (r, row) in table.rows().iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let Some(value) = cell.as_deref() else { continue };
            match value.parse::<f64>() {
                Ok(number) => worksheet.write_number(r as u32 + 1, c as u16, number)?,
                Err(_) => worksheet.write_string(r as u32 + 1, c as u16, value)?,
            };
        }
    }
    worksheet.set_freeze_panes(1, 0)?;
    workbook
        .save(path)
        .with_context(|| format!("could not save {}", path.display()))?;
    Ok(fs::metadata(path)?.len())
}

/// Path for a per-entity individual workbook: `{dir}/{YYYYMMDD}_{code}.xlsx`.
pub fn individual_workbook_path(dir: &Path, run_day: &str, code: &str) -> PathBuf {
    dir.join(format!("{run_day}_{code}.xlsx"))
}

/// Read a CSV written by `write_csv` back into a table. Used for the
/// write/read row-count round-trip checks.
pub fn read_csv_table(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("could not open {}", path.display()))?;
    let mut records = reader.records();
    let Some(header) = records.next().transpose()? else {
        return Ok(Table::default());
    };
    let mut table = Table::new(header.iter().map(str::to_string).collect());
    for record in records {
        let record = record?;
        table.push_row(record.iter().map(|v| Some(v.to_string())).collect::<Row>());
    }
    Ok(table)
}
