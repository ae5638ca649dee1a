use std::io::Cursor;

use anyhow::{Context, Result};
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};

use crate::error::ExtractError;
use crate::table::{Row, Table};

/// List the sheet names of an in-memory workbook.
pub fn sheet_names(bytes: &[u8]) -> Result<Vec<String>> {
    let workbook: Xlsx<_> =
        open_workbook_from_rs(Cursor::new(bytes)).context("not a readable xlsx workbook")?;
    Ok(workbook.sheet_names().to_vec())
}

/// Read one sheet into a `Table`, skipping `skip_rows` preamble rows. The
/// first remaining row becomes the header, the rest the data rows.
pub fn sheet_table(bytes: &[u8], sheet: &str, skip_rows: usize) -> Result<Table> {
    let mut workbook: Xlsx<_> =
        open_workbook_from_rs(Cursor::new(bytes)).context("not a readable xlsx workbook")?;
    let range = match workbook.worksheet_range(sheet) {
        Ok(range) => range,
        Err(_) => {
            return Err(ExtractError::MissingSheet(workbook.sheet_names().to_vec()).into());
        }
    };

    let mut rows = range.rows().skip(skip_rows);
    let Some(header) = rows.next() else {
        return Ok(Table::default());
    };
    let columns: Vec<String> = header
        .iter()
        .map(|cell| cell_to_string(cell).unwrap_or_default())
        .collect();

    let mut table = Table::new(columns);
    for row in rows {
        table.push_row(row.iter().map(cell_to_string).collect::<Row>());
    }
    Ok(table)
}

/// Read the first sheet of the workbook.
pub fn first_sheet_table(bytes: &[u8], skip_rows: usize) -> Result<Table> {
    let names = sheet_names(bytes)?;
    let first = names
        .first()
        .cloned()
        .ok_or_else(|| ExtractError::MissingSheet(Vec::new()))?;
    sheet_table(bytes, &first, skip_rows)
}

/// Render a cell the way the holdings files expect: integral floats lose
/// the trailing ".0", date cells render ISO, error cells count as null.
fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Data::Float(f) => Some(format_number(*f)),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => {
            let rendered = dt.as_datetime().map(|d| {
                if d.time() == chrono::NaiveTime::MIN {
                    d.date().format("%Y-%m-%d").to_string()
                } else {
                    d.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            });
            rendered.or_else(|| Some(dt.as_f64().to_string()))
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

fn format_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}
