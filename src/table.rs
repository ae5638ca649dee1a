use std::collections::HashSet;

/// One row of nullable cells. Blank upstream values are stored as `None`.
pub type Row = Vec<Option<String>>;

/// In-memory tabular data: ordered column names plus rows of nullable
/// string cells. Every issuer payload (CSV, XLSX sheet, JSON records,
/// HTML table) is converted into one of these before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

/// Return the first candidate row index whose cell set contains one of the
/// marker column names, defaulting to the first candidate (row 0 when the
/// candidate list is empty). This isolates the per-issuer header-layout
/// branching: some workbooks float their real header one row down.
pub fn detect_header_row(rows: &[Row], candidates: &[usize], markers: &[&str]) -> usize {
    for &idx in candidates {
        let Some(row) = rows.get(idx) else { continue };
        let cells: HashSet<&str> = row.iter().filter_map(|c| c.as_deref()).collect();
        if markers.iter().any(|m| cells.contains(m)) {
            return idx;
        }
    }
    candidates.first().copied().unwrap_or(0)
}

fn normalize_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Build from a header row and data rows, padding short rows with nulls.
    pub fn with_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// Normalize and append one row, padding or truncating to the column count.
    pub fn push_row(&mut self, mut row: Row) {
        row.truncate(self.columns.len());
        row.resize(self.columns.len(), None);
        let row = row
            .into_iter()
            .map(|cell| cell.as_deref().and_then(normalize_cell))
            .collect();
        self.rows.push(row);
    }

    /// Drop rows with fewer than `min_non_null` populated cells. Filters the
    /// totals/footer rows that issuer files append below the holdings. The
    /// threshold is capped at the column count so fully-populated rows of a
    /// narrow table always survive.
    pub fn drop_sparse_rows(&mut self, min_non_null: usize) {
        let threshold = min_non_null.min(self.columns.len());
        self.rows
            .retain(|row| row.iter().filter(|c| c.is_some()).count() >= threshold);
    }

    /// Drop columns whose every data cell is null.
    pub fn drop_empty_columns(&mut self) {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| self.rows.iter().any(|row| row[i].is_some()))
            .collect();
        self.reorder_indices(&keep);
    }

    /// Drop columns with a blank header name.
    pub fn drop_unnamed_columns(&mut self) {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !self.columns[i].trim().is_empty())
            .collect();
        self.reorder_indices(&keep);
    }

    /// Replace the header with the cells of data row `idx` (newlines
    /// stripped) and drop that row and everything above it.
    pub fn promote_header(&mut self, idx: usize) {
        if idx >= self.rows.len() {
            return;
        }
        self.columns = self.rows[idx]
            .iter()
            .map(|cell| cell.as_deref().unwrap_or("").replace('\n', ""))
            .collect();
        self.rows.drain(..=idx);
    }

    /// Apply a source-header → canonical-header rename map. Columns whose
    /// name matches no map key pass through unchanged.
    pub fn rename_columns(&mut self, map: &[(&str, &str)]) {
        for column in &mut self.columns {
            if let Some((_, target)) = map.iter().find(|(source, _)| source == column) {
                *column = target.to_string();
            }
        }
    }

    /// Collapse any column whose name contains `needle` to exactly `target`.
    /// Some ASX sheets suffix a header with the as-of date, which varies by
    /// month and would otherwise fragment the aggregate.
    pub fn rename_columns_containing(&mut self, needle: &str, target: &str) {
        for column in &mut self.columns {
            if column.contains(needle) {
                *column = target.to_string();
            }
        }
    }

    pub fn drop_column(&mut self, name: &str) {
        if let Some(idx) = self.column_index(name) {
            let keep: Vec<usize> = (0..self.columns.len()).filter(|&i| i != idx).collect();
            self.reorder_indices(&keep);
        }
    }

    /// True when any populated cell of `name` contains `needle`.
    pub fn column_contains(&self, name: &str, needle: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.rows
            .iter()
            .any(|row| row[idx].as_deref().is_some_and(|v| v.contains(needle)))
    }

    /// Split `source` on `delim` into the `targets` columns. Each value is
    /// split at most `targets.len() - 1` times; missing trailing parts stay
    /// null. Callers gate on `column_contains` first so an undelimited
    /// column is copied whole instead (see `copy_column`).
    pub fn split_column(&mut self, source: &str, delim: char, targets: &[&str]) {
        let Some(idx) = self.column_index(source) else {
            return;
        };
        let parts: Vec<Vec<Option<String>>> = self
            .rows
            .iter()
            .map(|row| {
                let mut out = vec![None; targets.len()];
                if let Some(value) = row[idx].as_deref() {
                    for (slot, part) in out.iter_mut().zip(value.splitn(targets.len(), delim)) {
                        *slot = normalize_cell(part);
                    }
                }
                out
            })
            .collect();
        for (t, target) in targets.iter().enumerate() {
            let column: Vec<Option<String>> = parts.iter().map(|p| p[t].clone()).collect();
            self.set_column(target, column);
        }
    }

    /// Copy `source` into `target` unchanged. Returns false when the source
    /// column is absent.
    pub fn copy_column(&mut self, source: &str, target: &str) -> bool {
        let Some(idx) = self.column_index(source) else {
            return false;
        };
        let column: Vec<Option<String>> = self.rows.iter().map(|row| row[idx].clone()).collect();
        self.set_column(target, column);
        true
    }

    /// Set every cell of `name` to `value`, creating the column if needed.
    pub fn add_constant_column(&mut self, name: &str, value: &str) {
        let column = vec![normalize_cell(value); self.rows.len()];
        self.set_column(name, column);
    }

    /// Set a whole column from per-row values, creating it if needed.
    /// Values are padded/truncated to the row count.
    pub fn set_column_values(&mut self, name: &str, mut values: Vec<Option<String>>) {
        values.resize(self.rows.len(), None);
        self.set_column(name, values);
    }

    /// Create the column as all-null if absent.
    pub fn add_null_column(&mut self, name: &str) {
        if self.column_index(name).is_none() {
            self.set_column(name, vec![None; self.rows.len()]);
        }
    }

    /// Keep only the columns named in `keep`, in `keep` order, skipping any
    /// that are absent. This both fixes the output column order and drops
    /// whatever issuer-specific extras survived renaming.
    pub fn project(&mut self, keep: &[&str]) {
        let indices: Vec<usize> = keep
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect();
        self.reorder_indices(&indices);
    }

    /// Append another table, aligning columns by name. Columns new to either
    /// side are retained, with null backfill for the rows that lack them.
    pub fn append(&mut self, other: Table) {
        for column in &other.columns {
            if self.column_index(column).is_none() {
                self.columns.push(column.clone());
                for row in &mut self.rows {
                    row.push(None);
                }
            }
        }
        let mapping: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|c| other.column_index(c))
            .collect();
        for row in other.rows {
            let aligned: Row = mapping
                .iter()
                .map(|idx| idx.and_then(|i| row[i].clone()))
                .collect();
            self.rows.push(aligned);
        }
    }

    fn set_column(&mut self, name: &str, column: Vec<Option<String>>) {
        debug_assert_eq!(column.len(), self.rows.len());
        match self.column_index(name) {
            Some(idx) => {
                for (row, cell) in self.rows.iter_mut().zip(column) {
                    row[idx] = cell;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, cell) in self.rows.iter_mut().zip(column) {
                    row.push(cell);
                }
            }
        }
    }

    fn reorder_indices(&mut self, indices: &[usize]) {
        self.columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            *row = indices.iter().map(|&i| row[i].take()).collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(cells: &[&str]) -> Row {
        cells
            .iter()
            .map(|c| if c.is_empty() { None } else { Some(c.to_string()) })
            .collect()
    }

    fn holdings_fixture() -> Table {
        Table::with_rows(
            vec![
                "Ticker".into(),
                "Name".into(),
                "Weight (%)".into(),
                "Market Value (AUD)".into(),
                "Sector".into(),
            ],
            vec![
                row(&["BHP", "BHP Group", "10.1", "1000", "Materials"]),
                row(&["CBA", "Commonwealth Bank", "9.2", "900", "Financials"]),
                row(&["Total", "", "100.0", "", ""]),
            ],
        )
    }

    #[test]
    fn test_drop_sparse_rows_filters_totals() {
        let mut table = holdings_fixture();
        table.drop_sparse_rows(5);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "Ticker"), Some("BHP"));
        assert_eq!(table.cell(1, "Ticker"), Some("CBA"));
    }

    #[test]
    fn test_drop_sparse_rows_caps_threshold_at_width() {
        let mut table = Table::with_rows(
            vec!["Name".into(), "Weight (%)".into()],
            vec![row(&["BHP Group", "10.1"]), row(&["Total", ""])],
        );
        table.drop_sparse_rows(5);
        // Fully-populated rows of a 2-column table survive a threshold of 5.
        assert_eq!(table.len(), 1);
        assert_eq!(table.cell(0, "Name"), Some("BHP Group"));
    }

    #[test]
    fn test_drop_empty_columns() {
        let mut table = Table::with_rows(
            vec!["A".into(), "B".into(), "C".into()],
            vec![row(&["1", "", "x"]), row(&["2", "", "y"])],
        );
        table.drop_empty_columns();
        assert_eq!(table.columns(), &["A".to_string(), "C".to_string()]);
        assert_eq!(table.cell(1, "C"), Some("y"));
    }

    #[test]
    fn test_drop_unnamed_columns() {
        let mut table = Table::with_rows(
            vec!["Code".into(), "".into(), "FUM".into()],
            vec![row(&["VAS", "junk", "1.0"])],
        );
        table.drop_unnamed_columns();
        assert_eq!(table.columns(), &["Code".to_string(), "FUM".to_string()]);
    }

    #[test]
    fn test_detect_header_row_prefers_marker() {
        let rows = vec![
            row(&["Funds at month end", "", ""]),
            row(&["ASX Code", "FUM", "Flows"]),
        ];
        assert_eq!(detect_header_row(&rows, &[0, 1], &["ASX Code"]), 1);
    }

    #[test]
    fn test_detect_header_row_defaults_to_first_candidate() {
        let rows = vec![row(&["ASX Code", "FUM"]), row(&["VAS", "1"])];
        assert_eq!(detect_header_row(&rows, &[0, 1], &["ASX Code"]), 0);
        // No marker anywhere: still the first candidate, never a panic.
        assert_eq!(detect_header_row(&rows, &[1], &["Ticker"]), 1);
        assert_eq!(detect_header_row(&[], &[], &["Ticker"]), 0);
    }

    #[test]
    fn test_promote_header_strips_newlines_and_drops_preamble() {
        let mut table = Table::with_rows(
            vec!["0".into(), "1".into()],
            vec![
                row(&["monthly statistics", ""]),
                row(&["ASX\nCode", "FUM\n($m)"]),
                row(&["VAS", "1000"]),
            ],
        );
        table.promote_header(1);
        assert_eq!(table.columns(), &["ASXCode".to_string(), "FUM($m)".to_string()]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.cell(0, "ASXCode"), Some("VAS"));
    }

    #[test]
    fn test_rename_leaves_no_source_named_column() {
        let mut table = holdings_fixture();
        let map = [
            ("Name", "Security Name"),
            ("Weight (%)", "Weight %"),
            ("Ticker", "Security Ticker"),
            ("Market Value (AUD)", "Market Value"),
        ];
        table.rename_columns(&map);
        for (source, _) in map {
            assert_eq!(table.column_index(source), None, "{source} should be renamed");
        }
        assert_eq!(table.cell(0, "Security Name"), Some("BHP Group"));
        // Unmapped columns pass through unchanged.
        assert_eq!(table.cell(0, "Sector"), Some("Materials"));
    }

    #[test]
    fn test_rename_columns_containing() {
        let mut table = Table::with_rows(
            vec!["Prem/Disc % NTA (pre-tax) at 31 Jul".into(), "Code".into()],
            vec![row(&["1.2", "AFI"])],
        );
        table.rename_columns_containing("Prem/Disc % NTA (pre-tax)", "Prem/Disc % NTA (pre-tax)");
        assert_eq!(table.cell(0, "Prem/Disc % NTA (pre-tax)"), Some("1.2"));
    }

    #[test]
    fn test_split_column_with_delimiter() {
        let mut table = Table::with_rows(
            vec!["Bloomberg Ticker".into(), "Weight".into()],
            vec![row(&["BHP AU Equity", "10.0"]), row(&["RIO AU Equity", "5.0"])],
        );
        table.split_column(
            "Bloomberg Ticker",
            ' ',
            &["Security Ticker", "Country Code", "Security Type"],
        );
        assert_eq!(table.cell(0, "Security Ticker"), Some("BHP"));
        assert_eq!(table.cell(0, "Country Code"), Some("AU"));
        assert_eq!(table.cell(1, "Security Type"), Some("Equity"));
    }

    #[test]
    fn test_split_column_without_delimiter_copies_whole_field() {
        let mut table = Table::with_rows(
            vec!["Ticker".into()],
            vec![row(&["BHP"]), row(&["CBA"])],
        );
        // The hyphen never occurs, so the caller copies instead of splitting.
        if table.column_contains("Ticker", "-") {
            table.split_column("Ticker", '-', &["Security Ticker", "Country Code"]);
        } else {
            table.copy_column("Ticker", "Security Ticker");
            table.add_null_column("Country Code");
        }
        assert_eq!(table.cell(0, "Security Ticker"), Some("BHP"));
        assert_eq!(table.cell(0, "Country Code"), None);
    }

    #[test]
    fn test_project_keeps_canonical_order() {
        let mut table = holdings_fixture();
        table.rename_columns(&[("Name", "Security Name"), ("Ticker", "Security Ticker")]);
        table.project(&["Issuer", "Security Ticker", "Security Name", "Country"]);
        // Absent canonical columns are skipped; the rest keep canonical order.
        assert_eq!(
            table.columns(),
            &["Security Ticker".to_string(), "Security Name".to_string()]
        );
        assert_eq!(table.cell(0, "Security Ticker"), Some("BHP"));
    }

    #[test]
    fn test_append_aligns_on_column_name() {
        let mut combined = Table::with_rows(
            vec!["Security Name".into(), "Weight %".into()],
            vec![row(&["BHP Group", "10.1"])],
        );
        let other = Table::with_rows(
            vec!["Weight %".into(), "Security Name".into(), "Country".into()],
            vec![row(&["3.3", "Apple Inc", "US"])],
        );
        combined.append(other);
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.cell(1, "Security Name"), Some("Apple Inc"));
        assert_eq!(combined.cell(1, "Weight %"), Some("3.3"));
        // Backfilled null for the pre-existing row.
        assert_eq!(combined.cell(0, "Country"), None);
    }

    #[test]
    fn test_add_constant_column_overwrites_existing() {
        let mut table = holdings_fixture();
        table.add_constant_column("etf ticker", "VAS");
        table.add_constant_column("etf ticker", "VGS");
        assert_eq!(table.cell(0, "etf ticker"), Some("VGS"));
        assert_eq!(
            table.columns().iter().filter(|c| *c == "etf ticker").count(),
            1
        );
    }

    #[test]
    fn test_blank_cells_normalize_to_null() {
        let mut table = Table::new(vec!["A".into(), "B".into()]);
        table.push_row(vec![Some("  ".into()), Some(" x ".into())]);
        assert_eq!(table.cell(0, "A"), None);
        assert_eq!(table.cell(0, "B"), Some("x"));
    }
}
