use thiserror::Error;

/// Failure classes raised inside the source clients. All of them are
/// handled identically by the per-entity loop (log, empty result,
/// continue), but keeping them typed preserves the upstream messages the
/// run log records.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Could not get the containing page {url}: {message}")]
    Page { url: String, message: String },

    #[error("Could not get the spreadsheet {url}: {message}")]
    Download { url: String, message: String },

    #[error("Could not find the spreadsheet link in\t{page}")]
    MissingLink { page: String },

    #[error("Missing expected column '{0}'")]
    MissingColumn(String),

    #[error("No usable sheet in workbook, found {0:?}")]
    MissingSheet(Vec<String>),
}

impl ExtractError {
    pub fn page(url: impl Into<String>, err: impl ToString) -> Self {
        ExtractError::Page { url: url.into(), message: err.to_string() }
    }

    pub fn download(url: impl Into<String>, err: impl ToString) -> Self {
        ExtractError::Download { url: url.into(), message: err.to_string() }
    }
}
