use serde::{Deserialize, Serialize};

/// One row of the input fund list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundEntry {
    /// Exchange code, e.g. "VAS". Unique within one run (warned otherwise).
    pub code: String,
    /// Fund page or download link. Blank (shorter than 5 chars) means skip.
    pub link: String,
    /// Issuer label used for dispatch, e.g. "BetaShares".
    pub issuer: String,
    /// Optional category tag carried through to the output.
    pub category: String,
}

/// One monthly funds-statistics workbook discovered on the exchange page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyStatement {
    /// Reporting period rendered dd/mm/yyyy (first of the month).
    pub period: String,
    /// Link text, e.g. "ASX Investment Products - July 2021".
    pub description: String,
    /// First word of the description.
    pub exchange: String,
    /// Absolute workbook URL.
    pub link: String,
    /// Four-digit year, used by the year filter.
    pub year: String,
}

/// Issuers the holdings extract recognises. Dispatch is a case-insensitive
/// prefix match on the list's issuer label, as the labels vary in suffix
/// ("BetaShares Capital Ltd", "iShares Core...", and so on).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Issuer {
    BetaShares,
    IShares,
    StateStreet,
    EtfSecurities,
}

impl Issuer {
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        if label.starts_with("betashares") {
            Some(Issuer::BetaShares)
        } else if label.starts_with("ishares") {
            Some(Issuer::IShares)
        } else if label.starts_with("state street") {
            Some(Issuer::StateStreet)
        } else if label.starts_with("etf") {
            Some(Issuer::EtfSecurities)
        } else {
            None
        }
    }

    /// Stem of the combined output files for a single-issuer run.
    pub fn output_stem(&self) -> &'static str {
        match self {
            Issuer::BetaShares => "BetaShares",
            Issuer::IShares => "BlackRock - iShares",
            Issuer::StateStreet => "State Street",
            Issuer::EtfSecurities => "ETF Securities",
        }
    }
}

/// End-of-run accounting, logged as the run summary.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub funds_listed: usize,
    pub funds_with_rows: usize,
    pub rows: usize,
    pub elapsed_secs: u64,
}

impl RunSummary {
    /// Minutes/seconds split used by the summary log line.
    pub fn minutes_seconds(&self) -> (u64, u64) {
        (self.elapsed_secs / 60, self.elapsed_secs % 60)
    }
}

/// Configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub fund_list_path: String,
    pub output_dir: String,
    pub logs_dir: String,
    pub request_timeout_secs: u64,
    pub save_individual_files: bool,
    /// "ALL", or explicit years for the funds-statistics pipeline.
    pub filter_years: Vec<String>,
    pub user_agent: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Ok(Config {
            fund_list_path: std::env::var("FUND_LIST_PATH")
                .unwrap_or_else(|_| "fund-list.xlsx".to_string()),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "output".to_string()),
            logs_dir: std::env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            save_individual_files: std::env::var("SAVE_INDIVIDUAL_FILES")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),
            filter_years: std::env::var("ASX_FILTER_YEARS")
                .unwrap_or_else(|_| "ALL".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            user_agent: std::env::var("USER_AGENT")
                .unwrap_or_else(|_| "etf-holdings/0.1".to_string()),
        })
    }
}
