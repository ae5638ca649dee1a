use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

/// Append-only plain-text run log: one file per pipeline per day,
/// `HH:MM:SS`-stamped lines echoed to stdout and mirrored to `tracing`.
/// Log writes are best-effort; a full disk should not abort a run that is
/// otherwise collecting rows.
pub struct RunLog {
    file: File,
    path: PathBuf,
}

impl RunLog {
    /// Open (creating as needed) `{logs_dir}/{YYYYMMDD}_{pipeline}.log`.
    pub fn create(logs_dir: &str, pipeline: &str) -> Result<Self> {
        fs::create_dir_all(logs_dir)
            .with_context(|| format!("could not create logs dir {logs_dir}"))?;
        let day = Local::now().format("%Y%m%d");
        let path = Path::new(logs_dir).join(format!("{day}_{pipeline}.log"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("could not open log file {}", path.display()))?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Timestamped entry: `HH:MM:SS\t{msg}`.
    pub fn line(&mut self, msg: &str) {
        let stamp = Local::now().format("%H:%M:%S");
        let _ = writeln!(self.file, "{stamp}\t{msg}");
        println!("{msg}");
        info!("{msg}");
    }

    /// Un-stamped banner line (run headers and footers).
    pub fn banner(&mut self, msg: &str) {
        let _ = writeln!(self.file, "\t{msg}");
        println!("{msg}");
    }

    /// Separator rule between runs appended to the same file.
    pub fn rule(&mut self) {
        let _ = writeln!(self.file, "\n{}", "-".repeat(75));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_appended_with_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let logs_dir = dir.path().to_str().unwrap().to_string();

        let mut log = RunLog::create(&logs_dir, "betashares").unwrap();
        log.rule();
        log.line("VAS\tBetaShares\tStarting...");
        log.line("VAS\tBetaShares\tSKIPPING, not a valid link");
        let path = log.path().to_path_buf();
        drop(log);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("SKIPPING, not a valid link"));
        // Two stamped lines, each HH:MM:SS + tab.
        let stamped: Vec<&str> = content
            .lines()
            .filter(|l| l.len() > 9 && l.as_bytes()[2] == b':' && l.as_bytes()[5] == b':')
            .collect();
        assert_eq!(stamped.len(), 2);

        // Re-opening appends rather than truncates.
        let mut log = RunLog::create(&logs_dir, "betashares").unwrap();
        log.line("second run");
        drop(log);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("SKIPPING"));
        assert!(content.contains("second run"));
    }
}
