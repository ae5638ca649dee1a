use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

use crate::models::Config;

/// Thin wrapper over one `reqwest` client with the run's fixed timeout.
/// There is deliberately no retry, backoff or rate limiting here: a failed
/// GET surfaces as an error the per-entity loop logs and skips past.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

/// Find the href of the first anchor whose href contains `needle`.
pub fn find_anchor_href_containing(html: &str, needle: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").expect("static selector");
    document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| href.contains(needle))
        .map(str::to_string)
}

/// Find the href of the first anchor whose visible text equals `text`.
pub fn find_anchor_href_by_text(html: &str, text: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").expect("static selector");
    for anchor in document.select(&anchors) {
        let label: String = anchor.text().collect::<String>().trim().to_string();
        if label == text {
            return anchor.value().attr("href").map(str::to_string);
        }
    }
    None
}

/// Absolutize a discovered href against the issuer's base URL. Hrefs that
/// already carry a scheme pass through unchanged.
pub fn absolutize(base: &str, href: &str) -> String {
    if href.starts_with("http") {
        return href.to_string();
    }
    match Url::parse(base).and_then(|b| b.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{}{}", base.trim_end_matches('/'), href),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <a href="/files/VAS-Holdings.csv">Holdings file</a>
          <a href="/au/fund.xlsx">Fund workbook</a>
          <a href="/downloads/fund.ajax?fileType=csv">Download Holdings</a>
        </body></html>"#;

    #[test]
    fn test_find_anchor_by_href_fragment() {
        assert_eq!(
            find_anchor_href_containing(PAGE, "Holdings.csv"),
            Some("/files/VAS-Holdings.csv".to_string())
        );
        assert_eq!(
            find_anchor_href_containing(PAGE, ".xlsx"),
            Some("/au/fund.xlsx".to_string())
        );
        assert_eq!(find_anchor_href_containing(PAGE, ".zip"), None);
    }

    #[test]
    fn test_find_anchor_by_text() {
        assert_eq!(
            find_anchor_href_by_text(PAGE, "Download Holdings"),
            Some("/downloads/fund.ajax?fileType=csv".to_string())
        );
        assert_eq!(find_anchor_href_by_text(PAGE, "Download"), None);
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(
            absolutize("https://www.blackrock.com/", "/au/fund.csv"),
            "https://www.blackrock.com/au/fund.csv"
        );
        assert_eq!(
            absolutize("https://www.betashares.com.au/", "https://cdn.example/f.csv"),
            "https://cdn.example/f.csv"
        );
    }
}
