//! End-to-end runs against a local mock of the issuer sites: link
//! discovery, download, normalization, aggregation, outputs and log.

use std::path::Path;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use etf_holdings::collector::HoldingsCollector;
use etf_holdings::export;
use etf_holdings::models::{Config, Issuer};
use etf_holdings::runlog::RunLog;

fn test_config(dir: &Path) -> Config {
    Config {
        fund_list_path: dir.join("list.csv").to_str().unwrap().to_string(),
        output_dir: dir.join("output").to_str().unwrap().to_string(),
        logs_dir: dir.join("logs").to_str().unwrap().to_string(),
        request_timeout_secs: 5,
        save_individual_files: false,
        filter_years: vec!["ALL".to_string()],
        user_agent: "etf-holdings-test/0.1".to_string(),
    }
}

fn betashares_csv() -> String {
    [
        "Betashares Fund Holdings",
        "A200",
        "As at 2021-09-01",
        "",
        "All figures in AUD",
        "",
        "Name,Weight (%)",
        "BHP Group,10.1",
        "CSL Limited,8.2",
        "",
        "Harvested holdings are indicative only",
        "General advice warning",
        "",
        "Total,100",
    ]
    .join("\n")
}

#[tokio::test]
async fn test_holdings_run_continues_past_failures() {
    let server = MockServer::start().await;
    let page = format!(
        r#"<html><body><a href="{}/files/A200-Holdings.csv">Holdings file</a></body></html>"#,
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/funds/vas"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/A200-Holdings.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(betashares_csv()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/funds/down"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("list.csv"),
        format!(
            "ASX Code,Link,Issuer,ETF Category\n\
             VAS,{uri}/funds/vas,BetaShares,Equity - Australia\n\
             QOZ,,BetaShares,Equity\n\
             ZZZ,{uri}/funds/down,BetaShares,Equity\n\
             XYZ,{uri}/funds/xyz,Acme Funds,Equity\n",
            uri = server.uri()
        ),
    )
    .unwrap();

    let config = test_config(dir.path());
    let collector = HoldingsCollector::new(config.clone()).unwrap();
    let mut log = RunLog::create(&config.logs_dir, "pipeline-test").unwrap();
    let summary = collector.run(None, &mut log).await.unwrap();

    // Only VAS contributes; the blank link, the 500 and the unknown issuer
    // are logged and skipped without aborting the run.
    assert_eq!(summary.funds_listed, 4);
    assert_eq!(summary.funds_with_rows, 1);
    assert_eq!(summary.rows, 2);

    let combined = export::read_csv_table(&Path::new(&config.output_dir).join("ETF Holdings.csv"))
        .unwrap();
    assert_eq!(combined.len(), summary.rows);
    assert_eq!(combined.cell(0, "etf ticker"), Some("VAS"));
    assert_eq!(combined.cell(0, "Security Name"), Some("BHP Group"));
    assert_eq!(combined.cell(0, "Weight %"), Some("10.1"));
    assert_eq!(combined.cell(1, "Security Name"), Some("CSL Limited"));
    assert_eq!(combined.cell(0, "Issuer"), Some("BetaShares"));
    assert_eq!(combined.cell(0, "ETF Category"), Some("Equity - Australia"));
    // Renamed source headers never reach the output.
    assert_eq!(combined.column_index("Name"), None);
    assert_eq!(combined.column_index("Weight (%)"), None);

    let log_text = std::fs::read_to_string(log.path()).unwrap();
    assert!(log_text.contains("QOZ\tBetaShares\tSKIPPING, not a valid link"));
    assert!(log_text.contains("ZZZ\tBetaShares\tFailed to get holdings"));
    assert!(log_text.contains("XYZ\tAcme Funds\tDid not recognise this issuer"));
    assert!(log_text.contains("seconds for 4 funds"));

    // The workbook twin of the CSV is written alongside it.
    assert!(Path::new(&config.output_dir).join("ETF Holdings.xlsx").exists());
}

#[tokio::test]
async fn test_ishares_run_discovers_download_anchor() {
    let server = MockServer::start().await;
    let page = format!(
        r#"<html><body>
             <a href="/nothing">Overview</a>
             <a href="{}/files/ioz.csv">Download Holdings</a>
           </body></html>"#,
        server.uri()
    );
    let csv = [
        "iShares Core S&P/ASX 200 ETF",
        "Holdings",
        "as of 01-Sep-2021",
        "",
        "",
        "",
        "",
        "",
        "",
        "Ticker,Name,Sector,Asset Class,Market Value,Weight (%),Location",
        "BHP,BHP GROUP LTD,Materials,Equity,1000,10.1,Australia",
        "CBA,COMMONWEALTH BANK,Financials,Equity,900,9.2,Australia",
    ]
    .join("\n");
    Mock::given(method("GET"))
        .and(path("/funds/ioz"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/ioz.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("list.csv"),
        format!(
            "ASX Code,Link,Issuer,ETF Category\nIOZ,{}/funds/ioz,iShares,Equity\n",
            server.uri()
        ),
    )
    .unwrap();

    let config = test_config(dir.path());
    let collector = HoldingsCollector::new(config.clone()).unwrap();
    let mut log = RunLog::create(&config.logs_dir, "pipeline-test").unwrap();
    let summary = collector.run(Some(Issuer::IShares), &mut log).await.unwrap();

    assert_eq!(summary.rows, 2);
    let combined = export::read_csv_table(
        &Path::new(&config.output_dir).join("BlackRock - iShares.csv"),
    )
    .unwrap();
    assert_eq!(combined.len(), 2);
    assert_eq!(combined.cell(0, "Security Ticker"), Some("BHP"));
    assert_eq!(combined.cell(0, "Country"), Some("Australia"));
    assert_eq!(combined.cell(1, "Weight %"), Some("9.2"));
}
