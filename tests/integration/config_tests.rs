//! Config files driving a crawl

use crate::common::{price_table, BlockingServer};
use std::io::Write;
use sumi_crawler::config::{load_config_with_hash, parse_config, CrawlerRole};
use sumi_crawler::crawler::run_crawl;
use sumi_crawler::output::{load_statistics, render_statistics};
use sumi_crawler::persistence::{RunStatus, SqliteSink};
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn date_config(base: &str, db_path: &str) -> String {
    format!(
        r#"
[crawler]
role = "executor"
method = "get"
retry = 2
workers = 2

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[target]
url = "{base}/report?date={{date}}"
start = "2024-01-01"
end = "2024-01-05"
formatter = "yyyy-mm-dd"

[target.period]
days = 2

[parser]
kind = "html-table"
selector = "table.prices tr"
skip-header = true

[output]
database-path = "{db_path}"
destination = "prices"
"#
    )
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_config_generates_date_urls() {
    let config = parse_config(&date_config("http://127.0.0.1:8080", "./unused.db")).unwrap();

    assert_eq!(config.crawler.role, CrawlerRole::Executor);
    assert_eq!(
        config.target.generator().unwrap().generate().unwrap(),
        vec![
            "http://127.0.0.1:8080/report?date=20240101",
            "http://127.0.0.1:8080/report?date=20240103",
            "http://127.0.0.1:8080/report?date=20240105",
        ]
    );
}

#[test]
fn test_crawl_from_config_file() {
    let server = BlockingServer::start();
    for (page, date) in [(1, "20240101"), (3, "20240103"), (5, "20240105")] {
        server.mount(
            Mock::given(method("GET"))
                .and(path("/report"))
                .and(query_param("date", date))
                .respond_with(ResponseTemplate::new(200).set_body_string(price_table(page)))
                .expect(1),
        );
    }

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let file = write_config(&date_config(&server.uri(), &db_path.to_string_lossy()));

    let (config, hash) = load_config_with_hash(file.path()).unwrap();
    let report = run_crawl(&config, &hash).unwrap();
    assert!(report.is_complete());
    assert_eq!(report.urls, 3);
    assert_eq!(report.tasks, 2);

    let sink = SqliteSink::open(&db_path, "prices").unwrap();
    assert_eq!(sink.get_run(report.run_id).unwrap().config_hash, hash);

    let stats = load_statistics(&sink).unwrap();
    assert_eq!(stats.runs_by_status.get(&RunStatus::Completed), Some(&1));
    assert_eq!(stats.rows_by_destination, vec![("prices".to_string(), 6)]);
    assert!(render_statistics(&stats).contains("prices: 6"));
}

#[test]
fn test_repeated_runs_are_recorded_separately() {
    let server = BlockingServer::start();
    server.mount(
        Mock::given(method("GET"))
            .and(path("/report"))
            .respond_with(ResponseTemplate::new(200).set_body_string(price_table(1))),
    );

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = parse_config(&date_config(&server.uri(), &db_path.to_string_lossy())).unwrap();

    let first = run_crawl(&config, "first").unwrap();
    let second = run_crawl(&config, "second").unwrap();
    assert_ne!(first.run_id, second.run_id);

    let sink = SqliteSink::open(&db_path, "prices").unwrap();
    assert_eq!(sink.count_rows(first.run_id).unwrap(), 6);
    assert_eq!(sink.count_rows(second.run_id).unwrap(), 6);
    assert_eq!(sink.get_latest_run().unwrap().unwrap().id, second.run_id);
}
