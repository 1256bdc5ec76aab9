//! End-to-end crawls
//!
//! Every role crawls a mock server, parses the responses and stores the
//! rows in a temporary SQLite database.

use crate::common::{create_test_config, price_table, user_agent, BlockingServer};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use sumi_crawler::components::{
    AsyncReqwestTransport, HtmlTableParser, JsonParser, JsonRowsParser, PassThrough,
    ReqwestTransport, Row, RowHandler,
};
use sumi_crawler::config::{Config, CrawlerRole, ParserKind};
use sumi_crawler::crawler::{run_crawl, AsyncCrawler, CrawlerFactory, SimpleCrawler};
use sumi_crawler::persistence::{FlattenSink, RunStatus, SqliteSink};
use sumi_crawler::CrawlOutput;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mount_price_pages(server: &BlockingServer, pages: &[usize]) {
    for &page in pages {
        server.mount(
            Mock::given(method("GET"))
                .and(path(format!("/page/{}", page)))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "text/html")
                        .set_body_string(price_table(page)),
                ),
        );
    }
}

fn open_sink(config: &Config) -> SqliteSink {
    SqliteSink::open(
        Path::new(&config.output.database_path),
        config.output.destination.clone(),
    )
    .unwrap()
}

fn temp_db(dir: &TempDir) -> String {
    dir.path().join("crawl.db").to_string_lossy().into_owned()
}

/// Crawls three pages with `role` and checks every row landed
fn assert_role_saves_every_row(role: CrawlerRole) {
    let server = BlockingServer::start();
    mount_price_pages(&server, &[1, 2, 3]);

    let dir = TempDir::new().unwrap();
    let config = create_test_config(role, &server.uri(), 3, &temp_db(&dir));

    let report = run_crawl(&config, "test-hash").unwrap();
    assert!(report.is_complete(), "{} role reported failures", role);
    assert_eq!(report.urls, 3);
    assert_eq!(report.saved, 3);

    let sink = open_sink(&config);
    let run = sink.get_run(report.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert!(run.finished_at.is_some());
    assert_eq!(sink.count_rows(report.run_id).unwrap(), 6);

    let mut rows: Vec<Row> = sink.load_rows(report.run_id).unwrap();
    rows.sort();
    assert_eq!(
        rows,
        vec![
            vec!["item-1-a".to_string(), "1100".to_string()],
            vec!["item-1-b".to_string(), "1".to_string()],
            vec!["item-2-a".to_string(), "1200".to_string()],
            vec!["item-2-b".to_string(), "2".to_string()],
            vec!["item-3-a".to_string(), "1300".to_string()],
            vec!["item-3-b".to_string(), "3".to_string()],
        ]
    );
}

#[test]
fn test_simple_role_crawl() {
    assert_role_saves_every_row(CrawlerRole::Simple);
}

#[test]
fn test_executor_role_crawl() {
    assert_role_saves_every_row(CrawlerRole::Executor);
}

#[test]
fn test_pool_role_crawl() {
    assert_role_saves_every_row(CrawlerRole::Pool);
}

#[test]
fn test_async_role_crawl() {
    assert_role_saves_every_row(CrawlerRole::Async);
}

#[test]
fn test_semaphore_guard_crawl() {
    let server = BlockingServer::start();
    mount_price_pages(&server, &[1, 2, 3, 4, 5]);

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(CrawlerRole::Executor, &server.uri(), 5, &temp_db(&dir));
    config.crawler.workers = 2;
    config.crawler.lock = false;
    config.crawler.sema_value = 2;

    let report = run_crawl(&config, "sema").unwrap();
    assert!(report.is_complete());
    assert_eq!(report.tasks, 2);
    assert_eq!(report.saved, 5);
    assert_eq!(open_sink(&config).count_rows(report.run_id).unwrap(), 10);
}

#[test]
fn test_failed_task_marks_run_failed() {
    let server = BlockingServer::start();
    // Page 2 is not mounted and answers 404
    mount_price_pages(&server, &[1, 3]);

    let dir = TempDir::new().unwrap();
    let config = create_test_config(CrawlerRole::Executor, &server.uri(), 3, &temp_db(&dir));

    let report = run_crawl(&config, "partial").unwrap();
    assert!(!report.is_complete());
    assert_eq!(report.tasks, 3);
    assert_eq!(report.failed_tasks, 1);
    assert_eq!(report.saved, 2);

    let sink = open_sink(&config);
    assert_eq!(sink.get_run(report.run_id).unwrap().status, RunStatus::Failed);
    assert_eq!(sink.count_rows(report.run_id).unwrap(), 4);
}

#[test]
fn test_simple_role_saves_nothing_on_failure() {
    let server = BlockingServer::start();
    mount_price_pages(&server, &[1, 2]);

    let dir = TempDir::new().unwrap();
    let config = create_test_config(CrawlerRole::Simple, &server.uri(), 3, &temp_db(&dir));

    assert!(run_crawl(&config, "all-or-nothing").is_err());

    let sink = open_sink(&config);
    let run = sink.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(sink.count_rows(run.id).unwrap(), 0);
}

#[test]
fn test_json_rows_crawl() {
    let server = BlockingServer::start();
    for page in 1..=2 {
        server.mount(
            Mock::given(method("GET"))
                .and(path(format!("/page/{}", page)))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "data": {
                        "items": [
                            ["date", "close"],
                            [format!("2024-01-0{}", page), format!("{},000", page)],
                        ]
                    }
                }))),
        );
    }

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(CrawlerRole::Pool, &server.uri(), 2, &temp_db(&dir));
    config.crawler.workers = 2;
    config.parser.kind = ParserKind::JsonRows;
    config.parser.field = Some("data/items".to_string());

    let report = run_crawl(&config, "json-rows").unwrap();
    assert!(report.is_complete());

    let mut rows: Vec<Row> = open_sink(&config).load_rows(report.run_id).unwrap();
    rows.sort();
    assert_eq!(
        rows,
        vec![
            vec!["2024-01-01".to_string(), "1000".to_string()],
            vec!["2024-01-02".to_string(), "2000".to_string()],
        ]
    );
}

#[test]
fn test_json_documents_crawl() {
    let server = BlockingServer::start();
    server.mount(
        Mock::given(method("GET"))
            .and(path("/page/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"page": 1, "ok": true}))),
    );

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(CrawlerRole::Simple, &server.uri(), 1, &temp_db(&dir));
    config.parser.kind = ParserKind::Json;

    let report = run_crawl(&config, "json").unwrap();
    let documents: Vec<Value> = open_sink(&config).load_rows(report.run_id).unwrap();
    assert_eq!(documents, vec![json!({"page": 1, "ok": true})]);
}

#[test]
fn test_simple_crawler_with_registered_components() {
    let server = BlockingServer::start();
    mount_price_pages(&server, &[7]);

    let sink = Arc::new(SqliteSink::new_in_memory("prices").unwrap());
    let run_id = sink.begin_run("components").unwrap();

    let factory = CrawlerFactory::new(
        ReqwestTransport::from_config(&user_agent()).unwrap(),
        HtmlTableParser::new("table.prices tr").unwrap(),
        RowHandler::new(true),
    )
    .with_persistence(FlattenSink::new(Arc::clone(&sink)));
    let crawler = SimpleCrawler::new(factory).with_retry(2);

    let output = crawler
        .run_and_save("GET", format!("{}/page/7", server.uri()))
        .unwrap();
    assert!(matches!(output, CrawlOutput::Single(ref rows) if rows.len() == 2));
    assert_eq!(sink.count_rows(run_id).unwrap(), 2);

    // Unknown verbs are refused before any request
    assert!(crawler.run("FETCH", format!("{}/page/7", server.uri())).is_err());
}

#[tokio::test]
async fn test_async_crawler_runs_chunks_concurrently() {
    let server = MockServer::start().await;
    for page in 1..=4 {
        Mock::given(method("GET"))
            .and(path(format!("/api/{}", page)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([[page, "x"]])))
            .expect(1)
            .mount(&server)
            .await;
    }

    let factory = CrawlerFactory::new(
        AsyncReqwestTransport::from_config(&user_agent()).unwrap(),
        JsonRowsParser::new(None),
        RowHandler::new(false),
    );
    let crawler = AsyncCrawler::new(factory, 2).unwrap();
    let urls: Vec<String> = (1..=4)
        .map(|page| format!("{}/api/{}", server.uri(), page))
        .collect();

    let outcomes = crawler.run("get", &urls).await.unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].task_id, 0);
    assert_eq!(outcomes[0].urls, urls[..2].to_vec());

    let pages: Vec<Vec<Row>> = outcomes
        .into_iter()
        .flat_map(|outcome| outcome.result.unwrap())
        .collect();
    assert_eq!(
        pages,
        (1..=4)
            .map(|page| vec![vec![page.to_string(), "x".to_string()]])
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_async_crawler_json_documents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 9})))
        .mount(&server)
        .await;

    let factory = CrawlerFactory::new(
        AsyncReqwestTransport::from_config(&user_agent()).unwrap(),
        JsonParser,
        PassThrough::<Value>::new(),
    );
    let crawler = AsyncCrawler::new(factory, 1).unwrap();

    let output = crawler
        .run_input("GET", format!("{}/doc", server.uri()))
        .await
        .unwrap();
    assert_eq!(output, CrawlOutput::Single(json!({"id": 9})));
}
