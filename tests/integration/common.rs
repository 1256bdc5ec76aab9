//! Shared helpers for the integration tests

use sumi_crawler::config::{
    Config, CrawlerConfig, CrawlerRole, OutputConfig, ParserConfig, ParserKind, RangeValue,
    TargetConfig, UserAgentConfig,
};
use tokio::runtime::Runtime;
use wiremock::{Mock, MockServer};

/// A mock server usable from blocking code
///
/// The server lives on its own multi-thread runtime so the blocking reqwest
/// client can be driven from the test thread, outside any async context.
pub struct BlockingServer {
    // Dropped before the runtime that serves it
    server: MockServer,
    runtime: Runtime,
}

impl BlockingServer {
    pub fn start() -> Self {
        let runtime = Runtime::new().unwrap();
        let server = runtime.block_on(MockServer::start());
        Self { server, runtime }
    }

    pub fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }
}

pub fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestCrawler".to_string(),
        crawler_version: "1.0".to_string(),
        contact_url: "https://example.com/about".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

/// An HTML page holding a header row and two priced rows
pub fn price_table(page: usize) -> String {
    format!(
        r#"<html><body>
        <table class="prices">
            <tr><th>Item</th><th>Price</th></tr>
            <tr><td>item-{page}-a</td><td>1,{page}00</td></tr>
            <tr><td>item-{page}-b</td><td> {page} </td></tr>
        </table>
        </body></html>"#
    )
}

/// Builds a config crawling `{base}/page/{index}` for indexes 1..=pages
pub fn create_test_config(
    role: CrawlerRole,
    base: &str,
    pages: i64,
    db_path: &str,
) -> Config {
    Config {
        crawler: CrawlerConfig {
            role,
            method: "get".to_string(),
            retry: 2,
            workers: 3,
            lock: true,
            sema_value: 0,
        },
        user_agent: user_agent(),
        target: TargetConfig {
            url: format!("{}/page/{{index}}", base),
            start: Some(RangeValue::Integer(1)),
            end: Some(RangeValue::Integer(pages)),
            formatter: None,
            iterator: None,
            mapping: None,
            period: None,
        },
        parser: ParserConfig {
            kind: ParserKind::HtmlTable,
            selector: "table.prices tr".to_string(),
            field: None,
            skip_header: true,
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
            destination: "prices".to_string(),
        },
    }
}
