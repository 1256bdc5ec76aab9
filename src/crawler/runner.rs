//! Config-driven crawl
//!
//! Builds the components a [`Config`] describes, runs the configured
//! role over the generated URLs and records the run in SQLite.

use super::factory::CrawlerFactory;
use super::{AsyncCrawler, ExecutorCrawler, PoolCrawler, SimpleCrawler};
use crate::components::{
    AsyncReqwestTransport, DataHandler, HtmlTableParser, HttpResponse, JsonParser,
    JsonRowsParser, PassThrough, ResponseParser, ReqwestTransport, RowHandler,
};
use crate::config::{Config, CrawlerRole, ParserKind};
use crate::executor::{ConcurrencyGuard, TaskOutcome};
use crate::persistence::{FlattenSink, PersistenceSink, SqliteSink};
use crate::Result;
use std::path::Path;
use std::sync::Arc;

/// What a finished crawl did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub run_id: i64,
    /// URLs generated from the target
    pub urls: usize,
    /// Units of work the role split the URLs into
    pub tasks: usize,
    /// Units of work that failed; their results were not saved
    pub failed_tasks: usize,
    /// Handler results handed to the sink
    pub saved: usize,
}

impl CrawlReport {
    pub fn is_complete(&self) -> bool {
        self.failed_tasks == 0
    }
}

/// Counts gathered while a role runs
#[derive(Debug, Default)]
struct Tally {
    tasks: usize,
    failed_tasks: usize,
    saved: usize,
}

impl Tally {
    fn from_outcomes<T>(outcomes: &[TaskOutcome<T>], saved: impl Fn(&T) -> usize) -> Self {
        let mut tally = Self {
            tasks: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            match &outcome.result {
                Ok(value) => tally.saved += saved(value),
                Err(e) => {
                    tracing::error!(
                        "Task {} ({} URLs) failed: {}",
                        outcome.task_id,
                        outcome.urls.len(),
                        e
                    );
                    tally.failed_tasks += 1;
                }
            }
        }
        tally
    }
}

/// Runs the crawl described by `config`
///
/// The run is recorded under `config_hash`. It is marked completed when
/// every task succeeded and failed otherwise; a run that fails outright
/// is marked failed before the error is returned.
pub fn run_crawl(config: &Config, config_hash: &str) -> Result<CrawlReport> {
    let urls = config.target.generator()?.generate()?;
    tracing::info!("Generated {} URLs from {}", urls.len(), config.target.url);

    let sink = Arc::new(SqliteSink::open(
        Path::new(&config.output.database_path),
        config.output.destination.clone(),
    )?);
    let run_id = sink.begin_run(config_hash)?;

    match crawl_with_parser(config, &urls, Arc::clone(&sink)) {
        Ok(tally) => {
            if tally.failed_tasks == 0 {
                sink.complete_run()?;
            } else {
                sink.fail_run()?;
            }

            let report = CrawlReport {
                run_id,
                urls: urls.len(),
                tasks: tally.tasks,
                failed_tasks: tally.failed_tasks,
                saved: tally.saved,
            };
            tracing::info!(
                "Run {} finished: {} of {} tasks failed, {} results saved",
                run_id,
                report.failed_tasks,
                report.tasks,
                report.saved
            );
            Ok(report)
        }
        Err(e) => {
            tracing::error!("Run {} failed: {}", run_id, e);
            sink.fail_run()?;
            Err(e)
        }
    }
}

fn crawl_with_parser(config: &Config, urls: &[String], sink: Arc<SqliteSink>) -> Result<Tally> {
    let settings = &config.parser;
    match settings.kind {
        ParserKind::Json => crawl_with(config, urls, JsonParser, PassThrough::new(), sink),
        ParserKind::JsonRows => crawl_with(
            config,
            urls,
            JsonRowsParser::new(settings.field.clone()),
            RowHandler::new(settings.skip_header),
            FlattenSink::new(sink),
        ),
        ParserKind::HtmlTable => crawl_with(
            config,
            urls,
            HtmlTableParser::new(&settings.selector)?,
            RowHandler::new(settings.skip_header),
            FlattenSink::new(sink),
        ),
    }
}

fn crawl_with<P, H>(
    config: &Config,
    urls: &[String],
    parser: P,
    handler: H,
    sink: impl PersistenceSink<H::Output> + 'static,
) -> Result<Tally>
where
    P: ResponseParser<Response = HttpResponse> + 'static,
    H: DataHandler<Input = P::Output> + 'static,
    H::Output: Send + 'static,
{
    let settings = &config.crawler;
    tracing::info!(
        "Starting {} crawl: {} {} URLs, {} attempts per request",
        settings.role,
        settings.method,
        urls.len(),
        settings.retry
    );

    match settings.role {
        CrawlerRole::Simple => {
            let factory = blocking_factory(config, parser, handler, sink)?;
            let crawler = SimpleCrawler::new(factory).with_retry(settings.retry);
            let output = crawler.run_and_save(&settings.method, urls)?;
            Ok(Tally {
                tasks: 1,
                failed_tasks: 0,
                saved: output.len(),
            })
        }
        CrawlerRole::Executor => {
            let factory = blocking_factory(config, parser, handler, sink)?;
            let crawler = ExecutorCrawler::new(factory, settings.workers)?
                .with_retry(settings.retry)
                .with_guard(ConcurrencyGuard::from_settings(settings.lock, settings.sema_value)?);
            let outcomes = crawler.run_and_save(&settings.method, urls)?;
            Ok(Tally::from_outcomes(&outcomes, |saved| *saved))
        }
        CrawlerRole::Pool => {
            let factory = blocking_factory(config, parser, handler, sink)?;
            let crawler = SimpleCrawler::new(factory).with_retry(settings.retry);
            let mut pool = PoolCrawler::from_crawler(crawler, settings.workers);
            pool.init(settings.lock, settings.sema_value)?;
            let outcomes = pool.apply_and_save(&settings.method, urls);
            pool.close();
            Ok(Tally::from_outcomes(&outcomes?, |output| output.len()))
        }
        CrawlerRole::Async => {
            let transport = AsyncReqwestTransport::from_config(&config.user_agent)?;
            let factory = CrawlerFactory::new(transport, parser, handler).with_persistence(sink);
            let crawler = AsyncCrawler::new(factory, settings.workers)?
                .with_retry(settings.retry)
                .with_guard(ConcurrencyGuard::from_settings(settings.lock, settings.sema_value)?);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let outcomes = runtime.block_on(crawler.run_and_save(&settings.method, urls))?;
            Ok(Tally::from_outcomes(&outcomes, |saved| *saved))
        }
    }
}

fn blocking_factory<P, H>(
    config: &Config,
    parser: P,
    handler: H,
    sink: impl PersistenceSink<H::Output> + 'static,
) -> Result<CrawlerFactory<ReqwestTransport, P, H>>
where
    H: DataHandler,
{
    let transport = ReqwestTransport::from_config(&config.user_agent)?;
    Ok(CrawlerFactory::new(transport, parser, handler).with_persistence(sink))
}
