// src/crawl/run.rs
// =============================================================================
// Runs one crawl from browser launch to browser shutdown.
//
// The session is closed on every way out of the crawl: success, bound or
// limit stop, navigation error, or Ctrl-C. Closing errors are logged and
// never hide the crawl's own outcome.
//
// Rust concepts:
// - tokio::select! with `biased;`: the interrupt branch is polled first
// - impl Future parameter: tests pass a ready or pending future instead of
//   a real signal
// =============================================================================

use std::future::Future;

use tracing::{info, warn};

use super::queue::{CrawlResult, Crawler};
use crate::browser::{launch_first, BrowserEngine};
use crate::config::SessionConfig;
use crate::error::{GuardError, GuardResult};

/// A finished crawl and the engine it ran on
#[derive(Debug)]
pub struct CrawlRun {
    pub engine: &'static str,
    pub result: CrawlResult,
}

/// Launches the first available engine and crawls from the configured entry
/// page, stopping early on Ctrl-C
pub async fn run_crawl(
    crawler: &mut Crawler<'_>,
    engines: &[Box<dyn BrowserEngine>],
    session_config: &SessionConfig,
) -> GuardResult<CrawlRun> {
    let interrupt = async {
        // If the signal handler cannot be installed, never interrupt
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    run_crawl_until(crawler, engines, session_config, interrupt).await
}

/// Same as run_crawl, with the interrupt source supplied by the caller
pub async fn run_crawl_until(
    crawler: &mut Crawler<'_>,
    engines: &[Box<dyn BrowserEngine>],
    session_config: &SessionConfig,
    interrupt: impl Future<Output = ()>,
) -> GuardResult<CrawlRun> {
    let launched = launch_first(engines, session_config).await?;
    let engine = launched.engine;
    let mut session = launched.session;
    info!("Crawling with the {} engine", engine);

    let entry = crawler.config().entry.clone();

    // Whichever finishes first wins; the other future is dropped
    let outcome = tokio::select! {
        biased;
        _ = interrupt => {
            info!("Crawl interrupted; cleaning up.");
            Err(GuardError::Interrupted)
        }
        result = crawler.crawl(&entry, &mut *session) => result,
    };

    // Runs on every path out of the select above
    if let Err(e) = session.close().await {
        warn!("Failed to close {} session: {:#}", engine, e);
    }

    outcome.map(|result| CrawlRun { engine, result })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlConfig;
    use crate::crawl::fake_site::{FakeEngine, FakeSite, BASE};
    use crate::crawl::queue::CrawlStatus;
    use crate::crawl::toc::ExpectedSet;

    fn set(items: &[&str]) -> ExpectedSet {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[tokio::test]
    async fn test_session_closed_after_success() {
        let site = FakeSite::new()
            .page("README.html", &["intro.html"])
            .page("intro.html", &[]);
        let engines: Vec<Box<dyn BrowserEngine>> = vec![Box::new(FakeEngine(site.clone()))];
        let config = CrawlConfig::for_base_url(BASE).unwrap();
        let expected = set(&["README.html", "intro.html"]);

        let mut crawler = Crawler::new(&config, &expected);
        let run = run_crawl_until(
            &mut crawler,
            &engines,
            &SessionConfig::default(),
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(run.engine, "fake");
        assert_eq!(run.result.status, CrawlStatus::StoppedSuccess);
        assert!(site.is_closed());
    }

    #[tokio::test]
    async fn test_session_closed_after_navigation_error() {
        let site = FakeSite::new().page("README.html", &["gone.html"]);
        let engines: Vec<Box<dyn BrowserEngine>> = vec![Box::new(FakeEngine(site.clone()))];
        let config = CrawlConfig::for_base_url(BASE).unwrap();
        let expected = set(&["README.html", "gone.html"]);

        let mut crawler = Crawler::new(&config, &expected);
        let result = run_crawl_until(
            &mut crawler,
            &engines,
            &SessionConfig::default(),
            std::future::pending(),
        )
        .await;

        assert!(matches!(result, Err(GuardError::Navigation { .. })));
        assert!(site.is_closed());
    }

    #[tokio::test]
    async fn test_session_closed_when_interrupted() {
        let site = FakeSite::new().page("README.html", &[]);
        let engines: Vec<Box<dyn BrowserEngine>> = vec![Box::new(FakeEngine(site.clone()))];
        let config = CrawlConfig::for_base_url(BASE).unwrap();
        let expected = set(&["README.html"]);

        let mut crawler = Crawler::new(&config, &expected);
        let result = run_crawl_until(
            &mut crawler,
            &engines,
            &SessionConfig::default(),
            std::future::ready(()),
        )
        .await;

        assert!(matches!(result, Err(GuardError::Interrupted)));
        assert!(site.is_closed());
        assert!(site.navigations().is_empty());
    }

    #[tokio::test]
    async fn test_custom_entry_point() {
        let site = FakeSite::new()
            .page("README.html", &[])
            .page("guide/index.html", &["../README.html"]);
        let engines: Vec<Box<dyn BrowserEngine>> = vec![Box::new(FakeEngine(site.clone()))];
        let mut config = CrawlConfig::for_base_url(BASE).unwrap();
        config.entry = "guide/index.html".to_string();
        let expected = set(&["README.html", "guide/index.html"]);

        let mut crawler = Crawler::new(&config, &expected);
        let run = run_crawl_until(
            &mut crawler,
            &engines,
            &SessionConfig::default(),
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(run.result.visited, vec!["guide/index.html", "README.html"]);
    }
}
