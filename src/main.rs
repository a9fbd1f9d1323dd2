// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing, written to stderr)
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code:
//    0 = success, 1 = check failed, 2 = error, 3 = skipped (no browser)
//
// Rust concepts used:
// - async main with #[tokio::main]
// - anyhow::Result for the application layer, GuardError for matching on
//   specific failures (a missing browser is a skip, not an error)
// =============================================================================

mod book;
mod browser;
mod cli;
mod config;
mod crawl;
mod error;
mod notebook;
mod report;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use cli::{Cli, Commands, NotebookArgs, SiteArgs};
use config::CrawlConfig;
use crawl::{CoveragePolicy, CrawlRun, Crawler, LinkGraph, ProgressLog};
use error::{GuardError, GuardResult};

const EXIT_OK: i32 = 0;
const EXIT_FAILED: i32 = 1;
const EXIT_ERROR: i32 = 2;
const EXIT_SKIPPED: i32 = 3;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_filter());

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}

// RUST_LOG wins over --log-level
fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Site(args) => handle_site_scan(&args).await,
        Commands::Notebooks(args) => handle_notebooks(&args).await,
    }
}

// Handles the 'site' subcommand
async fn handle_site_scan(args: &SiteArgs) -> Result<i32> {
    let expected = crawl::load_expected_file(&args.toc)
        .with_context(|| format!("failed to load {}", args.toc.display()))?;
    info!("Expecting {} pages from {}", expected.len(), args.toc.display());

    let mut config = match &args.base_url {
        Some(base_url) => CrawlConfig::for_base_url(base_url)?,
        None => {
            if args.build {
                let project_root = args
                    .toc
                    .parent()
                    .filter(|parent| !parent.as_os_str().is_empty())
                    .unwrap_or(Path::new("."));
                book::ensure_site_built(&args.site_dir, project_root).await?;
            }
            CrawlConfig::for_site_dir(&args.site_dir)
                .with_context(|| format!("built site not found at {}", args.site_dir.display()))?
        }
    };
    config.home_page = args.home_page.clone();
    config.entry = match &args.entry {
        Some(entry) => crawl::resolve_entry(&config.base_url, entry, &config.home_page)
            .with_context(|| format!("--entry '{}' is not a page inside {}", entry, config.base_url))?,
        None => config.home_page.clone(),
    };
    config.allowance = args.allowance;
    config.limit = args.limit;
    config.nav_timeout = Duration::from_millis(args.nav_timeout_ms);
    config.settle_timeout = Duration::from_millis(args.settle_timeout_ms);
    config.page_delay = Duration::from_millis(args.delay_ms);

    info!("🔍 Crawling {}", config.base_url);

    let engines: Vec<_> = args.engine_order().into_iter().map(|kind| kind.build()).collect();
    let session_config = config.session_config(args.headed);

    // The graph feeds the report; the progress log only prints
    let mut graph = LinkGraph::new();
    let outcome = {
        let mut crawler = Crawler::new(&config, &expected)
            .observe(ProgressLog {
                expected: expected.len(),
            })
            .observe(&mut graph);
        crawl::run_crawl(&mut crawler, &engines, &session_config).await
    };

    // Only a finished crawl has something to report
    if let Ok(run) = &outcome {
        report::print_report(&report::SiteReport::new(run, &graph), args.json)?;
    }

    let policy = CoveragePolicy {
        strict_bound: args.strict_bound,
        deny_extra: args.deny_extra,
    };
    Ok(site_exit_code(&outcome, policy))
}

// Maps the end of a site crawl to the process exit code
fn site_exit_code(outcome: &GuardResult<CrawlRun>, policy: CoveragePolicy) -> i32 {
    let run = match outcome {
        Ok(run) => run,
        // No browser at all: the check could not run, which is not a failure
        Err(GuardError::EngineUnavailable { failures }) => {
            warn!("Skipping crawl, browser launch failed: {}", failures.join("; "));
            return EXIT_SKIPPED;
        }
        Err(e) => {
            error!("{}", e);
            return EXIT_ERROR;
        }
    };

    match run.result.check(policy) {
        Ok(()) => {
            if !run.result.extra.is_empty() {
                warn!(
                    "{} reachable page(s) are not in the table of contents",
                    run.result.extra.len()
                );
            }
            info!("Reached all {} expected pages!", run.result.expected);
            EXIT_OK
        }
        Err(e) => {
            error!("{}", e);
            EXIT_FAILED
        }
    }
}

// Handles the 'notebooks' subcommand
async fn handle_notebooks(args: &NotebookArgs) -> Result<i32> {
    let interpreter = notebook::Interpreter::parse(&args.python)
        .with_context(|| format!("invalid --python command '{}'", args.python))?;

    let options = notebook::NotebookOptions {
        notebooks: args.notebooks.clone(),
        execute: args.execute,
        timeout: Duration::from_secs(args.timeout),
        optional: args.optional.iter().cloned().collect(),
        interpreter,
        ..Default::default()
    };

    Ok(notebook::check_notebooks(&options).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::{CrawlResult, CrawlStatus};

    fn pages(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn finished(status: CrawlStatus, missing: &[&str], extra: &[&str]) -> GuardResult<CrawlRun> {
        Ok(CrawlRun {
            engine: "static",
            result: CrawlResult {
                status,
                expected: 2,
                max_pages: 3,
                visited: pages(&["README.html", "intro.html"]),
                missing: pages(missing),
                extra: pages(extra),
            },
        })
    }

    #[test]
    fn test_complete_crawl_exits_ok() {
        let outcome = finished(CrawlStatus::StoppedSuccess, &[], &[]);
        assert_eq!(site_exit_code(&outcome, CoveragePolicy::default()), EXIT_OK);
    }

    #[test]
    fn test_missing_pages_exit_failed() {
        let outcome = finished(CrawlStatus::Exhausted, &["guide.html"], &[]);
        assert_eq!(site_exit_code(&outcome, CoveragePolicy::default()), EXIT_FAILED);
    }

    #[test]
    fn test_bound_fails_only_when_strict() {
        let outcome = finished(CrawlStatus::StoppedBound, &[], &[]);
        assert_eq!(site_exit_code(&outcome, CoveragePolicy::default()), EXIT_OK);

        let strict = CoveragePolicy {
            strict_bound: true,
            ..Default::default()
        };
        assert_eq!(site_exit_code(&outcome, strict), EXIT_FAILED);
    }

    #[test]
    fn test_extra_pages_fail_only_when_denied() {
        let outcome = finished(CrawlStatus::StoppedSuccess, &[], &["extra.html"]);
        assert_eq!(site_exit_code(&outcome, CoveragePolicy::default()), EXIT_OK);

        let deny = CoveragePolicy {
            deny_extra: true,
            ..Default::default()
        };
        assert_eq!(site_exit_code(&outcome, deny), EXIT_FAILED);
    }

    #[test]
    fn test_no_browser_is_skipped() {
        let outcome: GuardResult<CrawlRun> = Err(GuardError::EngineUnavailable {
            failures: vec!["chromium: not installed".to_string()],
        });
        assert_eq!(site_exit_code(&outcome, CoveragePolicy::default()), EXIT_SKIPPED);
    }

    #[test]
    fn test_fatal_errors_exit_error() {
        let broken: GuardResult<CrawlRun> =
            Err(GuardError::navigation("https://site/gone.html", "HTTP 404 Not Found"));
        assert_eq!(site_exit_code(&broken, CoveragePolicy::default()), EXIT_ERROR);

        let interrupted: GuardResult<CrawlRun> = Err(GuardError::Interrupted);
        assert_eq!(site_exit_code(&interrupted, CoveragePolicy::default()), EXIT_ERROR);
    }
}
