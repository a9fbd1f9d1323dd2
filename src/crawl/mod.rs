// src/crawl/mod.rs
// =============================================================================
// This module handles crawling the built documentation site.
//
// Submodules:
// - normalize: turns raw hrefs into canonical page paths
// - toc: reads the table of contents into the set of expected pages
// - queue: the breadth-first crawler itself
// - observer: per-page events for everything that is not traversal
// - run: launches a browser, crawls, and always closes the browser
//
// Data flows one way: toc produces the expected set once, the crawler uses
// it together with normalize on every page, and talks to the browser only to
// navigate and list links.
//
// Rust concepts:
// - Private submodules with `pub use`: callers see one flat crawl:: API
// - #[cfg(test)]: the fake site only exists in test builds
// =============================================================================

mod normalize;
mod observer;
mod queue;
mod run;
mod toc;

#[cfg(test)]
mod fake_site;

pub use normalize::resolve_entry;
pub use observer::{LinkGraph, ProgressLog};
pub use queue::{CoveragePolicy, CrawlResult, Crawler};
pub use run::{run_crawl, CrawlRun};
pub use toc::load_expected_file;

#[cfg(test)]
pub use observer::{PageObserver, PageVisit};
#[cfg(test)]
pub use queue::CrawlStatus;
