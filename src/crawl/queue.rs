// src/crawl/queue.rs
// =============================================================================
// This module implements the breadth-first site crawl.
//
// How it works:
// 1. Start with the entry page in the frontier queue
// 2. Navigate the browser to the next page in the queue
// 3. Mark it visited and read every <a href> on it
// 4. Canonicalize each href; queue internal pages we have not seen yet
// 5. Stop when every expected page was visited, when we visited more pages
//    than the table of contents plus the allowance, or when the queue runs dry
//
// Invariants:
// - a path is in the frontier or in the visited set, never both
// - a path is queued at most once per crawl, so every page is fetched once
//   (first discovery wins)
//
// A page that fails to load aborts the crawl: a broken link in the docs is
// exactly what we are looking for, so there is no retry.
//
// Rust concepts:
// - HashSet + VecDeque: O(1) "seen?" checks next to a FIFO queue
// - &mut dyn BrowserSession: the crawler works with any engine
// - let-else: leave the loop as soon as the frontier is empty
// =============================================================================

use std::collections::{HashSet, VecDeque};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::normalize::normalize_internal_href;
use super::observer::{PageObserver, PageVisit};
use super::toc::ExpectedSet;
use crate::browser::BrowserSession;
use crate::config::CrawlConfig;
use crate::error::{GuardError, GuardResult};

/// Where the crawl loop is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    Running,
    /// Every expected page was visited
    StoppedSuccess,
    /// Visited more pages than expected + allowance
    StoppedBound,
    /// Hit the optional page limit
    StoppedLimit,
    /// Ran out of pages to visit before covering the expected set
    Exhausted,
}

impl CrawlStatus {
    pub fn describe(self) -> &'static str {
        match self {
            CrawlStatus::Running => "running",
            CrawlStatus::StoppedSuccess => "reached every expected page",
            CrawlStatus::StoppedBound => "stopped: too many pages",
            CrawlStatus::StoppedLimit => "stopped: page limit reached",
            CrawlStatus::Exhausted => "no more links to follow",
        }
    }
}

/// Discovered pages waiting to be visited, in discovery order
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<String>,
    queued: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a path unless it was already visited or is already queued
    ///
    /// Returns true if the path was added.
    pub fn push(&mut self, path: &str, visited: &HashSet<String>) -> bool {
        if visited.contains(path) || self.queued.contains(path) {
            return false;
        }
        self.queued.insert(path.to_string());
        self.queue.push_back(path.to_string());
        true
    }

    pub fn pop(&mut self) -> Option<String> {
        let path = self.queue.pop_front()?;
        // Once popped, the path is about to be visited; `visited` takes over
        self.queued.remove(&path);
        Some(path)
    }

    /// Number of pages waiting to be visited
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// What to treat as a failure once the crawl is over
#[derive(Debug, Clone, Copy, Default)]
pub struct CoveragePolicy {
    /// Fail when the crawl stopped on the page bound
    pub strict_bound: bool,
    /// Fail when pages outside the table of contents were visited
    pub deny_extra: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult {
    pub status: CrawlStatus,
    /// Number of pages in the table of contents
    pub expected: usize,
    /// Largest number of pages the crawl was allowed to visit
    pub max_pages: usize,
    /// Visited pages, in visit order
    pub visited: Vec<String>,
    /// Expected pages never visited, sorted
    pub missing: Vec<String>,
    /// Visited pages not in the table of contents, sorted
    pub extra: Vec<String>,
}

impl CrawlResult {
    fn new(status: CrawlStatus, expected: &ExpectedSet, max_pages: usize, visited: Vec<String>) -> Self {
        let seen: HashSet<&str> = visited.iter().map(String::as_str).collect();

        // ExpectedSet is ordered, so missing comes out sorted
        let missing = expected
            .iter()
            .filter(|path| !seen.contains(path.as_str()))
            .cloned()
            .collect();

        let mut extra: Vec<String> = visited
            .iter()
            .filter(|path| !expected.contains(*path))
            .cloned()
            .collect();
        extra.sort();

        Self {
            status,
            expected: expected.len(),
            max_pages,
            visited,
            missing,
            extra,
        }
    }

    /// Turns the outcome into an error according to the policy
    ///
    /// Missing pages always fail; the bound and extra pages only fail when
    /// the policy says so.
    pub fn check(&self, policy: CoveragePolicy) -> GuardResult<()> {
        if policy.strict_bound && self.status == CrawlStatus::StoppedBound {
            return Err(GuardError::BoundExceeded {
                visited: self.visited.len(),
                allowed: self.max_pages,
                expected: self.expected,
            });
        }
        if !self.missing.is_empty() {
            return Err(GuardError::IncompleteCoverage {
                missing: self.missing.clone(),
            });
        }
        if policy.deny_extra && !self.extra.is_empty() {
            return Err(GuardError::UnexpectedPages {
                extra: self.extra.clone(),
            });
        }
        Ok(())
    }
}

/// Breadth-first crawler over one browser session
pub struct Crawler<'a> {
    config: &'a CrawlConfig,
    expected: &'a ExpectedSet,
    observers: Vec<Box<dyn PageObserver + 'a>>,
}

impl<'a> Crawler<'a> {
    pub fn new(config: &'a CrawlConfig, expected: &'a ExpectedSet) -> Self {
        Self {
            config,
            expected,
            observers: Vec::new(),
        }
    }

    /// Registers an observer that sees every visited page
    pub fn observe(mut self, observer: impl PageObserver + 'a) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        self.config
    }

    /// Crawls the site starting at `entry` (a canonical path)
    ///
    /// Navigation errors abort the crawl and are returned as is.
    pub async fn crawl(
        &mut self,
        entry: &str,
        session: &mut dyn BrowserSession,
    ) -> GuardResult<CrawlResult> {
        // Copy the references out so `self.observers` can be borrowed mutably below
        let config = self.config;
        let expected = self.expected;
        let max_pages = config.max_pages(expected.len());

        // Pages we already loaded, as a set (lookups) and in order (report)
        let mut visited: HashSet<String> = HashSet::new();
        let mut order: Vec<String> = Vec::new();

        // How many expected pages are in `visited`
        let mut covered = 0usize;

        // Seed the queue with the entry page
        let mut frontier = Frontier::new();
        frontier.push(entry, &visited);

        let mut status = CrawlStatus::Running;

        // Process the queue until a stop rule fires or it runs dry
        while status == CrawlStatus::Running {
            let Some(path) = frontier.pop() else {
                status = CrawlStatus::Exhausted;
                break;
            };

            // Unreachable while push() guards the frontier
            if visited.contains(&path) {
                continue;
            }

            // Load the page; any failure ends the crawl right here
            let url = config.page_url(&path)?;
            debug!("Navigating to {} ({} still queued)", url, frontier.pending());
            session.navigate(&url).await?;

            // Mark as visited only once the page actually loaded
            visited.insert(path.clone());
            order.push(path.clone());
            if expected.contains(&path) {
                covered += 1;
            }

            // Keep only internal page links, in canonical form
            let links: Vec<String> = session
                .anchor_hrefs()
                .await?
                .iter()
                .filter_map(|href| normalize_internal_href(&config.base_url, href, &config.home_page))
                .collect();

            // push() ignores pages we visited or queued already
            for link in &links {
                frontier.push(link, &visited);
            }

            // Tell the observers about the page
            let visit = PageVisit {
                step: order.len(),
                path: &path,
                url: &url,
                links: &links,
            };
            for observer in self.observers.iter_mut() {
                observer.on_visit(&visit);
            }

            // Polite crawling: optional pause between pages
            if !config.page_delay.is_zero() {
                tokio::time::sleep(config.page_delay).await;
            }

            // Stop rules, checked in this order after every page
            if covered == expected.len() {
                info!("Reached all {} expected pages; stopping crawl.", expected.len());
                status = CrawlStatus::StoppedSuccess;
            } else if visited.len() > max_pages {
                warn!(
                    "Visited {} pages, exceeding the allowed {} (expected {}). Aborting crawl.",
                    visited.len(),
                    max_pages,
                    expected.len()
                );
                status = CrawlStatus::StoppedBound;
            } else if config.limit.is_some_and(|limit| order.len() >= limit) {
                info!("Page limit of {} reached; stopping crawl.", order.len());
                status = CrawlStatus::StoppedLimit;
            }
        }

        let result = CrawlResult::new(status, expected, max_pages, order);
        for path in &result.missing {
            warn!("Missing page: {}", path);
        }
        Ok(result)
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why does Frontier keep a HashSet next to the VecDeque?
//    - "is this path already queued?" is asked for every link on every page
//    - VecDeque::contains is O(n), the HashSet makes it O(1)
//
// 2. What is `let Some(path) = frontier.pop() else { ... };`?
//    - let-else: bind the value if the pattern matches, otherwise run the
//      else block, which must leave the loop (break) or the function
//
// 3. Why count `covered` instead of checking expected ⊆ visited each time?
//    - every visited path is inserted once, so counting the expected ones
//      we visit gives the same answer without walking the whole set
// -----------------------------------------------------------------------------
