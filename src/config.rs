// src/config.rs
// =============================================================================
// Crawl configuration.
//
// Everything the crawler and the browser engines need to know about the site
// lives in one explicit value that is passed in at construction time. Two
// crawls with different configurations can run in the same process without
// stepping on each other.
//
// Defaults:
// - home page: README.html (what the site root resolves to)
// - allowance: 25 extra pages beyond the table of contents
// - navigation / settle timeouts: 15 seconds each
// =============================================================================

use std::path::Path;
use std::time::Duration;

use url::Url;

use crate::error::{GuardError, GuardResult};

/// Every canonical page path ends with this suffix
pub const PAGE_SUFFIX: &str = ".html";

/// Page the site root resolves to
pub const DEFAULT_HOME_PAGE: &str = "README.html";

/// Extra, undeclared pages tolerated before the crawl is aborted
pub const DEFAULT_ALLOWANCE: usize = 25;

pub const DEFAULT_NAV_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_SETTLE_TIMEOUT_MS: u64 = 15_000;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Site root, always ending with '/'
    pub base_url: Url,
    pub home_page: String,
    /// First page to visit
    pub entry: String,
    pub allowance: usize,
    /// Optional hard cap on the number of pages visited
    pub limit: Option<usize>,
    pub nav_timeout: Duration,
    pub settle_timeout: Duration,
    /// Pause after each page
    pub page_delay: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            // A constant, known-valid URL
            base_url: Url::parse("http://localhost/").expect("static URL parses"),
            home_page: DEFAULT_HOME_PAGE.to_string(),
            entry: DEFAULT_HOME_PAGE.to_string(),
            allowance: DEFAULT_ALLOWANCE,
            limit: None,
            nav_timeout: Duration::from_millis(DEFAULT_NAV_TIMEOUT_MS),
            settle_timeout: Duration::from_millis(DEFAULT_SETTLE_TIMEOUT_MS),
            page_delay: Duration::ZERO,
        }
    }
}

impl CrawlConfig {
    /// Configuration for a locally built site directory (served as file://)
    pub fn for_site_dir(dir: &Path) -> GuardResult<Self> {
        let dir = dir.canonicalize()?;
        let base_url = Url::from_directory_path(&dir)
            .map_err(|_| GuardError::InvalidUrl(dir.display().to_string()))?;
        Ok(Self {
            base_url,
            ..Self::default()
        })
    }

    /// Configuration for a served site
    ///
    /// A missing trailing slash is added so the base URL is a stable prefix
    /// of every page URL.
    pub fn for_base_url(raw: &str) -> GuardResult<Self> {
        let with_slash = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{}/", raw)
        };
        let base_url =
            Url::parse(&with_slash).map_err(|e| GuardError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(GuardError::InvalidUrl(raw.to_string()));
        }
        Ok(Self {
            base_url,
            ..Self::default()
        })
    }

    /// Absolute URL of a canonical page path
    pub fn page_url(&self, path: &str) -> GuardResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| GuardError::InvalidUrl(format!("{}{}: {}", self.base_url, path, e)))
    }

    /// Largest number of visited pages before the crawl stops
    pub fn max_pages(&self, expected: usize) -> usize {
        expected + self.allowance
    }

    pub fn session_config(&self, headed: bool) -> SessionConfig {
        SessionConfig {
            nav_timeout: self.nav_timeout,
            settle_timeout: self.settle_timeout,
            headed,
        }
    }
}

/// What a browser engine needs at launch
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub nav_timeout: Duration,
    pub settle_timeout: Duration,
    /// Show the browser window instead of running headless
    pub headed: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        CrawlConfig::default().session_config(false)
    }
}
