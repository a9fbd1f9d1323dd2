// src/error.rs
// =============================================================================
// Error types shared by the crawler, the browser engines and the notebook
// checker.
//
// The application layer (main.rs and the subcommand handlers) still uses
// anyhow::Result like before. The library-style modules return GuardError so
// callers can tell the failure kinds apart:
// - Parse: the table of contents is not valid YAML/JSON (fatal, before crawling)
// - EngineUnavailable: no browser could be launched (callers may skip)
// - Navigation: a page failed to load or timed out (fatal for the crawl)
// - BoundExceeded / IncompleteCoverage: crawl outcomes, reported by the caller
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// The manifest is not valid structured data
    #[error("failed to parse table of contents: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A notebook file is not valid JSON
    #[error("failed to parse notebook {path}: {source}")]
    Notebook {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Every browser engine failed to launch
    #[error("no browser engine could be launched: {}", .failures.join("; "))]
    EngineUnavailable { failures: Vec<String> },

    /// A page failed to load or timed out
    #[error("failed to navigate to {url}: {reason}")]
    Navigation { url: String, reason: String },

    /// The crawl visited more pages than the allowance permits
    #[error("visited {visited} pages, exceeding the allowed {allowed} (expected {expected})")]
    BoundExceeded {
        visited: usize,
        allowed: usize,
        expected: usize,
    },

    /// The crawl ended without reaching every expected page
    #[error("missing pages during crawl: {}", .missing.join(", "))]
    IncompleteCoverage { missing: Vec<String> },

    /// Pages inside the site that the table of contents does not declare
    #[error("pages not listed in the table of contents: {}", .extra.join(", "))]
    UnexpectedPages { extra: Vec<String> },

    #[error("invalid site URL '{0}'")]
    InvalidUrl(String),

    #[error("notebook execution timed out after {0:?}")]
    ExecutionTimeout(Duration),

    #[error("interrupted by user")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GuardResult<T> = Result<T, GuardError>;

impl GuardError {
    /// Builds a navigation error from anything printable
    pub fn navigation(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        GuardError::Navigation {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
