// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands:
// - site: crawl the built documentation site and check every page listed in
//   the table of contents is reachable by following links
// - notebooks: check that notebooks only import available modules, and
//   optionally execute them
// =============================================================================

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::browser::EngineKind;
use crate::config::{DEFAULT_ALLOWANCE, DEFAULT_HOME_PAGE, DEFAULT_NAV_TIMEOUT_MS, DEFAULT_SETTLE_TIMEOUT_MS};

#[derive(Parser, Debug)]
#[command(
    name = "site-guardian",
    version = "0.1.0",
    about = "Verify that a built documentation site is fully reachable and its notebooks run",
    long_about = "site-guardian crawls a statically built documentation site breadth-first, \
                  checks that every page in the table of contents can be reached by following links, \
                  and checks that embedded notebooks import only available modules and execute cleanly."
)]
pub struct Cli {
    /// Logging verbosity (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl the built site and verify every table-of-contents page is reachable
    ///
    /// Example: site-guardian site --toc _toc.yml --site-dir _build/html
    Site(SiteArgs),

    /// Check notebook imports and optionally execute the notebooks
    ///
    /// Example: site-guardian notebooks hard/10_performance.ipynb --execute
    Notebooks(NotebookArgs),
}

#[derive(clap::Args, Debug)]
pub struct SiteArgs {
    /// Table of contents describing the pages the site must contain
    #[arg(long, default_value = "_toc.yml")]
    pub toc: PathBuf,

    /// Directory with the built HTML site
    #[arg(long, default_value = "_build/html", conflicts_with = "base_url")]
    pub site_dir: PathBuf,

    /// Crawl a served site instead of a local directory
    #[arg(long)]
    pub base_url: Option<String>,

    /// Page the site root resolves to
    #[arg(long, default_value = DEFAULT_HOME_PAGE)]
    pub home_page: String,

    /// First page to visit (defaults to the home page)
    #[arg(long)]
    pub entry: Option<String>,

    /// Extra pages tolerated beyond the table of contents before aborting
    #[arg(long, default_value_t = DEFAULT_ALLOWANCE)]
    pub allowance: usize,

    /// Stop after visiting this many pages
    #[arg(long)]
    pub limit: Option<usize>,

    /// Page load timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_NAV_TIMEOUT_MS)]
    pub nav_timeout_ms: u64,

    /// Timeout in milliseconds for a page to settle after loading
    #[arg(long, default_value_t = DEFAULT_SETTLE_TIMEOUT_MS)]
    pub settle_timeout_ms: u64,

    /// Pause after each page, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub delay_ms: u64,

    /// Browser engines to try, in order
    ///
    /// Can be repeated: --engine chromium --engine static
    #[arg(long = "engine", value_enum)]
    pub engines: Vec<EngineKind>,

    /// Show the browser window (chromium only)
    #[arg(long)]
    pub headed: bool,

    /// Run `jupyter-book build .` first if the site directory is missing
    #[arg(long)]
    pub build: bool,

    /// Fail when the crawl stops because it visited too many pages
    #[arg(long)]
    pub strict_bound: bool,

    /// Fail when pages outside the table of contents are reachable
    #[arg(long)]
    pub deny_extra: bool,

    /// Output the crawl report as JSON
    #[arg(long)]
    pub json: bool,
}

impl SiteArgs {
    /// Engines in priority order, chromium first by default
    pub fn engine_order(&self) -> Vec<EngineKind> {
        if self.engines.is_empty() {
            vec![EngineKind::Chromium, EngineKind::Static]
        } else {
            self.engines.clone()
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct NotebookArgs {
    /// Notebook paths to inspect
    #[arg(required = true)]
    pub notebooks: Vec<PathBuf>,

    /// Execute notebooks via nbconvert after the dependency check
    #[arg(long)]
    pub execute: bool,

    /// Execution timeout per notebook, in seconds
    #[arg(long, default_value_t = 600)]
    pub timeout: u64,

    /// Modules allowed to be missing (can be repeated)
    #[arg(long)]
    pub optional: Vec<String>,

    /// Python interpreter command line
    #[arg(long, default_value = "python3")]
    pub python: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_defaults() {
        let cli = Cli::try_parse_from(["site-guardian", "site"]).unwrap();
        let Commands::Site(args) = cli.command else {
            panic!("expected site subcommand");
        };
        assert_eq!(args.toc, PathBuf::from("_toc.yml"));
        assert_eq!(args.home_page, "README.html");
        assert_eq!(args.allowance, 25);
        assert_eq!(args.engine_order(), vec![EngineKind::Chromium, EngineKind::Static]);
        assert_eq!(cli.log_level, LogLevel::Info);
    }

    #[test]
    fn test_engine_priority_is_kept() {
        let cli = Cli::try_parse_from([
            "site-guardian",
            "site",
            "--engine",
            "static",
            "--engine",
            "chromium",
            "--log-level",
            "debug",
        ])
        .unwrap();
        let Commands::Site(args) = cli.command else {
            panic!("expected site subcommand");
        };
        assert_eq!(args.engine_order(), vec![EngineKind::Static, EngineKind::Chromium]);
        assert_eq!(cli.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_site_dir_conflicts_with_base_url() {
        let result = Cli::try_parse_from([
            "site-guardian",
            "site",
            "--site-dir",
            "out",
            "--base-url",
            "https://docs.example.com/",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_notebooks_args() {
        let cli = Cli::try_parse_from([
            "site-guardian",
            "notebooks",
            "a.ipynb",
            "--optional",
            "numba",
            "--optional",
            "cupy",
            "--execute",
        ])
        .unwrap();
        let Commands::Notebooks(args) = cli.command else {
            panic!("expected notebooks subcommand");
        };
        assert_eq!(args.notebooks, vec![PathBuf::from("a.ipynb")]);
        assert_eq!(args.optional, vec!["numba", "cupy"]);
        assert!(args.execute);
        assert_eq!(args.timeout, 600);
        assert_eq!(args.python, "python3");
    }
}
