// src/browser/mod.rs
// =============================================================================
// This module is the boundary between the crawler and a real browser.
//
// The crawler only needs four things from a browser:
// - launch a session
// - navigate to a URL (and wait for the page to settle)
// - list the raw href of every <a> on the current page
// - close the session
//
// Submodules:
// - chromium: headless Chromium through the DevTools protocol (chromiumoxide)
// - static_fetch: no JavaScript, fetches pages with reqwest or from disk and
//   parses them with scraper
//
// Engines are tried in priority order; the first one that launches wins.
//
// Rust concepts:
// - #[async_trait]: async methods on trait objects (Box<dyn BrowserEngine>)
// - Send bounds: sessions are driven from tokio tasks
// =============================================================================

mod chromium;
mod static_fetch;

pub use chromium::ChromiumEngine;
pub use static_fetch::StaticEngine;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use crate::config::SessionConfig;
use crate::error::{GuardError, GuardResult};

/// Something that can start a browser session
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn launch(&self, config: &SessionConfig) -> anyhow::Result<Box<dyn BrowserSession>>;
}

/// One open browser page
#[async_trait]
pub trait BrowserSession: Send {
    /// Loads the URL and waits for it to settle
    ///
    /// Failures and timeouts are GuardError::Navigation.
    async fn navigate(&mut self, url: &Url) -> GuardResult<()>;

    /// Raw href values of every anchor on the current page, in document order
    async fn anchor_hrefs(&mut self) -> GuardResult<Vec<String>>;

    /// Releases the page and the browser; calling it twice is harmless
    async fn close(&mut self) -> anyhow::Result<()>;
}

/// Engine names accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EngineKind {
    Chromium,
    Static,
}

impl EngineKind {
    pub fn build(self) -> Box<dyn BrowserEngine> {
        match self {
            EngineKind::Chromium => Box::new(ChromiumEngine),
            EngineKind::Static => Box::new(StaticEngine),
        }
    }
}

/// A launched session and the engine that produced it
pub struct Launched {
    pub engine: &'static str,
    pub session: Box<dyn BrowserSession>,
}

/// Tries each engine in order and returns the first session that launches
///
/// If every engine fails, returns GuardError::EngineUnavailable listing each
/// "engine: reason" so the caller can decide to skip instead of failing.
pub async fn launch_first(
    engines: &[Box<dyn BrowserEngine>],
    config: &SessionConfig,
) -> GuardResult<Launched> {
    let mut failures = Vec::new();

    // Stop at the first engine that launches
    for engine in engines {
        debug!("Attempting to launch {}", engine.name());
        match engine.launch(config).await {
            Ok(session) => {
                return Ok(Launched {
                    engine: engine.name(),
                    session,
                })
            }
            Err(e) => {
                // Remember why, then try the next engine
                warn!("Failed to launch {}: {:#}", engine.name(), e);
                failures.push(format!("{}: {:#}", engine.name(), e));
            }
        }
    }

    Err(GuardError::EngineUnavailable { failures })
}
