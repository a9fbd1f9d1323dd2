// src/crawl/fake_site.rs
// In-memory site used by the crawler tests in place of a real browser.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use crate::browser::{BrowserEngine, BrowserSession};
use crate::config::SessionConfig;
use crate::error::{GuardError, GuardResult};

pub const BASE: &str = "https://site/";

/// Page path -> raw hrefs on that page
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    pages: HashMap<String, Vec<String>>,
    current: Option<String>,
    /// Every path navigated to, in order
    pub navigations: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, path: &str, hrefs: &[&str]) -> Self {
        self.pages
            .insert(path.to_string(), hrefs.iter().map(|h| h.to_string()).collect());
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserSession for FakeSite {
    async fn navigate(&mut self, url: &Url) -> GuardResult<()> {
        let path = url.as_str().strip_prefix(BASE).unwrap_or(url.as_str()).to_string();
        self.navigations.lock().unwrap().push(path.clone());
        if !self.pages.contains_key(&path) {
            self.current = None;
            return Err(GuardError::navigation(url.as_str(), "HTTP 404 Not Found"));
        }
        self.current = Some(path);
        Ok(())
    }

    async fn anchor_hrefs(&mut self) -> GuardResult<Vec<String>> {
        Ok(self
            .current
            .as_ref()
            .and_then(|path| self.pages.get(path))
            .cloned()
            .unwrap_or_default())
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Engine that hands out a clone of the fake site
pub struct FakeEngine(pub FakeSite);

#[async_trait]
impl BrowserEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn launch(&self, _config: &SessionConfig) -> anyhow::Result<Box<dyn BrowserSession>> {
        Ok(Box::new(self.0.clone()))
    }
}
