// src/browser/static_fetch.rs
// =============================================================================
// A browser engine without a browser.
//
// Pages are fetched directly:
// - http:// and https:// with reqwest (a non-2xx status is a broken page)
// - file:// straight from disk (a locally built site)
//
// Anchors come from parsing the HTML with scraper ("a[href]"). No JavaScript
// runs, so links added by scripts are invisible to this engine. It is the
// fallback when no Chromium is installed.
//
// Rust concepts:
// - async blocks: `fetch` below is a future we can wrap in a timeout
// - `??`: the first ? unwraps the timeout, the second the fetch itself
// =============================================================================

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use super::{BrowserEngine, BrowserSession};
use crate::config::SessionConfig;
use crate::error::{GuardError, GuardResult};

pub struct StaticEngine;

#[async_trait]
impl BrowserEngine for StaticEngine {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn launch(&self, config: &SessionConfig) -> Result<Box<dyn BrowserSession>> {
        // The client timeout covers the whole request, body included
        let client = Client::builder().timeout(config.nav_timeout).build()?;
        Ok(Box::new(StaticSession {
            client,
            nav_timeout: config.nav_timeout,
            current: None,
        }))
    }
}

struct StaticSession {
    client: Client,
    nav_timeout: Duration,
    // HTML of the page we navigated to last
    current: Option<String>,
}

#[async_trait]
impl BrowserSession for StaticSession {
    async fn navigate(&mut self, url: &Url) -> GuardResult<()> {
        // Forget the previous page so a failed navigation has no anchors
        self.current = None;

        let client = &self.client;
        let nav_timeout = self.nav_timeout;
        let fetch = async {
            if url.scheme() == "file" {
                read_file_page(url).await
            } else {
                fetch_page(client, url).await
            }
        };

        // Also bounds file reads, which the client timeout does not see
        let html = tokio::time::timeout(nav_timeout, fetch)
            .await
            .map_err(|_| {
                GuardError::navigation(url.as_str(), format!("timed out after {:?}", nav_timeout))
            })??;

        self.current = Some(html);
        Ok(())
    }

    async fn anchor_hrefs(&mut self) -> GuardResult<Vec<String>> {
        Ok(self
            .current
            .as_deref()
            .map(extract_anchor_hrefs)
            .unwrap_or_default())
    }

    async fn close(&mut self) -> Result<()> {
        self.current = None;
        Ok(())
    }
}

// Fetches a web page and returns its HTML content
async fn fetch_page(client: &Client, url: &Url) -> GuardResult<String> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| GuardError::navigation(url.as_str(), e))?;

    // A 404 behind a link is exactly the broken page we are after
    if !response.status().is_success() {
        return Err(GuardError::navigation(
            url.as_str(),
            format!("HTTP {}", response.status()),
        ));
    }

    response
        .text()
        .await
        .map_err(|e| GuardError::navigation(url.as_str(), e))
}

async fn read_file_page(url: &Url) -> GuardResult<String> {
    let path = url
        .to_file_path()
        .map_err(|_| GuardError::navigation(url.as_str(), "not a local file path"))?;

    tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| GuardError::navigation(url.as_str(), e))
}

/// Raw href values of every <a href> in the document
pub(crate) fn extract_anchor_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    // Constant selector, known to be valid
    let selector = Selector::parse("a[href]").unwrap();

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect()
}
