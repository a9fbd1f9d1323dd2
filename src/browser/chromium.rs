// src/browser/chromium.rs
// =============================================================================
// Headless Chromium through chromiumoxide.
//
// chromiumoxide talks to the browser over the DevTools protocol. Launching
// gives us a Browser plus a Handler; the Handler is a stream that must be
// polled for the connection to make progress, so it runs in its own task.
//
// Each navigation is bounded twice:
// - nav_timeout for the page load itself
// - settle_timeout for the follow-up wait until the page stops navigating
// A timeout is a navigation error; the crawler does not retry.
//
// Rust concepts:
// - Option::take() in close(): each resource is released exactly once
// - JoinHandle::abort(): stops the background handler task
// =============================================================================

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::debug;
use url::Url;

use super::{BrowserEngine, BrowserSession};
use crate::config::SessionConfig;
use crate::error::{GuardError, GuardResult};

pub struct ChromiumEngine;

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn launch(&self, config: &SessionConfig) -> Result<Box<dyn BrowserSession>> {
        // Headless unless asked otherwise; DevTools calls share the nav timeout
        let mut builder = BrowserConfig::builder().request_timeout(config.nav_timeout);
        if config.headed {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(|e| anyhow!(e))?;

        // Fails when no Chromium binary is installed, which lets the caller
        // fall back to the next engine
        let (browser, mut handler) = Browser::launch(browser_config).await?;

        // Drive the DevTools connection until the browser goes away
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        // One page for the whole crawl, reused for every navigation
        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(e.into());
            }
        };

        Ok(Box::new(ChromiumSession {
            browser: Some(browser),
            page: Some(page),
            handler_task: Some(handler_task),
            nav_timeout: config.nav_timeout,
            settle_timeout: config.settle_timeout,
        }))
    }
}

struct ChromiumSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler_task: Option<JoinHandle<()>>,
    nav_timeout: Duration,
    settle_timeout: Duration,
}

impl ChromiumSession {
    // Page is a cheap handle; cloning it keeps `self` out of the awaits below
    fn page(&self, url: &str) -> GuardResult<Page> {
        self.page
            .clone()
            .ok_or_else(|| GuardError::navigation(url, "browser session is closed"))
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &Url) -> GuardResult<()> {
        let page = self.page(url.as_str())?;
        let nav_timeout = self.nav_timeout;
        let settle_timeout = self.settle_timeout;

        // Load: the outer Err is our timeout, the inner one a DevTools error
        tokio::time::timeout(nav_timeout, page.goto(url.as_str()))
            .await
            .map_err(|_| {
                GuardError::navigation(url.as_str(), format!("timed out after {:?}", nav_timeout))
            })?
            .map_err(|e| GuardError::navigation(url.as_str(), e))?;

        // Settle: wait until the page stops navigating (redirects, JS routing)
        tokio::time::timeout(settle_timeout, page.wait_for_navigation())
            .await
            .map_err(|_| {
                GuardError::navigation(
                    url.as_str(),
                    format!("page did not settle within {:?}", settle_timeout),
                )
            })?
            .map_err(|e| GuardError::navigation(url.as_str(), e))?;

        Ok(())
    }

    async fn anchor_hrefs(&mut self) -> GuardResult<Vec<String>> {
        let page = self.page("current page")?;

        // Only used to label errors
        let url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| "current page".to_string());

        let anchors = page
            .find_elements("a[href]")
            .await
            .map_err(|e| GuardError::navigation(url.as_str(), e))?;

        // Anchors without an href attribute are skipped
        let mut hrefs = Vec::with_capacity(anchors.len());
        for anchor in anchors {
            let href = anchor
                .attribute("href")
                .await
                .map_err(|e| GuardError::navigation(url.as_str(), e))?;
            if let Some(href) = href {
                hrefs.push(href);
            }
        }
        Ok(hrefs)
    }

    async fn close(&mut self) -> Result<()> {
        // Page first, then the browser process, then the handler task
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!("Failed to close page: {}", e);
            }
        }

        // Only a failure to close the browser itself is reported
        let mut result = Ok(());
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                result = Err(anyhow!("failed to close browser: {}", e));
            }
            if let Err(e) = browser.wait().await {
                debug!("Failed to wait for browser exit: {}", e);
            }
        }

        if let Some(task) = self.handler_task.take() {
            task.abort();
        }

        result
    }
}
