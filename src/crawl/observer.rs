// src/crawl/observer.rs
// =============================================================================
// Per-page events.
//
// The crawl loop only does traversal. Anything else that should happen for
// each visited page (progress output, screenshots, recording the link graph)
// subscribes here. Observers get a read-only view of the visit; they cannot
// change what the crawler does next.
//
// Two observers ship with the crate:
// - ProgressLog: one log line per visited page
// - LinkGraph: remembers which page links where, for the report
//
// Rust concepts:
// - Trait objects: the crawler stores Box<dyn PageObserver>
// - Lifetimes: PageVisit borrows from the crawl loop, so it is only valid
//   for the duration of on_visit
// =============================================================================

use std::collections::BTreeMap;

use tracing::info;
use url::Url;

/// One visited page, emitted after its links were enumerated
#[derive(Debug)]
pub struct PageVisit<'a> {
    /// 1-based position in the visit order
    pub step: usize,
    /// Canonical path of the page
    pub path: &'a str,
    pub url: &'a Url,
    /// Canonical paths of every internal page link on the page
    /// (including ones already visited or queued)
    pub links: &'a [String],
}

pub trait PageObserver: Send {
    fn on_visit(&mut self, visit: &PageVisit<'_>);
}

/// Logs every visited page with its position in the crawl
#[derive(Debug, Clone, Copy)]
pub struct ProgressLog {
    /// Size of the expected set, shown as the denominator
    pub expected: usize,
}

impl PageObserver for ProgressLog {
    fn on_visit(&mut self, visit: &PageVisit<'_>) {
        // step can exceed expected when the site has undeclared pages
        info!(
            "[{}/{}] {} ({} internal links)",
            visit.step,
            self.expected,
            visit.url,
            visit.links.len()
        );
    }
}

/// Records the outgoing links of every visited page
#[derive(Debug, Default, Clone)]
pub struct LinkGraph {
    edges: BTreeMap<String, Vec<String>>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages that link to `target`, sorted
    pub fn referrers(&self, target: &str) -> Vec<String> {
        self.edges
            .iter()
            .filter(|(_, links)| links.iter().any(|link| link == target))
            .map(|(page, _)| page.clone())
            .collect()
    }

    /// Deduplicated, sorted internal links of a visited page
    pub fn links_from(&self, page: &str) -> Option<&[String]> {
        self.edges.get(page).map(Vec::as_slice)
    }
}

impl PageObserver for LinkGraph {
    fn on_visit(&mut self, visit: &PageVisit<'_>) {
        // A page that links to the same target twice is still one edge
        let mut links = visit.links.to_vec();
        links.sort();
        links.dedup();
        self.edges.insert(visit.path.to_string(), links);
    }
}

// Lets the caller keep ownership of an observer (and read it afterwards)
impl<T: PageObserver + ?Sized> PageObserver for &mut T {
    fn on_visit(&mut self, visit: &PageVisit<'_>) {
        (**self).on_visit(visit);
    }
}
