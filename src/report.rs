// src/report.rs
// =============================================================================
// Prints the outcome of a site crawl, either as a human-readable summary or
// as JSON (for CI pipelines that want to parse it).
//
// The JSON report also carries the link graph: for every visited page, the
// internal pages it links to.
// =============================================================================

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use crate::crawl::{CrawlRun, LinkGraph};

#[derive(Debug, Serialize)]
pub struct SiteReport<'a> {
    pub engine: &'a str,
    #[serde(flatten)]
    pub result: &'a crate::crawl::CrawlResult,
    /// For each extra page, the pages that link to it
    pub referrers: BTreeMap<String, Vec<String>>,
    /// For each visited page, the internal pages it links to
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, Vec<String>>,
}

impl<'a> SiteReport<'a> {
    pub fn new(run: &'a CrawlRun, graph: &LinkGraph) -> Self {
        let referrers = run
            .result
            .extra
            .iter()
            .map(|page| (page.clone(), graph.referrers(page)))
            .collect();

        // Pages visited without an observer attached have no entry
        let links = run
            .result
            .visited
            .iter()
            .filter_map(|page| Some((page.clone(), graph.links_from(page)?.to_vec())))
            .collect();

        Self {
            engine: run.engine,
            result: &run.result,
            referrers,
            links,
        }
    }
}

pub fn print_report(report: &SiteReport<'_>, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(report)?;
        println!("{}", json_output);
    } else {
        print_summary(report);
    }
    Ok(())
}

fn print_summary(report: &SiteReport<'_>) {
    let result = report.result;

    println!("📊 Summary ({} engine):", report.engine);
    println!("   🏁 {}", result.status.describe());
    println!("   ✅ Visited: {}", result.visited.len());
    println!("   📋 Expected: {}", result.expected);
    println!("   ❌ Missing: {}", result.missing.len());
    println!("   ➕ Extra: {}", result.extra.len());

    if !result.missing.is_empty() {
        println!();
        println!("Missing pages:");
        for page in &result.missing {
            println!("   - {}", page);
        }
    }

    if !report.referrers.is_empty() {
        println!();
        println!("{:<50} {}", "EXTRA PAGE", "LINKED FROM");
        println!("{}", "=".repeat(80));
        for (page, from) in &report.referrers {
            println!("{:<50} {}", page, from.join(", "));
        }
    }
}
