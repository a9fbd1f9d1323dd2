// src/crawl/toc.rs
// =============================================================================
// This module reads the site's table of contents (a Jupyter Book _toc.yml)
// and turns it into the set of pages the built site must contain.
//
// Input shape:
//   root: README
//   parts:                 # optional grouping, each part has chapters
//     - caption: Basics
//       chapters: [...]
//   chapters:
//     - file: intro
//     - file: guide
//       sections:
//         - file: guide/advanced
//
// Every entry naming a `file` contributes `file + ".html"`. Entries without a
// file only group their children. Sections nest to any depth.
//
// We use serde_yaml, which also accepts JSON (YAML is a superset of JSON).
//
// Rust concepts:
// - #[derive(Deserialize)]: the structs below mirror the YAML shape
// - Recursion: sections hold entries, which hold sections
// =============================================================================

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use crate::config::PAGE_SUFFIX;
use crate::error::GuardResult;

/// Root used when the table of contents does not name one
pub const DEFAULT_ROOT: &str = "README";

/// The pages the table of contents declares, as canonical paths
pub type ExpectedSet = BTreeSet<String>;

#[derive(Debug, Deserialize)]
struct TocDocument {
    root: Option<String>,
    #[serde(default)]
    parts: Option<Vec<TocPart>>,
    #[serde(default)]
    chapters: Option<Vec<TocEntry>>,
}

#[derive(Debug, Deserialize)]
struct TocPart {
    #[serde(default)]
    chapters: Option<Vec<TocEntry>>,
}

#[derive(Debug, Deserialize)]
struct TocEntry {
    file: Option<String>,
    #[serde(default)]
    sections: Option<Vec<TocEntry>>,
}

/// Parses a table of contents into the set of expected page paths
///
/// Fails with GuardError::Parse when the source is not valid structured data.
pub fn load_expected(source: &str) -> GuardResult<ExpectedSet> {
    let document: TocDocument = serde_yaml::from_str(source)?;

    let mut expected = ExpectedSet::new();

    let root = document
        .root
        .as_deref()
        .filter(|root| !root.is_empty())
        .unwrap_or(DEFAULT_ROOT);
    expected.insert(page_path(root));

    let part_chapters = document
        .parts
        .iter()
        .flatten()
        .flat_map(|part| part.chapters.iter().flatten());
    let chapters = document.chapters.iter().flatten();

    for entry in part_chapters.chain(chapters) {
        add_entry(entry, &mut expected);
    }

    Ok(expected)
}

/// Reads and parses a table of contents file
pub fn load_expected_file(path: &Path) -> GuardResult<ExpectedSet> {
    let source = std::fs::read_to_string(path)?;
    load_expected(&source)
}

// Adds an entry and, recursively, all of its sections
fn add_entry(entry: &TocEntry, expected: &mut ExpectedSet) {
    if let Some(file) = entry.file.as_deref().filter(|file| !file.is_empty()) {
        expected.insert(page_path(file));
    }
    for section in entry.sections.iter().flatten() {
        add_entry(section, expected);
    }
}

fn page_path(file: &str) -> String {
    format!("{}{}", file, PAGE_SUFFIX)
}
