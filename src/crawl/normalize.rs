// src/crawl/normalize.rs
// =============================================================================
// This module turns raw href values into canonical page paths.
//
// A canonical path is relative to the site root, ends with ".html" and never
// carries a fragment or a query string. Two hrefs that end up at the same
// canonical path are the same page for the crawler.
//
// How it works:
// 1. Skip in-page anchors and mailto:/javascript:/tel:/data: links
//    (an empty href points at the site root, so it becomes the home page)
// 2. Resolve the href against the site root (like a browser does)
// 3. Drop the #fragment
// 4. Drop anything that is not under the site root (external link)
// 5. Canonicalize what is left (see canonicalize_relative)
//
// Both functions are pure: same input, same output. The crawler relies on
// that to deduplicate a link discovered from many different pages.
//
// Rust concepts:
// - Url::join: relative resolution following the URL standard
// - Option + `?`: every rejection is just an early None
// =============================================================================

use tracing::debug;
use url::Url;

use crate::config::PAGE_SUFFIX;

// Links that never lead to another page
const SKIPPED_SCHEMES: &[&str] = &["mailto:", "javascript:", "tel:", "data:"];

/// Returns the canonical path for an internal page link, or None when the
/// link is external, not a page, or not navigable at all
///
/// Examples (base = "https://site/", home_page = "README.html"):
///   "intro.html"            -> Some("intro.html")
///   "page.html?x=1#sec"     -> Some("page.html")
///   "" or "/"               -> Some("README.html")
///   "guide/"                -> Some("guide/index.html")
///   "style.css"             -> None
///   "https://other.com/a.html" -> None
pub fn normalize_internal_href(base: &Url, href: &str, home_page: &str) -> Option<String> {
    // Browsers ignore surrounding whitespace in href values
    let href = href.trim();
    if href.is_empty() {
        return canonicalize_relative("", home_page);
    }
    if href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        return None;
    }

    // Resolve exactly like a browser would (handles ./, ../ and absolute paths)
    let mut absolute = base.join(href).ok()?;
    absolute.set_fragment(None);

    // External link: not under the site root
    let relative = absolute.as_str().strip_prefix(base.as_str())?;

    canonicalize_relative(relative, home_page)
}

/// Normalizes a path relative to the site root into its canonical form
///
/// Rules, in order:
/// - the query string is dropped (logged at debug level)
/// - a leading '/' is stripped
/// - "" and "." become the home page
/// - "dir/" becomes "dir/index.html"
/// - anything not ending in ".html" is rejected (assets are not followed)
pub fn canonicalize_relative(relative: &str, home_page: &str) -> Option<String> {
    let relative = relative.split('#').next().unwrap_or_default();

    let path = match relative.split_once('?') {
        Some((path, query)) => {
            if !query.is_empty() {
                debug!("Dropping query string '{}' from {}", query, relative);
            }
            path
        }
        None => relative,
    };

    // "/intro.html" and "intro.html" are the same page
    let path = path.strip_prefix('/').unwrap_or(path);

    let mut path = if path.is_empty() || path == "." {
        home_page.to_string()
    } else {
        path.to_string()
    };

    // Directory URLs are served by their index page
    if path.ends_with('/') {
        path.push_str("index");
        path.push_str(PAGE_SUFFIX);
    }

    if !path.ends_with(PAGE_SUFFIX) {
        return None;
    }

    Some(path)
}

/// Canonical path of a page named on the command line
///
/// The entry is always relative to the site root: a leading '/' does not
/// reach the root of the host or of the filesystem. Returns None for anything
/// that is not a page inside the site.
pub fn resolve_entry(base: &Url, entry: &str, home_page: &str) -> Option<String> {
    let relative = entry.trim().trim_start_matches('/');
    normalize_internal_href(base, relative, home_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = "README.html";

    fn base() -> Url {
        Url::parse("https://site/").unwrap()
    }

    #[test]
    fn test_relative_page() {
        assert_eq!(
            normalize_internal_href(&base(), "intro.html", HOME),
            Some("intro.html".to_string())
        );
    }

    #[test]
    fn test_same_input_same_output() {
        let first = normalize_internal_href(&base(), "../guide/./advanced.html", HOME);
        let second = normalize_internal_href(&base(), "../guide/./advanced.html", HOME);
        assert_eq!(first, second);
        assert_eq!(first, Some("guide/advanced.html".to_string()));
    }

    #[test]
    fn test_fragment_and_query_are_stripped() {
        assert_eq!(
            normalize_internal_href(&base(), "page.html?x=1#sec", HOME),
            normalize_internal_href(&base(), "page.html", HOME)
        );
        assert_eq!(
            normalize_internal_href(&base(), "page.html#top", HOME),
            Some("page.html".to_string())
        );
    }

    #[test]
    fn test_external_link_rejected() {
        assert_eq!(
            normalize_internal_href(&base(), "https://other.com/a.html", HOME),
            None
        );
    }

    #[test]
    fn test_link_outside_site_root_rejected() {
        let base = Url::parse("file:///srv/book/_build/html/").unwrap();
        assert_eq!(normalize_internal_href(&base, "/etc/passwd.html", HOME), None);
        assert_eq!(
            normalize_internal_href(&base, "file:///srv/book/_build/html/intro.html", HOME),
            Some("intro.html".to_string())
        );
    }

    #[test]
    fn test_home_substitution() {
        assert_eq!(
            normalize_internal_href(&base(), "", HOME),
            Some(HOME.to_string())
        );
        assert_eq!(
            normalize_internal_href(&base(), "/", HOME),
            Some(HOME.to_string())
        );
        assert_eq!(
            normalize_internal_href(&base(), ".", HOME),
            Some(HOME.to_string())
        );
        assert_eq!(
            normalize_internal_href(&base(), "https://site", HOME),
            Some(HOME.to_string())
        );
    }

    #[test]
    fn test_trailing_slash_gets_index() {
        assert_eq!(
            normalize_internal_href(&base(), "guide/", HOME),
            Some("guide/index.html".to_string())
        );
    }

    #[test]
    fn test_non_page_rejected() {
        assert_eq!(normalize_internal_href(&base(), "style.css", HOME), None);
        assert_eq!(normalize_internal_href(&base(), "_static/logo.png", HOME), None);
        assert_eq!(normalize_internal_href(&base(), "guide", HOME), None);
    }

    #[test]
    fn test_non_navigable_links_rejected() {
        assert_eq!(normalize_internal_href(&base(), "#section", HOME), None);
        assert_eq!(
            normalize_internal_href(&base(), "mailto:team@example.com", HOME),
            None
        );
        assert_eq!(
            normalize_internal_href(&base(), "JavaScript:void(0)", HOME),
            None
        );
    }

    #[test]
    fn test_relative_to_nested_base() {
        let base = Url::parse("https://docs.example.com/book/").unwrap();
        assert_eq!(
            normalize_internal_href(&base, "/book/guide.html", HOME),
            Some("guide.html".to_string())
        );
        assert_eq!(normalize_internal_href(&base, "/other/guide.html", HOME), None);
    }

    #[test]
    fn test_canonicalize_relative_rules() {
        assert_eq!(
            canonicalize_relative("/intro.html?lang=en", HOME),
            Some("intro.html".to_string())
        );
        assert_eq!(
            canonicalize_relative("?lang=en", HOME),
            Some(HOME.to_string())
        );
        assert_eq!(canonicalize_relative("api/", HOME), Some("api/index.html".to_string()));
        assert_eq!(canonicalize_relative("notebook.ipynb", HOME), None);
    }

    #[test]
    fn test_entry_is_relative_to_site_root() {
        let base = Url::parse("file:///srv/book/_build/html/").unwrap();
        assert_eq!(resolve_entry(&base, "/intro.html", HOME), Some("intro.html".to_string()));
        assert_eq!(
            resolve_entry(&base, "guide/", HOME),
            Some("guide/index.html".to_string())
        );
        assert_eq!(
            resolve_entry(&base, "./guide/advanced.html#top", HOME),
            Some("guide/advanced.html".to_string())
        );
        assert_eq!(resolve_entry(&base, "", HOME), Some(HOME.to_string()));
    }

    #[test]
    fn test_entry_outside_site_rejected() {
        let base = Url::parse("file:///srv/book/_build/html/").unwrap();
        assert_eq!(resolve_entry(&base, "../secret.html", HOME), None);
        assert_eq!(resolve_entry(&base, "style.css", HOME), None);
        assert_eq!(resolve_entry(&base, "https://other.com/a.html", HOME), None);
    }
}
