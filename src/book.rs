// src/book.rs
// =============================================================================
// Makes sure the HTML site exists before we crawl it.
//
// If the build output directory is missing we run `jupyter-book build .` in
// the project root, the same command a human would run.
// =============================================================================

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use tokio::process::Command;
use tracing::info;

const BUILDER: &str = "jupyter-book";

/// Builds the site unless `site_dir` already exists
///
/// Returns true if a build was run.
pub async fn ensure_site_built(site_dir: &Path, project_root: &Path) -> Result<bool> {
    ensure_site_built_with(site_dir, project_root, BUILDER).await
}

async fn ensure_site_built_with(site_dir: &Path, project_root: &Path, builder: &str) -> Result<bool> {
    if site_dir.exists() {
        return Ok(false);
    }

    info!("HTML build not found; running `{} build .`", builder);
    let status = Command::new(builder)
        .arg("build")
        .arg(".")
        .current_dir(project_root)
        .status()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => anyhow!("{} CLI not found on PATH", builder),
            _ => anyhow!(e),
        })
        .with_context(|| format!("failed to build the site in {}", project_root.display()))?;

    if !status.success() {
        bail!("`{} build .` failed with {}", builder, status);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_existing_site_is_not_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let built = ensure_site_built_with(dir.path(), dir.path(), "definitely-not-a-builder")
            .await
            .unwrap();
        assert!(!built);
    }

    #[tokio::test]
    async fn test_missing_builder_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("_build").join("html");
        let err = ensure_site_built_with(&site, dir.path(), "definitely-not-a-builder")
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("not found on PATH"));
    }
}
