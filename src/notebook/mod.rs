// src/notebook/mod.rs
// =============================================================================
// This module checks the notebooks embedded in the documentation.
//
// For each notebook:
// 1. Collect the modules its code cells import
// 2. Try to import each one with the configured Python interpreter
// 3. If a required module is missing, report it and skip execution
// 4. Optionally execute the notebook with nbconvert
//
// Modules listed as optional are reported but never block execution.
// Cells that are not valid Python (exercise stubs) are not scanned.
// The return value is a process exit code: 0 when every notebook passed.
// =============================================================================

mod exec;
mod imports;

pub use exec::{check_modules, execute_notebook, Interpreter, CACHE_DIR};
pub use imports::{collect_imports, Notebook};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::GuardError;

#[derive(Debug, Clone)]
pub struct NotebookOptions {
    pub notebooks: Vec<PathBuf>,
    pub execute: bool,
    pub timeout: Duration,
    /// Modules whose absence does not block execution
    pub optional: BTreeSet<String>,
    pub interpreter: Interpreter,
    pub cache_dir: PathBuf,
}

impl Default for NotebookOptions {
    fn default() -> Self {
        Self {
            notebooks: Vec::new(),
            execute: false,
            timeout: Duration::from_secs(600),
            optional: BTreeSet::new(),
            interpreter: Interpreter::default(),
            cache_dir: PathBuf::from(CACHE_DIR),
        }
    }
}

/// Checks every notebook and returns 0 if all passed, 1 otherwise
pub async fn check_notebooks(options: &NotebookOptions) -> i32 {
    let mut exit_code = 0;

    for path in &options.notebooks {
        if !path.exists() {
            error!("{} not found", path.display());
            exit_code = 1;
            continue;
        }

        info!("Notebook: {}", path.display());
        match check_one(path, options).await {
            Ok(true) => {}
            Ok(false) => exit_code = 1,
            Err(e) => {
                error!("{}: {}", path.display(), e);
                exit_code = 1;
            }
        }
    }

    exit_code
}

// Returns Ok(false) when the notebook failed a check
async fn check_one(path: &Path, options: &NotebookOptions) -> Result<bool, GuardError> {
    let notebook = Notebook::load(path)?;
    let modules = collect_imports(&notebook);
    let results = check_modules(&options.interpreter, &modules).await?;

    if results.is_empty() {
        info!("No imports detected.");
    } else {
        info!("Dependency check:");
        for result in &results {
            let status = if result.available {
                "OK"
            } else if options.optional.contains(&result.name) {
                "OPTIONAL"
            } else {
                "MISSING"
            };
            info!("  - {:<12} {} ({})", result.name, status, result.detail);
        }
    }

    let missing: Vec<&str> = results
        .iter()
        .filter(|r| !r.available && !options.optional.contains(&r.name))
        .map(|r| r.name.as_str())
        .collect();
    if !missing.is_empty() {
        warn!(
            "Skipping execution because required modules are missing: {}",
            missing.join(", ")
        );
        return Ok(false);
    }

    if !options.execute {
        return Ok(true);
    }

    info!("Executing notebook...");
    match execute_notebook(&options.interpreter, path, options.timeout, &options.cache_dir).await {
        Ok(0) => {
            info!("Execution succeeded.");
            Ok(true)
        }
        Ok(code) => {
            error!("Execution failed with exit code {}.", code);
            Ok(false)
        }
        Err(GuardError::ExecutionTimeout(_)) => {
            error!("Execution timed out.");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
