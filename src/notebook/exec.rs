// src/notebook/exec.rs
// =============================================================================
// Talks to the Python interpreter.
//
// Two jobs:
// - probe whether a module can be imported (`python -c "import ..." name`)
// - execute a notebook through nbconvert, with a timeout
//
// The interpreter is a full command line, so `python3`, `uv run python` or
// `/opt/venv/bin/python` all work.
// =============================================================================

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{GuardError, GuardResult};

// Imports the module named by the first argument
const PROBE_SNIPPET: &str = "import importlib, sys; importlib.import_module(sys.argv[1])";

/// Where executed notebooks are written
pub const CACHE_DIR: &str = ".nbexec-cache";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    pub program: String,
    pub args: Vec<String>,
}

impl Interpreter {
    /// Splits a command line like "uv run python" on whitespace
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: Vec::new(),
        }
    }
}

/// Result of probing one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCheck {
    pub name: String,
    pub available: bool,
    /// "ok", or the interpreter's error line
    pub detail: String,
}

/// Tries to import each module, sorted by name
pub async fn check_modules<'a>(
    interpreter: &Interpreter,
    modules: impl IntoIterator<Item = &'a String>,
) -> GuardResult<Vec<ModuleCheck>> {
    let mut names: Vec<&String> = modules.into_iter().collect();
    names.sort();
    names.dedup();

    let mut results = Vec::with_capacity(names.len());
    for name in names {
        results.push(probe_module(interpreter, name).await?);
    }
    Ok(results)
}

async fn probe_module(interpreter: &Interpreter, name: &str) -> GuardResult<ModuleCheck> {
    let output = interpreter
        .command()
        .arg("-c")
        .arg(PROBE_SNIPPET)
        .arg(name)
        .stdin(Stdio::null())
        .output()
        .await?;

    if output.status.success() {
        return Ok(ModuleCheck {
            name: name.to_string(),
            available: true,
            detail: "ok".to_string(),
        });
    }

    // The last stderr line is "ExceptionType: message"
    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| format!("import failed with {}", output.status));

    Ok(ModuleCheck {
        name: name.to_string(),
        available: false,
        detail,
    })
}

/// Executes a notebook with nbconvert and returns the exit code
///
/// The executed copy is written to `cache_dir/<stem>__executed.ipynb`. If the
/// run takes longer than `timeout` the child is killed and
/// GuardError::ExecutionTimeout is returned.
pub async fn execute_notebook(
    interpreter: &Interpreter,
    notebook: &Path,
    timeout: Duration,
    cache_dir: &Path,
) -> GuardResult<i32> {
    tokio::fs::create_dir_all(cache_dir).await?;

    let stem = notebook
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "notebook".to_string());
    let output_name = format!("{}__executed.ipynb", stem);

    debug!("Executing notebook {} (timeout={:?})", notebook.display(), timeout);

    let mut command = interpreter.command();
    command
        .args(["-m", "nbconvert", "--execute"])
        .arg("--ExecutePreprocessor.allow_errors=True")
        .args(["--to", "notebook", "--output"])
        .arg(&output_name)
        .arg("--output-dir")
        .arg(cache_dir)
        .arg(notebook)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(output) => output?,
        Err(_) => return Err(GuardError::ExecutionTimeout(timeout)),
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        debug!("nbconvert stdout for {}:\n{}", notebook.display(), stdout.trim_end());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        warn!("nbconvert stderr for {}:\n{}", notebook.display(), stderr.trim_end());
    }

    // No exit code means the process was killed by a signal
    Ok(output.status.code().unwrap_or(-1))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Writes a shell script standing in for python and returns an
    /// interpreter that runs it through `sh` (arguments start at $1)
    pub(crate) fn fake_python(dir: &Path, script: &str) -> Interpreter {
        let path: PathBuf = dir.join("fake_python.sh");
        std::fs::write(&path, script).unwrap();
        Interpreter {
            program: "sh".to_string(),
            args: vec![path.display().to_string()],
        }
    }

    // $1 = -c, $2 = snippet, $3 = module
    pub(crate) const PROBE_SCRIPT: &str = r#"
if [ "$1" = "-c" ]; then
  case "$3" in
    json|collections) exit 0 ;;
    *) echo "Traceback (most recent call last):" >&2
       echo "ModuleNotFoundError: No module named '$3'" >&2
       exit 1 ;;
  esac
fi
exit 0
"#;

    #[test]
    fn test_parse_interpreter_command() {
        let interpreter = Interpreter::parse("uv run python").unwrap();
        assert_eq!(interpreter.program, "uv");
        assert_eq!(interpreter.args, vec!["run", "python"]);
        assert!(Interpreter::parse("   ").is_none());
    }

    #[tokio::test]
    async fn test_check_modules() {
        let dir = tempfile::tempdir().unwrap();
        let python = fake_python(dir.path(), PROBE_SCRIPT);
        let modules = vec![
            "no_such_module".to_string(),
            "json".to_string(),
            "collections".to_string(),
        ];

        let results = check_modules(&python, &modules).await.unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["collections", "json", "no_such_module"]);
        assert!(results[0].available);
        assert_eq!(results[1].detail, "ok");
        assert!(!results[2].available);
        assert_eq!(
            results[2].detail,
            "ModuleNotFoundError: No module named 'no_such_module'"
        );
    }

    #[tokio::test]
    async fn test_execute_notebook_success() {
        let dir = tempfile::tempdir().unwrap();
        // Writes the file named after --output into --output-dir
        let python = fake_python(
            dir.path(),
            r#"
out=""; outdir=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output) out="$2"; shift ;;
    --output-dir) outdir="$2"; shift ;;
  esac
  shift
done
mkdir -p "$outdir"
echo '{"cells": []}' > "$outdir/$out"
echo ok
exit 0
"#,
        );
        let notebook = dir.path().join("run.ipynb");
        std::fs::write(&notebook, r#"{"cells": []}"#).unwrap();
        let cache = dir.path().join(CACHE_DIR);

        let rc = execute_notebook(&python, &notebook, Duration::from_secs(30), &cache)
            .await
            .unwrap();

        assert_eq!(rc, 0);
        assert!(cache.join("run__executed.ipynb").exists());
    }

    #[tokio::test]
    async fn test_execute_notebook_passes_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let python = fake_python(dir.path(), "echo fake-stdout\necho fake-stderr >&2\nexit 5\n");
        let notebook = dir.path().join("dummy.ipynb");
        let cache = dir.path().join(CACHE_DIR);

        let rc = execute_notebook(&python, &notebook, Duration::from_secs(30), &cache)
            .await
            .unwrap();
        assert_eq!(rc, 5);
    }

    #[tokio::test]
    async fn test_execute_notebook_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let python = fake_python(dir.path(), "sleep 5\n");
        let notebook = dir.path().join("slow.ipynb");
        let cache = dir.path().join(CACHE_DIR);

        let result = execute_notebook(&python, &notebook, Duration::from_millis(200), &cache).await;
        assert!(matches!(result, Err(GuardError::ExecutionTimeout(_))));
    }
}
