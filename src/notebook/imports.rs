// src/notebook/imports.rs
// =============================================================================
// Reads a Jupyter notebook and finds which top-level modules it imports.
//
// Notebooks are JSON. We only care about code cells; their `source` is either
// one string or a list of lines, depending on the tool that wrote the file.
//
// How a cell is scanned:
// 1. Split it into logical lines the way Python does: brackets and trailing
//    backslashes join physical lines, comments go away, and the contents of
//    string literals (docstrings included) are blanked out
// 2. If the cell would not parse, skip it entirely. Exercise stubs
//    (`answer = ???`, a `def` with no body yet) and IPython magics
//    (`%timeit`, `!pip`) land here
// 3. Every import statement adds its top-level module:
//      import numpy as np, os.path   -> numpy, os
//      from collections import deque -> collections
//      try: import optional_mod      -> optional_mod
// Relative imports are ignored.
//
// The parse check is a cheap stand-in for a real Python parser: it catches
// unterminated strings, unbalanced brackets, characters Python never accepts,
// and broken indentation. Anything subtler still counts as valid.
//
// Rust concepts:
// - #[serde(untagged)]: `source` can be a string or a list of strings
// - Option + `?`: the scanner bails out with None on the first syntax error
// =============================================================================

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::{GuardError, GuardResult};

#[derive(Debug, Deserialize)]
pub struct Notebook {
    #[serde(default)]
    pub cells: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
pub struct Cell {
    pub cell_type: String,
    #[serde(default)]
    pub source: CellSource,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CellSource {
    Text(String),
    Lines(Vec<String>),
}

impl Default for CellSource {
    fn default() -> Self {
        CellSource::Text(String::new())
    }
}

impl CellSource {
    pub fn text(&self) -> String {
        match self {
            CellSource::Text(text) => text.clone(),
            CellSource::Lines(lines) => lines.concat(),
        }
    }
}

impl Notebook {
    pub fn load(path: &Path) -> GuardResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw).map_err(|source| GuardError::Notebook {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn code_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|cell| cell.cell_type == "code")
    }
}

/// Top-level module names imported anywhere in the notebook's code cells
///
/// Cells that are not valid Python are skipped.
pub fn collect_imports(notebook: &Notebook) -> BTreeSet<String> {
    let mut modules = BTreeSet::new();
    for cell in notebook.code_cells() {
        let source = cell.source.text();

        // Incomplete cells (exercise stubs, magics) contribute nothing
        let Some(lines) = logical_lines(&source) else {
            continue;
        };

        for line in &lines {
            // Strings are blanked out, so every ';' left separates statements
            for statement in line.code.split(';') {
                parse_import(block_body(statement.trim()), &mut modules);
            }
        }
    }
    modules
}

// One logical line of Python: comments removed, string literals replaced by ""
#[derive(Debug, PartialEq, Eq)]
struct LogicalLine {
    indent: usize,
    code: String,
}

// Keywords that open a block and may carry their body on the same line
const BLOCK_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "try", "except", "finally", "while", "for", "with", "def", "class",
    "async",
];

// Splits a cell into logical lines, or returns None if it would not parse
fn logical_lines(source: &str) -> Option<Vec<LogicalLine>> {
    let chars: Vec<char> = source.chars().collect();
    let mut lines = Vec::new();

    // Open brackets, innermost last
    let mut brackets: Vec<char> = Vec::new();
    let mut code = String::new();
    let mut indent = 0usize;
    let mut at_line_start = true;

    let mut i = 0;
    while i < chars.len() {
        if at_line_start {
            // Measure the indentation of a new logical line
            let mut width = 0;
            while i < chars.len() && (chars[i] == ' ' || chars[i] == '\t') {
                width = if chars[i] == '\t' { (width / 8 + 1) * 8 } else { width + 1 };
                i += 1;
            }
            // Blank and comment-only lines do not count
            match chars.get(i) {
                None => break,
                Some('\n') | Some('\r') => {
                    i += 1;
                    continue;
                }
                Some('#') => {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                    continue;
                }
                // IPython magics and shell escapes
                Some('%') | Some('!') => return None,
                Some(_) => {}
            }
            indent = width;
            at_line_start = false;
        }

        let c = chars[i];
        match c {
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '\\' => {
                // Explicit line joining; anything else after a backslash is an error
                match chars.get(i + 1) {
                    Some('\n') => i += 2,
                    Some('\r') if chars.get(i + 2) == Some(&'\n') => i += 3,
                    _ => return None,
                }
                code.push(' ');
                continue;
            }
            '\n' => {
                if brackets.is_empty() {
                    if !code.trim().is_empty() {
                        lines.push(LogicalLine {
                            indent,
                            code: std::mem::take(&mut code),
                        });
                    }
                    code.clear();
                    at_line_start = true;
                } else {
                    code.push(' ');
                }
            }
            '\'' | '"' => {
                i = skip_string(&chars, i)?;
                code.push_str("\"\"");
                continue;
            }
            '(' | '[' | '{' => {
                brackets.push(c);
                code.push(c);
            }
            ')' | ']' | '}' => {
                let open = brackets.pop()?;
                if !matches!((open, c), ('(', ')') | ('[', ']') | ('{', '}')) {
                    return None;
                }
                code.push(c);
            }
            // Not part of any Python token
            '?' | '$' | '`' => return None,
            '!' if chars.get(i + 1) != Some(&'=') => return None,
            _ => code.push(c),
        }
        i += 1;
    }

    if !brackets.is_empty() {
        return None;
    }
    if !code.trim().is_empty() {
        lines.push(LogicalLine { indent, code });
    }

    check_indentation(&lines).then_some(lines)
}

// Returns the index just past the string literal starting at `start`,
// or None if the literal is never closed
fn skip_string(chars: &[char], start: usize) -> Option<usize> {
    let quote = chars[start];
    let triple = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);

    let mut i = if triple { start + 3 } else { start + 1 };
    while i < chars.len() {
        match chars[i] {
            // A backslash protects the next character, raw strings included
            '\\' => i += 2,
            c if c == quote => {
                if !triple {
                    return Some(i + 1);
                }
                if chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote) {
                    return Some(i + 3);
                }
                i += 1;
            }
            // Only triple-quoted strings span lines
            '\n' if !triple => return None,
            _ => i += 1,
        }
    }
    None
}

// A block header must be followed by a deeper line, dedents must return to an
// enclosing level, and nothing else may indent
fn check_indentation(lines: &[LogicalLine]) -> bool {
    let mut levels = vec![0usize];
    let mut expect_block = false;

    for line in lines {
        let current = levels.last().copied().unwrap_or(0);
        if expect_block {
            if line.indent <= current {
                return false;
            }
            levels.push(line.indent);
        } else if line.indent > current {
            return false;
        } else {
            while levels.last().is_some_and(|&level| line.indent < level) {
                levels.pop();
            }
            if levels.last() != Some(&line.indent) {
                return false;
            }
        }
        expect_block = line.code.trim_end().ends_with(':');
    }

    // A header on the last line has no body yet
    !expect_block
}

// "try: import x" -> "import x"; other statements come back unchanged
fn block_body(statement: &str) -> &str {
    let keyword = statement
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .next()
        .unwrap_or_default();
    if !BLOCK_KEYWORDS.contains(&keyword) {
        return statement;
    }

    // The header ends at the first ':' outside brackets
    let mut depth = 0i32;
    for (index, c) in statement.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ':' if depth == 0 => return block_body(statement[index + 1..].trim()),
            _ => {}
        }
    }
    statement
}

// Adds the modules a single statement imports, if it is an import
fn parse_import(statement: &str, modules: &mut BTreeSet<String>) {
    if let Some(rest) = statement.strip_prefix("import ") {
        for name in rest.split(',') {
            // "numpy as np" -> "numpy"
            let name = name.split_whitespace().next().unwrap_or_default();
            add_top_level(name, modules);
        }
    } else if let Some(rest) = statement.strip_prefix("from ") {
        let mut words = rest.split_whitespace();
        let (Some(module), Some("import")) = (words.next(), words.next()) else {
            return;
        };
        add_top_level(module, modules);
    }
}

fn add_top_level(name: &str, modules: &mut BTreeSet<String>) {
    // Relative imports start with '.', which leaves an empty first segment
    let top = name.trim_matches(|c| c == '(' || c == ')').split('.').next().unwrap_or_default();
    if is_identifier(top) {
        modules.insert(top.to_string());
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
