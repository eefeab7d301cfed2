//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural
//! principles of the output workspace:
//! - No blocking I/O inside async code
//! - No thread sleeps, and timed delays only through the delay schedulers
//!
//! The helpers here give the tests a rough, line-based view of the
//! production sources: which file a line is in and whether it runs in test,
//! async or plain synchronous code.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["conductor/core/src", "conductor/daemon/src"];

/// Workspace root (two levels above this package)
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// A loaded Rust source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the workspace root
    pub path: PathBuf,
    /// File lines
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Lines as string slices
    #[must_use]
    pub fn line_refs(&self) -> Vec<&str> {
        self.lines.iter().map(String::as_str).collect()
    }

    /// Whether the file is one of `paths` (workspace-relative)
    #[must_use]
    pub fn is_one_of(&self, paths: &[&str]) -> bool {
        paths.iter().any(|p| self.path == Path::new(p))
    }
}

/// All Rust files under the production directories
///
/// # Panics
///
/// Panics when a production directory is missing, so a moved crate cannot
/// silently disable the checks.
#[must_use]
pub fn production_sources() -> Vec<SourceFile> {
    let root = workspace_root();
    let mut files = Vec::new();

    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        assert!(path.exists(), "production directory missing: {}", path.display());

        for entry in walkdir::WalkDir::new(&path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
                continue;
            }
            let Ok(content) = fs::read_to_string(entry.path()) else {
                continue;
            };
            let relative = entry
                .path()
                .strip_prefix(&root)
                .unwrap_or(entry.path())
                .to_path_buf();
            files.push(SourceFile {
                path: relative,
                lines: content.lines().map(str::to_string).collect(),
            });
        }
    }
    files
}

/// Where a source line runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeContext {
    /// Inside a `#[cfg(test)]` module or a test function
    Test,
    /// Inside an async fn or an async block
    Async,
    /// Inside a plain function
    Sync,
    /// Outside any function (imports, items, docs)
    Item,
}

/// The code part of a line, without trailing `//` comments
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Signature kind of a function declaration line, if it is one
fn fn_declaration(line: &str) -> Option<bool> {
    let mut rest = line.trim_start();
    for prefix in ["pub(crate) ", "pub(super) ", "pub "] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
            break;
        }
    }
    if rest.starts_with("async fn ") {
        Some(true)
    } else if rest.starts_with("fn ") || rest.starts_with("const fn ") {
        Some(false)
    } else {
        None
    }
}

/// Classify the line at `current_idx`
#[must_use]
pub fn context_at(lines: &[&str], current_idx: usize) -> CodeContext {
    // unit test modules sit at the end of a file, unindented
    if lines[..current_idx]
        .iter()
        .any(|line| line.starts_with("#[cfg(test)]"))
    {
        return CodeContext::Test;
    }

    let mut async_block = false;
    for i in (0..=current_idx).rev() {
        let line = lines[i];
        if i < current_idx && (line.contains("async move {") || line.contains("async {")) {
            async_block = true;
        }

        let Some(is_async) = fn_declaration(line) else {
            continue;
        };

        let attributes = lines[..i]
            .iter()
            .rev()
            .take_while(|l| l.trim_start().starts_with("#["));
        for attribute in attributes {
            let attribute = attribute.trim_start();
            if attribute.starts_with("#[test]") || attribute.starts_with("#[tokio::test") {
                return CodeContext::Test;
            }
        }

        return if is_async || async_block {
            CodeContext::Async
        } else {
            CodeContext::Sync
        };
    }
    CodeContext::Item
}

/// A rule violation found in a source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Workspace-relative file
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// What is wrong
    pub reason: &'static str,
    /// Offending source text
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} - {}: {}",
            self.path.display(),
            self.line,
            self.reason,
            self.text.trim()
        )
    }
}

/// Report violations and fail the test when there are any
///
/// # Panics
///
/// Panics when `violations` is not empty.
pub fn assert_no_violations(rule: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n❌ {rule}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!(
        "\nFound {} violation(s) of '{rule}'.\nFix these before merging!",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_function_detected() {
        let code = vec![
            "pub async fn load() {",
            "    let contents = std::fs::read_to_string(\"file.txt\")?;",
            "}",
        ];
        assert_eq!(context_at(&code, 1), CodeContext::Async);
    }

    #[test]
    fn test_async_block_in_sync_function() {
        let code = vec![
            "pub(crate) fn emit_after(&self) {",
            "    runtime.spawn(async move {",
            "        tokio::time::sleep(delay).await;",
            "    });",
            "}",
        ];
        assert_eq!(context_at(&code, 2), CodeContext::Async);
        assert_eq!(context_at(&code, 1), CodeContext::Sync);
    }

    #[test]
    fn test_sync_function_detected() {
        let code = vec![
            "pub fn load_config() {",
            "    let contents = std::fs::read_to_string(\"config.toml\")?;",
            "}",
        ];
        assert_eq!(context_at(&code, 1), CodeContext::Sync);
    }

    #[test]
    fn test_test_code_detected() {
        let code = vec![
            "#[tokio::test(start_paused = true)]",
            "async fn test_timer() {",
            "    tokio::time::sleep(d).await;",
            "}",
        ];
        assert_eq!(context_at(&code, 2), CodeContext::Test);

        let code = vec!["#[cfg(test)]", "mod tests {", "    use std::fs;", "}"];
        assert_eq!(context_at(&code, 2), CodeContext::Test);
    }

    #[test]
    fn test_code_part_strips_comments() {
        assert_eq!(code_part("let a = 1; // std::fs::read"), "let a = 1; ");
    }
}
