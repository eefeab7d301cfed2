//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async code in the output workspace MUST NOT use blocking I/O.
//! The conductor's state lock is taken from async tasks, so a blocked worker
//! thread stalls timers and delayed effects of every output.
//!
//! **Required**: `tokio::fs`, `tokio::io`, `tokio::net` inside async code.
//! Blocking calls are fine in plain functions (config loading) and tests.

use architectural_enforcement::{
    assert_no_violations, code_part, context_at, production_sources, CodeContext, Violation,
};

/// Blocking call patterns and what they are
const BLOCKING_CALLS: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O"),
    ("std::net::", "Blocking network I/O"),
    ("std::process::Command", "Blocking process I/O"),
    ("std::io::stdin()", "Blocking stdin in async"),
    ("std::io::stdout()", "Blocking stdout in async"),
    ("std::io::Read", "Blocking read trait in async"),
];

/// Test that async production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_async_code() {
    let mut violations = Vec::new();

    for file in production_sources() {
        let lines = file.line_refs();
        for (idx, line) in lines.iter().enumerate() {
            let code = code_part(line);
            let Some(&(_, reason)) = BLOCKING_CALLS
                .iter()
                .find(|(pattern, _)| code.contains(pattern))
            else {
                continue;
            };

            if context_at(&lines, idx) == CodeContext::Async {
                violations.push(Violation {
                    path: file.path.clone(),
                    line: idx + 1,
                    reason,
                    text: (*line).to_string(),
                });
            }
        }
    }

    assert_no_violations("All I/O in async code must be async", &violations);
}

/// Blocking imports make it too easy to call them from async code
#[test]
fn test_no_blocking_io_imports() {
    let mut violations = Vec::new();

    for file in production_sources() {
        let lines = file.line_refs();
        for (idx, line) in lines.iter().enumerate() {
            let code = code_part(line).trim_start();
            let blocking_import = code.starts_with("use std::fs")
                || code.starts_with("use std::net")
                || code.starts_with("use std::process");
            if blocking_import && context_at(&lines, idx) != CodeContext::Test {
                violations.push(Violation {
                    path: file.path.clone(),
                    line: idx + 1,
                    reason: "Blocking I/O import",
                    text: (*line).to_string(),
                });
            }
        }
    }

    assert_no_violations("Blocking I/O must be spelled out where it is used", &violations);
}
