//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT sleep to wait for something.
//! Delays are part of the output model (overlay expiry, delayed stage
//! mirror and video data), but they go through the two schedulers that own
//! them: overlay timers and the conductor's delayed effects.
//!
//! **Exceptions**: Test code (paused-clock timer tests).

use architectural_enforcement::{
    assert_no_violations, code_part, context_at, production_sources, CodeContext, Violation,
};

/// Files allowed to schedule delays with `tokio::time::sleep`
const DELAY_SCHEDULERS: &[&str] = &["conductor/core/src/timers.rs", "conductor/core/src/conductor.rs"];

/// Test that production code never blocks a thread with sleep
#[test]
fn test_no_thread_sleep_in_production_code() {
    let mut violations = Vec::new();

    for file in production_sources() {
        let lines = file.line_refs();
        for (idx, line) in lines.iter().enumerate() {
            let code = code_part(line);
            if code.contains("thread::sleep") && context_at(&lines, idx) != CodeContext::Test {
                violations.push(Violation {
                    path: file.path.clone(),
                    line: idx + 1,
                    reason: "Thread sleep",
                    text: (*line).to_string(),
                });
            }
        }
    }

    assert_no_violations("No sleep, only wait on I/O", &violations);
}

/// Timed delays only come from the delay schedulers
#[test]
fn test_async_sleep_only_in_delay_schedulers() {
    let mut violations = Vec::new();

    for file in production_sources() {
        if file.is_one_of(DELAY_SCHEDULERS) {
            continue;
        }

        let lines = file.line_refs();
        for (idx, line) in lines.iter().enumerate() {
            let code = code_part(line);
            let sleeps = code.contains("time::sleep") || code.contains("sleep_until");
            if sleeps && context_at(&lines, idx) != CodeContext::Test {
                violations.push(Violation {
                    path: file.path.clone(),
                    line: idx + 1,
                    reason: "Ad-hoc delay, use OverlayTimers or the conductor's delayed effects",
                    text: (*line).to_string(),
                });
            }
        }
    }

    assert_no_violations("Delays go through the delay schedulers", &violations);
}

/// Scheduled delays never sit in a polling loop
#[test]
fn test_no_sleep_in_loops() {
    let mut violations = Vec::new();

    for file in production_sources() {
        let lines = file.line_refs();
        for (idx, line) in lines.iter().enumerate() {
            if !code_part(line).contains("sleep(") || context_at(&lines, idx) == CodeContext::Test {
                continue;
            }

            let in_loop = lines[idx.saturating_sub(5)..idx].iter().any(|l| {
                let code = code_part(l).trim_start();
                code.starts_with("loop {") || code.starts_with("while ")
            });
            if in_loop {
                violations.push(Violation {
                    path: file.path.clone(),
                    line: idx + 1,
                    reason: "Sleep in a polling loop",
                    text: (*line).to_string(),
                });
            }
        }
    }

    assert_no_violations("No polling loops", &violations);
}
