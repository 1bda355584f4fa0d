//! Plain-text reports returned to remote callers. Callers match on the
//! fixed labels (`Command:`, `Exit Code:`, `--- Output ---`, `--- Errors ---`).

use dotbridge_core::{CommandSpec, DotbridgeError, ExecutionResult};
use std::fmt::Write;

pub fn format_report(spec: &CommandSpec, result: &ExecutionResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Command: {}", spec.command_line());
    let _ = writeln!(out, "Exit Code: {}", result.exit_code);
    push_section(&mut out, "Output", &result.stdout);
    push_section(&mut out, "Errors", &result.stderr);
    out
}

/// Report for an invocation that did not produce an exit code
pub fn format_error(action: &str, spec: Option<&CommandSpec>, err: &DotbridgeError) -> String {
    let mut out = format!("Error {}: {}", action, err);

    if let DotbridgeError::TimedOut { stdout, stderr, .. } = err {
        out.push('\n');
        if let Some(spec) = spec {
            let _ = writeln!(out, "Command: {}", spec.command_line());
        }
        push_section(&mut out, "Output", stdout);
        push_section(&mut out, "Errors", stderr);
    }
    out
}

fn push_section(out: &mut String, label: &str, text: &str) {
    if !text.is_empty() {
        let _ = write!(out, "\n--- {} ---\n{}\n", label, text);
    }
}
