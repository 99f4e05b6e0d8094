//! Output formatting utilities

use serde::Serialize;
use supplytrace_kernel::TrackerError;

/// Print a command result as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Tracker errors carry a stable code so scripts can branch on it.
pub fn error_body(err: &anyhow::Error) -> serde_json::Value {
    match err.downcast_ref::<TrackerError>() {
        Some(e) => serde_json::json!({
            "error": e.kind().code(),
            "message": e.to_string(),
            "retryable": e.is_retryable(),
        }),
        None => serde_json::json!({
            "error": "INTERNAL",
            "message": format!("{err:#}"),
            "retryable": false,
        }),
    }
}

/// Print an error on stderr
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{}", error_body(err));
}
