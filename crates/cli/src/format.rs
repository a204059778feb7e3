//! Output formatting for responses and errors.

use linkage_core::{IdentifyResponse, LinkageError};

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Pretty,
    Compact,
}

/// Format a successful response as JSON.
pub fn format_response(response: &IdentifyResponse, mode: OutputMode) -> String {
    let rendered = match mode {
        OutputMode::Pretty => serde_json::to_string_pretty(response),
        OutputMode::Compact => serde_json::to_string(response),
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\": \"failed to render response: {}\"}}", e))
}

/// Format an error as a JSON object with its message and code.
pub fn format_error(err: &LinkageError, mode: OutputMode) -> String {
    let value = serde_json::json!({
        "error": err.to_string(),
        "code": err.code(),
    });
    let rendered = match mode {
        OutputMode::Pretty => serde_json::to_string_pretty(&value),
        OutputMode::Compact => serde_json::to_string(&value),
    };
    rendered.unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err))
}
