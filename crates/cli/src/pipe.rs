//! Pipe mode: one JSON request per input line.
//!
//! Every non-blank line is parsed as an `IdentifyRequest` and resolved
//! against the same session store, so later lines see earlier ones. Each
//! line produces exactly one output line, a response or an error object.
//! Lines starting with `#` are comments.

use std::io::{self, BufRead, Write};

use linkage_core::{IdentifyRequest, LinkageError};
use linkage_engine::IdentityService;
use tracing::debug;

use crate::format::{format_error, format_response, OutputMode};

/// Process every line of `input`, writing results to `out`.
///
/// Returns the process exit code: 0 if every line succeeded, 1 otherwise.
pub fn run_pipe<R, W>(service: &IdentityService, input: R, out: &mut W, mode: OutputMode) -> i32
where
    R: BufRead,
    W: Write,
{
    let mut exit_code = 0;

    for (number, line) in input.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("(error) failed to read input: {}", e);
                return 1;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let rendered = match handle_line(service, trimmed) {
            Ok(rendered) => format_response(&rendered, mode),
            Err(e) => {
                debug!(target: "linkage::cli", line = number + 1, error = %e, "Request failed");
                exit_code = 1;
                format_error(&e, mode)
            }
        };
        if let Err(e) = writeln!(out, "{}", rendered) {
            return broken_output(e);
        }
    }

    if let Err(e) = out.flush() {
        return broken_output(e);
    }
    exit_code
}

fn handle_line(
    service: &IdentityService,
    line: &str,
) -> Result<linkage_core::IdentifyResponse, LinkageError> {
    let request: IdentifyRequest = serde_json::from_str(line)
        .map_err(|e| LinkageError::invalid_request(format!("malformed JSON request: {}", e)))?;
    service.identify(&request)
}

fn broken_output(e: io::Error) -> i32 {
    eprintln!("(error) failed to write output: {}", e);
    1
}
