//! Helpers behind the `form-extractor` binary: bounded retries and output.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use form_extractor::{ExtractResult, Extractor, FormField};

/// Base delay between attempts; attempt `n` waits `n` times this.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Run `dispatch` up to `max_attempts` times.
///
/// Only acquisition failures are retried. Each attempt acquires and
/// releases its own resources, so nothing leaks between tries.
pub async fn extract_with_retry(
    extractor: &Extractor,
    reference: &str,
    max_attempts: u32,
    backoff: Duration,
) -> ExtractResult<Vec<FormField>> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match extractor.dispatch(reference).await {
            Ok(fields) => return Ok(fields),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = backoff * attempt;
                tracing::warn!("attempt {attempt}/{max_attempts} failed: {e}; retrying in {delay:?}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Serialize fields as a JSON array, pretty-printed unless `compact`.
pub fn render_fields(fields: &[FormField], compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(fields)
    } else {
        serde_json::to_string_pretty(fields)
    };
    json.context("failed to serialize form fields")
}

/// Write rendered output to `path`, or stdout when `None`.
pub fn write_output(rendered: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, format!("{rendered}\n"))
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}
