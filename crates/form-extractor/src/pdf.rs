//! PDF extraction: descriptor lines in, canonical fields out.

use std::sync::Arc;
use std::time::Duration;

use crate::acroform::PdfFieldParser;
use crate::download::{Downloader, LocalDocument};
use crate::normalize::normalize;
use crate::reference::Location;
use crate::types::{ExtractError, ExtractResult, FormField};

/// Owns one local PDF for the duration of an extraction.
pub struct PdfFieldAdapter {
    reference: String,
    document: LocalDocument,
    parser: Arc<dyn PdfFieldParser>,
}

impl PdfFieldAdapter {
    pub fn new(reference: &str, document: LocalDocument, parser: Arc<dyn PdfFieldParser>) -> Self {
        Self {
            reference: reference.to_string(),
            document,
            parser,
        }
    }

    /// Make the referenced PDF available locally.
    ///
    /// Remote references are downloaded within `timeout`; a fetch cut short
    /// by the timeout drops its temp file before this returns.
    pub async fn acquire(
        reference: &str,
        downloader: &dyn Downloader,
        parser: Arc<dyn PdfFieldParser>,
        timeout: Duration,
    ) -> ExtractResult<Self> {
        let document = match Location::of(reference) {
            Location::Remote(url) => {
                match tokio::time::timeout(timeout, downloader.fetch(&url, timeout)).await {
                    Ok(Ok(document)) => document,
                    Ok(Err(e)) => {
                        return Err(ExtractError::acquisition(
                            reference,
                            format!("failed to download PDF: {e:#}"),
                        ))
                    }
                    Err(_) => {
                        return Err(ExtractError::acquisition(
                            reference,
                            format!("download timed out after {}ms", timeout.as_millis()),
                        ))
                    }
                }
            }
            Location::Local(path) => LocalDocument::open(&path).map_err(|e| {
                ExtractError::acquisition(reference, format!("failed to open {}: {e}", path.display()))
            })?,
        };

        Ok(Self::new(reference, document, parser))
    }

    /// Parse the held document and normalize every usable descriptor.
    pub async fn extract(&self) -> ExtractResult<Vec<FormField>> {
        let parser = Arc::clone(&self.parser);
        let path = self.document.path().to_path_buf();

        let descriptors = tokio::task::spawn_blocking(move || parser.field_descriptors(&path))
            .await
            .map_err(|e| ExtractError::extraction(&self.reference, format!("parser task failed: {e}")))?
            .map_err(|e| {
                ExtractError::structural(&self.reference, format!("error listing form fields: {e:#}"))
            })?;

        let fields = fields_from_descriptors(&descriptors);
        tracing::info!(
            "{}: {} of {} PDF descriptors yielded fields",
            self.reference,
            fields.len(),
            descriptors.len()
        );
        Ok(fields)
    }

    /// Close the file handle and remove a downloaded temp file.
    pub fn close(self) -> ExtractResult<()> {
        let temporary = self.document.is_temporary();
        self.document.close().map_err(|e| {
            let what = if temporary {
                "error removing temporary PDF file"
            } else {
                "error closing PDF file"
            };
            ExtractError::release(&self.reference, format!("{what}: {e}"))
        })
    }
}

/// Convert descriptors in order, skipping any with fewer than three tokens.
pub fn fields_from_descriptors<S: AsRef<str>>(descriptors: &[S]) -> Vec<FormField> {
    descriptors
        .iter()
        .filter_map(|d| field_from_descriptor(d.as_ref()))
        .collect()
}

/// Token 2 is the type; tokens 3.. are the raw name tail.
pub fn field_from_descriptor(descriptor: &str) -> Option<FormField> {
    let tokens: Vec<&str> = descriptor.split_whitespace().collect();
    if tokens.len() < 3 {
        tracing::debug!("skipping malformed PDF descriptor {descriptor:?}");
        return None;
    }

    let (name, label) = normalize(&tokens[3..].join(" "));
    let field = FormField::new(name, tokens[2], label);
    if !field.is_well_formed() {
        tracing::warn!("PDF descriptor {descriptor:?} normalized to an empty name");
    }

    Some(field)
}
