//! Reference dispatch and the acquire → extract → release cycle.

use std::sync::Arc;

use crate::acroform::{LopdfFieldParser, PdfFieldParser};
use crate::browser::{default_driver, BrowserDriver};
use crate::config::ExtractorConfig;
use crate::download::{Downloader, HttpDownloader};
use crate::html::HtmlFieldAdapter;
use crate::pdf::PdfFieldAdapter;
use crate::reference::{select_source, Location};
use crate::types::{ExtractError, ExtractResult, FormField, SourceKind};

/// An acquired source, ready to be read and then released.
pub enum FormExtractor {
    Pdf(PdfFieldAdapter),
    Html(HtmlFieldAdapter),
}

impl FormExtractor {
    pub fn kind(&self) -> SourceKind {
        match self {
            FormExtractor::Pdf(_) => SourceKind::Pdf,
            FormExtractor::Html(_) => SourceKind::Html,
        }
    }

    pub async fn extract(&self) -> ExtractResult<Vec<FormField>> {
        match self {
            FormExtractor::Pdf(adapter) => adapter.extract().await,
            FormExtractor::Html(adapter) => adapter.extract().await,
        }
    }

    /// Release the document handle or browser session.
    pub async fn close(self) -> ExtractResult<()> {
        match self {
            FormExtractor::Pdf(adapter) => adapter.close(),
            FormExtractor::Html(adapter) => adapter.close().await,
        }
    }
}

/// Entry point: picks an adapter for a reference and runs it.
///
/// Holds no per-extraction state, so one `Extractor` can serve concurrent
/// `dispatch` calls; each call owns its own document or browser session.
#[derive(Clone)]
pub struct Extractor {
    config: ExtractorConfig,
    downloader: Arc<dyn Downloader>,
    parser: Arc<dyn PdfFieldParser>,
    driver: Arc<dyn BrowserDriver>,
}

impl Extractor {
    /// Extractor with the reqwest downloader, lopdf parser and the best
    /// available browser driver.
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            downloader: Arc::new(HttpDownloader::new()),
            parser: Arc::new(LopdfFieldParser),
            driver: default_driver(),
        }
    }

    pub fn with_downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.downloader = downloader;
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn PdfFieldParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_driver(mut self, driver: Arc<dyn BrowserDriver>) -> Self {
        self.driver = driver;
        self
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Acquire the resources for `reference` without extracting yet.
    ///
    /// The caller must `close()` the returned extractor.
    pub async fn open(&self, reference: &str) -> ExtractResult<FormExtractor> {
        let kind = select_source(reference);
        tracing::info!("{reference}: dispatching to {kind:?} extractor");

        match kind {
            SourceKind::Pdf => {
                let adapter = PdfFieldAdapter::acquire(
                    reference,
                    self.downloader.as_ref(),
                    Arc::clone(&self.parser),
                    self.config.timeout,
                )
                .await?;
                Ok(FormExtractor::Pdf(adapter))
            }
            SourceKind::Html => {
                let url = Location::of(reference).to_url().map_err(|e| {
                    ExtractError::acquisition(reference, format!("cannot open local page: {e}"))
                })?;
                let adapter = HtmlFieldAdapter::acquire(
                    reference,
                    &url,
                    self.driver.as_ref(),
                    self.config.timeout,
                )
                .await?;
                Ok(FormExtractor::Html(adapter))
            }
        }
    }

    /// Acquire, extract and release, returning the fields in source order.
    ///
    /// The adapter is closed exactly once whether or not extraction
    /// succeeds. A failed release is logged and does not replace the
    /// extraction outcome.
    pub async fn dispatch(&self, reference: &str) -> ExtractResult<Vec<FormField>> {
        let extractor = self.open(reference).await?;
        let extracted = extractor.extract().await;

        if let Err(e) = extractor.close().await {
            tracing::warn!("{e}");
        }

        extracted
    }
}
