//! Dispatch and resource-lifecycle tests with in-memory collaborators.
//!
//! Covers path selection, timeout handling, and the guarantee that every
//! acquired document or browser session is released exactly once.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use form_extractor::browser::static_html::StaticHtmlSession;
use form_extractor::{
    BrowserDriver, BrowserSession, Downloader, ExtractError, Extractor, ExtractorConfig,
    FormElement, LocalDocument, Phase, PdfFieldParser, SourceKind,
};

// ─────────────────────── helpers ───────────────────────

/// Downloader that writes an empty temp file, optionally after a delay.
#[derive(Default)]
struct FakeDownloader {
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_path: Mutex<Option<PathBuf>>,
}

impl FakeDownloader {
    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    fn last_path(&self) -> PathBuf {
        self.last_path.lock().unwrap().clone().expect("fetch never called")
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn fetch(&self, _url: &str, _timeout: Duration) -> Result<LocalDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let temp = tempfile::Builder::new()
            .prefix("form-")
            .suffix(".pdf")
            .tempfile()?;
        *self.last_path.lock().unwrap() = Some(temp.path().to_path_buf());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(LocalDocument::temporary(temp))
    }
}

/// Parser returning canned descriptors, or failing like a corrupt PDF.
struct FakeParser {
    descriptors: Option<Vec<String>>,
}

impl FakeParser {
    fn with(descriptors: &[&str]) -> Self {
        Self {
            descriptors: Some(descriptors.iter().map(|d| d.to_string()).collect()),
        }
    }

    fn failing() -> Self {
        Self { descriptors: None }
    }
}

impl PdfFieldParser for FakeParser {
    fn field_descriptors(&self, _path: &std::path::Path) -> Result<Vec<String>> {
        match &self.descriptors {
            Some(d) => Ok(d.clone()),
            None => bail!("no form fields found"),
        }
    }
}

/// Driver whose sessions serve fixed markup and count their closes.
#[derive(Clone, Default)]
struct FakeDriver {
    markup: String,
    nav_delay: Option<Duration>,
    fail_queries: bool,
    fail_close: bool,
    launches: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl FakeDriver {
    fn serving(markup: &str) -> Self {
        Self {
            markup: markup.to_string(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            page: StaticHtmlSession::with_markup(self.markup.clone()),
            nav_delay: self.nav_delay,
            fail_queries: self.fail_queries,
            fail_close: self.fail_close,
            closes: Arc::clone(&self.closes),
        }))
    }
}

struct FakeSession {
    page: StaticHtmlSession,
    nav_delay: Option<Duration>,
    fail_queries: bool,
    fail_close: bool,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, _url: &str, _timeout: Duration) -> Result<()> {
        // Ignores the timeout; the adapter bounds it
        if let Some(delay) = self.nav_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn wait_load(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn FormElement>>> {
        if self.fail_queries {
            bail!("DOM detached");
        }
        self.page.query_all(selector).await
    }

    async fn query_one(&self, selector: &str) -> Result<Option<Box<dyn FormElement>>> {
        self.page.query_one(selector).await
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            bail!("browser process already gone");
        }
        Ok(())
    }
}

fn extractor(
    timeout: Duration,
    downloader: Arc<FakeDownloader>,
    parser: FakeParser,
    driver: FakeDriver,
) -> Extractor {
    Extractor::new(ExtractorConfig::default().with_timeout(timeout))
        .with_downloader(downloader)
        .with_parser(Arc::new(parser))
        .with_driver(Arc::new(driver))
}

const SIGNUP_FORM: &str = r#"
    <form>
      <label for="email">Email</label>
      <input id="email" name="email" type="email" required>
      <input name="nick" placeholder="Nickname">
    </form>"#;

// ═══════════════════════════════════════════════════════
// PATH SELECTION
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_mixed_case_pdf_extension_takes_pdf_path() {
    let downloader = Arc::new(FakeDownloader::default());
    let driver = FakeDriver::serving(SIGNUP_FORM);
    let ex = extractor(
        Duration::from_secs(5),
        Arc::clone(&downloader),
        FakeParser::with(&["1 [1] text 10 Owner Name", "2 [1] checkbox 11 Agree_2"]),
        driver.clone(),
    );

    let fields = ex.dispatch("https://x/y/form.PDF").await.unwrap();

    assert_eq!(downloader.calls.load(Ordering::SeqCst), 1);
    assert_eq!(driver.launches.load(Ordering::SeqCst), 0);
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name, "Owner Name");
    assert_eq!(fields[1].name, "Agree_2");
    assert_eq!(fields[1].label, "Agree (2)");
    assert_eq!(fields[1].field_type, "checkbox");

    // Downloaded temp file is gone once dispatch returns
    assert!(!downloader.last_path().exists());
}

#[tokio::test]
async fn test_extensionless_reference_takes_html_path() {
    let downloader = Arc::new(FakeDownloader::default());
    let driver = FakeDriver::serving(SIGNUP_FORM);
    let ex = extractor(
        Duration::from_secs(5),
        Arc::clone(&downloader),
        FakeParser::with(&[]),
        driver.clone(),
    );

    let fields = ex.dispatch("https://x/y/apply").await.unwrap();

    assert_eq!(downloader.calls.load(Ordering::SeqCst), 0);
    assert_eq!(driver.launches.load(Ordering::SeqCst), 1);
    assert_eq!(driver.closes.load(Ordering::SeqCst), 1);

    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name, "email");
    assert_eq!(fields[0].label, "Email");
    assert_eq!(fields[0].field_type, "email");
    assert!(fields[0].required);
    assert_eq!(fields[1].label, "Nickname");
    assert_eq!(fields[1].field_type, "text");
}

#[tokio::test]
async fn test_open_reports_kind() {
    let ex = extractor(
        Duration::from_secs(5),
        Arc::new(FakeDownloader::default()),
        FakeParser::with(&[]),
        FakeDriver::serving(""),
    );

    let pdf = ex.open("https://x/a.pdf").await.ok().unwrap();
    assert_eq!(pdf.kind(), SourceKind::Pdf);
    pdf.close().await.unwrap();

    let html = ex.open("https://x/a").await.ok().unwrap();
    assert_eq!(html.kind(), SourceKind::Html);
    html.close().await.unwrap();
}

// ═══════════════════════════════════════════════════════
// TIMEOUTS AND RELEASE
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_slow_download_times_out_and_removes_temp_file() {
    let downloader = Arc::new(FakeDownloader::slow(Duration::from_secs(30)));
    let ex = extractor(
        Duration::from_millis(100),
        Arc::clone(&downloader),
        FakeParser::with(&["1 [1] text 10 Name"]),
        FakeDriver::default(),
    );

    let err = ex.dispatch("https://x/slow.pdf").await.unwrap_err();

    assert!(matches!(err, ExtractError::Acquisition { .. }));
    assert_eq!(err.phase(), Phase::Acquire);
    assert!(err.is_retryable());
    assert_eq!(err.reference(), "https://x/slow.pdf");
    assert!(!downloader.last_path().exists());
}

#[tokio::test]
async fn test_slow_navigation_times_out_and_closes_session() {
    let driver = FakeDriver {
        nav_delay: Some(Duration::from_secs(30)),
        ..FakeDriver::serving(SIGNUP_FORM)
    };
    let ex = extractor(
        Duration::from_millis(100),
        Arc::new(FakeDownloader::default()),
        FakeParser::with(&[]),
        driver.clone(),
    );

    let err = ex.dispatch("https://x/slow-page").await.unwrap_err();

    assert_eq!(err.phase(), Phase::Acquire);
    assert!(err.to_string().contains("timed out"));
    assert_eq!(driver.launches.load(Ordering::SeqCst), 1);
    assert_eq!(driver.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pdf_parse_failure_still_releases() {
    let downloader = Arc::new(FakeDownloader::default());
    let ex = extractor(
        Duration::from_secs(5),
        Arc::clone(&downloader),
        FakeParser::failing(),
        FakeDriver::default(),
    );

    let err = ex.dispatch("https://x/broken.pdf").await.unwrap_err();

    assert!(matches!(err, ExtractError::StructuralParse { .. }));
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("no form fields found"));
    assert!(!downloader.last_path().exists());
}

#[tokio::test]
async fn test_dom_failure_still_closes_once() {
    let driver = FakeDriver {
        fail_queries: true,
        ..FakeDriver::serving(SIGNUP_FORM)
    };
    let ex = extractor(
        Duration::from_secs(5),
        Arc::new(FakeDownloader::default()),
        FakeParser::with(&[]),
        driver.clone(),
    );

    let err = ex.dispatch("https://x/form").await.unwrap_err();

    assert_eq!(err.phase(), Phase::Parse);
    assert_eq!(driver.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_release_failure_does_not_mask_fields() {
    let driver = FakeDriver {
        fail_close: true,
        ..FakeDriver::serving(SIGNUP_FORM)
    };
    let ex = extractor(
        Duration::from_secs(5),
        Arc::new(FakeDownloader::default()),
        FakeParser::with(&[]),
        driver.clone(),
    );

    let fields = ex.dispatch("https://x/form").await.unwrap();

    assert_eq!(fields.len(), 2);
    assert_eq!(driver.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_close_surfaces_release_error() {
    let driver = FakeDriver {
        fail_close: true,
        ..FakeDriver::serving(SIGNUP_FORM)
    };
    let ex = extractor(
        Duration::from_secs(5),
        Arc::new(FakeDownloader::default()),
        FakeParser::with(&[]),
        driver.clone(),
    );

    let opened = ex.open("https://x/form").await.ok().unwrap();
    let err = opened.close().await.unwrap_err();

    assert!(matches!(err, ExtractError::Release { .. }));
    assert_eq!(err.phase(), Phase::Release);
    assert!(!err.is_retryable());
    assert_eq!(err.reference(), "https://x/form");
    assert!(err.to_string().contains("browser process already gone"));
    assert_eq!(driver.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_local_pdf_is_acquisition_error() {
    let ex = extractor(
        Duration::from_secs(5),
        Arc::new(FakeDownloader::default()),
        FakeParser::with(&[]),
        FakeDriver::default(),
    );

    let err = ex.dispatch("/no/such/dir/form.pdf").await.unwrap_err();
    assert_eq!(err.phase(), Phase::Acquire);
}

// ═══════════════════════════════════════════════════════
// ITEM-LEVEL ANOMALIES
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_malformed_descriptors_do_not_abort_batch() {
    let ex = extractor(
        Duration::from_secs(5),
        Arc::new(FakeDownloader::default()),
        FakeParser::with(&["1 [1] text 10 First", "junk", "", "3 [1] text 12 Third"]),
        FakeDriver::default(),
    );

    let fields = ex.dispatch("https://x/f.pdf").await.unwrap();
    let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["First", "Third"]);
}

// ═══════════════════════════════════════════════════════
// CONCURRENCY
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_concurrent_dispatches_own_their_resources() {
    let downloader = Arc::new(FakeDownloader::default());
    let driver = FakeDriver::serving(SIGNUP_FORM);
    let ex = extractor(
        Duration::from_secs(5),
        Arc::clone(&downloader),
        FakeParser::with(&["1 [1] text 10 Name"]),
        driver.clone(),
    );

    let (a, b, c) = tokio::join!(
        ex.dispatch("https://x/one.pdf"),
        ex.dispatch("https://x/page"),
        ex.dispatch("https://x/other-page"),
    );

    assert_eq!(a.unwrap().len(), 1);
    assert_eq!(b.unwrap().len(), 2);
    assert_eq!(c.unwrap().len(), 2);
    assert_eq!(driver.launches.load(Ordering::SeqCst), 2);
    assert_eq!(driver.closes.load(Ordering::SeqCst), 2);
}
