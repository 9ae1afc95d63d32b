//! Chromium-based browser driver using chromiumoxide.

use super::{BrowserDriver, BrowserSession, FormElement, StaticHtmlDriver};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Environment variable overriding the Chromium binary location.
pub const CHROMIUM_PATH_ENV: &str = "FORM_EXTRACTOR_CHROMIUM_PATH";

/// Executable names probed on `PATH`, in order of preference.
const PATH_NAMES: [&str; 4] = ["google-chrome", "chromium", "chromium-browser", "chrome"];

/// Locate a Chrome or Chromium executable.
///
/// `FORM_EXTRACTOR_CHROMIUM_PATH` wins when it names an existing file, then
/// `PATH`, then the platform's standard install locations.
pub fn find_chromium() -> Option<PathBuf> {
    let explicit = std::env::var_os(CHROMIUM_PATH_ENV).map(PathBuf::from);
    if let Some(path) = explicit.filter(|p| p.is_file()) {
        return Some(path);
    }

    PATH_NAMES
        .iter()
        .find_map(|bin| which::which(bin).ok())
        .or_else(|| {
            install_locations(dirs::home_dir())
                .into_iter()
                .find(|p| p.is_file())
        })
}

/// Well-known install paths for the current platform, system-wide first.
fn install_locations(home: Option<PathBuf>) -> Vec<PathBuf> {
    const MAC_APPS: [&str; 2] = [
        "Google Chrome.app/Contents/MacOS/Google Chrome",
        "Chromium.app/Contents/MacOS/Chromium",
    ];

    let mut paths = Vec::new();
    if cfg!(target_os = "macos") {
        paths.extend(MAC_APPS.iter().map(|app| PathBuf::from("/Applications").join(app)));
        if let Some(home) = home {
            paths.extend(MAC_APPS.iter().map(|app| home.join("Applications").join(app)));
        }
    } else if cfg!(target_os = "windows") {
        for root in ["C:\\Program Files", "C:\\Program Files (x86)"] {
            paths.push(PathBuf::from(root).join("Google\\Chrome\\Application\\chrome.exe"));
        }
        if let Some(home) = home {
            paths.push(home.join("AppData\\Local\\Google\\Chrome\\Application\\chrome.exe"));
        }
    } else {
        paths.push(PathBuf::from("/snap/bin/chromium"));
        paths.push(PathBuf::from("/opt/google/chrome/chrome"));
    }
    paths
}

/// Pick the Chromium driver when a binary is installed.
///
/// Without one, HTML pages are fetched over plain HTTP and read as static
/// markup, so forms built by client-side script will come back empty.
pub fn default_driver() -> Arc<dyn BrowserDriver> {
    match find_chromium() {
        Some(path) => {
            tracing::debug!("using Chromium at {}", path.display());
            Arc::new(ChromiumDriver::new(path))
        }
        None => {
            tracing::info!("Chromium not found, falling back to static HTML fetch");
            Arc::new(StaticHtmlDriver::new())
        }
    }
}

/// Launches a fresh headless Chromium for every session.
pub struct ChromiumDriver {
    executable: PathBuf,
}

impl ChromiumDriver {
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let config = BrowserConfig::builder()
            .chrome_executable(&self.executable)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Drive the CDP connection until the browser goes away
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler_task.abort();
                bail!("failed to create new page: {e}");
            }
        };

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler_task,
        }))
    }
}

/// A launched Chromium with its single page.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {}ms", timeout.as_millis()),
        }
    }

    async fn wait_load(&self, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => bail!("page load failed: {e}"),
            Err(_) => bail!("timed out after {}ms waiting for page load", timeout.as_millis()),
        }
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn FormElement>>> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .with_context(|| format!("element query failed: {selector}"))?;

        Ok(elements
            .into_iter()
            .map(|element| Box::new(ChromiumElement { element }) as Box<dyn FormElement>)
            .collect())
    }

    async fn query_one(&self, selector: &str) -> Result<Option<Box<dyn FormElement>>> {
        let mut all = self.query_all(selector).await?;
        if all.is_empty() {
            return Ok(None);
        }
        Ok(Some(all.swap_remove(0)))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromiumSession {
            mut browser,
            page,
            handler_task,
        } = *self;

        let _ = page.close().await;
        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            tracing::debug!("Chromium process wait failed: {e}");
        }
        handler_task.abort();

        closed.context("failed to close Chromium")?;
        Ok(())
    }
}

struct ChromiumElement {
    element: Element,
}

#[async_trait]
impl FormElement for ChromiumElement {
    async fn tag_name(&self) -> Result<String> {
        let returns = self
            .element
            .call_js_fn("function() { return this.tagName; }", false)
            .await
            .context("failed to read tag name")?;
        let tag = returns
            .result
            .value
            .and_then(|v| v.as_str().map(str::to_lowercase))
            .unwrap_or_default();
        Ok(tag)
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.element
            .attribute(name)
            .await
            .with_context(|| format!("failed to read attribute {name}"))
    }

    async fn text(&self) -> Result<String> {
        let text = self
            .element
            .inner_text()
            .await
            .context("failed to read element text")?;
        Ok(text.unwrap_or_default())
    }
}
