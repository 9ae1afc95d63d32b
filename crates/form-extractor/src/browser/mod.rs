//! Browser abstraction for loading HTML forms.
//!
//! Defines the `BrowserDriver`, `BrowserSession` and `FormElement` traits
//! that abstract over the page engine: Chromium via chromiumoxide, or a
//! static HTTP fetch parsed with scraper when no browser is installed.

pub mod chromium;
pub mod static_html;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

pub use chromium::{default_driver, find_chromium, ChromiumDriver};
pub use static_html::StaticHtmlDriver;

/// A page engine that can launch sessions.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Launch a browser with a single blank tab.
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// One launched browser and the tab it drives.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate the tab to a URL, failing if it takes longer than `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;
    /// Wait for the current document to finish loading.
    async fn wait_load(&self, timeout: Duration) -> Result<()>;
    /// All elements matching a CSS selector, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn FormElement>>>;
    /// The first element matching a CSS selector, if any.
    async fn query_one(&self, selector: &str) -> Result<Option<Box<dyn FormElement>>>;
    /// Close the tab and shut the browser down.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A handle to a single DOM element.
#[async_trait]
pub trait FormElement: Send + Sync {
    /// Lowercase tag name (`input`, `select`, ...).
    async fn tag_name(&self) -> Result<String>;
    /// Attribute value, `None` when the attribute is absent.
    async fn attribute(&self, name: &str) -> Result<Option<String>>;
    /// Rendered text content.
    async fn text(&self) -> Result<String>;
}
