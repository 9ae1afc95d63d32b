//! HTTP-only page engine.
//!
//! Fetches the document with reqwest (or reads a `file://` URL) and answers
//! selector queries against the static markup with scraper. No script is
//! executed, so this only sees controls present in the served HTML.

use super::{BrowserDriver, BrowserSession, FormElement};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/131.0.0.0 Safari/537.36";

/// Driver whose sessions read static markup instead of rendering it.
#[derive(Clone)]
pub struct StaticHtmlDriver {
    client: reqwest::Client,
}

impl StaticHtmlDriver {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for StaticHtmlDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserDriver for StaticHtmlDriver {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        Ok(Box::new(StaticHtmlSession {
            client: self.client.clone(),
            markup: String::new(),
        }))
    }
}

/// A "tab" holding the markup of the last navigated document.
pub struct StaticHtmlSession {
    client: reqwest::Client,
    markup: String,
}

impl StaticHtmlSession {
    /// A session over markup that is already in memory.
    pub fn with_markup(markup: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            markup: markup.into(),
        }
    }
}

#[async_trait]
impl BrowserSession for StaticHtmlSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let parsed = url::Url::parse(url).with_context(|| format!("invalid URL: {url}"))?;

        self.markup = match parsed.scheme() {
            "http" | "https" => {
                let resp = self
                    .client
                    .get(parsed)
                    .timeout(timeout)
                    .send()
                    .await
                    .context("navigation failed")?;
                let status = resp.status();
                if !status.is_success() {
                    bail!("bad status: {status}");
                }
                resp.text().await.context("failed to read page body")?
            }
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|_| anyhow::anyhow!("not a local file URL: {url}"))?;
                tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?
            }
            "about" => String::new(),
            other => bail!("unsupported URL scheme for static fetch: {other}"),
        };

        Ok(())
    }

    async fn wait_load(&self, _timeout: Duration) -> Result<()> {
        // The whole body is already in hand once navigate returns
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn FormElement>>> {
        let elements = select_static(&self.markup, selector)?;
        Ok(elements
            .into_iter()
            .map(|e| Box::new(e) as Box<dyn FormElement>)
            .collect())
    }

    async fn query_one(&self, selector: &str) -> Result<Option<Box<dyn FormElement>>> {
        let first = select_static(&self.markup, selector)?.into_iter().next();
        Ok(first.map(|e| Box::new(e) as Box<dyn FormElement>))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Snapshot of an element taken while the parsed document was alive.
#[derive(Debug, Clone)]
struct StaticElement {
    tag: String,
    attributes: Vec<(String, String)>,
    text: String,
}

#[async_trait]
impl FormElement for StaticElement {
    async fn tag_name(&self) -> Result<String> {
        Ok(self.tag.clone())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone()))
    }

    async fn text(&self) -> Result<String> {
        Ok(self.text.clone())
    }
}

// `Html` is not Send, so parse and snapshot without crossing an await.
fn select_static(markup: &str, selector: &str) -> Result<Vec<StaticElement>> {
    let selector = Selector::parse(selector)
        .map_err(|e| anyhow::anyhow!("invalid selector {selector}: {e:?}"))?;
    let document = Html::parse_document(markup);

    Ok(document
        .select(&selector)
        .map(|el| StaticElement {
            tag: el.value().name().to_lowercase(),
            attributes: el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text: collapse_whitespace(&el.text().collect::<String>()),
        })
        .collect())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
