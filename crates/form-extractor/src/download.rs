//! Fetching remote PDFs to local storage.
//!
//! A download lands in a `form-*.pdf` temp file that lives exactly as long
//! as the `LocalDocument` holding it: explicit `close()` removes it and
//! reports failures, dropping it (e.g. when a timeout cancels the fetch)
//! removes it silently.

use std::fs::File;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tempfile::TempPath;

/// Something that can materialize a URL as a local file.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<LocalDocument>;
}

/// An open handle on a PDF available on the local filesystem.
#[derive(Debug)]
pub struct LocalDocument {
    file: File,
    path: PathBuf,
    temp: Option<TempPath>,
}

impl LocalDocument {
    /// Take ownership of a temp file; it is deleted on release.
    pub fn temporary(temp: tempfile::NamedTempFile) -> Self {
        let (file, temp) = temp.into_parts();
        let path = temp.to_path_buf();
        Self {
            file,
            path,
            temp: Some(temp),
        }
    }

    /// Open an existing file; it is left in place on release.
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        Ok(Self {
            file,
            path,
            temp: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }

    /// Close the handle and remove any temp backing file.
    pub fn close(self) -> std::io::Result<()> {
        drop(self.file);
        match self.temp {
            Some(temp) => temp.close(),
            None => Ok(()),
        }
    }
}

/// Downloader backed by reqwest.
#[derive(Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    /// Create a downloader with a standard Chrome user-agent.
    pub fn new() -> Self {
        let ua = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                  AppleWebKit/537.36 (KHTML, like Gecko) \
                  Chrome/131.0.0.0 Safari/537.36";

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(ua)
            .build()
            .unwrap_or_default();

        Self { client }
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<LocalDocument> {
        let mut resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .context("error downloading file")?;

        // Any non-2xx is an acquisition failure, same as an I/O error
        let status = resp.status();
        if !status.is_success() {
            bail!("bad status: {status}");
        }

        let mut temp = tempfile::Builder::new()
            .prefix("form-")
            .suffix(".pdf")
            .tempfile()
            .context("error creating temp file")?;

        let mut written = 0usize;
        while let Some(chunk) = resp.chunk().await.context("error downloading file")? {
            temp.write_all(&chunk).context("error saving file")?;
            written += chunk.len();
        }
        temp.flush().context("error saving file")?;
        temp.rewind().context("error seeking file")?;

        tracing::debug!(
            "downloaded {written} bytes from {url} to {}",
            temp.path().display()
        );

        Ok(LocalDocument::temporary(temp))
    }
}
