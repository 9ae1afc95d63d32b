//! HTML extraction: live form controls in, canonical fields out.

use std::time::Duration;

use crate::browser::{BrowserDriver, BrowserSession};
use crate::label::resolve_field;
use crate::types::{ExtractError, ExtractResult, FormField};

/// The element kinds treated as form controls.
pub const FORM_CONTROL_SELECTOR: &str = "input, select, textarea";

/// Owns a browser session with the referenced page loaded.
pub struct HtmlFieldAdapter {
    reference: String,
    session: Box<dyn BrowserSession>,
    timeout: Duration,
}

impl std::fmt::Debug for HtmlFieldAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlFieldAdapter")
            .field("reference", &self.reference)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HtmlFieldAdapter {
    /// Launch a session, navigate to `url` and wait for the load.
    ///
    /// Each step is bounded by `timeout`. If navigation or the load wait
    /// fails, the session is closed before the error is returned.
    pub async fn acquire(
        reference: &str,
        url: &str,
        driver: &dyn BrowserDriver,
        timeout: Duration,
    ) -> ExtractResult<Self> {
        let mut session = match tokio::time::timeout(timeout, driver.launch()).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                return Err(ExtractError::acquisition(
                    reference,
                    format!("failed to launch browser: {e:#}"),
                ))
            }
            Err(_) => {
                return Err(ExtractError::acquisition(
                    reference,
                    format!("browser launch timed out after {}ms", timeout.as_millis()),
                ))
            }
        };

        if let Err(message) = load_page(session.as_mut(), url, timeout).await {
            if let Err(e) = session.close().await {
                tracing::warn!("{reference}: failed to close browser after load failure: {e:#}");
            }
            return Err(ExtractError::acquisition(reference, message));
        }

        Ok(Self {
            reference: reference.to_string(),
            session,
            timeout,
        })
    }

    /// Read every named control on the loaded page, in document order.
    pub async fn extract(&self) -> ExtractResult<Vec<FormField>> {
        match tokio::time::timeout(self.timeout, fields_from_page(self.session.as_ref())).await {
            Ok(Ok(fields)) => {
                tracing::info!("{}: found {} named form controls", self.reference, fields.len());
                Ok(fields)
            }
            Ok(Err(e)) => Err(ExtractError::structural(
                &self.reference,
                format!("failed to find form elements: {e:#}"),
            )),
            Err(_) => Err(ExtractError::acquisition(
                &self.reference,
                format!("reading form elements timed out after {}ms", self.timeout.as_millis()),
            )),
        }
    }

    /// Shut the browser session down.
    pub async fn close(self) -> ExtractResult<()> {
        self.session
            .close()
            .await
            .map_err(|e| ExtractError::release(&self.reference, format!("error closing browser: {e:#}")))
    }
}

async fn load_page(session: &mut dyn BrowserSession, url: &str, timeout: Duration) -> Result<(), String> {
    match tokio::time::timeout(timeout, session.navigate(url, timeout)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(format!("failed to navigate to URL: {e:#}")),
        Err(_) => return Err(format!("navigation timed out after {}ms", timeout.as_millis())),
    }

    match tokio::time::timeout(timeout, session.wait_load(timeout)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("timeout waiting for page to load: {e:#}")),
        Err(_) => Err(format!("timeout waiting for page to load after {}ms", timeout.as_millis())),
    }
}

/// Resolve all form controls of an already loaded page.
///
/// Controls without a `name` are skipped.
pub async fn fields_from_page(page: &dyn BrowserSession) -> anyhow::Result<Vec<FormField>> {
    let elements = page.query_all(FORM_CONTROL_SELECTOR).await?;

    let mut fields = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        match resolve_field(element.as_ref(), page).await {
            Some(field) => fields.push(field),
            None => tracing::debug!("skipping form control #{index} without a name"),
        }
    }
    Ok(fields)
}
