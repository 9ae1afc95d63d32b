//! Label, type, and required-flag resolution for HTML form controls.
//!
//! The label is the first non-empty of: the text of a `<label for=ID>`,
//! the `aria-label` attribute, the `placeholder` attribute, and finally the
//! control's `name`. Attribute read failures count as "absent", so
//! resolution itself never fails.

use crate::browser::{BrowserSession, FormElement};
use crate::types::{FormField, DEFAULT_FIELD_TYPE};

/// Build the canonical field for a control, or `None` when it has no name.
pub async fn resolve_field(element: &dyn FormElement, page: &dyn BrowserSession) -> Option<FormField> {
    let name = read_attribute(element, "name").await.filter(|n| !n.is_empty())?;

    let label = resolve_label(element, page, &name).await;
    let field_type = resolve_type(element).await;
    let required = is_required(element).await;

    Some(FormField::new(name, field_type, label).required(required))
}

/// Best-effort human label; falls back to `name`.
pub async fn resolve_label(element: &dyn FormElement, page: &dyn BrowserSession, name: &str) -> String {
    if let Some(id) = non_blank(read_attribute(element, "id").await) {
        if let Some(text) = associated_label_text(page, &id).await {
            return text;
        }
    }

    for attr in ["aria-label", "placeholder"] {
        if let Some(value) = non_blank(read_attribute(element, attr).await) {
            return value;
        }
    }

    name.to_string()
}

/// The `type` attribute, else the tag for `select`/`textarea`, else `text`.
pub async fn resolve_type(element: &dyn FormElement) -> String {
    if let Some(t) = non_blank(read_attribute(element, "type").await) {
        return t.to_lowercase();
    }

    match element.tag_name().await {
        Ok(tag) if tag == "select" || tag == "textarea" => tag,
        _ => DEFAULT_FIELD_TYPE.to_string(),
    }
}

/// Presence of `required` is the signal; its value is ignored.
pub async fn is_required(element: &dyn FormElement) -> bool {
    read_attribute(element, "required").await.is_some()
}

/// CSS selector for the label explicitly bound to `id`.
pub fn label_selector(id: &str) -> String {
    let escaped = id.replace('\\', "\\\\").replace('"', "\\\"");
    format!("label[for=\"{escaped}\"]")
}

async fn associated_label_text(page: &dyn BrowserSession, id: &str) -> Option<String> {
    let selector = label_selector(id);
    match page.query_one(&selector).await {
        Ok(Some(label)) => match label.text().await {
            Ok(text) => non_blank(Some(text)),
            Err(e) => {
                tracing::debug!("could not read text of {selector}: {e:#}");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::debug!("label lookup {selector} failed: {e:#}");
            None
        }
    }
}

async fn read_attribute(element: &dyn FormElement, name: &str) -> Option<String> {
    match element.attribute(name).await {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("could not read attribute {name}: {e:#}");
            None
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
