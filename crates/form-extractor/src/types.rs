//! Core data types for extracted form fields and extraction failures.

use serde::{Deserialize, Serialize};

/// Type tag used for HTML controls that carry no `type` attribute.
pub const DEFAULT_FIELD_TYPE: &str = "text";

/// A single form field, independent of the document format it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

impl FormField {
    /// Create a field with default `required` and `value`.
    pub fn new(
        name: impl Into<String>,
        field_type: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            label: label.into(),
            required: false,
            value: String::new(),
        }
    }

    /// Mark the field as mandatory.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// True when both `name` and `label` carry text.
    ///
    /// Fields failing this are still returned; an empty name or label is a
    /// data-quality signal for the caller, not an extraction failure.
    pub fn is_well_formed(&self) -> bool {
        !self.name.is_empty() && !self.label.is_empty()
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Which kind of source a reference resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Pdf,
    Html,
}

/// The stage of an extraction at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Acquire,
    Parse,
    Extract,
    Release,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Acquire => "acquire",
            Phase::Parse => "parse",
            Phase::Extract => "extract",
            Phase::Release => "release",
        };
        f.write_str(s)
    }
}

/// Errors surfaced by a single extraction.
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    /// Download, navigation, or page-load failure (including timeouts).
    #[error("Failed to acquire {reference}: {message}")]
    Acquisition { reference: String, message: String },

    /// The document or page yielded no interpretable field list.
    #[error("Failed to parse {reference}: {message}")]
    StructuralParse { reference: String, message: String },

    /// The adapter failed while walking an already acquired document.
    #[error("Failed to extract fields from {reference}: {message}")]
    Extraction { reference: String, message: String },

    /// The owned document handle or browser session could not be released.
    #[error("Failed to release resources for {reference}: {message}")]
    Release { reference: String, message: String },
}

impl ExtractError {
    pub fn acquisition(reference: &str, message: impl std::fmt::Display) -> Self {
        ExtractError::Acquisition {
            reference: reference.to_string(),
            message: message.to_string(),
        }
    }

    pub fn structural(reference: &str, message: impl std::fmt::Display) -> Self {
        ExtractError::StructuralParse {
            reference: reference.to_string(),
            message: message.to_string(),
        }
    }

    pub fn extraction(reference: &str, message: impl std::fmt::Display) -> Self {
        ExtractError::Extraction {
            reference: reference.to_string(),
            message: message.to_string(),
        }
    }

    pub fn release(reference: &str, message: impl std::fmt::Display) -> Self {
        ExtractError::Release {
            reference: reference.to_string(),
            message: message.to_string(),
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            ExtractError::Acquisition { .. } => Phase::Acquire,
            ExtractError::StructuralParse { .. } => Phase::Parse,
            ExtractError::Extraction { .. } => Phase::Extract,
            ExtractError::Release { .. } => Phase::Release,
        }
    }

    /// The reference the failing extraction was started for.
    pub fn reference(&self) -> &str {
        match self {
            ExtractError::Acquisition { reference, .. }
            | ExtractError::StructuralParse { reference, .. }
            | ExtractError::Extraction { reference, .. }
            | ExtractError::Release { reference, .. } => reference,
        }
    }

    /// Only acquisition failures can succeed on a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExtractError::Acquisition { .. })
    }
}

/// Convenience result type.
pub type ExtractResult<T> = Result<T, ExtractError>;
