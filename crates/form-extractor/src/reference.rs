//! Interpreting the input reference string.

use std::path::PathBuf;

use url::Url;

use crate::types::SourceKind;

/// Choose the extraction path from the reference alone.
///
/// Purely syntactic: a case-insensitive `.pdf` suffix means PDF, anything
/// else is treated as an HTML page. The content is never sniffed.
pub fn select_source(reference: &str) -> SourceKind {
    if reference.to_ascii_lowercase().ends_with(".pdf") {
        SourceKind::Pdf
    } else {
        SourceKind::Html
    }
}

/// Where the referenced document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Anything with a URL scheme other than `file`.
    Remote(String),
    /// A filesystem path, given directly or as a `file://` URL.
    Local(PathBuf),
}

impl Location {
    pub fn of(reference: &str) -> Self {
        match Url::parse(reference) {
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => Location::Local(path),
                Err(_) => Location::Remote(reference.to_string()),
            },
            // A one-letter "scheme" is a Windows drive letter
            Ok(url) if url.scheme().len() > 1 => Location::Remote(reference.to_string()),
            _ => Location::Local(PathBuf::from(reference)),
        }
    }

    /// A URL a browser can navigate to.
    pub fn to_url(&self) -> std::io::Result<String> {
        match self {
            Location::Remote(url) => Ok(url.clone()),
            Location::Local(path) => {
                let absolute = std::fs::canonicalize(path)?;
                Url::from_file_path(&absolute)
                    .map(String::from)
                    .map_err(|_| {
                        std::io::Error::other(format!(
                            "cannot express {} as a file URL",
                            absolute.display()
                        ))
                    })
            }
        }
    }
}
