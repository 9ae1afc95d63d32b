//! Pull a canonical field list out of PDF AcroForms and
//! HTML forms.

pub mod acroform;
pub mod browser;
pub mod config;
pub mod download;
pub mod extractor;
pub mod html;
pub mod label;
pub mod normalize;
pub mod pdf;
pub mod reference;
pub mod types;

pub use acroform::{LopdfFieldParser, PdfFieldParser};
pub use browser::{BrowserDriver, BrowserSession, ChromiumDriver, FormElement, StaticHtmlDriver};
pub use config::ExtractorConfig;
pub use download::{Downloader, HttpDownloader, LocalDocument};
pub use extractor::{Extractor, FormExtractor};
pub use normalize::normalize;
pub use reference::select_source;
pub use types::*;
