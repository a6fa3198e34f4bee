//! Error types for docfill operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while extracting a schema or merging rich text.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "archive")]
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed XML: {0}")]
    MalformedXml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template not found: {}", .0.display())]
    TemplateMissing(PathBuf),

    #[error("Invalid template: {0}")]
    TemplateInvalid(String),

    #[error("Invalid merge values: {0}")]
    InvalidMergeValues(String),

    #[error("ZIP support is not available in this build")]
    ZipUnavailable,

    #[error("No readable content in {}", .0.display())]
    UnreadableContent(PathBuf),

    #[error("Cannot open archive {}: {reason}", .path.display())]
    ArchiveOpenFailed { path: PathBuf, reason: String },

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;
