//! # docfill
//!
//! Placeholder schema extraction and rich text merging for DOCX and ODT
//! templates.
//!
//! ## Features
//!
//! - Extract the fields of a template from placeholders such as
//!   `[nombre;type='text';length='80']`, including repeater blocks
//! - Validate and normalize submitted values against the field schema
//! - Convert HTML field values in a generated document into native runs,
//!   paragraphs, lists, tables and hyperlinks
//!
//! ## Quick Start
//!
//! ```no_run
//! use docfill::{MergeContext, extract_schema, merge_rich_text};
//!
//! let schema = extract_schema("contrato.docx").unwrap();
//! for field in &schema.fields {
//!     println!("{} ({})", field.title, field.field_type.as_str());
//! }
//!
//! let mut values = MergeContext::new();
//! values.insert("clausulas", "<ul><li>Primera</li><li>Segunda</li></ul>");
//! merge_rich_text("contrato-generado.docx", &values).unwrap();
//! ```
//!
//! ## Cargo features
//!
//! - `archive` (default): ZIP package support. Without it, extraction and
//!   merging return [`Error::ZipUnavailable`].
//! - `cli` (default): the `docfill` binary.

pub mod error;
pub mod fields;
pub mod html;
pub mod merge;
pub mod package;
pub mod template;
pub(crate) mod util;
pub mod xml;

pub use error::{Error, Result};
pub use fields::{FieldError, SubmissionErrors, ValidationError};
pub use merge::{MergeConfig, MergeContext, MergeReport, MergeValue, RichTextMerger, merge_rich_text};
pub use package::PackageKind;
pub use template::{FieldDescriptor, FieldType, RepeaterBlock, Schema, extract_schema};
