//! Template schema extraction.
//!
//! A template is a DOCX or ODT file whose text contains placeholders such
//! as `[nombre;type='text';length='80']`. Extraction flattens each text part
//! ([`tokenizer`]), parses every placeholder ([`descriptor`]) and groups the
//! results into a [`Schema`] of fields and repeater blocks ([`schema`]).

pub mod descriptor;
pub mod extract;
pub mod schema;
pub mod tokenizer;

pub use descriptor::{FieldDescriptor, FieldType, Token, parse_placeholder, split_segments};
pub use extract::{extract_schema, tokens_from_part};
pub use schema::{RepeaterBlock, SCHEMA_VERSION, Schema, SchemaBuilder, SchemaMeta};
