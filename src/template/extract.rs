//! Schema extraction from a template file.

use std::path::Path;

use super::descriptor::{Token, parse_placeholder};
use super::schema::{SCHEMA_VERSION, Schema, SchemaBuilder, SchemaMeta};
use super::tokenizer::{normalize_part, placeholder_chunks};
use crate::error::{Error, Result};
use crate::package::PackageKind;

/// Extract the field schema of a DOCX or ODT template.
///
/// # Errors
///
/// - [`Error::TemplateMissing`] if `path` is not an existing file
/// - [`Error::TemplateInvalid`] for an unsupported extension or a file that
///   is not a ZIP package
/// - [`Error::ZipUnavailable`] when built without the `archive` feature
/// - [`Error::UnreadableContent`] if none of the text parts can be read
pub fn extract_schema(path: impl AsRef<Path>) -> Result<Schema> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::TemplateMissing(path.to_path_buf()));
    }
    let kind = PackageKind::from_path(path).ok_or_else(|| {
        Error::TemplateInvalid(format!(
            "unsupported template extension: {}",
            path.display()
        ))
    })?;
    if cfg!(not(feature = "archive")) {
        return Err(Error::ZipUnavailable);
    }

    let bytes = std::fs::read(path)?;
    let parts = read_text_parts(path, &bytes, kind)?;
    if parts.is_empty() {
        return Err(Error::UnreadableContent(path.to_path_buf()));
    }

    let mut builder = SchemaBuilder::new();
    for (name, xml) in &parts {
        let tokens = tokens_from_part(xml, kind);
        log::debug!("{name}: {} placeholder(s)", tokens.len());
        for token in tokens {
            builder.push(token);
        }
    }

    let mut schema = builder.finish();
    schema.meta = Some(SchemaMeta {
        version: SCHEMA_VERSION,
        template_kind: kind,
        template_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        hash: content_hash(&bytes),
    });

    log::info!(
        "extracted {} field(s) and {} repeater(s) from {}",
        schema.fields.len(),
        schema.repeaters.len(),
        path.display()
    );
    Ok(schema)
}

/// Placeholder tokens of one XML part, in document order.
pub fn tokens_from_part(xml: &str, kind: PackageKind) -> Vec<Token> {
    let text = normalize_part(xml, kind);
    placeholder_chunks(&text)
        .into_iter()
        .filter_map(parse_placeholder)
        .collect()
}

#[cfg(feature = "archive")]
fn read_text_parts(path: &Path, bytes: &[u8], kind: PackageKind) -> Result<Vec<(String, String)>> {
    use std::io::Cursor;

    use crate::package::Package;

    let mut package = Package::from_reader(Cursor::new(bytes))
        .map_err(|e| Error::TemplateInvalid(format!("{}: {e}", path.display())))?;

    let mut parts = Vec::new();
    for name in kind.text_parts(package.names()) {
        match package.read_text_part(&name) {
            Ok(Some(xml)) if !xml.trim().is_empty() => parts.push((name, xml)),
            Ok(_) => {}
            Err(e) => log::warn!("skipping unreadable part {name}: {e}"),
        }
    }
    Ok(parts)
}

#[cfg(not(feature = "archive"))]
fn read_text_parts(
    _path: &Path,
    _bytes: &[u8],
    _kind: PackageKind,
) -> Result<Vec<(String, String)>> {
    Err(Error::ZipUnavailable)
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = sha1_smol::Sha1::new();
    hasher.update(bytes);
    hasher.digest().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_from_docx_part() {
        let xml = concat!(
            r#"<w:document><w:body><w:p><w:r><w:t>Sr. [nom</w:t></w:r><w:r><w:t>bre]</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t>[onshow.fecha] [importe;type=number]</w:t></w:r></w:p></w:body></w:document>"#,
        );
        let tokens = tokens_from_part(xml, PackageKind::Docx);
        assert_eq!(tokens.len(), 2);
        assert!(matches!(&tokens[0], Token::Field(f) if f.slug == "nombre"));
    }

    #[test]
    fn test_missing_template() {
        let err = extract_schema("/definitely/not/here.docx").unwrap_err();
        assert!(matches!(err, Error::TemplateMissing(_)));
    }
}
