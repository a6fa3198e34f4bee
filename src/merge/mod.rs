//! Rich text merge engine.
//!
//! After a document has been generated by literal substitution, HTML field
//! values sit in its text as escaped markup. [`RichTextMerger`] finds those
//! values and replaces them with the package's native formatting: runs,
//! paragraphs, tables and hyperlinks for DOCX, spans, paragraphs and
//! automatic styles for ODT.
//!
//! ```no_run
//! use docfill::merge::{MergeContext, merge_rich_text};
//!
//! let mut context = MergeContext::new();
//! context.insert("cuerpo", "<p>Hola <strong>mundo</strong></p>");
//! let report = merge_rich_text("salida.docx", &context).unwrap();
//! println!("{} fragment(s) converted", report.fragments_converted);
//! ```

mod context;
mod docx;
mod layout;
mod lookup;
mod odt;
mod relationships;
mod styles;

use std::path::Path;

use serde::Serialize;

pub use context::{MergeContext, MergeValue};
pub use layout::{Block, Inline, Layout, ListMarkers, RunFormat, layout};
pub use lookup::{RichLookup, Segment};
pub use relationships::RelationshipRegistry;
pub use styles::{StyleFlags, StyleRegistry};

use crate::error::{Error, Result};
use crate::xml::{NodeId, XmlDocument};

/// Configuration for rich text conversion.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Join tags that the word processor split across runs before
    /// matching, and convert recognised markup even without a lookup
    /// entry. Off by default.
    pub recover_split_markup: bool,
    /// Prefix repeated once per nesting level of a list.
    pub list_indent: String,
    /// Marker for unordered list items.
    pub bullet: String,
    /// Prefix of the ODT automatic style names.
    pub style_prefix: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            recover_split_markup: false,
            list_indent: "    ".to_string(),
            bullet: "• ".to_string(),
            style_prefix: "Rich".to_string(),
        }
    }
}

impl MergeConfig {
    pub fn markers(&self) -> ListMarkers<'_> {
        ListMarkers {
            indent: &self.list_indent,
            bullet: &self.bullet,
        }
    }
}

/// What one merge call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub parts_scanned: usize,
    pub parts_rewritten: usize,
    pub fragments_converted: usize,
    pub relationships_added: usize,
}

/// A converted part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedPart {
    pub xml: String,
    pub fragments: usize,
}

/// Converts HTML field values inside generated packages.
#[derive(Debug, Clone, Default)]
pub struct RichTextMerger {
    config: MergeConfig,
}

impl RichTextMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: MergeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Convert one `word/*.xml` part.
    ///
    /// Returns `None` when nothing matched, in which case the part must be
    /// left as it is. Hyperlinks are registered in `rels`.
    pub fn convert_docx_part(
        &self,
        xml: &str,
        lookup: &RichLookup,
        rels: &mut RelationshipRegistry,
    ) -> Result<Option<ConvertedPart>> {
        if lookup.is_empty() {
            return Ok(None);
        }
        let mut doc = XmlDocument::parse(xml)?;
        let fragments = docx::convert_docx(&mut doc, lookup, rels, &self.config);
        Ok((fragments > 0).then(|| ConvertedPart {
            xml: doc.to_xml(),
            fragments,
        }))
    }

    /// Convert `content.xml` or `styles.xml` of an ODT package.
    pub fn convert_odt_part(&self, xml: &str, lookup: &RichLookup) -> Result<Option<ConvertedPart>> {
        if lookup.is_empty() {
            return Ok(None);
        }
        let mut doc = XmlDocument::parse(xml)?;
        let fragments = odt::convert_odt(&mut doc, lookup, &self.config);
        Ok((fragments > 0).then(|| ConvertedPart {
            xml: doc.to_xml(),
            fragments,
        }))
    }

    /// Convert every text part of the package at `path`, in place.
    ///
    /// The package is rewritten only if a part changed; the new archive
    /// replaces the old one in a single rename.
    ///
    /// # Errors
    ///
    /// - [`Error::ZipUnavailable`] when built without the `archive` feature
    /// - [`Error::ArchiveOpenFailed`] if `path` is not a readable DOCX or
    ///   ODT package
    pub fn merge(&self, path: impl AsRef<Path>, context: &MergeContext) -> Result<MergeReport> {
        let path = path.as_ref();
        if cfg!(not(feature = "archive")) {
            return Err(Error::ZipUnavailable);
        }
        self.merge_package(path, context)
    }

    #[cfg(feature = "archive")]
    fn merge_package(&self, path: &Path, context: &MergeContext) -> Result<MergeReport> {
        use std::collections::BTreeMap;

        use crate::package::{Package, PackageKind, relationships_path};

        let open_failed = |reason: String| Error::ArchiveOpenFailed {
            path: path.to_path_buf(),
            reason,
        };
        let mut package = Package::open(path).map_err(|e| open_failed(e.to_string()))?;
        let kind = package
            .kind()
            .ok_or_else(|| open_failed("not a DOCX or ODT package".into()))?;

        let lookup = RichLookup::from_context(context);
        if lookup.is_empty() {
            log::debug!("no HTML values to convert in {}", path.display());
            return Ok(MergeReport::default());
        }

        let mut report = MergeReport::default();
        let mut replacements = BTreeMap::new();

        for part in package.text_parts() {
            let xml = match package.read_text_part(&part) {
                Ok(Some(xml)) => xml,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("skipping unreadable part {part}: {e}");
                    continue;
                }
            };
            report.parts_scanned += 1;

            let converted = match kind {
                PackageKind::Docx => {
                    let rels_path = relationships_path(&part);
                    let mut rels = match package.read_text_part(&rels_path) {
                        Ok(Some(existing)) => match RelationshipRegistry::parse(&existing) {
                            Ok(rels) => rels,
                            Err(e) => {
                                log::warn!("skipping {part}: cannot parse {rels_path}: {e}");
                                continue;
                            }
                        },
                        _ => RelationshipRegistry::new(),
                    };
                    let converted = self.convert_docx_part(&xml, &lookup, &mut rels);
                    if converted.as_ref().is_ok_and(Option::is_some) && rels.is_dirty() {
                        report.relationships_added += rels.added();
                        replacements.insert(rels_path, rels.to_xml().into_bytes());
                    }
                    converted
                }
                PackageKind::Odt => self.convert_odt_part(&xml, &lookup),
            };

            match converted {
                Ok(Some(done)) => {
                    log::debug!("{part}: {} fragment(s) converted", done.fragments);
                    report.parts_rewritten += 1;
                    report.fragments_converted += done.fragments;
                    replacements.insert(part, done.xml.into_bytes());
                }
                Ok(None) => log::debug!("{part}: unchanged"),
                Err(e) => log::warn!("skipping {part}: {e}"),
            }
        }

        package.commit(path, replacements)?;
        log::info!(
            "{}: {} of {} part(s) rewritten, {} fragment(s) converted",
            path.display(),
            report.parts_rewritten,
            report.parts_scanned,
            report.fragments_converted
        );
        Ok(report)
    }

    #[cfg(not(feature = "archive"))]
    fn merge_package(&self, _path: &Path, _context: &MergeContext) -> Result<MergeReport> {
        Err(Error::ZipUnavailable)
    }
}

/// Convert the HTML values of `context` inside the package at `path` with
/// the default configuration.
pub fn merge_rich_text(path: impl AsRef<Path>, context: &MergeContext) -> Result<MergeReport> {
    RichTextMerger::new().merge(path, context)
}

/// Replace the children of `element` with one text node.
pub(crate) fn replace_text(doc: &mut XmlDocument, element: NodeId, text: &str) {
    let children: Vec<NodeId> = doc.children(element).collect();
    for child in children {
        doc.detach(child);
    }
    let node = doc.create_text(text);
    doc.append(element, node);
}
