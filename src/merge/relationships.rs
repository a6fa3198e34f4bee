//! Hyperlink relationships of one OOXML part.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::xml::{Attr, NodeId, XmlDocument, ns};

const RELS_PROLOG: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

/// The `.rels` document of a part, extended with external hyperlinks.
///
/// Registering a target already present returns its id; new targets get
/// `rId<N>` with `N` one past the highest numeric id in use.
#[derive(Debug)]
pub struct RelationshipRegistry {
    doc: XmlDocument,
    root: NodeId,
    by_target: HashMap<String, String>,
    next_id: u32,
    added: usize,
}

impl Default for RelationshipRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationshipRegistry {
    /// Registry for a part that has no `.rels` yet.
    pub fn new() -> Self {
        let mut doc = XmlDocument::new();
        doc.prolog = RELS_PROLOG.to_string();
        let root = doc.append_element(
            doc.document(),
            "Relationships",
            vec![Attr::new("xmlns", ns::PACKAGE_RELATIONSHIPS)],
        );
        Self {
            doc,
            root,
            by_target: HashMap::new(),
            next_id: 1,
            added: 0,
        }
    }

    /// Registry over an existing `.rels` document.
    pub fn parse(xml: &str) -> Result<Self> {
        let doc = XmlDocument::parse(xml)?;
        let root = doc
            .root()
            .filter(|&r| doc.name(r) == Some("Relationships"))
            .ok_or_else(|| Error::MalformedXml("missing <Relationships> root".into()))?;

        let mut by_target = HashMap::new();
        let mut max_id = 0;
        for rel in doc.children(root).filter(|&c| doc.name(c) == Some("Relationship")) {
            let Some(id) = doc.attr(rel, "Id") else {
                continue;
            };
            if let Some(n) = id.strip_prefix("rId").and_then(|n| n.parse::<u32>().ok()) {
                max_id = max_id.max(n);
            }
            if doc.attr(rel, "Type") == Some(ns::HYPERLINK_TYPE)
                && let Some(target) = doc.attr(rel, "Target")
            {
                by_target
                    .entry(target.to_string())
                    .or_insert_with(|| id.to_string());
            }
        }

        Ok(Self {
            doc,
            root,
            by_target,
            next_id: max_id + 1,
            added: 0,
        })
    }

    /// Id of the hyperlink relationship for `target`, adding it if needed.
    pub fn register(&mut self, target: &str) -> String {
        if let Some(id) = self.by_target.get(target) {
            return id.clone();
        }

        let id = format!("rId{}", self.next_id);
        self.next_id += 1;
        self.doc.append_element(
            self.root,
            "Relationship",
            vec![
                Attr::new("Id", id.as_str()),
                Attr::new("Type", ns::HYPERLINK_TYPE),
                Attr::new("Target", target),
                Attr::new("TargetMode", "External"),
            ],
        );
        self.by_target.insert(target.to_string(), id.clone());
        self.added += 1;
        log::debug!("registered hyperlink {id} -> {target}");
        id
    }

    /// Whether the document needs to be written back.
    pub fn is_dirty(&self) -> bool {
        self.added > 0
    }

    /// Relationships added since construction.
    pub fn added(&self) -> usize {
        self.added
    }

    pub fn to_xml(&self) -> String {
        self.doc.to_xml()
    }
}
