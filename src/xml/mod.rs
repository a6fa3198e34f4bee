//! Minimal XML DOM for editing DOCX and ODT parts.
//!
//! Parts are parsed with quick-xml into an arena ([`XmlDocument`]), edited
//! in place and serialized back only when something changed.

mod dom;
mod reader;
mod writer;

pub use dom::{Attr, ChildrenIter, Node, NodeData, NodeId, XmlDocument};

/// Namespace URIs for the prefixes the merge engine may introduce.
pub mod ns {
    pub const R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
    pub const PACKAGE_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships";
    pub const HYPERLINK_TYPE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

    pub const OFFICE: &str = "urn:oasis:names:tc:opendocument:xmlns:office:1.0";
    pub const STYLE: &str = "urn:oasis:names:tc:opendocument:xmlns:style:1.0";
    pub const TEXT: &str = "urn:oasis:names:tc:opendocument:xmlns:text:1.0";
    pub const TABLE: &str = "urn:oasis:names:tc:opendocument:xmlns:table:1.0";
    pub const FO: &str = "urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0";
    pub const XLINK: &str = "http://www.w3.org/1999/xlink";
}

/// Declare `xmlns:<prefix>` on the root element if it is missing.
///
/// Returns true if the declaration was added.
pub fn ensure_namespace(doc: &mut XmlDocument, prefix: &str, uri: &str) -> bool {
    let Some(root) = doc.root() else {
        return false;
    };
    if doc.declares_prefix(root, prefix) {
        return false;
    }
    doc.set_attr(root, &format!("xmlns:{prefix}"), uri);
    true
}
