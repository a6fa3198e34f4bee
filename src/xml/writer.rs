//! Serialize an [`XmlDocument`] back to text.

use super::dom::{NodeData, NodeId, XmlDocument};
use crate::util::{escape_attr, escape_text};

impl XmlDocument {
    /// Serialize the whole document, prolog included.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(self.len_hint());
        out.push_str(&self.prolog);
        for child in self.children(self.document()) {
            self.write_node(child, &mut out);
        }
        out
    }

    /// Serialize one node and its subtree.
    pub fn node_to_xml(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Document => {
                for child in self.children(id) {
                    self.write_node(child, out);
                }
            }
            NodeData::Element {
                name,
                attrs,
                self_closing,
            } => {
                out.push('<');
                out.push_str(name);
                for attr in attrs {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(&attr.value));
                    out.push('"');
                }
                if node.first_child.is_none() && *self_closing {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in self.children(id) {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::CData(text) => {
                out.push_str("<![CDATA[");
                out.push_str(text);
                out.push_str("]]>");
            }
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::ProcessingInstruction(text) => {
                out.push_str("<?");
                out.push_str(text);
                out.push_str("?>");
            }
            NodeData::DocType(text) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(text);
                out.push('>');
            }
        }
    }

    fn len_hint(&self) -> usize {
        self.prolog.len() + 64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::Attr;

    #[test]
    fn test_roundtrip_preserves_structure() {
        let xml = r#"<?xml version="1.0"?><a x="1 &amp; 2"><b/><c></c>t &lt; u<!--note--></a>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        assert_eq!(doc.to_xml(), xml);
    }

    #[test]
    fn test_built_elements_self_close() {
        let mut doc = XmlDocument::new();
        let root = doc.append_element(doc.document(), "w:p", vec![]);
        doc.append_element(root, "w:br", vec![Attr::new("w:type", "page")]);
        assert_eq!(doc.to_xml(), r#"<w:p><w:br w:type="page"/></w:p>"#);
    }
}
