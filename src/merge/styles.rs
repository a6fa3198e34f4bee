//! Automatic styles for ODT parts.

use bitflags::bitflags;

use crate::xml::{Attr, NodeId, XmlDocument};

bitflags! {
    /// Automatic styles a converted part refers to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StyleFlags: u8 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
        const LINK = 1 << 3;
        const TABLE = 1 << 4;
        const RULE = 1 << 5;
    }
}

/// Names and definitions of the automatic styles, under a common prefix.
#[derive(Debug, Clone)]
pub struct StyleRegistry {
    prefix: String,
}

impl StyleRegistry {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn bold(&self) -> String {
        format!("{}Bold", self.prefix)
    }

    pub fn italic(&self) -> String {
        format!("{}Italic", self.prefix)
    }

    pub fn underline(&self) -> String {
        format!("{}Underline", self.prefix)
    }

    pub fn link(&self) -> String {
        format!("{}Link", self.prefix)
    }

    pub fn table(&self) -> String {
        format!("{}Table", self.prefix)
    }

    pub fn table_cell(&self) -> String {
        format!("{}TableCell", self.prefix)
    }

    pub fn rule(&self) -> String {
        format!("{}Rule", self.prefix)
    }

    /// Add the styles named by `flags` to `office:automatic-styles`,
    /// creating that element if needed. Styles already present are left
    /// alone. Returns the number of styles added.
    pub fn ensure(&self, doc: &mut XmlDocument, flags: StyleFlags) -> usize {
        if flags.is_empty() {
            return 0;
        }
        let Some(root) = doc.root() else {
            return 0;
        };
        let container = automatic_styles(doc, root);

        let existing: Vec<String> = doc
            .children(container)
            .filter_map(|c| doc.attr(c, "style:name").map(str::to_string))
            .collect();

        let mut added = 0;
        for flag in flags.iter() {
            for (name, family, properties, attrs) in self.definitions(flag) {
                if existing.contains(&name) {
                    continue;
                }
                let style = doc.append_element(
                    container,
                    "style:style",
                    vec![
                        Attr::new("style:name", name.as_str()),
                        Attr::new("style:family", family),
                    ],
                );
                doc.append_element(style, properties, attrs);
                added += 1;
            }
        }
        added
    }

    fn definitions(&self, flag: StyleFlags) -> Vec<(String, &'static str, &'static str, Vec<Attr>)> {
        let text = "style:text-properties";
        let underline = || {
            vec![
                Attr::new("style:text-underline-style", "solid"),
                Attr::new("style:text-underline-width", "auto"),
                Attr::new("style:text-underline-color", "font-color"),
            ]
        };

        if flag == StyleFlags::BOLD {
            vec![(
                self.bold(),
                "text",
                text,
                vec![
                    Attr::new("fo:font-weight", "bold"),
                    Attr::new("style:font-weight-asian", "bold"),
                    Attr::new("style:font-weight-complex", "bold"),
                ],
            )]
        } else if flag == StyleFlags::ITALIC {
            vec![(
                self.italic(),
                "text",
                text,
                vec![
                    Attr::new("fo:font-style", "italic"),
                    Attr::new("style:font-style-asian", "italic"),
                    Attr::new("style:font-style-complex", "italic"),
                ],
            )]
        } else if flag == StyleFlags::UNDERLINE {
            vec![(self.underline(), "text", text, underline())]
        } else if flag == StyleFlags::LINK {
            let mut attrs = vec![Attr::new("fo:color", "#0563c1")];
            attrs.extend(underline());
            vec![(self.link(), "text", text, attrs)]
        } else if flag == StyleFlags::TABLE {
            vec![
                (
                    self.table(),
                    "table",
                    "style:table-properties",
                    vec![
                        Attr::new("style:width", "17cm"),
                        Attr::new("table:align", "margins"),
                        Attr::new("table:border-model", "collapsing"),
                    ],
                ),
                (
                    self.table_cell(),
                    "table-cell",
                    "style:table-cell-properties",
                    vec![
                        Attr::new("fo:padding", "0.1cm"),
                        Attr::new("fo:border", "0.5pt solid #000000"),
                    ],
                ),
            ]
        } else if flag == StyleFlags::RULE {
            vec![(
                self.rule(),
                "paragraph",
                "style:paragraph-properties",
                vec![
                    Attr::new("fo:border-bottom", "0.5pt solid #000000"),
                    Attr::new("fo:padding-bottom", "0.05cm"),
                ],
            )]
        } else {
            Vec::new()
        }
    }
}

/// `office:automatic-styles`, created before the body or master styles
/// (or as the first child) when missing.
fn automatic_styles(doc: &mut XmlDocument, root: NodeId) -> NodeId {
    if let Some(existing) = doc.first_child_named(root, "office:automatic-styles") {
        return existing;
    }
    let container = doc.create_element("office:automatic-styles", vec![]);
    let anchor = doc.children(root).find(|&c| {
        matches!(
            doc.name(c),
            Some("office:master-styles" | "office:body")
        )
    });
    match anchor {
        Some(anchor) => doc.insert_before(anchor, container),
        None => doc.prepend(root, container),
    }
    container
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = r#"<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0"><office:body><office:text/></office:body></office:document-content>"#;

    #[test]
    fn test_creates_container_and_styles() {
        let mut doc = XmlDocument::parse(CONTENT).unwrap();
        let styles = StyleRegistry::new("Rich");
        assert_eq!(styles.ensure(&mut doc, StyleFlags::BOLD | StyleFlags::LINK), 2);

        let xml = doc.to_xml();
        let auto = xml.find("<office:automatic-styles>").unwrap();
        assert!(auto < xml.find("<office:body>").unwrap());
        assert!(xml.contains(r#"<style:style style:name="RichBold" style:family="text"><style:text-properties fo:font-weight="bold""#));
        assert!(xml.contains(r#"style:name="RichLink""#));
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let mut doc = XmlDocument::parse(CONTENT).unwrap();
        let styles = StyleRegistry::new("Rich");
        styles.ensure(&mut doc, StyleFlags::ITALIC | StyleFlags::TABLE);
        let once = doc.to_xml();
        assert_eq!(styles.ensure(&mut doc, StyleFlags::ITALIC | StyleFlags::TABLE), 0);
        assert_eq!(doc.to_xml(), once);
        assert!(once.contains(r#"fo:border="0.5pt solid #000000""#));
        assert_eq!(doc.elements_named("office:automatic-styles").len(), 1);
    }

    #[test]
    fn test_existing_container_is_reused() {
        let xml = r#"<office:document-styles xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0"><office:styles/><office:automatic-styles><style:style style:name="P1"/></office:automatic-styles><office:master-styles/></office:document-styles>"#;
        let mut doc = XmlDocument::parse(xml).unwrap();
        StyleRegistry::new("X").ensure(&mut doc, StyleFlags::RULE);
        let out = doc.to_xml();
        assert!(out.contains(r#"<style:style style:name="P1"/><style:style style:name="XRule" style:family="paragraph">"#));
        assert_eq!(doc.elements_named("office:automatic-styles").len(), 1);
    }

    #[test]
    fn test_empty_flags_do_nothing() {
        let mut doc = XmlDocument::parse(CONTENT).unwrap();
        assert_eq!(StyleRegistry::new("Rich").ensure(&mut doc, StyleFlags::empty()), 0);
        assert_eq!(doc.to_xml(), CONTENT);
    }
}
