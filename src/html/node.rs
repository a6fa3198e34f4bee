//! The HTML subset the merge engine understands.

use super::arena::{HtmlDom, HtmlNodeId};

/// Formatting carried by an inline `style` attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl InlineStyle {
    /// Read `font-weight`, `font-style` and `text-decoration` declarations.
    pub fn parse(style: &str) -> Self {
        let mut parsed = InlineStyle::default();
        for declaration in style.split(';') {
            let Some((property, value)) = declaration.split_once(':') else {
                continue;
            };
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim().to_ascii_lowercase();
            match property.as_str() {
                "font-weight" => {
                    parsed.bold = value == "bold"
                        || value == "bolder"
                        || value.parse::<u32>().is_ok_and(|w| w >= 600);
                }
                "font-style" => parsed.italic = value == "italic" || value == "oblique",
                "text-decoration" | "text-decoration-line" => {
                    parsed.underline = value.split_whitespace().any(|v| v == "underline");
                }
                _ => {}
            }
        }
        parsed
    }

    pub fn is_plain(&self) -> bool {
        !self.bold && !self.italic && !self.underline
    }
}

/// One node of a parsed fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNode {
    Text(String),
    Bold(Vec<HtmlNode>),
    Italic(Vec<HtmlNode>),
    Underline(Vec<HtmlNode>),
    Span {
        style: InlineStyle,
        children: Vec<HtmlNode>,
    },
    Anchor {
        href: String,
        children: Vec<HtmlNode>,
    },
    Heading {
        level: u8,
        children: Vec<HtmlNode>,
    },
    /// `p`, `div` and the other generic block containers.
    Paragraph(Vec<HtmlNode>),
    Table(Vec<TableRow>),
    List {
        ordered: bool,
        children: Vec<HtmlNode>,
    },
    ListItem(Vec<HtmlNode>),
    LineBreak,
    /// `<hr>`
    Rule,
    /// Any other element; only its content is kept.
    Unknown(Vec<HtmlNode>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    /// `<th>`
    pub header: bool,
    pub children: Vec<HtmlNode>,
}

impl HtmlNode {
    /// Whether this node starts its own paragraph.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            HtmlNode::Heading { .. }
                | HtmlNode::Paragraph(_)
                | HtmlNode::Table(_)
                | HtmlNode::List { .. }
                | HtmlNode::ListItem(_)
                | HtmlNode::Rule
        )
    }

    /// Whether this node or any descendant is a block.
    pub fn contains_block(&self) -> bool {
        self.is_block() || self.children().iter().any(HtmlNode::contains_block)
    }

    pub fn children(&self) -> &[HtmlNode] {
        match self {
            HtmlNode::Bold(c)
            | HtmlNode::Italic(c)
            | HtmlNode::Underline(c)
            | HtmlNode::Paragraph(c)
            | HtmlNode::ListItem(c)
            | HtmlNode::Unknown(c) => c,
            HtmlNode::Span { children, .. }
            | HtmlNode::Anchor { children, .. }
            | HtmlNode::Heading { children, .. }
            | HtmlNode::List { children, .. } => children,
            HtmlNode::Text(_) | HtmlNode::Table(_) | HtmlNode::LineBreak | HtmlNode::Rule => &[],
        }
    }

    /// Plain text of the subtree.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            HtmlNode::Text(t) => out.push_str(t),
            HtmlNode::LineBreak => out.push('\n'),
            HtmlNode::Table(rows) => {
                for cell in rows.iter().flat_map(|r| &r.cells) {
                    for child in &cell.children {
                        child.collect_text(out);
                    }
                }
            }
            _ => {
                for child in self.children() {
                    child.collect_text(out);
                }
            }
        }
    }
}

/// Elements whose content is never rendered.
const DROPPED: &[&str] = &[
    "script", "style", "head", "title", "template", "noscript", "iframe", "object", "embed",
    "svg", "math",
];

const PARAGRAPHS: &[&str] = &[
    "p", "div", "section", "article", "blockquote", "address", "header", "footer", "main",
    "aside", "figure", "figcaption", "pre", "center", "dd", "dt", "dl", "nav", "caption",
];

/// Lower the arena children of `parent` into [`HtmlNode`]s.
pub(crate) fn lower_children(dom: &HtmlDom, parent: HtmlNodeId) -> Vec<HtmlNode> {
    dom.children(parent)
        .filter_map(|child| lower_node(dom, child))
        .collect()
}

fn lower_node(dom: &HtmlDom, id: HtmlNodeId) -> Option<HtmlNode> {
    if let Some(text) = dom.text(id) {
        return Some(HtmlNode::Text(text.to_string()));
    }

    let tag = dom.element_name(id)?.as_ref().to_ascii_lowercase();
    if DROPPED.contains(&tag.as_str()) {
        return None;
    }

    let style = dom
        .get_attr(id, "style")
        .map(InlineStyle::parse)
        .unwrap_or_default();
    let styled = |children: Vec<HtmlNode>| {
        if style.is_plain() {
            children
        } else {
            vec![HtmlNode::Span { style, children }]
        }
    };

    let node = match tag.as_str() {
        "strong" | "b" => HtmlNode::Bold(styled(lower_children(dom, id))),
        "em" | "i" | "cite" | "var" | "dfn" => HtmlNode::Italic(styled(lower_children(dom, id))),
        "u" | "ins" => HtmlNode::Underline(styled(lower_children(dom, id))),
        "span" | "font" => HtmlNode::Span {
            style,
            children: lower_children(dom, id),
        },
        "a" => match dom.get_attr(id, "href").map(str::trim).filter(|h| !h.is_empty()) {
            Some(href) => HtmlNode::Anchor {
                href: href.to_string(),
                children: styled(lower_children(dom, id)),
            },
            None => HtmlNode::Unknown(styled(lower_children(dom, id))),
        },
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => HtmlNode::Heading {
            level: tag.as_bytes()[1] - b'0',
            children: styled(lower_children(dom, id)),
        },
        "ul" | "ol" => HtmlNode::List {
            ordered: tag == "ol",
            children: lower_children(dom, id),
        },
        "li" => HtmlNode::ListItem(styled(lower_children(dom, id))),
        "table" => HtmlNode::Table(lower_table(dom, id)),
        "br" => HtmlNode::LineBreak,
        "hr" => HtmlNode::Rule,
        t if PARAGRAPHS.contains(&t) => HtmlNode::Paragraph(styled(lower_children(dom, id))),
        _ => HtmlNode::Unknown(styled(lower_children(dom, id))),
    };
    Some(node)
}

/// Rows of a table, flattening `thead`/`tbody`/`tfoot`.
fn lower_table(dom: &HtmlDom, table: HtmlNodeId) -> Vec<TableRow> {
    let mut rows = Vec::new();
    collect_rows(dom, table, &mut rows);
    rows
}

fn collect_rows(dom: &HtmlDom, parent: HtmlNodeId, rows: &mut Vec<TableRow>) {
    for child in dom.children(parent) {
        let Some(tag) = dom.element_name(child) else {
            continue;
        };
        match tag.as_ref() {
            "thead" | "tbody" | "tfoot" => collect_rows(dom, child, rows),
            "tr" => {
                let cells = dom
                    .children(child)
                    .filter_map(|cell| {
                        let header = match dom.element_name(cell)?.as_ref() {
                            "th" => true,
                            "td" => false,
                            _ => return None,
                        };
                        Some(TableCell {
                            header,
                            children: lower_children(dom, cell),
                        })
                    })
                    .collect();
                rows.push(TableRow { cells });
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_style_parse() {
        let style = InlineStyle::parse("font-weight: 700; font-style:italic; text-decoration: underline overline");
        assert!(style.bold && style.italic && style.underline);
        assert!(InlineStyle::parse("color: red").is_plain());
        assert!(!InlineStyle::parse("font-weight: 400").bold);
    }

    #[test]
    fn test_block_detection() {
        let inline = HtmlNode::Bold(vec![HtmlNode::Text("x".into())]);
        assert!(!inline.contains_block());
        let nested = HtmlNode::Unknown(vec![HtmlNode::Paragraph(vec![])]);
        assert!(nested.contains_block());
    }
}
