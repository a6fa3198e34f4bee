//! HTML fragments submitted as field values.
//!
//! Fragments are parsed with html5ever (so misnested or unclosed markup is
//! repaired the way a browser would) and lowered into [`HtmlNode`], the
//! small tagged union the merge engine converts to native markup.

mod arena;
mod node;
mod sanitize;
mod tree_sink;

use std::sync::LazyLock;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use regex::Regex;

pub use arena::{HtmlDom, HtmlNodeData, HtmlNodeId};
pub use node::{HtmlNode, InlineStyle, TableCell, TableRow};
pub use sanitize::sanitize_html;
pub use tree_sink::HtmlSink;

/// A tag the converter knows how to render.
static KNOWN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(?:p|div|span|strong|b|em|i|u|a|h[1-6]|ul|ol|li|table|thead|tbody|tfoot|tr|td|th|br|hr|section|article|blockquote|address)(?:\s[^<>]*)?/?>",
    )
    .unwrap()
});

/// Parse a fragment into the supported node set.
///
/// Text that does not produce a document body is returned as one literal
/// text node.
pub fn parse_fragment(html: &str) -> Vec<HtmlNode> {
    let dom = parse_document(HtmlSink::new(), ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_dom();

    match dom.find_by_tag("body") {
        Some(body) => node::lower_children(&dom, body),
        None => vec![HtmlNode::Text(html.to_string())],
    }
}

/// Whether `text` contains at least one recognised HTML tag.
pub fn contains_markup(text: &str) -> bool {
    text.contains('<') && KNOWN_TAG.is_match(text)
}

/// Number of recognised tags in `text`.
pub(crate) fn markup_tag_count(text: &str) -> usize {
    if !text.contains('<') {
        return 0;
    }
    KNOWN_TAG.find_iter(text).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> HtmlNode {
        HtmlNode::Text(s.to_string())
    }

    #[test]
    fn test_inline_fragment() {
        assert_eq!(
            parse_fragment("Un <strong>texto</strong>"),
            vec![text("Un "), HtmlNode::Bold(vec![text("texto")])]
        );
    }

    #[test]
    fn test_block_fragment() {
        let nodes = parse_fragment("<h2>Título</h2><p>Contenido</p>");
        assert_eq!(
            nodes,
            vec![
                HtmlNode::Heading {
                    level: 2,
                    children: vec![text("Título")]
                },
                HtmlNode::Paragraph(vec![text("Contenido")]),
            ]
        );
    }

    #[test]
    fn test_table_rows_are_flattened() {
        let nodes = parse_fragment(
            "<table><thead><tr><th>A</th><th>B</th></tr></thead><tbody><tr><td>1</td></tr></tbody></table>",
        );
        let HtmlNode::Table(rows) = &nodes[0] else {
            panic!("expected table, got {nodes:?}");
        };
        assert_eq!(rows.len(), 2);
        assert!(rows[0].cells[0].header);
        assert_eq!(rows[1].cells.len(), 1);
        assert!(!rows[1].cells[0].header);
    }

    #[test]
    fn test_scripts_are_dropped_and_entities_decoded() {
        assert_eq!(
            parse_fragment("<p>a &amp; b<script>alert(1)</script></p>"),
            vec![HtmlNode::Paragraph(vec![text("a & b")])]
        );
    }

    #[test]
    fn test_style_attribute_wraps_children() {
        let nodes = parse_fragment(r#"<span style="font-weight:bold">x</span>"#);
        assert_eq!(
            nodes,
            vec![HtmlNode::Span {
                style: InlineStyle {
                    bold: true,
                    ..Default::default()
                },
                children: vec![text("x")],
            }]
        );
    }

    #[test]
    fn test_contains_markup() {
        assert!(contains_markup("Hola <b>mundo</b>"));
        assert!(contains_markup("<hr />"));
        assert!(contains_markup("<UL><LI>x"));
        assert!(!contains_markup("a < b > c"));
        assert!(!contains_markup("<nombre>"));
        assert!(!contains_markup("<brand>"));
    }

    #[test]
    fn test_markup_tag_count() {
        assert_eq!(markup_tag_count("<b>x</b> <br/>"), 3);
        assert_eq!(markup_tag_count("<b"), 0);
        assert_eq!(markup_tag_count("sin marcas"), 0);
    }
}
