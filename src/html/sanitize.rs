//! Re-serialize a fragment keeping only the supported subset.

use super::node::{HtmlNode, InlineStyle};
use super::parse_fragment;
use crate::util::{escape_attr, escape_text};

/// Clean an HTML value before it is stored or merged.
///
/// Scripts, styles, frames and embedded objects are removed; the remaining
/// supported tags are written back with only `href` and `style` attributes.
/// Links with a scheme other than http, https or mailto keep their text but
/// lose the link.
pub fn sanitize_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    for node in parse_fragment(html) {
        write_node(&node, &mut out);
    }
    out
}

fn write_children(children: &[HtmlNode], out: &mut String) {
    for child in children {
        write_node(child, out);
    }
}

fn wrap(tag: &str, children: &[HtmlNode], out: &mut String) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    write_children(children, out);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn write_node(node: &HtmlNode, out: &mut String) {
    match node {
        HtmlNode::Text(text) => out.push_str(&escape_text(text)),
        HtmlNode::Bold(c) => wrap("strong", c, out),
        HtmlNode::Italic(c) => wrap("em", c, out),
        HtmlNode::Underline(c) => wrap("u", c, out),
        HtmlNode::Span { style, children } => {
            if style.is_plain() {
                write_children(children, out);
            } else {
                out.push_str("<span style=\"");
                out.push_str(&style_declarations(style));
                out.push_str("\">");
                write_children(children, out);
                out.push_str("</span>");
            }
        }
        HtmlNode::Anchor { href, children } => {
            if is_safe_href(href) {
                out.push_str("<a href=\"");
                out.push_str(&escape_attr(href));
                out.push_str("\">");
                write_children(children, out);
                out.push_str("</a>");
            } else {
                write_children(children, out);
            }
        }
        HtmlNode::Heading { level, children } => wrap(&format!("h{level}"), children, out),
        HtmlNode::Paragraph(c) => wrap("p", c, out),
        HtmlNode::Table(rows) => {
            out.push_str("<table>");
            for row in rows {
                out.push_str("<tr>");
                for cell in &row.cells {
                    wrap(if cell.header { "th" } else { "td" }, &cell.children, out);
                }
                out.push_str("</tr>");
            }
            out.push_str("</table>");
        }
        HtmlNode::List { ordered, children } => {
            wrap(if *ordered { "ol" } else { "ul" }, children, out)
        }
        HtmlNode::ListItem(c) => wrap("li", c, out),
        HtmlNode::LineBreak => out.push_str("<br>"),
        HtmlNode::Rule => out.push_str("<hr>"),
        HtmlNode::Unknown(c) => write_children(c, out),
    }
}

fn style_declarations(style: &InlineStyle) -> String {
    let mut declarations = Vec::new();
    if style.bold {
        declarations.push("font-weight:bold");
    }
    if style.italic {
        declarations.push("font-style:italic");
    }
    if style.underline {
        declarations.push("text-decoration:underline");
    }
    declarations.join(";")
}

fn is_safe_href(href: &str) -> bool {
    match href.split_once(':') {
        Some((scheme, _)) if !scheme.contains(['/', '?', '#']) => {
            matches!(
                scheme.trim().to_ascii_lowercase().as_str(),
                "http" | "https" | "mailto"
            )
        }
        _ => true,
    }
}
