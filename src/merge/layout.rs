//! Format-neutral layout of a parsed fragment.
//!
//! The HTML tree is walked once into paragraphs, tables and rules made of
//! formatted text runs. The DOCX and ODT emitters only translate this
//! layout; neither looks at HTML.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::html::{HtmlNode, InlineStyle};

/// Characters that cannot appear raw in a link target.
const HREF_UNSAFE: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`');

/// Formatting of one run. Derived with the `with_*` methods, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFormat {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub link: Option<String>,
}

impl RunFormat {
    pub fn with_bold(&self) -> Self {
        Self {
            bold: true,
            ..self.clone()
        }
    }

    pub fn with_italic(&self) -> Self {
        Self {
            italic: true,
            ..self.clone()
        }
    }

    pub fn with_underline(&self) -> Self {
        Self {
            underline: true,
            ..self.clone()
        }
    }

    pub fn with_link(&self, href: &str) -> Self {
        Self {
            link: Some(utf8_percent_encode(href.trim(), HREF_UNSAFE).to_string()),
            ..self.clone()
        }
    }

    pub fn with_style(&self, style: &InlineStyle) -> Self {
        Self {
            bold: self.bold || style.bold,
            italic: self.italic || style.italic,
            underline: self.underline || style.underline,
            link: self.link.clone(),
        }
    }

    pub fn is_plain(&self) -> bool {
        !self.bold && !self.italic && !self.underline && self.link.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text { text: String, format: RunFormat },
    Break,
}

impl Inline {
    fn is_blank(&self) -> bool {
        match self {
            Inline::Break => true,
            Inline::Text { text, .. } => text.trim().is_empty(),
        }
    }
}

/// Content of one table cell.
pub type Cell = Vec<Inline>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    /// Rows of cells; rows may be shorter than the widest one.
    Table(Vec<Vec<Cell>>),
    Rule,
}

/// Layout of one fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub blocks: Vec<Block>,
    /// The fragment had no block-level element.
    pub inline_only: bool,
}

impl Layout {
    /// The runs of an inline-only fragment, to be spliced into the host
    /// paragraph.
    pub fn inlines(&self) -> Option<&[Inline]> {
        if !self.inline_only {
            return None;
        }
        match self.blocks.as_slice() {
            [] => Some(&[]),
            [Block::Paragraph(inlines)] => Some(inlines),
            _ => None,
        }
    }

    /// Everything flattened into one run sequence, paragraphs joined by
    /// line breaks. Used where the host cannot hold paragraphs.
    pub fn flattened(&self) -> Vec<Inline> {
        let mut out = Vec::new();
        for block in &self.blocks {
            if !out.is_empty() {
                out.push(Inline::Break);
            }
            match block {
                Block::Paragraph(inlines) => out.extend(inlines.iter().cloned()),
                Block::Table(rows) => {
                    for (i, row) in rows.iter().enumerate() {
                        if i > 0 {
                            out.push(Inline::Break);
                        }
                        for (j, cell) in row.iter().enumerate() {
                            if j > 0 {
                                out.push(Inline::Text {
                                    text: "\t".to_string(),
                                    format: RunFormat::default(),
                                });
                            }
                            out.extend(cell.iter().cloned());
                        }
                    }
                }
                Block::Rule => {}
            }
        }
        trim_trailing(&mut out);
        out
    }
}

/// Strings used when laying out lists.
#[derive(Debug, Clone, Copy)]
pub struct ListMarkers<'a> {
    pub indent: &'a str,
    pub bullet: &'a str,
}

impl Default for ListMarkers<'_> {
    fn default() -> Self {
        Self {
            indent: "    ",
            bullet: "• ",
        }
    }
}

/// Lay out a parsed fragment.
pub fn layout(nodes: &[HtmlNode], markers: ListMarkers<'_>) -> Layout {
    let mut builder = Builder::new(markers);
    for node in nodes {
        builder.walk(node, &RunFormat::default(), 0);
    }
    builder.flush();

    let mut blocks = builder.blocks;
    trim_blocks(&mut blocks);
    Layout {
        blocks,
        inline_only: !nodes.iter().any(HtmlNode::contains_block),
    }
}

struct Builder<'a> {
    markers: ListMarkers<'a>,
    blocks: Vec<Block>,
    current: Vec<Inline>,
}

impl<'a> Builder<'a> {
    fn new(markers: ListMarkers<'a>) -> Self {
        Self {
            markers,
            blocks: Vec::new(),
            current: Vec::new(),
        }
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            let inlines = std::mem::take(&mut self.current);
            self.blocks.push(Block::Paragraph(inlines));
        }
    }

    fn push_text(&mut self, text: &str, format: &RunFormat) {
        // Whitespace between blocks is source formatting, not content.
        if self.current.is_empty() && text.trim().is_empty() {
            return;
        }
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.current.push(Inline::Break);
            }
            if !line.is_empty() {
                self.push_run(line, format);
            }
        }
    }

    /// Append a run, extending the previous one when the format matches.
    fn push_run(&mut self, text: &str, format: &RunFormat) {
        if let Some(Inline::Text {
            text: last,
            format: last_format,
        }) = self.current.last_mut()
            && last_format == format
        {
            last.push_str(text);
            return;
        }
        self.current.push(Inline::Text {
            text: text.to_string(),
            format: format.clone(),
        });
    }

    fn walk_all(&mut self, nodes: &[HtmlNode], format: &RunFormat, depth: usize) {
        for node in nodes {
            self.walk(node, format, depth);
        }
    }

    fn walk(&mut self, node: &HtmlNode, format: &RunFormat, depth: usize) {
        match node {
            HtmlNode::Text(text) => self.push_text(text, format),
            HtmlNode::Bold(c) => self.walk_all(c, &format.with_bold(), depth),
            HtmlNode::Italic(c) => self.walk_all(c, &format.with_italic(), depth),
            HtmlNode::Underline(c) => self.walk_all(c, &format.with_underline(), depth),
            HtmlNode::Span { style, children } => {
                self.walk_all(children, &format.with_style(style), depth)
            }
            HtmlNode::Anchor { href, children } => {
                let linked = format.with_link(href);
                if node.text_content().trim().is_empty() {
                    self.push_text(href, &linked);
                } else {
                    self.walk_all(children, &linked, depth);
                }
            }
            HtmlNode::LineBreak => self.current.push(Inline::Break),
            HtmlNode::Heading { children, .. } => {
                self.flush();
                self.blocks.push(Block::Paragraph(Vec::new()));
                self.walk_all(children, &format.with_bold(), depth);
                self.flush();
                self.blocks.push(Block::Paragraph(Vec::new()));
            }
            HtmlNode::Paragraph(children) => {
                self.flush();
                self.walk_all(children, format, depth);
                self.flush();
            }
            HtmlNode::Unknown(children) => self.walk_all(children, format, depth),
            HtmlNode::List { ordered, children } => {
                self.flush();
                let mut number = 0;
                for child in children {
                    match child {
                        HtmlNode::ListItem(item) => {
                            number += 1;
                            let marker = if *ordered {
                                format!("{number}. ")
                            } else {
                                self.markers.bullet.to_string()
                            };
                            self.list_item(item, &marker, format, depth);
                        }
                        other => self.walk(other, format, depth),
                    }
                }
                self.flush();
            }
            HtmlNode::ListItem(item) => {
                let marker = self.markers.bullet.to_string();
                self.list_item(item, &marker, format, depth);
            }
            HtmlNode::Table(rows) => {
                self.flush();
                let rows: Vec<Vec<Cell>> = rows
                    .iter()
                    .map(|row| {
                        row.cells
                            .iter()
                            .map(|cell| {
                                let cell_format = if cell.header {
                                    format.with_bold()
                                } else {
                                    format.clone()
                                };
                                self.cell(&cell.children, &cell_format)
                            })
                            .collect::<Vec<Cell>>()
                    })
                    .collect();
                self.blocks.push(Block::Table(rows));
            }
            HtmlNode::Rule => {
                self.flush();
                self.blocks.push(Block::Rule);
            }
        }
    }

    fn list_item(&mut self, item: &[HtmlNode], marker: &str, format: &RunFormat, depth: usize) {
        self.flush();
        let prefix = format!("{}{marker}", self.markers.indent.repeat(depth));
        self.push_run(&prefix, &RunFormat::default());
        self.walk_all(item, format, depth + 1);
        self.flush();
    }

    /// One cell's content as a single run sequence.
    fn cell(&self, children: &[HtmlNode], format: &RunFormat) -> Cell {
        let mut inner = Builder::new(self.markers);
        inner.walk_all(children, format, 0);
        inner.flush();
        let mut blocks = inner.blocks;
        trim_blocks(&mut blocks);
        Layout {
            blocks,
            inline_only: false,
        }
        .flattened()
    }
}

fn trim_trailing(inlines: &mut Vec<Inline>) {
    while inlines.last().is_some_and(Inline::is_blank) {
        inlines.pop();
    }
}

/// Drop trailing breaks, blank text and empty paragraphs.
fn trim_blocks(blocks: &mut Vec<Block>) {
    while let Some(last) = blocks.last_mut() {
        match last {
            Block::Paragraph(inlines) => {
                trim_trailing(inlines);
                if inlines.is_empty() {
                    blocks.pop();
                } else {
                    break;
                }
            }
            _ => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_fragment;

    fn lay(html: &str) -> Layout {
        layout(&parse_fragment(html), ListMarkers::default())
    }

    fn text(s: &str) -> Inline {
        Inline::Text {
            text: s.to_string(),
            format: RunFormat::default(),
        }
    }

    fn bold(s: &str) -> Inline {
        Inline::Text {
            text: s.to_string(),
            format: RunFormat::default().with_bold(),
        }
    }

    #[test]
    fn test_inline_fragment() {
        let layout = lay("Un <strong>texto</strong>");
        assert_eq!(layout.inlines(), Some(&[text("Un "), bold("texto")][..]));
    }

    #[test]
    fn test_formats_compose() {
        let layout = lay("<b><i>x</i></b><span style=\"text-decoration:underline\">y</span>");
        let inlines = layout.inlines().unwrap();
        let Inline::Text { format, .. } = &inlines[0] else {
            panic!("expected text");
        };
        assert!(format.bold && format.italic && !format.underline);
        let Inline::Text { format, .. } = &inlines[1] else {
            panic!("expected text");
        };
        assert!(format.underline && !format.bold);
    }

    #[test]
    fn test_paragraphs() {
        let layout = lay("<p>Primero</p>\n<p>Segundo</p>");
        assert!(!layout.inline_only);
        assert_eq!(
            layout.blocks,
            vec![
                Block::Paragraph(vec![text("Primero")]),
                Block::Paragraph(vec![text("Segundo")]),
            ]
        );
    }

    #[test]
    fn test_newlines_become_breaks() {
        let layout = lay("uno\ndos<br>tres<br>");
        assert_eq!(
            layout.inlines().unwrap(),
            &[
                text("uno"),
                Inline::Break,
                text("dos"),
                Inline::Break,
                text("tres")
            ]
        );
    }

    #[test]
    fn test_heading_is_flanked() {
        let layout = lay("<h2>Título</h2><p>x</p>");
        assert_eq!(
            layout.blocks,
            vec![
                Block::Paragraph(vec![]),
                Block::Paragraph(vec![bold("Título")]),
                Block::Paragraph(vec![]),
                Block::Paragraph(vec![text("x")]),
            ]
        );
    }

    #[test]
    fn test_lists() {
        let layout = lay("<ul><li>Uno</li><li>Dos<ol><li>A</li><li>B</li></ol></li></ul>");
        assert_eq!(
            layout.blocks,
            vec![
                Block::Paragraph(vec![text("• Uno")]),
                Block::Paragraph(vec![text("• Dos")]),
                Block::Paragraph(vec![text("    1. A")]),
                Block::Paragraph(vec![text("    2. B")]),
            ]
        );
    }

    #[test]
    fn test_list_marker_keeps_own_run_before_formatted_text() {
        let layout = lay("<ol><li><b>Uno</b> y dos</li></ol>");
        assert_eq!(
            layout.blocks,
            vec![Block::Paragraph(vec![text("1. "), bold("Uno"), text(" y dos")])]
        );
    }

    #[test]
    fn test_table_cells() {
        let layout = lay("<table><tr><th>A</th><th>B</th></tr><tr><td><p>1</p><p>2</p></td></tr></table>");
        assert_eq!(
            layout.blocks,
            vec![Block::Table(vec![
                vec![vec![bold("A")], vec![bold("B")]],
                vec![vec![text("1"), Inline::Break, text("2")]],
            ])]
        );
    }

    #[test]
    fn test_empty_anchor_shows_href() {
        let layout = lay(r#"<a href="https://example.com/a b"></a>"#);
        assert_eq!(
            layout.inlines().unwrap(),
            &[Inline::Text {
                text: "https://example.com/a b".to_string(),
                format: RunFormat {
                    link: Some("https://example.com/a%20b".to_string()),
                    ..Default::default()
                },
            }]
        );
    }

    #[test]
    fn test_trailing_artifacts_trimmed() {
        let layout = lay("<p>x<br></p><p> </p><br>");
        assert_eq!(layout.blocks, vec![Block::Paragraph(vec![text("x")])]);
    }

    #[test]
    fn test_flattened() {
        let layout = lay("<p>a</p><hr><p>b</p>");
        assert_eq!(
            layout.blocks,
            vec![
                Block::Paragraph(vec![text("a")]),
                Block::Rule,
                Block::Paragraph(vec![text("b")]),
            ]
        );
        assert_eq!(
            layout.flattened(),
            vec![text("a"), Inline::Break, Inline::Break, text("b")]
        );
    }
}
