//! OpenDocument text emitter.
//!
//! Text in ODF is mixed content of `text:p`, `text:h` and `text:span`, so
//! the converter works on text nodes. Formatting is expressed through
//! automatic styles, registered once per part at the end.

use super::MergeConfig;
use super::layout::{Block, Inline, ListMarkers, RunFormat, layout};
use super::lookup::{RichLookup, Segment, match_text};
use super::styles::{StyleFlags, StyleRegistry};
use crate::html::{markup_tag_count, parse_fragment};
use crate::util::decode_entities;
use crate::xml::{Attr, NodeId, XmlDocument, ensure_namespace, ns};

/// Elements whose text children may hold merged values.
const TEXT_HOSTS: &[&str] = &["text:p", "text:h", "text:span", "text:a"];

const PARAGRAPHS: &[&str] = &["text:p", "text:h"];

/// Paragraph attributes that identify one paragraph in the document.
const PARAGRAPH_IDS: &[&str] = &["xml:id", "text:id"];

/// Convert every matching text node of a part. Returns the number of
/// fragments converted.
pub(crate) fn convert_odt(doc: &mut XmlDocument, lookup: &RichLookup, config: &MergeConfig) -> usize {
    let recover = config.recover_split_markup && !lookup.is_empty();
    if recover {
        let merged = coalesce_split_markup(doc);
        if merged > 0 {
            log::debug!("coalesced split markup in {merged} paragraph(s)");
        }
    }

    let targets: Vec<NodeId> = doc
        .descendants(doc.document())
        .into_iter()
        .filter(|&n| {
            doc.is_text(n)
                && doc
                    .name(doc.parent(n))
                    .is_some_and(|name| TEXT_HOSTS.contains(&name))
        })
        .collect();

    let styles = StyleRegistry::new(config.style_prefix.as_str());
    let table_seq = doc.elements_named("table:table").len();
    let mut converter = OdtConverter {
        doc: &mut *doc,
        styles: &styles,
        markers: config.markers(),
        flags: StyleFlags::empty(),
        table_seq,
    };
    let mut converted = 0;
    for node in targets {
        converted += converter.convert_text(node, lookup, recover);
    }

    let flags = converter.flags;
    if converted > 0 {
        if !flags.is_empty() {
            ensure_namespace(doc, "style", ns::STYLE);
            ensure_namespace(doc, "fo", ns::FO);
        }
        if flags.contains(StyleFlags::LINK) {
            ensure_namespace(doc, "xlink", ns::XLINK);
        }
        if flags.contains(StyleFlags::TABLE) {
            ensure_namespace(doc, "table", ns::TABLE);
            ensure_namespace(doc, "office", ns::OFFICE);
        }
        styles.ensure(doc, flags);
    }
    converted
}

enum Piece {
    Nodes(Vec<NodeId>),
    Blocks(Vec<Block>),
}

struct OdtConverter<'a> {
    doc: &'a mut XmlDocument,
    styles: &'a StyleRegistry,
    markers: ListMarkers<'a>,
    flags: StyleFlags,
    table_seq: usize,
}

impl OdtConverter<'_> {
    fn convert_text(&mut self, node: NodeId, lookup: &RichLookup, recover: bool) -> usize {
        let Some(raw) = self.doc.text(node).map(str::to_string) else {
            return 0;
        };
        let decoded = decode_entities(&raw);
        let Some(segments) = match_text(lookup, &decoded, recover) else {
            return 0;
        };

        let host = self.doc.parent(node);
        let in_paragraph = self
            .doc
            .name(host)
            .is_some_and(|name| PARAGRAPHS.contains(&name));
        let in_link = self.doc.ancestor_named(host, &["text:a"]).is_some();

        let mut pieces = Vec::new();
        let mut fragments = 0;
        for segment in segments {
            match segment {
                Segment::Plain(text) if text.is_empty() => {}
                Segment::Plain(text) => {
                    let text = self.doc.create_text(text);
                    pieces.push(Piece::Nodes(vec![text]));
                }
                Segment::Fragment(html) => {
                    fragments += 1;
                    let laid = layout(&parse_fragment(html), self.markers);
                    match laid.inlines() {
                        Some(inlines) => pieces.push(Piece::Nodes(self.inline_nodes(inlines, !in_link))),
                        None if in_paragraph => pieces.push(Piece::Blocks(laid.blocks)),
                        None => {
                            let nodes = self.inline_nodes(&laid.flattened(), !in_link);
                            pieces.push(Piece::Nodes(nodes));
                        }
                    }
                }
            }
        }

        if pieces.iter().any(|p| matches!(p, Piece::Blocks(_))) {
            self.split_paragraph(host, node, pieces);
        } else {
            for piece in pieces {
                if let Piece::Nodes(nodes) = piece {
                    for n in nodes {
                        self.doc.insert_before(node, n);
                    }
                }
            }
            self.doc.detach(node);
        }
        fragments
    }

    /// Text with runs of spaces and tabs in ODF form.
    fn content_nodes(&mut self, text: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut plain = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\t' => {
                    self.flush_text(&mut plain, &mut out);
                    out.push(self.doc.create_element("text:tab", vec![]));
                }
                ' ' if chars.peek() == Some(&' ') => {
                    plain.push(' ');
                    let mut extra = 0;
                    while chars.peek() == Some(&' ') {
                        chars.next();
                        extra += 1;
                    }
                    self.flush_text(&mut plain, &mut out);
                    out.push(self.doc.create_element(
                        "text:s",
                        vec![Attr::new("text:c", extra.to_string())],
                    ));
                }
                _ => plain.push(c),
            }
        }
        self.flush_text(&mut plain, &mut out);
        out
    }

    fn flush_text(&mut self, plain: &mut String, out: &mut Vec<NodeId>) {
        if !plain.is_empty() {
            out.push(self.doc.create_text(std::mem::take(plain)));
        }
    }

    /// Formatted text: nested spans for bold, italic and underline.
    fn formatted(&mut self, text: &str, format: &RunFormat) -> Vec<NodeId> {
        let mut nodes = self.content_nodes(text);
        let layers = [
            (format.underline, StyleFlags::UNDERLINE, self.styles.underline()),
            (format.italic, StyleFlags::ITALIC, self.styles.italic()),
            (format.bold, StyleFlags::BOLD, self.styles.bold()),
        ];
        for (on, flag, style) in layers {
            if !on {
                continue;
            }
            self.flags |= flag;
            let span = self
                .doc
                .create_element("text:span", vec![Attr::new("text:style-name", style)]);
            for node in nodes {
                self.doc.append(span, node);
            }
            nodes = vec![span];
        }
        nodes
    }

    /// Nodes for `inlines`, consecutive runs with one target sharing a
    /// `text:a`.
    fn inline_nodes(&mut self, inlines: &[Inline], allow_links: bool) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut open: Option<(String, NodeId)> = None;

        for inline in inlines {
            let (nodes, link) = match inline {
                Inline::Text { text, format } => (self.formatted(text, format), format.link.clone()),
                Inline::Break => (vec![self.doc.create_element("text:line-break", vec![])], None),
            };

            match link.filter(|_| allow_links) {
                Some(href) => {
                    let anchor = match &open {
                        Some((current, anchor)) if *current == href => *anchor,
                        _ => {
                            self.flags |= StyleFlags::LINK;
                            let anchor = self.doc.create_element(
                                "text:a",
                                vec![
                                    Attr::new("xlink:type", "simple"),
                                    Attr::new("xlink:href", href.as_str()),
                                    Attr::new("text:style-name", self.styles.link()),
                                ],
                            );
                            out.push(anchor);
                            open = Some((href, anchor));
                            anchor
                        }
                    };
                    for node in nodes {
                        self.doc.append(anchor, node);
                    }
                }
                None => {
                    open = None;
                    out.extend(nodes);
                }
            }
        }
        out
    }

    fn split_paragraph(&mut self, host: NodeId, node: NodeId, pieces: Vec<Piece>) {
        let mut trailing = Vec::new();
        let mut next = self.doc.next_sibling(node);
        while next.is_some() {
            trailing.push(next);
            next = self.doc.next_sibling(next);
        }
        for &n in &trailing {
            self.doc.detach(n);
        }
        self.doc.detach(node);

        let mut current = host;
        let mut last = host;
        let mut created = Vec::new();
        for piece in pieces {
            match piece {
                Piece::Nodes(nodes) => {
                    for n in nodes {
                        self.doc.append(current, n);
                    }
                }
                Piece::Blocks(blocks) => {
                    for block in &blocks {
                        let n = self.block(block, host);
                        self.doc.insert_after(last, n);
                        last = n;
                    }
                    let next = self.doc.shallow_clone(host);
                    for id in PARAGRAPH_IDS {
                        self.doc.remove_attr(next, id);
                    }
                    self.doc.insert_after(last, next);
                    last = next;
                    current = next;
                    created.push(next);
                }
            }
        }
        for n in trailing {
            self.doc.append(current, n);
        }

        for para in std::iter::once(host).chain(created) {
            if self.doc.first_child(para).is_none() {
                self.doc.detach(para);
            }
        }
    }

    /// A `text:p` with the host's paragraph style (headings excluded).
    fn paragraph(&mut self, host: NodeId) -> NodeId {
        let mut attrs = Vec::new();
        if self.doc.name(host) == Some("text:p")
            && let Some(style) = self.doc.attr(host, "text:style-name")
        {
            attrs.push(Attr::new("text:style-name", style));
        }
        self.doc.create_element("text:p", attrs)
    }

    fn block(&mut self, block: &Block, host: NodeId) -> NodeId {
        match block {
            Block::Paragraph(inlines) => {
                let para = self.paragraph(host);
                for n in self.inline_nodes(inlines, true) {
                    self.doc.append(para, n);
                }
                para
            }
            Block::Table(rows) => self.table(rows),
            Block::Rule => {
                self.flags |= StyleFlags::RULE;
                self.doc.create_element(
                    "text:p",
                    vec![Attr::new("text:style-name", self.styles.rule())],
                )
            }
        }
    }

    fn table(&mut self, rows: &[Vec<Vec<Inline>>]) -> NodeId {
        self.flags |= StyleFlags::TABLE;
        self.table_seq += 1;
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);

        let table = self.doc.create_element(
            "table:table",
            vec![
                Attr::new("table:name", format!("{}{}", self.styles.table(), self.table_seq)),
                Attr::new("table:style-name", self.styles.table()),
            ],
        );
        self.doc.append_element(
            table,
            "table:table-column",
            vec![Attr::new("table:number-columns-repeated", columns.to_string())],
        );

        let cell_style = self.styles.table_cell();
        for row in rows {
            let tr = self.doc.append_element(table, "table:table-row", vec![]);
            for index in 0..columns {
                let cell = self.doc.append_element(
                    tr,
                    "table:table-cell",
                    vec![
                        Attr::new("table:style-name", cell_style.as_str()),
                        Attr::new("office:value-type", "string"),
                    ],
                );
                let para = self.doc.append_element(cell, "text:p", vec![]);
                if let Some(content) = row.get(index) {
                    for n in self.inline_nodes(content, true) {
                        self.doc.append(para, n);
                    }
                }
            }
        }
        table
    }
}

/// Join the text of paragraphs whose tags are split across spans into the
/// first text node. Returns the number of paragraphs merged.
fn coalesce_split_markup(doc: &mut XmlDocument) -> usize {
    let paragraphs: Vec<NodeId> = doc
        .descendants(doc.document())
        .into_iter()
        .filter(|&n| doc.name(n).is_some_and(|name| PARAGRAPHS.contains(&name)))
        .collect();

    let mut merged = 0;
    for p in paragraphs {
        let texts: Vec<NodeId> = doc
            .descendants(p)
            .into_iter()
            .filter(|&n| {
                doc.is_text(n) && doc.ancestor_named(doc.parent(n), PARAGRAPHS) == Some(p)
            })
            .collect();
        if texts.len() < 2 {
            continue;
        }

        let pieces: Vec<String> = texts
            .iter()
            .map(|&t| doc.text(t).unwrap_or_default().to_string())
            .collect();
        let joined = pieces.concat();
        let whole = markup_tag_count(&joined);
        let separate: usize = pieces.iter().map(|s| markup_tag_count(s)).sum();
        if whole == 0 || whole <= separate {
            continue;
        }

        doc.set_text(texts[0], joined);
        for &t in &texts[1..] {
            let mut parent = doc.parent(t);
            doc.detach(t);
            while parent != p && doc.first_child(parent).is_none() {
                let up = doc.parent(parent);
                doc.detach(parent);
                parent = up;
            }
        }
        merged += 1;
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = concat!(
        r#"xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" "#,
        r#"xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0""#
    );

    fn content(body: &str) -> XmlDocument {
        XmlDocument::parse(&format!(
            "<office:document-content {NS}><office:body><office:text>{body}</office:text></office:body></office:document-content>"
        ))
        .unwrap()
    }

    fn text_xml(doc: &XmlDocument) -> String {
        let text = doc.elements_named("office:text")[0];
        doc.children(text).map(|c| doc.node_to_xml(c)).collect()
    }

    fn convert(doc: &mut XmlDocument, values: &[&str]) -> usize {
        let lookup = RichLookup::from_values(values.iter().copied());
        convert_odt(doc, &lookup, &MergeConfig::default())
    }

    #[test]
    fn test_inline_bold_uses_style() {
        let mut doc = content(r#"<text:p text:style-name="P1">Un &lt;strong&gt;texto&lt;/strong&gt;</text:p>"#);
        assert_eq!(convert(&mut doc, &["Un <strong>texto</strong>"]), 1);
        assert_eq!(
            text_xml(&doc),
            r#"<text:p text:style-name="P1">Un <text:span text:style-name="RichBold">texto</text:span></text:p>"#
        );
        let xml = doc.to_xml();
        assert!(xml.contains(r#"<style:style style:name="RichBold" style:family="text">"#));
        assert!(xml.contains(r#"xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0""#));
        assert!(!xml.contains("&lt;strong&gt;"));
    }

    #[test]
    fn test_combined_flags_nest_spans() {
        let mut doc = content("<text:p>&lt;b&gt;&lt;i&gt;x&lt;/i&gt;&lt;/b&gt;</text:p>");
        convert(&mut doc, &["<b><i>x</i></b>"]);
        assert_eq!(
            text_xml(&doc),
            r#"<text:p><text:span text:style-name="RichBold"><text:span text:style-name="RichItalic">x</text:span></text:span></text:p>"#
        );
    }

    #[test]
    fn test_paragraphs_and_breaks() {
        let mut doc = content(r#"<text:p text:style-name="P2">&lt;p&gt;Primero&lt;/p&gt;&lt;p&gt;Segundo&lt;br&gt;línea&lt;/p&gt;</text:p>"#);
        convert(&mut doc, &["<p>Primero</p><p>Segundo<br>línea</p>"]);
        assert_eq!(
            text_xml(&doc),
            concat!(
                r#"<text:p text:style-name="P2">Primero</text:p>"#,
                r#"<text:p text:style-name="P2">Segundo<text:line-break/>línea</text:p>"#
            )
        );
    }

    #[test]
    fn test_split_paragraphs_do_not_repeat_ids() {
        let mut doc = content(
            r#"<text:p xml:id="id1" text:style-name="P2">A &lt;p&gt;Uno&lt;/p&gt; fin</text:p>"#,
        );
        convert(&mut doc, &["<p>Uno</p>"]);
        let paragraphs = doc.elements_named("text:p");
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(doc.attr(paragraphs[0], "xml:id"), Some("id1"));
        assert!(paragraphs[1..].iter().all(|&p| doc.attr(p, "xml:id").is_none()));
        assert_eq!(doc.attr(paragraphs[2], "text:style-name"), Some("P2"));
        assert_eq!(text_xml(&doc).matches("xml:id").count(), 1);
    }

    #[test]
    fn test_list_in_span() {
        let mut doc = content(
            "<text:p>A <text:span text:style-name=\"T1\">&lt;ul&gt;&lt;li&gt;Uno&lt;/li&gt;&lt;li&gt;Dos&lt;/li&gt;&lt;/ul&gt;</text:span></text:p>",
        );
        convert(&mut doc, &["<ul><li>Uno</li><li>Dos</li></ul>"]);
        assert_eq!(
            text_xml(&doc),
            r#"<text:p>A <text:span text:style-name="T1">• Uno<text:line-break/>• Dos</text:span></text:p>"#
        );
    }

    #[test]
    fn test_link_and_table() {
        let value = r#"<a href="https://example.com">web</a><table><tr><td>1</td><td>2</td></tr></table>"#;
        let mut doc = content(&format!("<text:p>{}</text:p>", crate::util::escape_text(value)));
        convert(&mut doc, &[value]);
        let xml = text_xml(&doc);
        assert!(xml.starts_with(r#"<text:p><text:a xlink:type="simple" xlink:href="https://example.com" text:style-name="RichLink">web</text:a></text:p>"#));
        assert!(xml.contains(r#"<table:table table:name="RichTable1" table:style-name="RichTable"><table:table-column table:number-columns-repeated="2"/>"#));
        assert_eq!(doc.elements_named("table:table-cell").len(), 2);

        let full = doc.to_xml();
        assert!(full.contains("xmlns:xlink="));
        assert!(full.contains("xmlns:table="));
        assert!(full.contains(r#"style:name="RichTableCell""#));
    }

    #[test]
    fn test_spaces_and_rule() {
        let mut doc = content("<text:p>&lt;p&gt;a   b&lt;/p&gt;&lt;hr&gt;</text:p>");
        convert(&mut doc, &["<p>a   b</p><hr>"]);
        assert_eq!(
            text_xml(&doc),
            r#"<text:p>a <text:s text:c="2"/>b</text:p><text:p text:style-name="RichRule"/>"#
        );
    }

    #[test]
    fn test_unmatched_part_is_untouched() {
        let mut doc = content("<text:p>&lt;b&gt;x&lt;/b&gt;</text:p>");
        let before = doc.to_xml();
        assert_eq!(convert(&mut doc, &["<i>y</i>"]), 0);
        assert_eq!(doc.to_xml(), before);
    }

    #[test]
    fn test_recovery_joins_spans() {
        let mut doc = content(
            r#"<text:p>&lt;em<text:span text:style-name="T1">&gt;x&lt;/em&gt;</text:span></text:p>"#,
        );
        let lookup = RichLookup::from_values(["<b>otro</b>"]);
        let config = MergeConfig {
            recover_split_markup: true,
            ..MergeConfig::default()
        };
        assert_eq!(convert_odt(&mut doc, &lookup, &config), 1);
        assert_eq!(
            text_xml(&doc),
            r#"<text:p><text:span text:style-name="RichItalic">x</text:span></text:p>"#
        );
    }
}
