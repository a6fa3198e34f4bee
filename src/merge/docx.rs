//! WordprocessingML emitter.
//!
//! Each `w:t` whose text holds a known fragment is replaced by native
//! runs. Inline fragments stay in the host paragraph. Block fragments
//! split it: the runs before the fragment stay in the original `w:p`,
//! the blocks follow as new paragraphs and tables, and whatever came after
//! moves to a new paragraph with the same properties.

use super::MergeConfig;
use super::layout::{Block, Inline, ListMarkers, RunFormat, layout};
use super::lookup::{RichLookup, Segment, match_text};
use super::relationships::RelationshipRegistry;
use super::replace_text;
use crate::html::{markup_tag_count, parse_fragment};
use crate::util::decode_entities;
use crate::xml::{Attr, NodeId, XmlDocument, ensure_namespace, ns};

/// Schema order of `w:rPr` children.
const RPR_ORDER: &[&str] = &[
    "w:rStyle", "w:rFonts", "w:b", "w:bCs", "w:i", "w:iCs", "w:caps", "w:smallCaps",
    "w:strike", "w:dstrike", "w:outline", "w:shadow", "w:emboss", "w:imprint", "w:noProof",
    "w:snapToGrid", "w:vanish", "w:webHidden", "w:color", "w:spacing", "w:w", "w:kern",
    "w:position", "w:sz", "w:szCs", "w:highlight", "w:u", "w:effect", "w:bdr", "w:shd",
    "w:fitText", "w:vertAlign", "w:rtl", "w:cs", "w:em", "w:lang", "w:eastAsianLayout",
    "w:specVanish", "w:oMath",
];

const TABLE_BORDERS: &[&str] = &["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"];

/// Paragraph attributes that identify one paragraph in the part.
const PARAGRAPH_IDS: &[&str] = &["w14:paraId", "w14:textId"];

/// Usable page width in twentieths of a point.
const TABLE_WIDTH: usize = 9000;

/// Convert every matching text element of a part. Returns the number of
/// fragments converted.
pub(crate) fn convert_docx(
    doc: &mut XmlDocument,
    lookup: &RichLookup,
    rels: &mut RelationshipRegistry,
    config: &MergeConfig,
) -> usize {
    let recover = config.recover_split_markup && !lookup.is_empty();
    if recover {
        let merged = coalesce_split_markup(doc);
        if merged > 0 {
            log::debug!("coalesced split markup in {merged} paragraph(s)");
        }
    }

    let targets = doc.elements_named("w:t");
    let mut converter = DocxConverter {
        doc: &mut *doc,
        rels,
        markers: config.markers(),
        hyperlinks: false,
    };
    let mut converted = 0;
    for t in targets {
        converted += converter.convert_text(t, lookup, recover);
    }

    if converter.hyperlinks {
        ensure_namespace(doc, "r", ns::R);
    }
    converted
}

enum Piece {
    Nodes(Vec<NodeId>),
    Blocks(Vec<Block>),
}

struct DocxConverter<'a> {
    doc: &'a mut XmlDocument,
    rels: &'a mut RelationshipRegistry,
    markers: ListMarkers<'a>,
    hyperlinks: bool,
}

impl DocxConverter<'_> {
    fn convert_text(&mut self, t: NodeId, lookup: &RichLookup, recover: bool) -> usize {
        let raw = self.doc.text_content(t);
        if raw.is_empty() {
            return 0;
        }
        let decoded = decode_entities(&raw);
        let Some(segments) = match_text(lookup, &decoded, recover) else {
            return 0;
        };

        let run = self.doc.parent(t);
        if self.doc.name(run) != Some("w:r") {
            return 0;
        }
        let container = self.doc.parent(run);
        let in_paragraph = self.doc.name(container) == Some("w:p");
        let base = self.doc.first_child_named(run, "w:rPr");

        let (before, after) = self.run_content_around(run, t);
        let mut pieces = Vec::new();
        let mut fragments = 0;

        if !before.is_empty() {
            pieces.push(Piece::Nodes(vec![self.run_holding(run, base, before)]));
        }
        for segment in segments {
            match segment {
                Segment::Plain(text) if text.is_empty() => {}
                Segment::Plain(text) => {
                    let node = self.text_run(run, base, &RunFormat::default(), text);
                    pieces.push(Piece::Nodes(vec![node]));
                }
                Segment::Fragment(html) => {
                    fragments += 1;
                    let laid = layout(&parse_fragment(html), self.markers);
                    match laid.inlines() {
                        Some(inlines) => {
                            let nodes = self.inline_nodes(run, base, inlines, in_paragraph);
                            pieces.push(Piece::Nodes(nodes));
                        }
                        None if in_paragraph => pieces.push(Piece::Blocks(laid.blocks)),
                        None => {
                            let nodes = self.inline_nodes(run, base, &laid.flattened(), false);
                            pieces.push(Piece::Nodes(nodes));
                        }
                    }
                }
            }
        }
        if !after.is_empty() {
            pieces.push(Piece::Nodes(vec![self.run_holding(run, base, after)]));
        }

        if pieces.iter().any(|p| matches!(p, Piece::Blocks(_))) {
            self.split_paragraph(container, run, base, pieces);
        } else {
            for piece in pieces {
                if let Piece::Nodes(nodes) = piece {
                    for node in nodes {
                        self.doc.insert_before(run, node);
                    }
                }
            }
            self.doc.detach(run);
        }
        fragments
    }

    /// Run children before and after `t`, run properties excluded.
    fn run_content_around(&self, run: NodeId, t: NodeId) -> (Vec<NodeId>, Vec<NodeId>) {
        let mut before = Vec::new();
        let mut after = Vec::new();
        let mut seen = false;
        for child in self.doc.children(run) {
            if child == t {
                seen = true;
            } else if self.doc.name(child) == Some("w:rPr") {
                continue;
            } else if seen {
                after.push(child);
            } else {
                before.push(child);
            }
        }
        (before, after)
    }

    /// A copy of `run` (attributes and properties) holding `content`.
    fn run_holding(&mut self, run: NodeId, base: Option<NodeId>, content: Vec<NodeId>) -> NodeId {
        let copy = self.doc.shallow_clone(run);
        if let Some(rpr) = base {
            let rpr = self.doc.deep_clone(rpr);
            self.doc.append(copy, rpr);
        }
        for node in content {
            self.doc.append(copy, node);
        }
        copy
    }

    fn new_run(&mut self, run: NodeId, base: Option<NodeId>, format: &RunFormat) -> NodeId {
        let copy = self.doc.shallow_clone(run);
        if let Some(rpr) = self.run_properties(base, format) {
            self.doc.append(copy, rpr);
        }
        copy
    }

    fn text_run(
        &mut self,
        run: NodeId,
        base: Option<NodeId>,
        format: &RunFormat,
        text: &str,
    ) -> NodeId {
        let r = self.new_run(run, base, format);
        for (i, piece) in text.split('\t').enumerate() {
            if i > 0 {
                self.doc.append_element(r, "w:tab", vec![]);
            }
            if !piece.is_empty() {
                let t = self
                    .doc
                    .append_element(r, "w:t", vec![Attr::new("xml:space", "preserve")]);
                let content = self.doc.create_text(piece);
                self.doc.append(t, content);
            }
        }
        r
    }

    fn break_run(&mut self, run: NodeId, base: Option<NodeId>) -> NodeId {
        let r = self.new_run(run, base, &RunFormat::default());
        self.doc.append_element(r, "w:br", vec![]);
        r
    }

    /// `base` with the flags of `format` applied, or `None` if there is
    /// nothing to set.
    fn run_properties(&mut self, base: Option<NodeId>, format: &RunFormat) -> Option<NodeId> {
        if base.is_none() && format.is_plain() {
            return None;
        }
        let rpr = match base {
            Some(base) => self.doc.deep_clone(base),
            None => self.doc.create_element("w:rPr", vec![]),
        };
        if format.link.is_some() {
            self.set_property(rpr, "w:rStyle", vec![Attr::new("w:val", "Hyperlink")]);
            self.set_property(rpr, "w:color", vec![Attr::new("w:val", "0563C1")]);
            self.set_property(rpr, "w:u", vec![Attr::new("w:val", "single")]);
        }
        if format.bold {
            self.set_property(rpr, "w:b", vec![]);
            self.set_property(rpr, "w:bCs", vec![]);
        }
        if format.italic {
            self.set_property(rpr, "w:i", vec![]);
            self.set_property(rpr, "w:iCs", vec![]);
        }
        if format.underline {
            self.set_property(rpr, "w:u", vec![Attr::new("w:val", "single")]);
        }
        Some(rpr)
    }

    /// Replace any `name` child of `rpr` with a fresh one, in schema order.
    fn set_property(&mut self, rpr: NodeId, name: &str, attrs: Vec<Attr>) {
        let existing: Vec<_> = self
            .doc
            .children(rpr)
            .filter(|&c| self.doc.name(c) == Some(name))
            .collect();
        for node in existing {
            self.doc.detach(node);
        }

        let rank = rpr_rank(name);
        let next = self
            .doc
            .children(rpr)
            .find(|&c| self.doc.name(c).is_some_and(|n| rpr_rank(n) > rank));
        let property = self.doc.create_element(name, attrs);
        match next {
            Some(next) => self.doc.insert_before(next, property),
            None => self.doc.append(rpr, property),
        }
    }

    /// Runs for `inlines`, with linked runs grouped into `w:hyperlink`.
    fn inline_nodes(
        &mut self,
        run: NodeId,
        base: Option<NodeId>,
        inlines: &[Inline],
        allow_links: bool,
    ) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut open: Option<(String, NodeId)> = None;

        for inline in inlines {
            let (node, link) = match inline {
                Inline::Text { text, format } => {
                    (self.text_run(run, base, format, text), format.link.clone())
                }
                Inline::Break => (self.break_run(run, base), None),
            };

            match link.filter(|_| allow_links) {
                Some(href) => match &open {
                    Some((current, hyperlink)) if *current == href => {
                        self.doc.append(*hyperlink, node);
                    }
                    _ => {
                        let id = self.rels.register(&href);
                        let hyperlink = self.doc.create_element(
                            "w:hyperlink",
                            vec![Attr::new("r:id", id), Attr::new("w:history", "1")],
                        );
                        self.doc.append(hyperlink, node);
                        self.hyperlinks = true;
                        out.push(hyperlink);
                        open = Some((href, hyperlink));
                    }
                },
                None => {
                    open = None;
                    out.push(node);
                }
            }
        }
        out
    }

    fn split_paragraph(&mut self, p: NodeId, run: NodeId, base: Option<NodeId>, pieces: Vec<Piece>) {
        let ppr = self.doc.first_child_named(p, "w:pPr");

        let mut trailing = Vec::new();
        let mut next = self.doc.next_sibling(run);
        while next.is_some() {
            trailing.push(next);
            next = self.doc.next_sibling(next);
        }
        for &node in &trailing {
            self.doc.detach(node);
        }
        self.doc.detach(run);

        let mut current = p;
        let mut last = p;
        let mut created = Vec::new();
        for piece in pieces {
            match piece {
                Piece::Nodes(nodes) => {
                    for node in nodes {
                        self.doc.append(current, node);
                    }
                }
                Piece::Blocks(blocks) => {
                    for block in &blocks {
                        let node = self.block(block, p, run, base, ppr);
                        self.doc.insert_after(last, node);
                        last = node;
                    }
                    let next = self.paragraph_like(p, ppr);
                    self.doc.insert_after(last, next);
                    last = next;
                    current = next;
                    created.push(next);
                }
            }
        }
        for node in trailing {
            self.doc.append(current, node);
        }

        // Section properties belong to the last paragraph of the section.
        if current != p
            && let Some(ppr) = ppr
            && let Some(sect) = self.doc.first_child_named(ppr, "w:sectPr")
        {
            let previous = self.doc.get(current).map(|n| n.prev_sibling);
            let holder = match previous {
                Some(prev) if !self.has_content(current) && self.doc.name(prev) == Some("w:p") => {
                    prev
                }
                _ => current,
            };
            let target = match self.doc.first_child_named(holder, "w:pPr") {
                Some(existing) => existing,
                None => {
                    let fresh = self.doc.create_element("w:pPr", vec![]);
                    self.doc.prepend(holder, fresh);
                    fresh
                }
            };
            self.doc.append(target, sect);
        }

        for para in std::iter::once(p).chain(created) {
            if self.is_disposable(para) {
                self.doc.detach(para);
            }
        }
    }

    fn has_content(&self, p: NodeId) -> bool {
        self.doc
            .children(p)
            .any(|c| self.doc.name(c) != Some("w:pPr"))
    }

    /// An empty paragraph that can be dropped without changing the document.
    fn is_disposable(&self, p: NodeId) -> bool {
        if self.has_content(p) {
            return false;
        }
        let has_sect = self
            .doc
            .first_child_named(p, "w:pPr")
            .is_some_and(|ppr| self.doc.first_child_named(ppr, "w:sectPr").is_some());
        if has_sect {
            return false;
        }
        // A table cell must end with a paragraph.
        let parent = self.doc.parent(p);
        !(self.doc.name(parent) == Some("w:tc") && self.doc.next_sibling(p).is_none())
    }

    /// Copy of `p` with its paragraph properties, minus section properties
    /// and the ids that must stay unique.
    fn paragraph_like(&mut self, p: NodeId, ppr: Option<NodeId>) -> NodeId {
        let copy = self.doc.shallow_clone(p);
        for id in PARAGRAPH_IDS {
            self.doc.remove_attr(copy, id);
        }
        if let Some(ppr) = ppr {
            let props = self.doc.deep_clone(ppr);
            if let Some(sect) = self.doc.first_child_named(props, "w:sectPr") {
                self.doc.detach(sect);
            }
            self.doc.append(copy, props);
        }
        copy
    }

    fn block(
        &mut self,
        block: &Block,
        p: NodeId,
        run: NodeId,
        base: Option<NodeId>,
        ppr: Option<NodeId>,
    ) -> NodeId {
        match block {
            Block::Paragraph(inlines) => {
                let para = self.paragraph_like(p, ppr);
                for node in self.inline_nodes(run, base, inlines, true) {
                    self.doc.append(para, node);
                }
                para
            }
            Block::Table(rows) => self.table(rows, run, base),
            Block::Rule => {
                let para = self.doc.create_element("w:p", vec![]);
                let props = self.doc.append_element(para, "w:pPr", vec![]);
                let borders = self.doc.append_element(props, "w:pBdr", vec![]);
                self.doc.append_element(
                    borders,
                    "w:bottom",
                    vec![
                        Attr::new("w:val", "single"),
                        Attr::new("w:sz", "6"),
                        Attr::new("w:space", "1"),
                        Attr::new("w:color", "auto"),
                    ],
                );
                para
            }
        }
    }

    fn table(&mut self, rows: &[Vec<Vec<Inline>>], run: NodeId, base: Option<NodeId>) -> NodeId {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let width = (TABLE_WIDTH / columns).to_string();

        let tbl = self.doc.create_element("w:tbl", vec![]);
        let props = self.doc.append_element(tbl, "w:tblPr", vec![]);
        self.doc.append_element(
            props,
            "w:tblW",
            vec![Attr::new("w:w", "0"), Attr::new("w:type", "auto")],
        );
        let borders = self.doc.append_element(props, "w:tblBorders", vec![]);
        for side in TABLE_BORDERS {
            self.doc.append_element(
                borders,
                *side,
                vec![
                    Attr::new("w:val", "single"),
                    Attr::new("w:sz", "4"),
                    Attr::new("w:space", "0"),
                    Attr::new("w:color", "000000"),
                ],
            );
        }

        let grid = self.doc.append_element(tbl, "w:tblGrid", vec![]);
        for _ in 0..columns {
            self.doc
                .append_element(grid, "w:gridCol", vec![Attr::new("w:w", width.as_str())]);
        }

        for row in rows {
            let tr = self.doc.append_element(tbl, "w:tr", vec![]);
            for index in 0..columns {
                let tc = self.doc.append_element(tr, "w:tc", vec![]);
                let tc_props = self.doc.append_element(tc, "w:tcPr", vec![]);
                self.doc.append_element(
                    tc_props,
                    "w:tcW",
                    vec![Attr::new("w:w", width.as_str()), Attr::new("w:type", "dxa")],
                );
                let para = self.doc.append_element(tc, "w:p", vec![]);
                if let Some(cell) = row.get(index) {
                    for node in self.inline_nodes(run, base, cell, true) {
                        self.doc.append(para, node);
                    }
                }
            }
        }
        tbl
    }
}

fn rpr_rank(name: &str) -> usize {
    RPR_ORDER
        .iter()
        .position(|&n| n == name)
        .unwrap_or(RPR_ORDER.len())
}

/// Move the text of paragraphs whose tags are split across runs into the
/// paragraph's first text element. Returns the number of paragraphs merged.
fn coalesce_split_markup(doc: &mut XmlDocument) -> usize {
    let mut merged = 0;
    for p in doc.elements_named("w:p") {
        let texts: Vec<NodeId> = doc
            .descendants(p)
            .into_iter()
            .filter(|&n| {
                doc.name(n) == Some("w:t") && doc.ancestor_named(doc.parent(n), &["w:p"]) == Some(p)
            })
            .collect();
        if texts.len() < 2 {
            continue;
        }

        let pieces: Vec<String> = texts.iter().map(|&t| doc.text_content(t)).collect();
        let joined = pieces.concat();
        let whole = markup_tag_count(&joined);
        let separate: usize = pieces.iter().map(|s| markup_tag_count(s)).sum();
        if whole == 0 || whole <= separate {
            continue;
        }

        replace_text(doc, texts[0], &joined);
        doc.set_attr(texts[0], "xml:space", "preserve");
        for &t in &texts[1..] {
            let run = doc.parent(t);
            doc.detach(t);
            let empty = doc.children(run).all(|c| doc.name(c) == Some("w:rPr"));
            if empty && doc.name(run) == Some("w:r") {
                doc.detach(run);
            }
        }
        merged += 1;
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    fn document(body: &str) -> XmlDocument {
        XmlDocument::parse(&format!("<w:document {W}><w:body>{body}</w:body></w:document>")).unwrap()
    }

    fn body_xml(doc: &XmlDocument) -> String {
        let body = doc.elements_named("w:body")[0];
        doc.children(body).map(|c| doc.node_to_xml(c)).collect()
    }

    fn convert(doc: &mut XmlDocument, values: &[&str]) -> (usize, RelationshipRegistry) {
        let lookup = RichLookup::from_values(values.iter().copied());
        let mut rels = RelationshipRegistry::new();
        let n = convert_docx(doc, &lookup, &mut rels, &MergeConfig::default());
        (n, rels)
    }

    #[test]
    fn test_inline_bold() {
        let mut doc = document("<w:p><w:r><w:t>Un &lt;strong&gt;texto&lt;/strong&gt;</w:t></w:r></w:p>");
        let (n, _) = convert(&mut doc, &["Un <strong>texto</strong>"]);
        assert_eq!(n, 1);
        assert_eq!(
            body_xml(&doc),
            concat!(
                r#"<w:p><w:r><w:t xml:space="preserve">Un </w:t></w:r>"#,
                r#"<w:r><w:rPr><w:b/><w:bCs/></w:rPr><w:t xml:space="preserve">texto</w:t></w:r></w:p>"#
            )
        );
    }

    #[test]
    fn test_run_properties_are_kept_in_order() {
        let mut doc = document(
            r#"<w:p><w:r w:rsidR="00A1"><w:rPr><w:rFonts w:ascii="Arial"/><w:sz w:val="20"/></w:rPr><w:t>&lt;i&gt;x&lt;/i&gt;</w:t></w:r></w:p>"#,
        );
        convert(&mut doc, &["<i>x</i>"]);
        assert_eq!(
            body_xml(&doc),
            r#"<w:p><w:r w:rsidR="00A1"><w:rPr><w:rFonts w:ascii="Arial"/><w:i/><w:iCs/><w:sz w:val="20"/></w:rPr><w:t xml:space="preserve">x</w:t></w:r></w:p>"#
        );
    }

    #[test]
    fn test_paragraphs_split_host() {
        let mut doc = document(
            r#"<w:p><w:pPr><w:jc w:val="both"/></w:pPr><w:r><w:t>A: &lt;p&gt;Primero&lt;/p&gt;&lt;p&gt;Segundo&lt;/p&gt; fin</w:t></w:r></w:p>"#,
        );
        convert(&mut doc, &["<p>Primero</p><p>Segundo</p>"]);
        let xml = body_xml(&doc);
        assert!(!xml.contains("&lt;p&gt;"));
        assert_eq!(doc.elements_named("w:p").len(), 4);
        assert_eq!(
            xml,
            concat!(
                r#"<w:p><w:pPr><w:jc w:val="both"/></w:pPr><w:r><w:t xml:space="preserve">A: </w:t></w:r></w:p>"#,
                r#"<w:p><w:pPr><w:jc w:val="both"/></w:pPr><w:r><w:t xml:space="preserve">Primero</w:t></w:r></w:p>"#,
                r#"<w:p><w:pPr><w:jc w:val="both"/></w:pPr><w:r><w:t xml:space="preserve">Segundo</w:t></w:r></w:p>"#,
                r#"<w:p><w:pPr><w:jc w:val="both"/></w:pPr><w:r><w:t xml:space="preserve"> fin</w:t></w:r></w:p>"#
            )
        );
    }

    #[test]
    fn test_split_paragraphs_do_not_repeat_ids() {
        let mut doc = document(
            r#"<w:p w14:paraId="1A2B3C4D" w14:textId="77777777" w:rsidR="00A1"><w:r><w:t>A: &lt;p&gt;Uno&lt;/p&gt; fin</w:t></w:r></w:p>"#,
        );
        convert(&mut doc, &["<p>Uno</p>"]);
        let paragraphs = doc.elements_named("w:p");
        assert_eq!(paragraphs.len(), 3);
        let with_id: Vec<_> = paragraphs
            .iter()
            .filter(|&&p| doc.attr(p, "w14:paraId").is_some())
            .collect();
        assert_eq!(with_id, vec![&paragraphs[0]]);
        assert!(paragraphs.iter().all(|&p| doc.attr(p, "w:rsidR") == Some("00A1")));
        assert_eq!(body_xml(&doc).matches("w14:textId").count(), 1);
    }

    #[test]
    fn test_whole_paragraph_value_leaves_no_empty_host() {
        let mut doc = document("<w:p><w:r><w:t>&lt;ul&gt;&lt;li&gt;Uno&lt;/li&gt;&lt;li&gt;Dos&lt;/li&gt;&lt;/ul&gt;</w:t></w:r></w:p>");
        convert(&mut doc, &["<ul><li>Uno</li><li>Dos</li></ul>"]);
        let xml = body_xml(&doc);
        assert!(!xml.contains("&lt;ul&gt;") && !xml.contains("&lt;li&gt;"));
        assert_eq!(doc.elements_named("w:p").len(), 2);
        assert!(xml.contains("<w:t xml:space=\"preserve\">• Uno</w:t>"));
        assert!(xml.contains("Dos"));
    }

    #[test]
    fn test_section_properties_move_to_last_paragraph() {
        let mut doc = document(
            r#"<w:p><w:pPr><w:sectPr><w:pgSz w:w="11906"/></w:sectPr></w:pPr><w:r><w:t>x&lt;hr&gt;y</w:t></w:r></w:p>"#,
        );
        convert(&mut doc, &["x<hr>y"]);
        let paragraphs = doc.elements_named("w:p");
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(doc.elements_named("w:sectPr").len(), 1);
        let last = *paragraphs.last().unwrap();
        assert!(doc.node_to_xml(last).contains("<w:sectPr>"));
        assert!(doc.node_to_xml(paragraphs[1]).contains("<w:pBdr><w:bottom"));
    }

    #[test]
    fn test_hyperlinks_share_relationships() {
        let mut doc = document(
            r#"<w:p><w:r><w:t>&lt;a href="https://example.com"&gt;uno&lt;/a&gt; y &lt;a href="https://example.com"&gt;dos&lt;/a&gt;</w:t></w:r></w:p>"#,
        );
        let (_, rels) = convert(
            &mut doc,
            &[r#"<a href="https://example.com">uno</a> y <a href="https://example.com">dos</a>"#],
        );
        let links = doc.elements_named("w:hyperlink");
        assert_eq!(links.len(), 2);
        assert_eq!(doc.attr(links[0], "r:id"), Some("rId1"));
        assert_eq!(doc.attr(links[1], "r:id"), Some("rId1"));
        assert_eq!(rels.added(), 1);
        let root = doc.root().unwrap();
        assert_eq!(doc.attr(root, "xmlns:r"), Some(ns::R));
        assert!(doc.node_to_xml(links[0]).contains(r#"<w:rStyle w:val="Hyperlink"/>"#));
    }

    #[test]
    fn test_table() {
        let mut doc = document("<w:p><w:r><w:t>&lt;table&gt;&lt;tr&gt;&lt;th&gt;A&lt;/th&gt;&lt;th&gt;B&lt;/th&gt;&lt;/tr&gt;&lt;tr&gt;&lt;td&gt;1&lt;/td&gt;&lt;/tr&gt;&lt;/table&gt;</w:t></w:r></w:p>");
        convert(&mut doc, &["<table><tr><th>A</th><th>B</th></tr><tr><td>1</td></tr></table>"]);
        assert_eq!(doc.elements_named("w:tbl").len(), 1);
        assert_eq!(doc.elements_named("w:tr").len(), 2);
        assert_eq!(doc.elements_named("w:tc").len(), 4);
        assert_eq!(doc.elements_named("w:gridCol").len(), 2);
        assert_eq!(doc.elements_named("w:insideV").len(), 1);
        let body = doc.elements_named("w:body")[0];
        assert_eq!(doc.children(body).count(), 1);
        assert_eq!(doc.elements_named("w:b").len(), 2);
    }

    #[test]
    fn test_blocks_inside_hyperlink_degrade_to_breaks() {
        let mut doc = document(
            r#"<w:p><w:hyperlink r:id="rId9"><w:r><w:t>&lt;p&gt;a&lt;/p&gt;&lt;p&gt;b&lt;/p&gt;</w:t></w:r></w:hyperlink></w:p>"#,
        );
        convert(&mut doc, &["<p>a</p><p>b</p>"]);
        assert_eq!(doc.elements_named("w:p").len(), 1);
        assert_eq!(doc.elements_named("w:br").len(), 1);
    }

    #[test]
    fn test_unmatched_text_is_untouched() {
        let body = "<w:p><w:r><w:t>&lt;b&gt;otro&lt;/b&gt;</w:t></w:r></w:p>";
        let mut doc = document(body);
        let (n, rels) = convert(&mut doc, &["<i>x</i>"]);
        assert_eq!(n, 0);
        assert!(!rels.is_dirty());
        assert_eq!(body_xml(&doc), body);
    }

    #[test]
    fn test_recovery_merges_split_tags() {
        let mut doc = document(
            "<w:p><w:r><w:t>&lt;str</w:t></w:r><w:r><w:rPr><w:i/></w:rPr><w:t>ong&gt;x&lt;/strong&gt;</w:t></w:r></w:p>",
        );
        let lookup = RichLookup::from_values(["<em>otro</em>"]);
        let mut rels = RelationshipRegistry::new();
        let config = MergeConfig {
            recover_split_markup: true,
            ..MergeConfig::default()
        };
        assert_eq!(convert_docx(&mut doc, &lookup, &mut rels, &config), 1);
        assert_eq!(
            body_xml(&doc),
            r#"<w:p><w:r><w:rPr><w:b/><w:bCs/></w:rPr><w:t xml:space="preserve">x</w:t></w:r></w:p>"#
        );
    }
}
