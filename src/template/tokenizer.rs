//! Placeholder tokenizer.
//!
//! Word processors split visible text into runs wherever formatting,
//! spell-check state or revision marks change, so a placeholder typed as
//! `[nombre;type='text']` can be stored across several `<w:t>` or
//! `<text:span>` elements. The tokenizer flattens a part into plain text in
//! which every placeholder is contiguous again, then cuts out the
//! bracketed chunks.

use std::sync::LazyLock;

use regex::Regex;

use crate::package::PackageKind;
use crate::util::{decode_entities, normalize_newlines};

/// `</w:t>` followed by a new run and its text element. The run properties
/// may not contain `</w:r>` or `</w:p>`, so a seam never spans past the
/// next run.
static DOCX_RUN_SEAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</w:t>\s*</w:r>(?:\s*<w:proofErr[^>]*/>)*\s*<w:r(?:\s[^>]*)?>(?:\s*<w:rPr>(?:[^<]|<[^/]|</[^w]|</w:[^rp]|</w:[rp][^>])*?</w:rPr>)?\s*<w:t(?:\s[^>]*)?>")
        .unwrap()
});

/// Two text elements inside one run.
static DOCX_TEXT_SEAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</w:t>\s*<w:t(?:\s[^>]*)?>").unwrap());

static DOCX_SPACERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</w:p>|<w:tab\s*/>|<w:br(?:\s[^>]*)?/>|<w:cr\s*/>").unwrap());

static ODT_SPAN_SEAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</text:span>\s*<text:span(?:\s[^>]*)?>").unwrap());

static ODT_PARAGRAPH_SEAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</text:p>\s*<text:p(?:\s[^>]*)?>").unwrap());

static ODT_SPACERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</text:h>|</text:p>|<text:s(?:\s[^>]*)?/>|<text:tab\s*/>|<text:line-break\s*/>")
        .unwrap()
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Flatten one XML part into text with whole placeholders.
pub fn normalize_part(xml: &str, kind: PackageKind) -> String {
    let merged = match kind {
        PackageKind::Docx => {
            let step = DOCX_RUN_SEAM.replace_all(xml, "");
            let step = DOCX_TEXT_SEAM.replace_all(&step, "");
            DOCX_SPACERS.replace_all(&step, " ").into_owned()
        }
        PackageKind::Odt => {
            let step = ODT_SPAN_SEAM.replace_all(xml, "");
            let step = ODT_PARAGRAPH_SEAM.replace_all(&step, " ");
            ODT_SPACERS.replace_all(&step, " ").into_owned()
        }
    };

    let without_controls: String = merged
        .chars()
        .filter(|&c| !c.is_control() || c == '\n' || c == '\r' || c == '\t')
        .map(|c| if c == '\t' { ' ' } else { c })
        .collect();
    let without_tags = TAG.replace_all(&without_controls, "");
    let decoded = decode_entities(&without_tags);
    normalize_newlines(&decoded).into_owned()
}

/// Cut the bracketed chunks out of flattened text, brackets excluded.
///
/// A `]` inside a quoted value does not close the chunk, and a quote
/// preceded by a backslash does not toggle quoting. An unterminated chunk
/// at the end of the text is dropped.
pub fn placeholder_chunks(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut chunks = Vec::new();
    let mut pos = 0;

    while let Some(offset) = memchr::memchr(b'[', &bytes[pos..]) {
        let start = pos + offset + 1;
        let mut quote: Option<u8> = None;
        let mut prev = 0u8;
        let mut end = None;

        for (i, &b) in bytes[start..].iter().enumerate() {
            match b {
                b'\'' | b'"' if prev != b'\\' => match quote {
                    Some(q) if q == b => quote = None,
                    None => quote = Some(b),
                    _ => {}
                },
                b']' if quote.is_none() => {
                    end = Some(start + i);
                    break;
                }
                // A new opening bracket outside quotes restarts the scan.
                b'[' if quote.is_none() => break,
                _ => {}
            }
            prev = b;
        }

        match end {
            Some(end) => {
                chunks.push(&text[start..end]);
                pos = end + 1;
            }
            None => pos = start,
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docx_runs_are_merged() {
        let xml = concat!(
            r#"<w:p><w:r><w:t>[nom</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>bre;type=</w:t></w:r>"#,
            r#"<w:r><w:t xml:space="preserve">'text']</w:t></w:r></w:p>"#,
        );
        let text = normalize_part(xml, PackageKind::Docx);
        assert_eq!(placeholder_chunks(&text), vec!["nombre;type='text'"]);
    }

    #[test]
    fn test_docx_paragraphs_stay_separated() {
        let xml = "<w:p><w:r><w:t>[a]</w:t></w:r></w:p><w:p><w:r><w:t>x</w:t></w:r></w:p>";
        let text = normalize_part(xml, PackageKind::Docx);
        assert_eq!(text.trim(), "[a] x");
    }

    #[test]
    fn test_odt_spans_are_merged() {
        let xml = concat!(
            r#"<text:p text:style-name="P1">[email;<text:span text:style-name="T1">"#,
            r#"type='email']</text:span></text:p><text:p>[fecha;<text:span>type=</text:span>"#,
            r#"<text:span>'date']</text:span></text:p>"#,
        );
        let text = normalize_part(xml, PackageKind::Odt);
        assert_eq!(
            placeholder_chunks(&text),
            vec!["email;type='email'", "fecha;type='date'"]
        );
    }

    #[test]
    fn test_entities_and_controls() {
        let xml = "<w:t>[t\u{1};title=&apos;A &amp; B&apos;]</w:t>";
        let text = normalize_part(xml, PackageKind::Docx);
        assert_eq!(placeholder_chunks(&text), vec!["t;title='A & B'"]);
    }

    #[test]
    fn test_chunks_respect_quotes() {
        let text = r"[a;pattern='^[0-9]+$'] and [b;title='it\'s'] [c";
        assert_eq!(
            placeholder_chunks(text),
            vec!["a;pattern='^[0-9]+$'", r"b;title='it\'s'"]
        );
    }

    #[test]
    fn test_backslash_only_escapes_quotes() {
        assert_eq!(placeholder_chunks(r"[a\] [b]"), vec![r"a\", "b"]);
    }

    #[test]
    fn test_docx_seam_stops_at_run_end() {
        let xml = concat!(
            "<w:p><w:r><w:t>[a]</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:tab/><w:t>[medio]</w:t></w:r></w:p>",
            "<w:p><w:r><w:rPr><w:i/></w:rPr><w:t>[c]</w:t></w:r></w:p>",
        );
        let text = normalize_part(xml, PackageKind::Docx);
        assert_eq!(placeholder_chunks(&text), vec!["a", "medio", "c"]);
    }

    #[test]
    fn test_docx_seam_keeps_paragraph_space() {
        let xml = concat!(
            "<w:p><w:r><w:t>[uno]</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:br/></w:r></w:p>",
            "<w:p><w:r><w:rPr><w:i/></w:rPr><w:t>[dos]</w:t></w:r></w:p>",
        );
        let text = normalize_part(xml, PackageKind::Docx);
        assert_eq!(text, "[uno]  [dos] ");
    }

    #[test]
    fn test_nested_open_bracket_restarts() {
        assert_eq!(placeholder_chunks("[[x]"), vec!["x"]);
        assert!(placeholder_chunks("no placeholders").is_empty());
    }


    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_docx_split_point_does_not_matter(
                name in "[a-z][a-z0-9_]{0,10}",
                kind in prop_oneof![Just("text"), Just("number"), Just("date")],
                cut in 0usize..64,
            ) {
                let placeholder = format!("[{name};type='{kind}']");
                let cut = cut % (placeholder.len() + 1);
                let (left, right) = placeholder.split_at(cut);
                let xml = format!(
                    "<w:p><w:r><w:t>{left}</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>{right}</w:t></w:r></w:p>"
                );
                let text = normalize_part(&xml, PackageKind::Docx);
                let expected = format!("{name};type='{kind}'");
                prop_assert_eq!(placeholder_chunks(&text), vec![expected.as_str()]);
            }

            #[test]
            fn prop_chunks_are_substrings(text in "[a-z \\[\\]';]{0,40}") {
                for chunk in placeholder_chunks(&text) {
                    prop_assert!(text.contains(chunk));
                    prop_assert!(!chunk.starts_with('['));
                }
            }
        }
    }
}
