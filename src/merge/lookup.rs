//! Rich lookup table: which generated text came from an HTML value.
//!
//! After literal substitution, an HTML field value sits in the document as
//! plain text. The table maps every form that text can take (as submitted,
//! with normalized newlines, entity-decoded, entity-encoded) back to the
//! normalized fragment, and finds those forms in text nodes with one
//! leftmost-longest Aho-Corasick pass.

use aho_corasick::{AhoCorasick, MatchKind};

use super::context::MergeContext;
use crate::html::contains_markup;
use crate::util::{decode_entities, escape_text, normalize_newlines};

/// A piece of a text node after matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text left as it was.
    Plain(&'a str),
    /// HTML to convert to native markup.
    Fragment(&'a str),
}

#[derive(Debug, Default)]
pub struct RichLookup {
    matcher: Option<AhoCorasick>,
    /// Fragment index for each pattern.
    targets: Vec<usize>,
    fragments: Vec<String>,
}

impl RichLookup {
    /// Table of every HTML-bearing string in the context.
    pub fn from_context(context: &MergeContext) -> Self {
        Self::from_values(context.strings())
    }

    /// Values without both `<` and `>` are discarded.
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut patterns: Vec<String> = Vec::new();
        let mut targets = Vec::new();
        let mut fragments: Vec<String> = Vec::new();

        for value in values {
            if !(value.contains('<') && value.contains('>')) {
                continue;
            }
            let normalized = normalize_newlines(value).into_owned();
            if normalized.trim().is_empty() {
                continue;
            }
            let index = match fragments.iter().position(|f| *f == normalized) {
                Some(index) => index,
                None => {
                    fragments.push(normalized.clone());
                    fragments.len() - 1
                }
            };

            let forms = [
                value.to_string(),
                decode_entities(&normalized).into_owned(),
                escape_text(&normalized).into_owned(),
                normalized,
            ];
            for form in forms {
                if !form.is_empty() && !patterns.contains(&form) {
                    patterns.push(form);
                    targets.push(index);
                }
            }
        }

        if patterns.is_empty() {
            return Self::default();
        }

        let matcher = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostLongest)
            .build(&patterns);
        match matcher {
            Ok(matcher) => Self {
                matcher: Some(matcher),
                targets,
                fragments,
            },
            Err(e) => {
                log::warn!("cannot build rich lookup table: {e}");
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matcher.is_none()
    }

    /// Number of distinct HTML fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Split `text` into plain and fragment segments.
    ///
    /// Returns `None` when nothing matches, so callers can leave the node
    /// untouched. Text is matched after entity decoding.
    pub fn segments<'a>(&'a self, text: &'a str) -> Option<Vec<Segment<'a>>> {
        let matcher = self.matcher.as_ref()?;
        matcher.find(text)?;

        let mut segments = Vec::new();
        let mut last = 0;
        for m in matcher.find_iter(text) {
            if m.start() > last {
                segments.push(Segment::Plain(&text[last..m.start()]));
            }
            let fragment = &self.fragments[self.targets[m.pattern().as_usize()]];
            segments.push(Segment::Fragment(fragment));
            last = m.end();
        }
        if last < text.len() {
            segments.push(Segment::Plain(&text[last..]));
        }
        Some(segments)
    }
}

/// Segments of a text node, or `None` to leave it as is.
///
/// With `recover` set, text that contains recognised tags but no table
/// entry is converted whole.
pub(crate) fn match_text<'a>(
    lookup: &'a RichLookup,
    decoded: &'a str,
    recover: bool,
) -> Option<Vec<Segment<'a>>> {
    match lookup.segments(decoded) {
        Some(segments) => Some(segments),
        None if recover && !lookup.is_empty() && contains_markup(decoded) => {
            Some(vec![Segment::Fragment(decoded)])
        }
        None => None,
    }
}
