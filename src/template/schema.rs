//! Template schema and the builder that assembles it from tokens.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::descriptor::{FieldDescriptor, Token, sanitize_key};
use crate::package::PackageKind;

/// Version of the persisted schema layout.
pub const SCHEMA_VERSION: u32 = 2;

/// Fields and repeaters extracted from one template.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<FieldDescriptor>,
    pub repeaters: Vec<RepeaterBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<SchemaMeta>,
}

/// A repeatable template region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeaterBlock {
    pub slug: String,
    /// Name of the begin marker that opened the block.
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    pub fields: Vec<FieldDescriptor>,
}

/// Where a schema came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMeta {
    /// Layout version, [`SCHEMA_VERSION`] for schemas written by this crate.
    pub version: u32,
    pub template_kind: PackageKind,
    pub template_name: String,
    /// SHA-1 of the template bytes, hex encoded.
    pub hash: String,
}

impl Schema {
    /// Look up a top-level field by slug.
    pub fn field(&self, slug: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.slug == slug)
    }

    pub fn repeater(&self, slug: &str) -> Option<&RepeaterBlock> {
        self.repeaters.iter().find(|r| r.slug == slug)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.repeaters.is_empty()
    }

    /// Build a schema from tokens in document order.
    pub fn from_tokens(tokens: impl IntoIterator<Item = Token>) -> Self {
        let mut builder = SchemaBuilder::new();
        for token in tokens {
            builder.push(token);
        }
        builder.finish()
    }
}

/// Accumulates tokens into a [`Schema`].
///
/// Repeaters are one level deep: a `block=begin` inside an open repeater is
/// ignored together with its matching `block=end`, and its fields stay in
/// the outer repeater. Unbalanced `block=end` markers are ignored and a
/// repeater still open at the end is closed implicitly.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldDescriptor>,
    field_slugs: HashSet<String>,
    repeaters: Vec<RepeaterBlock>,
    repeater_slugs: HashSet<String>,
    /// Field slugs used inside each repeater.
    repeater_field_slugs: Vec<HashSet<String>>,
    /// Index of the open repeater.
    open: Option<usize>,
    /// Nested begin markers swallowed inside the open repeater.
    ignored_depth: usize,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: Token) {
        match token {
            Token::BlockBegin {
                name,
                repeat,
                parameters,
            } => {
                if self.open.is_some() {
                    log::debug!("ignoring nested block '{name}' inside an open repeater");
                    self.ignored_depth += 1;
                    return;
                }
                self.open_repeater(name, repeat, parameters);
            }
            Token::BlockEnd { name } => {
                if self.ignored_depth > 0 {
                    self.ignored_depth -= 1;
                } else if self.open.take().is_none() {
                    log::debug!("ignoring unbalanced block end '{name}'");
                }
            }
            Token::Field(field) => match self.open {
                Some(index) => {
                    let field = dedupe(field, &mut self.repeater_field_slugs[index]);
                    self.repeaters[index].fields.push(field);
                }
                None => {
                    let field = dedupe(field, &mut self.field_slugs);
                    self.fields.push(field);
                }
            },
        }
    }

    fn open_repeater(
        &mut self,
        name: String,
        repeat: String,
        mut parameters: BTreeMap<String, String>,
    ) {
        let base = sanitize_key(&repeat);
        let base = if base.is_empty() { "items".to_string() } else { base };
        let (slug, _) = unique_slug(base, &mut self.repeater_slugs);

        let title = parameters
            .remove("title")
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| title_from_slug(&slug));
        let description = parameters.remove("description").filter(|d| !d.trim().is_empty());

        self.repeaters.push(RepeaterBlock {
            slug,
            name,
            title,
            description,
            parameters,
            fields: Vec::new(),
        });
        self.repeater_field_slugs.push(HashSet::new());
        self.open = Some(self.repeaters.len() - 1);
    }

    pub fn finish(self) -> Schema {
        Schema {
            fields: self.fields,
            repeaters: self.repeaters,
            meta: None,
        }
    }
}

/// Suffix repeated slugs with `_N` (starting at 2) and derive missing titles.
fn dedupe(mut field: FieldDescriptor, used: &mut HashSet<String>) -> FieldDescriptor {
    let (slug, duplicate) = unique_slug(std::mem::take(&mut field.slug), used);
    field.slug = slug;
    field.is_duplicate = duplicate;
    if field.title.is_empty() {
        field.title = title_from_slug(&field.slug);
    }
    field
}

/// Reserve `base` or the first free `base_N`; the flag tells whether a suffix was needed.
fn unique_slug(base: String, used: &mut HashSet<String>) -> (String, bool) {
    if used.insert(base.clone()) {
        return (base, false);
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}_{n}");
        if used.insert(candidate.clone()) {
            return (candidate, true);
        }
        n += 1;
    }
}

/// `fecha_alta-2` -> `Fecha Alta 2`.
pub fn title_from_slug(slug: &str) -> String {
    slug.split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
