//! Field descriptor parser.
//!
//! Turns the inside of one `[...]` placeholder into a [`Token`]: either a
//! field with its declared attributes or a repeater boundary marker.
//!
//! ```text
//! [nombre;type='text';title='Nombre completo';length='80']
//! [items;block=begin;repeat=items]
//! [items;block=end]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::util::decode_entities;

/// Input type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Textarea,
    Html,
    Number,
    Date,
    Email,
    Url,
}

impl FieldType {
    /// Map a declared `type` value (aliases included) to a field type.
    ///
    /// Unknown values fall back to [`FieldType::Text`].
    pub fn from_declared(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "textarea" | "text-area" | "text_area" => FieldType::Textarea,
            "html" | "rich" | "tinymce" | "editor" => FieldType::Html,
            "number" | "numeric" | "int" | "integer" | "float" | "decimal" => FieldType::Number,
            "date" => FieldType::Date,
            "email" => FieldType::Email,
            "url" => FieldType::Url,
            _ => FieldType::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Html => "html",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Email => "email",
            FieldType::Url => "url",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One merge field of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Form identifier; unique within its scope after de-duplication.
    pub slug: String,
    /// Name the merge step binds the submitted value to.
    pub merge_key: String,
    /// Empty until the schema builder derives one.
    pub title: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(rename = "patternmsg", default, skip_serializing_if = "Option::is_none")]
    pub pattern_message: Option<String>,
    #[serde(rename = "minvalue", default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<String>,
    #[serde(rename = "maxvalue", default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default)]
    pub is_duplicate: bool,
    pub original_name: String,
    /// Parameters without a first-class attribute.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

/// A parsed placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Field(FieldDescriptor),
    /// `block=begin`; `repeat` falls back to the placeholder name.
    BlockBegin {
        name: String,
        repeat: String,
        parameters: BTreeMap<String, String>,
    },
    BlockEnd {
        name: String,
    },
}

/// Parameter keys promoted to descriptor attributes.
const KNOWN_KEYS: &[&str] = &[
    "type",
    "title",
    "placeholder",
    "description",
    "pattern",
    "patternmsg",
    "minvalue",
    "maxvalue",
    "length",
];

/// Parse the text between `[` and `]`.
///
/// Returns `None` for an empty name or for bracketed text that is not a
/// field name (anything beyond letters, digits, `_`, `-` and spaces).
pub fn parse_placeholder(raw: &str) -> Option<Token> {
    let decoded = decode_entities(raw.trim());
    if decoded.starts_with(';') {
        return None;
    }
    let mut segments = split_segments(&decoded).into_iter();

    let name = segments.next()?.trim().to_string();
    if name.is_empty() {
        return None;
    }

    let mut parameters = BTreeMap::new();
    for segment in segments {
        let (key, value) = parse_parameter(&segment);
        if !key.is_empty() {
            parameters.insert(key, value);
        }
    }

    match parameters.get("block").map(|b| b.to_ascii_lowercase()) {
        Some(mode) if mode == "begin" => {
            parameters.remove("block");
            let repeat = parameters
                .remove("repeat")
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| name.clone());
            return Some(Token::BlockBegin {
                name,
                repeat,
                parameters,
            });
        }
        Some(mode) if mode == "end" => return Some(Token::BlockEnd { name }),
        _ => {}
    }

    if !is_field_name(&name) {
        return None;
    }
    let slug = sanitize_key(&name);
    if slug.is_empty() {
        return None;
    }

    let non_empty = |key: &str, params: &BTreeMap<String, String>| {
        params
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let field = FieldDescriptor {
        slug,
        merge_key: name.clone(),
        title: non_empty("title", &parameters).unwrap_or_default(),
        field_type: parameters
            .get("type")
            .map(|t| FieldType::from_declared(t))
            .unwrap_or_default(),
        placeholder: non_empty("placeholder", &parameters),
        description: non_empty("description", &parameters),
        pattern: parameters.get("pattern").filter(|p| !p.is_empty()).cloned(),
        pattern_message: non_empty("patternmsg", &parameters),
        min_value: non_empty("minvalue", &parameters),
        max_value: non_empty("maxvalue", &parameters),
        length: non_empty("length", &parameters).and_then(|l| l.parse::<usize>().ok()),
        is_duplicate: false,
        original_name: name,
        parameters: parameters
            .into_iter()
            .filter(|(k, _)| !KNOWN_KEYS.contains(&k.as_str()))
            .collect(),
    };

    Some(Token::Field(field))
}

/// Split a placeholder on `;` outside single or double quotes.
///
/// A quote preceded by a backslash does not open or close a quoted value.
/// Segments are trimmed and empty segments dropped.
pub fn split_segments(placeholder: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut buffer = String::new();
    let mut quote: Option<char> = None;
    let mut prev = '\0';

    for c in placeholder.chars() {
        if (c == '\'' || c == '"') && prev != '\\' {
            match quote {
                None => quote = Some(c),
                Some(q) if q == c => quote = None,
                Some(_) => {}
            }
        }

        if c == ';' && quote.is_none() {
            segments.push(std::mem::take(&mut buffer));
        } else {
            buffer.push(c);
        }
        prev = c;
    }
    segments.push(buffer);

    segments
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse `key=value` (or a bare flag) into a lower-cased key and its value.
fn parse_parameter(segment: &str) -> (String, String) {
    let Some((key, value)) = segment.split_once('=') else {
        return (segment.trim().to_lowercase(), "1".to_string());
    };

    let key = key.trim().to_lowercase();
    let value = value.trim();
    let unquoted = strip_quotes(value);
    (key, unquoted)
}

/// Remove one pair of matching surrounding quotes and unescape `\<quote>`.
fn strip_quotes(value: &str) -> String {
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            let inner = &value[1..value.len() - 1];
            let escaped = format!("\\{quote}");
            return inner.replace(&escaped, &quote.to_string());
        }
    }
    value.to_string()
}

/// Field names are words: letters, digits, `_`, `-` and spaces.
fn is_field_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == ' ')
}

/// Lower-case and keep only `[a-z0-9_-]`.
pub fn sanitize_key(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect()
}
