//! Validation of submitted field values.
//!
//! A template declares constraints in its placeholders (`type`, `pattern`,
//! `length`, `minvalue`, `maxvalue`). [`FieldDescriptor::validate`] applies
//! them to one raw value and returns the cleaned string the merge step
//! should receive; [`Schema::validate_submission`] does the same for a
//! whole form and maps slugs back to merge keys.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

use crate::html::sanitize_html;
use crate::merge::{MergeContext, MergeValue};
use crate::template::{FieldDescriptor, FieldType, Schema};
use crate::util::normalize_newlines;

const DEFAULT_PATTERN_MESSAGE: &str = "The value does not match the required format.";

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").unwrap());

/// Why a value was rejected. The `Display` text is meant for end users.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The value must be a number.")]
    NotANumber,

    #[error("The value must be a valid date (YYYY-MM-DD).")]
    InvalidDate,

    #[error("The value must be a valid email address.")]
    InvalidEmail,

    #[error("The value must be a valid URL.")]
    InvalidUrl,

    #[error("The value cannot exceed {0} characters.")]
    TooLong(usize),

    #[error("{0}")]
    PatternMismatch(String),

    #[error("The minimum allowed value is {0}.")]
    BelowMinimum(String),

    #[error("The maximum allowed value is {0}.")]
    AboveMaximum(String),

    #[error("Invalid validation pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl FieldDescriptor {
    /// Check `raw` against this field's constraints.
    ///
    /// Returns the sanitized value on success. Empty input is always
    /// accepted as the empty string.
    pub fn validate(&self, raw: &str) -> Result<String, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(String::new());
        }

        let value = match self.field_type {
            FieldType::Text => collapse_whitespace(&strip_tags(trimmed)),
            FieldType::Textarea => {
                let text = normalize_newlines(trimmed);
                strip_tags(&text).trim().to_string()
            }
            FieldType::Html => sanitize_html(trimmed),
            FieldType::Number => {
                parse_number(trimmed).ok_or(ValidationError::NotANumber)?;
                trimmed.to_string()
            }
            FieldType::Date => {
                parse_date(trimmed).ok_or(ValidationError::InvalidDate)?;
                trimmed.to_string()
            }
            FieldType::Email => {
                if !is_email(trimmed) {
                    return Err(ValidationError::InvalidEmail);
                }
                trimmed.to_string()
            }
            FieldType::Url => {
                if !is_url(trimmed) {
                    return Err(ValidationError::InvalidUrl);
                }
                trimmed.to_string()
            }
        };

        if self.limits_length()
            && let Some(limit) = self.length.filter(|&l| l > 0)
            && value.chars().count() > limit
        {
            return Err(ValidationError::TooLong(limit));
        }

        if self.checks_pattern()
            && let Some(pattern) = self.pattern.as_deref().filter(|p| !p.is_empty())
        {
            let regex = Regex::new(pattern).map_err(|e| {
                log::warn!("field '{}' has an invalid pattern: {e}", self.slug);
                ValidationError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                }
            })?;
            if !regex.is_match(&value) {
                let message = self
                    .pattern_message
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| DEFAULT_PATTERN_MESSAGE.to_string());
                return Err(ValidationError::PatternMismatch(message));
            }
        }

        self.check_range(&value)?;
        Ok(value)
    }

    /// Convert a validated value into the form written into the document.
    ///
    /// Numbers accept a decimal comma and lose superfluous trailing zeros;
    /// dates are written as `YYYY-MM-DD`. Other types pass through.
    pub fn normalize(&self, value: &str) -> String {
        let value = value.trim();
        match self.field_type {
            FieldType::Number => {
                let cleaned: String = value
                    .chars()
                    .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
                    .map(|c| if c == ',' { '.' } else { c })
                    .collect();
                match cleaned.parse::<f64>() {
                    Ok(n) => format_number(n),
                    Err(_) => value.to_string(),
                }
            }
            FieldType::Date => match parse_date(value) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => value.to_string(),
            },
            _ => value.to_string(),
        }
    }

    fn limits_length(&self) -> bool {
        matches!(
            self.field_type,
            FieldType::Text | FieldType::Textarea | FieldType::Email | FieldType::Url
        )
    }

    fn checks_pattern(&self) -> bool {
        matches!(
            self.field_type,
            FieldType::Text
                | FieldType::Textarea
                | FieldType::Email
                | FieldType::Url
                | FieldType::Number
        )
    }

    fn check_range(&self, value: &str) -> Result<(), ValidationError> {
        let min = self.min_value.as_deref().filter(|m| !m.is_empty());
        let max = self.max_value.as_deref().filter(|m| !m.is_empty());

        match self.field_type {
            FieldType::Number => {
                let Some(n) = parse_number(value) else {
                    return Ok(());
                };
                if let Some(min) = min
                    && parse_number(min).is_some_and(|m| n < m)
                {
                    return Err(ValidationError::BelowMinimum(min.to_string()));
                }
                if let Some(max) = max
                    && parse_number(max).is_some_and(|m| n > m)
                {
                    return Err(ValidationError::AboveMaximum(max.to_string()));
                }
            }
            // ISO dates order lexically.
            FieldType::Date => {
                if let Some(min) = min
                    && value < min
                {
                    return Err(ValidationError::BelowMinimum(min.to_string()));
                }
                if let Some(max) = max
                    && value > max
                {
                    return Err(ValidationError::AboveMaximum(max.to_string()));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn strip_tags(text: &str) -> String {
    TAG.replace_all(text, "").into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decimal number, accepting a single decimal comma.
fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let text = if text.contains('.') {
        text.to_string()
    } else {
        text.replacen(',', ".", 1)
    };
    if !NUMBER.is_match(&text) {
        return None;
    }
    text.parse().ok()
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// `YYYY-MM-DD` with zero-padded fields and a real calendar day.
fn parse_date(text: &str) -> Option<NaiveDate> {
    let bytes = text.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

fn is_email(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = text.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && domain.split('.').all(|label| {
            !label.is_empty() && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

fn is_url(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((scheme, rest)) = text.split_once(':') else {
        return false;
    };
    match scheme.to_ascii_lowercase().as_str() {
        "http" | "https" => rest
            .strip_prefix("//")
            .and_then(|r| r.split(['/', '?', '#']).next())
            .is_some_and(|host| !host.is_empty()),
        "mailto" => !rest.is_empty(),
        _ => false,
    }
}

/// One rejected value of a form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub slug: String,
    /// Repeater slug and row index when the value came from a repeater.
    pub row: Option<(String, usize)>,
    pub error: ValidationError,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.row {
            Some((repeater, index)) => {
                write!(f, "{repeater}[{index}].{}: {}", self.slug, self.error)
            }
            None => write!(f, "{}: {}", self.slug, self.error),
        }
    }
}

/// Every rejected value of a submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} field(s) failed validation", .0.len())]
pub struct SubmissionErrors(pub Vec<FieldError>);

impl Schema {
    /// Validate a form submission and build the merge context.
    ///
    /// `submitted` is keyed by field slug, with repeater rows under the
    /// repeater slug. The result is keyed by merge key (scalars) and by
    /// repeater name (rows), with values normalized. Missing fields merge
    /// as empty strings. Duplicate fields share a merge key; the first
    /// non-empty value wins.
    pub fn validate_submission(
        &self,
        submitted: &MergeContext,
    ) -> Result<MergeContext, SubmissionErrors> {
        let mut errors = Vec::new();
        let mut context = MergeContext::new();

        for field in &self.fields {
            let raw = submitted.scalar(&field.slug).unwrap_or_default();
            match field.validate(raw) {
                Ok(value) => {
                    let value = field.normalize(&value);
                    let taken = context
                        .scalar(&field.merge_key)
                        .is_some_and(|existing| !existing.is_empty());
                    if !taken {
                        context.insert(field.merge_key.clone(), value);
                    }
                }
                Err(error) => errors.push(FieldError {
                    slug: field.slug.clone(),
                    row: None,
                    error,
                }),
            }
        }

        for repeater in &self.repeaters {
            let rows = match submitted.get(&repeater.slug) {
                Some(MergeValue::Rows(rows)) => rows.as_slice(),
                _ => &[],
            };
            let mut merged = Vec::with_capacity(rows.len());
            for (index, row) in rows.iter().enumerate() {
                let mut out = BTreeMap::new();
                for field in &repeater.fields {
                    let raw = row.get(&field.slug).map(String::as_str).unwrap_or_default();
                    match field.validate(raw) {
                        Ok(value) => {
                            out.entry(field.merge_key.clone())
                                .and_modify(|existing: &mut String| {
                                    if existing.is_empty() {
                                        *existing = field.normalize(&value);
                                    }
                                })
                                .or_insert_with(|| field.normalize(&value));
                        }
                        Err(error) => errors.push(FieldError {
                            slug: field.slug.clone(),
                            row: Some((repeater.slug.clone(), index)),
                            error,
                        }),
                    }
                }
                merged.push(out);
            }
            context.insert_rows(repeater.name.clone(), merged);
        }

        if errors.is_empty() {
            Ok(context)
        } else {
            Err(SubmissionErrors(errors))
        }
    }
}
