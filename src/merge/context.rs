//! Values handed to a generation call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A scalar value or the rows of a repeater.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MergeValue {
    Scalar(String),
    Rows(Vec<BTreeMap<String, String>>),
}

impl From<&str> for MergeValue {
    fn from(value: &str) -> Self {
        MergeValue::Scalar(value.to_string())
    }
}

impl From<String> for MergeValue {
    fn from(value: String) -> Self {
        MergeValue::Scalar(value)
    }
}

/// Merge key -> value map for one generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergeContext {
    values: BTreeMap<String, MergeValue>,
}

impl MergeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MergeValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn insert_rows(&mut self, key: impl Into<String>, rows: Vec<BTreeMap<String, String>>) {
        self.values.insert(key.into(), MergeValue::Rows(rows));
    }

    pub fn get(&self, key: &str) -> Option<&MergeValue> {
        self.values.get(key)
    }

    pub fn scalar(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            MergeValue::Scalar(s) => Some(s),
            MergeValue::Rows(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MergeValue)> {
        self.values.iter()
    }

    /// Every string in the context, repeater cells included.
    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.values.values().flat_map(|value| -> Box<dyn Iterator<Item = &str> + '_> {
            match value {
                MergeValue::Scalar(s) => Box::new(std::iter::once(s.as_str())),
                MergeValue::Rows(rows) => {
                    Box::new(rows.iter().flat_map(|row| row.values().map(String::as_str)))
                }
            }
        })
    }

    /// Build a context from a JSON object.
    ///
    /// Numbers and booleans become strings, arrays of objects become
    /// repeater rows and `null` becomes the empty string.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            Error::InvalidMergeValues("merge values must be a JSON object".into())
        })?;

        let mut context = MergeContext::new();
        for (key, value) in object {
            match value {
                serde_json::Value::Array(items) => {
                    let mut rows = Vec::with_capacity(items.len());
                    for item in items {
                        let row = item.as_object().ok_or_else(|| {
                            Error::InvalidMergeValues(format!("rows of '{key}' must be objects"))
                        })?;
                        rows.push(
                            row.iter()
                                .map(|(k, v)| (k.clone(), json_scalar(v)))
                                .collect(),
                        );
                    }
                    context.insert_rows(key.clone(), rows);
                }
                other => context.insert(key.clone(), json_scalar(other)),
            }
        }
        Ok(context)
    }
}

fn json_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl FromIterator<(String, MergeValue)> for MergeContext {
    fn from_iter<I: IntoIterator<Item = (String, MergeValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
