//! Citation normalization
//!
//! Turns the `hits` field of a chat response into a list of renderable
//! citations. The server gives no shape guarantees beyond "a list of objects",
//! so every field is optional and nothing is ever dropped: one input element
//! always produces one [`Hit`], in input order.

use std::fmt;

use serde_json::Value;

/// A document-relative identifier: either numeric or free text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Number(i64),
    Text(String),
}

impl Locator {
    /// Read a locator from an arbitrary JSON value (`null` means absent)
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Self::Number(i),
                None => Self::Text(n.to_string()),
            }),
            other => Some(Self::Text(other.to_string())),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Locator {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for Locator {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

/// One retrieval citation, ready for display
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hit {
    pub doc_id: Option<Locator>,
    pub page: Option<Locator>,
    /// Primary display label
    pub chunk_id: Option<Locator>,
    /// Provenance, auxiliary detail only (empty when missing)
    pub source_path: String,
    pub fused_score: Option<f64>,
    pub rerank_score: Option<f64>,
}

impl Hit {
    fn from_value(value: &Value) -> Self {
        let Some(entry) = value.as_object() else {
            return Self::default();
        };

        let locator = |key: &str| entry.get(key).and_then(Locator::from_value);
        let score = |key: &str| entry.get(key).and_then(Value::as_f64);

        Self {
            doc_id: locator("doc_id"),
            page: locator("page"),
            chunk_id: locator("chunk_id"),
            source_path: entry
                .get("source_path")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            fused_score: score("fused_score"),
            rerank_score: score("rerank_score"),
        }
    }

    /// Primary citation line, e.g. `[d1:3] c9`
    pub fn label(&self) -> String {
        format!(
            "[{}:{}] {}",
            display_or_empty(&self.doc_id),
            display_or_empty(&self.page),
            display_or_empty(&self.chunk_id)
        )
    }
}

fn display_or_empty(locator: &Option<Locator>) -> String {
    locator.as_ref().map(ToString::to_string).unwrap_or_default()
}

/// Normalize the raw `hits` field of a response body.
///
/// Absent, `null` or non-array input yields an empty list, so renderers never
/// need to branch on presence.
pub fn normalize(raw_hits: Option<&Value>) -> Vec<Hit> {
    match raw_hits {
        Some(Value::Array(entries)) => entries.iter().map(Hit::from_value).collect(),
        _ => Vec::new(),
    }
}
