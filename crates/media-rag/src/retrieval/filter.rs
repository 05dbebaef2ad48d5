//! Metadata filters for similarity queries
//!
//! Filters use the Pinecone grammar so they can be passed to a remote store
//! unchanged and evaluated locally by the in-memory store:
//!
//! ```json
//! {"file_type": "pdf", "file_size": {"$lt": 1000000}}
//! {"$or": [{"content_type": "transcript"}, {"content_type": {"$in": ["document"]}}]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::types::{Metadata, MetadataValue};

const COMPARISON_OPS: &[&str] = &["$eq", "$ne", "$gt", "$gte", "$lt", "$lte", "$in", "$nin"];

/// Conjunction of per-field predicates over chunk metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataFilter(Map<String, Value>);

impl MetadataFilter {
    /// Filter that matches everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON filter object
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => {
                validate_clause(&map)?;
                Ok(Self(map))
            }
            other => Err(Error::Config(format!("Filter must be a JSON object, got {}", other))),
        }
    }

    /// Require `key == value`
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Require `key <op> value` for a comparison operator such as `$gte`
    pub fn op(mut self, key: impl Into<String>, op: &str, value: impl Into<Value>) -> Self {
        let key = key.into();
        let mut ops = match self.0.remove(&key) {
            Some(Value::Object(existing)) => existing,
            Some(scalar) => {
                let mut m = Map::new();
                m.insert("$eq".to_string(), scalar);
                m
            }
            None => Map::new(),
        };
        ops.insert(op.to_string(), value.into());
        self.0.insert(key, Value::Object(ops));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON form for remote stores; `None` when the filter is empty
    pub fn to_json(&self) -> Option<Value> {
        if self.0.is_empty() {
            None
        } else {
            Some(Value::Object(self.0.clone()))
        }
    }

    /// Evaluate the filter against a metadata record
    pub fn matches(&self, metadata: &Metadata) -> bool {
        clause_matches(&self.0, metadata)
    }
}

fn validate_clause(clause: &Map<String, Value>) -> Result<()> {
    for (key, value) in clause {
        match key.as_str() {
            "$and" | "$or" => {
                let items = value
                    .as_array()
                    .ok_or_else(|| Error::Config(format!("{} expects an array", key)))?;
                for item in items {
                    let sub = item
                        .as_object()
                        .ok_or_else(|| Error::Config(format!("{} items must be objects", key)))?;
                    validate_clause(sub)?;
                }
            }
            k if k.starts_with('$') => {
                return Err(Error::Config(format!("Unknown logical operator {}", k)));
            }
            _ => {
                if let Value::Object(ops) = value {
                    for (op, operand) in ops {
                        if !COMPARISON_OPS.contains(&op.as_str()) {
                            return Err(Error::Config(format!("Unknown operator {} on {}", op, key)));
                        }
                        if matches!(op.as_str(), "$in" | "$nin") && !operand.is_array() {
                            return Err(Error::Config(format!("{} on {} expects an array", op, key)));
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn clause_matches(clause: &Map<String, Value>, metadata: &Metadata) -> bool {
    clause.iter().all(|(key, condition)| match key.as_str() {
        "$and" => sub_clauses(condition).all(|c| clause_matches(c, metadata)),
        "$or" => sub_clauses(condition).any(|c| clause_matches(c, metadata)),
        field => field_matches(metadata.get(field), condition),
    })
}

fn sub_clauses(value: &Value) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn field_matches(actual: Option<&MetadataValue>, condition: &Value) -> bool {
    match condition {
        Value::Object(ops) => ops
            .iter()
            .all(|(op, operand)| operator_matches(actual, op, operand)),
        scalar => actual.is_some_and(|a| values_equal(a, scalar)),
    }
}

fn operator_matches(actual: Option<&MetadataValue>, op: &str, operand: &Value) -> bool {
    let in_list = |a: &MetadataValue| {
        operand
            .as_array()
            .is_some_and(|items| items.iter().any(|item| values_equal(a, item)))
    };

    match (op, actual) {
        ("$ne", None) | ("$nin", None) => true,
        (_, None) => false,
        ("$eq", Some(a)) => values_equal(a, operand),
        ("$ne", Some(a)) => !values_equal(a, operand),
        ("$in", Some(a)) => in_list(a),
        ("$nin", Some(a)) => !in_list(a),
        ("$gt", Some(a)) => compare(a, operand).is_some_and(|o| o.is_gt()),
        ("$gte", Some(a)) => compare(a, operand).is_some_and(|o| o.is_ge()),
        ("$lt", Some(a)) => compare(a, operand).is_some_and(|o| o.is_lt()),
        ("$lte", Some(a)) => compare(a, operand).is_some_and(|o| o.is_le()),
        _ => false,
    }
}

fn values_equal(actual: &MetadataValue, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => actual.to_json() == *expected,
    }
}

fn compare(actual: &MetadataValue, operand: &Value) -> Option<std::cmp::Ordering> {
    match (actual.as_f64(), operand.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => match (actual.as_str(), operand.as_str()) {
            (Some(a), Some(b)) => Some(a.cmp(b)),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pdf_meta() -> Metadata {
        Metadata::new()
            .with("file_type", "pdf")
            .with("file_size", 2048u64)
            .with("page", 3u32)
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = MetadataFilter::new();
        assert!(filter.matches(&pdf_meta()));
        assert!(filter.matches(&Metadata::new()));
        assert!(filter.to_json().is_none());
    }

    #[test]
    fn test_equality_shorthand() {
        let filter = MetadataFilter::new().eq("file_type", "pdf");
        assert!(filter.matches(&pdf_meta()));
        assert!(!MetadataFilter::new().eq("file_type", "video").matches(&pdf_meta()));
        assert!(!filter.matches(&Metadata::new()));
    }

    #[test]
    fn test_range_operators() {
        let filter = MetadataFilter::new()
            .op("file_size", "$gte", 1024)
            .op("file_size", "$lt", 4096);
        assert!(filter.matches(&pdf_meta()));

        let filter = MetadataFilter::new().op("page", "$gt", 3);
        assert!(!filter.matches(&pdf_meta()));

        // integers and floats compare numerically
        let filter = MetadataFilter::new().eq("file_size", 2048.0);
        assert!(filter.matches(&pdf_meta()));
    }

    #[test]
    fn test_set_operators_and_missing_fields() {
        let filter = MetadataFilter::from_json(json!({
            "file_type": {"$in": ["pdf", "image"]},
            "content_type": {"$nin": ["transcript"]}
        }))
        .unwrap();
        assert!(filter.matches(&pdf_meta()));

        let filter = MetadataFilter::from_json(json!({"content_type": {"$eq": "document"}})).unwrap();
        assert!(!filter.matches(&pdf_meta()));
    }

    #[test]
    fn test_logical_operators() {
        let filter = MetadataFilter::from_json(json!({
            "$or": [{"file_type": "video"}, {"page": {"$lte": 3}}]
        }))
        .unwrap();
        assert!(filter.matches(&pdf_meta()));

        let filter = MetadataFilter::from_json(json!({
            "$and": [{"file_type": "pdf"}, {"page": 4}]
        }))
        .unwrap();
        assert!(!filter.matches(&pdf_meta()));
    }

    #[test]
    fn test_invalid_filters_rejected() {
        assert!(MetadataFilter::from_json(json!(["pdf"])).is_err());
        assert!(MetadataFilter::from_json(json!({"page": {"$between": [1, 2]}})).is_err());
        assert!(MetadataFilter::from_json(json!({"page": {"$in": 3}})).is_err());
        assert!(MetadataFilter::from_json(json!({"$not": {}})).is_err());
        assert!(MetadataFilter::from_json(Value::Null).unwrap().is_empty());
    }
}
