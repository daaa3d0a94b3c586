//! Boolean filter tree evaluated against cached records.
//!
//! The generic storage contract carries filters as loosely structured JSON:
//! composite nodes are `{"op": "and"|"or", "conds": [<node>, ...]}` and
//! leaves are `{"field": "<name>", "conds": [<value>, ...]}` meaning "the
//! record's field value is one of these". [`Filter::from_value`] parses
//! that wire form into a typed tree; [`Filter::matches`] evaluates it.
//!
//! Vacuous cases all evaluate to true: an empty composite, a leaf with no
//! values, and a leaf naming a field the record does not have. An
//! unrecognized `op` falls back to conjunction semantics; see DESIGN.md.

use serde_json::Value;

use crate::models::Record;

/// A typed filter tree: conjunction, disjunction, or a field-membership
/// leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Eq { field: String, values: Vec<Value> },
}

impl Filter {
    /// The vacuously-true filter (an empty conjunction).
    pub fn empty() -> Filter {
        Filter::And(Vec::new())
    }

    /// Leaf testing `field == value`.
    pub fn eq(field: impl Into<String>, value: Value) -> Filter {
        Filter::Eq {
            field: field.into(),
            values: vec![value],
        }
    }

    /// Parse the wire form. Unparseable input degrades to [`Filter::empty`]
    /// rather than failing; the contract treats an absent or malformed
    /// filter as "match everything".
    pub fn from_value(value: &Value) -> Filter {
        let Some(obj) = value.as_object() else {
            return Filter::empty();
        };

        let conds: Vec<&Value> = obj
            .get("conds")
            .and_then(Value::as_array)
            .map(|a| a.iter().collect())
            .unwrap_or_default();

        let children: Vec<Filter> = conds
            .iter()
            .filter(|c| c.is_object())
            .map(|c| Filter::from_value(c))
            .collect();

        if !children.is_empty() {
            // Composite node. Anything other than "or" gets conjunction
            // semantics, including unrecognized operators.
            return match obj.get("op").and_then(Value::as_str) {
                Some("or") => Filter::Or(children),
                _ => Filter::And(children),
            };
        }

        if let Some(field) = obj.get("field").and_then(Value::as_str) {
            let values: Vec<Value> = conds.into_iter().filter(|c| !c.is_object()).cloned().collect();
            return Filter::Eq {
                field: field.to_string(),
                values,
            };
        }

        Filter::empty()
    }

    /// Evaluate the tree against a record.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::And(children) => children.iter().all(|c| c.matches(record)),
            Filter::Or(children) => {
                children.is_empty() || children.iter().any(|c| c.matches(record))
            }
            Filter::Eq { field, values } => {
                if values.is_empty() {
                    return true;
                }
                match record.field(field) {
                    // A field the record does not carry never excludes it.
                    None => true,
                    Some(actual) => values.contains(&actual),
                }
            }
        }
    }
}

/// Pull a free-text query string out of a raw filter payload.
///
/// Accepts either a top-level `"query"` key or a leaf condition on the
/// `query` field; returns `None` when neither yields non-empty text.
pub fn query_text(filter: &Value) -> Option<String> {
    if let Some(q) = filter.get("query").and_then(Value::as_str) {
        if !q.is_empty() {
            return Some(q.to_string());
        }
    }
    for cond in filter.get("conds").and_then(Value::as_array)? {
        if cond.get("field").and_then(Value::as_str) == Some("query") {
            let q = cond
                .get("conds")
                .and_then(Value::as_array)
                .and_then(|a| a.first())
                .and_then(Value::as_str)?;
            if !q.is_empty() {
                return Some(q.to_string());
            }
        }
    }
    None
}
