//! The response envelope: `{data, errors}` with partial success observable.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A GraphQL response envelope.
///
/// `data` and `errors` are independently present: a response may carry data
/// alone (success), errors alone (failure), or both at once (partial
/// success). Callers must be able to observe partial data even when errors
/// are non-empty, so nothing here collapses the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// The `data` mapping, if the server produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// The ordered error sequence; empty on full success.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQlError>,
}

impl Response {
    /// An envelope carrying only `data`.
    pub fn of_data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// Whether the envelope carries any GraphQL errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Look up a root field of `data`.
    ///
    /// Returns `None` when `data` is absent, when the field is missing, or
    /// when the field is explicitly `null`: "no such entity" and "field
    /// not selected" both map to an absent value rather than an error.
    pub fn root_field(&self, name: &str) -> Option<&Value> {
        match self.data.as_ref()?.get(name) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value),
        }
    }
}

/// One entry of the envelope's `errors` sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlError {
    /// Human-readable error description.
    pub message: String,

    /// Path from the operation root to the field that failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,

    /// Implementation-specific extra information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQlError {
    /// An error carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            extensions: None,
        }
    }
}

/// One segment of an error path: a field name, or an index into a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// A field name.
    Field(String),
    /// A list index.
    Index(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_success_envelope() {
        let response: Response =
            serde_json::from_value(json!({"data": {"books": [{"id": 1}]}})).unwrap();
        assert!(!response.has_errors());
        assert_eq!(response.root_field("books"), Some(&json!([{"id": 1}])));
    }

    #[test]
    fn decodes_partial_success() {
        let response: Response = serde_json::from_value(json!({
            "data": {"book": {"id": 1}},
            "errors": [{"message": "author unavailable", "path": ["book", "author"]}]
        }))
        .unwrap();
        assert!(response.has_errors());
        assert!(response.data.is_some());
        assert_eq!(
            response.errors[0].path,
            vec![
                PathSegment::Field("book".into()),
                PathSegment::Field("author".into())
            ]
        );
    }

    #[test]
    fn decodes_mixed_path_segments() {
        let error: GraphQlError = serde_json::from_value(json!({
            "message": "bad element",
            "path": ["books", 2, "title"],
            "extensions": {"code": "INTERNAL"}
        }))
        .unwrap();
        assert_eq!(
            error.path,
            vec![
                PathSegment::Field("books".into()),
                PathSegment::Index(2),
                PathSegment::Field("title".into())
            ]
        );
        assert_eq!(error.extensions, Some(json!({"code": "INTERNAL"})));
    }

    #[test]
    fn null_root_field_is_absent() {
        let response: Response = serde_json::from_value(json!({"data": {"book": null}})).unwrap();
        assert_eq!(response.root_field("book"), None);
        assert_eq!(response.root_field("missing"), None);
    }

    #[test]
    fn errors_only_envelope_has_no_data() {
        let response: Response =
            serde_json::from_value(json!({"errors": [{"message": "boom"}]})).unwrap();
        assert!(response.has_errors());
        assert!(response.data.is_none());
    }
}
