//! The request value object: an opaque operation document plus variables.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EncodingError;
use crate::fingerprint::Fingerprint;

/// Variables for one operation: an ordered mapping from parameter name to a
/// JSON-compatible value.
pub type Variables = Map<String, Value>;

/// One GraphQL operation to execute: the document text (never parsed),
/// its variables, and optional per-call headers.
///
/// `Request` is a value object (equality is by content) and serializes
/// directly to the wire body `{query, variables?}`. Headers are a local
/// transport concern and never serialized.
///
/// ```
/// use wireql_protocol::Request;
///
/// let request = Request::new("query GetBook($id: Int!) { book(id: $id) { title } }")
///     .variable("id", 1);
/// assert_eq!(request.variables.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// The operation document, with any named fragments inlined.
    #[serde(rename = "query")]
    pub document: String,

    /// Operation variables; omitted from the wire body when empty.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub variables: Variables,

    /// Per-call headers, merged over the transport's configured headers.
    #[serde(skip)]
    pub headers: HashMap<String, String>,
}

impl Request {
    /// Create a request for `document` with no variables.
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            variables: Map::new(),
            headers: HashMap::new(),
        }
    }

    /// Replace the variables with the serialized form of `variables`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError`] if `variables` does not serialize to a
    /// JSON object.
    pub fn variables<T: Serialize>(mut self, variables: &T) -> Result<Self, EncodingError> {
        match serde_json::to_value(variables)? {
            Value::Object(map) => {
                self.variables = map;
                Ok(self)
            }
            other => Err(EncodingError::NotAnObject(json_type_name(&other))),
        }
    }

    /// Add a single variable.
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Add a per-call header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// The cache fingerprint of this request.
    ///
    /// Derived from the document text and the canonical form of the
    /// variables only; headers do not participate. Two requests with equal
    /// documents and value-equal variables fingerprint identically,
    /// independent of variable insertion order.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.document, &self.variables)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
