//! Typed views over response envelopes.
//!
//! `Book` and `Author` are reconstructed per call from a response; they hold
//! no identity of their own and no mutation path back to the server; never
//! treat them as a local cache of server state. Wire names (`publishedYear`,
//! `birthYear`) translate to Rust names via the fixed `camelCase` rename;
//! unrecognized fields are ignored for forward compatibility.
//!
//! Scalars outside `id`/`title`/`name` are optional so that narrower
//! selections (`{ books { id title } }`) still map; a missing
//! cross-reference is an explicit `None`, never silently dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use wireql_protocol::{ClientError, EncodingError, Response};

/// An author view, optionally carrying its books.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    /// Server-assigned id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Birth year, when selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_year: Option<i64>,
    /// Cross-reference to the author's books, when selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub books: Option<Vec<Book>>,
}

/// A book view, optionally carrying its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Server-assigned id.
    pub id: i64,
    /// Title.
    pub title: String,
    /// Genre, when selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Publication year, when selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i64>,
    /// Cross-reference to the author, when selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
}

/// Map the `books` root field to a list of books.
///
/// An absent or null root field maps to an empty list, not an error.
///
/// # Errors
///
/// [`EncodingError`] when the field is present but has an incompatible
/// shape.
pub fn books_from_response(response: &Response) -> Result<Vec<Book>, ClientError> {
    match response.root_field("books") {
        None => Ok(Vec::new()),
        Some(value) => decode(value),
    }
}

/// Map the `book` root field to a book.
///
/// "No book with that id" (`{data: {book: null}}`) maps to `Ok(None)`,
/// distinguishing it from a protocol failure.
///
/// # Errors
///
/// [`EncodingError`] when the field is present but has an incompatible
/// shape.
pub fn book_from_response(response: &Response) -> Result<Option<Book>, ClientError> {
    match response.root_field("book") {
        None => Ok(None),
        Some(value) => decode(value).map(Some),
    }
}

/// Map the `createBook` mutation envelope (`{data: {createBook: {book}}}`)
/// to the created book, or `None` when the server produced nothing.
///
/// # Errors
///
/// [`EncodingError`] when the nested field has an incompatible shape.
pub fn created_book_from_response(response: &Response) -> Result<Option<Book>, ClientError> {
    match response.root_field("createBook").and_then(|v| v.get("book")) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => decode(value).map(Some),
    }
}

/// Map one `bookAdded` subscription event payload to a book.
///
/// # Errors
///
/// [`EncodingError`] when the payload has an incompatible shape.
pub fn book_from_event(event: &Value) -> Result<Option<Book>, ClientError> {
    match event.get("bookAdded") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => decode(value).map(Some),
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, ClientError> {
    serde_json::from_value(value.clone())
        .map_err(|e| ClientError::Encoding(EncodingError::Json(e)))
}
