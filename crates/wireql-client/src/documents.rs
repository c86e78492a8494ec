//! Prebuilt operation documents for the book catalog.
//!
//! Documents are composed from shared fragments by plain string assembly;
//! nothing here parses GraphQL.

use wireql_protocol::Request;

/// Selection shared by every book-shaped result.
pub const BOOK_FRAGMENT: &str = "\
fragment BookDetails on Book {
  id
  title
  genre
  publishedYear
}";

/// Selection shared by every author-shaped result.
pub const AUTHOR_FRAGMENT: &str = "\
fragment AuthorDetails on Author {
  id
  name
  birthYear
}";

fn with_fragments(operation: &str) -> String {
    format!("{BOOK_FRAGMENT}\n{AUTHOR_FRAGMENT}\n{operation}")
}

/// List every book with its author.
pub fn all_books() -> Request {
    Request::new(with_fragments(
        "query GetAllBooks {
  books {
    ...BookDetails
    author {
      ...AuthorDetails
    }
  }
}",
    ))
}

/// Fetch one book by id.
pub fn book_by_id(id: i64) -> Request {
    Request::new(with_fragments(
        "query GetBook($bookId: Int!) {
  book(id: $bookId) {
    ...BookDetails
    author {
      ...AuthorDetails
    }
  }
}",
    ))
    .variable("bookId", id)
}

/// Create a book.
pub fn create_book(title: &str, author_id: i64, genre: &str, published_year: i64) -> Request {
    Request::new(with_fragments(
        "mutation CreateBook($title: String!, $authorId: Int!, $genre: String!, $publishedYear: Int!) {
  createBook(title: $title, authorId: $authorId, genre: $genre, publishedYear: $publishedYear) {
    book {
      ...BookDetails
      author {
        ...AuthorDetails
      }
    }
  }
}",
    ))
    .variable("title", title)
    .variable("authorId", author_id)
    .variable("genre", genre)
    .variable("publishedYear", published_year)
}

/// Subscribe to newly added books.
pub fn book_added() -> Request {
    Request::new(with_fragments(
        "subscription OnBookAdded {
  bookAdded {
    ...BookDetails
    author {
      ...AuthorDetails
    }
  }
}",
    ))
}
