//! Catalog records as they leave the store.
//!
//! Serialized with camelCase keys and RFC 3339 timestamps.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A stored author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: i64,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Author annotated with how many books reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorWithBookCount {
    #[serde(flatten)]
    pub author: Author,
    pub book_count: i64,
}

/// Author together with every book that references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorWithBooks {
    #[serde(flatten)]
    pub author: Author,
    pub books: Vec<Book>,
}

/// A stored book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub year: i32,
    pub author_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Book joined with its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookWithAuthor {
    #[serde(flatten)]
    pub book: Book,
    pub author: Author,
}

/// Fields required to insert a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author_id: i64,
    pub year: i32,
}

/// Partial book update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author_id: Option<i64>,
    pub year: Option<i32>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author_id.is_none() && self.year.is_none()
    }
}

/// Normalised search criteria.
///
/// `text` is already trimmed and passed through [`fold_case`]. `year` is only set when the
/// query was a whole number, so stores never compare years against
/// non-numeric input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    pub text: String,
    pub year: Option<i32>,
}

impl SearchFilter {
    /// Case-insensitive containment, folding both sides with [`fold_case`].
    pub fn matches_text(&self, haystack: &str) -> bool {
        fold_case(haystack).contains(&fold_case(&self.text))
    }
}

/// Case folding shared by every store: ASCII letters only, the same as
/// SQLite's built-in `lower()`. Other characters are compared as stored.
pub fn fold_case(text: &str) -> String {
    text.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn author() -> Author {
        Author {
            id: 1,
            name: "Ada".to_string(),
            created_at: datetime!(2024-01-01 00:00 UTC),
            updated_at: datetime!(2024-01-02 12:30 UTC),
        }
    }

    #[test]
    fn book_with_author_serializes_flat_camel_case() {
        let value = serde_json::to_value(BookWithAuthor {
            book: Book {
                id: 7,
                title: "Notes".to_string(),
                year: 1843,
                author_id: 1,
                created_at: datetime!(2024-01-01 00:00 UTC),
                updated_at: datetime!(2024-01-01 00:00 UTC),
            },
            author: author(),
        })
        .unwrap();

        assert_eq!(value["id"], 7);
        assert_eq!(value["authorId"], 1);
        assert_eq!(value["createdAt"], "2024-01-01T00:00:00Z");
        assert_eq!(value["author"]["name"], "Ada");
        assert_eq!(value["author"]["updatedAt"], "2024-01-02T12:30:00Z");
    }

    #[test]
    fn author_with_count_exposes_book_count() {
        let value = serde_json::to_value(AuthorWithBookCount {
            author: author(),
            book_count: 3,
        })
        .unwrap();
        assert_eq!(value["bookCount"], 3);
        assert_eq!(value["name"], "Ada");
    }

    #[test]
    fn empty_patch_detected() {
        assert!(BookPatch::default().is_empty());
        assert!(!BookPatch {
            year: Some(1999),
            ..Default::default()
        }
        .is_empty());
    }

    #[test]
    fn text_match_is_case_insensitive() {
        let filter = SearchFilter {
            text: "ada".to_string(),
            year: None,
        };
        assert!(filter.matches_text("Ada Lovelace"));
        assert!(!filter.matches_text("Grace Hopper"));
    }

    #[test]
    fn non_ascii_text_matches_as_stored() {
        let filter = SearchFilter {
            text: fold_case("ÉMILE ZOLA"),
            year: None,
        };
        assert_eq!(filter.text, "Émile zola");
        assert!(filter.matches_text("Émile Zola"));
        assert!(!filter.matches_text("émile zola"));
    }
}
