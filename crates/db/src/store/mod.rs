//! The catalog storage handle.
//!
//! [`CatalogStore`] is the single seam between the catalog services and
//! persistence. Two implementations exist: [`sqlite::SqliteStore`] (durable,
//! via `sqlx`) and [`memory::MemoryStore`] (process-local, used for tests and
//! throwaway runs).

use async_trait::async_trait;
use shelf_kernel::Migration;
use thiserror::Error;

use crate::model::{
    Author, AuthorWithBookCount, AuthorWithBooks, BookPatch, BookWithAuthor, NewBook,
    SearchFilter,
};

pub mod memory;
pub mod sqlite;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{entity} still has {} dependent record(s)", .dependents.len())]
    HasDependents {
        entity: String,
        dependents: Vec<i64>,
    },
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("record".into()),
            err if is_foreign_key_violation(&err) => {
                StoreError::InvalidReference("foreign key constraint failed".into())
            }
            err => StoreError::Unexpected(err.into()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_foreign_key_violation(),
        _ => false,
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Every author with its book count, ascending id
    async fn list_authors(&self) -> StoreResult<Vec<AuthorWithBookCount>>;
    async fn get_author(&self, id: i64) -> StoreResult<AuthorWithBooks>;
    async fn create_author(&self, name: &str) -> StoreResult<Author>;
    async fn update_author(&self, id: i64, name: &str) -> StoreResult<Author>;
    /// Delete an author that has no books.
    ///
    /// The existence check, the dependent check and the delete are atomic.
    /// Fails with `NotFound` or `HasDependents`.
    async fn delete_author(&self, id: i64) -> StoreResult<()>;

    /// Every book joined with its author, ascending id
    async fn list_books(&self) -> StoreResult<Vec<BookWithAuthor>>;
    async fn get_book(&self, id: i64) -> StoreResult<BookWithAuthor>;
    /// Fails with `InvalidReference` when `book.author_id` does not exist.
    async fn create_book(&self, book: NewBook) -> StoreResult<BookWithAuthor>;
    /// Fails with `NotFound` for an unknown book and `InvalidReference` for
    /// an unknown `patch.author_id`.
    async fn update_book(&self, id: i64, patch: BookPatch) -> StoreResult<BookWithAuthor>;
    async fn delete_book(&self, id: i64) -> StoreResult<()>;

    /// Books whose title or author name contains `filter.text`, or whose
    /// year equals `filter.year`
    async fn search_books(&self, filter: &SearchFilter) -> StoreResult<Vec<BookWithAuthor>>;
    /// Authors whose name contains `filter.text`
    async fn search_authors(&self, filter: &SearchFilter) -> StoreResult<Vec<Author>>;

    /// Apply the given `(module, migration)` pairs that have not run yet and
    /// return how many were applied
    async fn apply_migrations(&self, migrations: &[(String, Migration)]) -> StoreResult<usize>;
    async fn health_check(&self) -> StoreResult<()>;
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn foreign_key_check_ignores_non_database_errors() {
        assert!(!is_foreign_key_violation(&sqlx::Error::PoolTimedOut));
        let err: StoreError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, StoreError::Unexpected(_)));
    }

    #[test]
    fn has_dependents_message_counts_records() {
        let err = StoreError::HasDependents {
            entity: "author 1".into(),
            dependents: vec![3, 4],
        };
        assert_eq!(err.to_string(), "author 1 still has 2 dependent record(s)");
    }
}
