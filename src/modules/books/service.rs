use shelf_db::{BookPatch, BookWithAuthor, NewBook, SharedStore, StoreError};

use crate::catalog::{
    check_author_id, check_text, check_year, ensure_id, CatalogError, CatalogResult,
};

/// CRUD over books. Every book returned carries its author.
#[derive(Clone)]
pub struct BookService {
    store: SharedStore,
}

impl BookService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> CatalogResult<Vec<BookWithAuthor>> {
        Ok(self.store.list_books().await?)
    }

    pub async fn get(&self, id: i64) -> CatalogResult<BookWithAuthor> {
        ensure_id(id)?;
        Ok(self.store.get_book(id).await?)
    }

    /// Create a book; an unknown `author_id` is an `InvalidReference` and
    /// leaves the store untouched.
    pub async fn create(&self, book: NewBook) -> CatalogResult<BookWithAuthor> {
        check_new_book(&book)?;
        let author_id = book.author_id;
        let created = self.store.create_book(book).await.map_err(|err| {
            if matches!(err, StoreError::InvalidReference(_)) {
                tracing::debug!(author_id, "book create refused: unknown author");
            }
            CatalogError::from(err)
        })?;
        tracing::info!(book_id = created.book.id, author_id, "book created");
        Ok(created)
    }

    /// Apply a partial update.
    ///
    /// An unknown book and an unknown `author_id` both surface as `NotFound`.
    pub async fn update(&self, id: i64, patch: BookPatch) -> CatalogResult<BookWithAuthor> {
        ensure_id(id)?;
        check_patch(&patch)?;
        let updated = self
            .store
            .update_book(id, patch)
            .await
            .map_err(|err| match err {
                StoreError::InvalidReference(message) => CatalogError::not_found(message),
                other => CatalogError::from(other),
            })?;
        tracing::info!(book_id = id, "book updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> CatalogResult<()> {
        ensure_id(id)?;
        self.store.delete_book(id).await?;
        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }
}

fn check_new_book(book: &NewBook) -> CatalogResult<()> {
    let mut errors = Vec::new();
    check_text("title", Some(book.title.as_str()), &mut errors);
    check_author_id(book.author_id, &mut errors);
    check_year(book.year, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::validation(errors))
    }
}

fn check_patch(patch: &BookPatch) -> CatalogResult<()> {
    if patch.is_empty() {
        return Err(CatalogError::invalid_field(
            "body",
            "at least one of title, authorId, year is required",
        ));
    }
    let mut errors = Vec::new();
    if let Some(title) = &patch.title {
        check_text("title", Some(title.as_str()), &mut errors);
    }
    if let Some(author_id) = patch.author_id {
        check_author_id(author_id, &mut errors);
    }
    if let Some(year) = patch.year {
        check_year(year, &mut errors);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::validation(errors))
    }
}
