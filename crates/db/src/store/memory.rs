//! Process-local catalog store.
//!
//! State lives in two ordered maps behind one `tokio::sync::RwLock`. Every
//! mutation takes the write lock for its whole duration, which gives the
//! same atomicity the SQLite backend gets from transactions. Nothing is
//! persisted.

use std::collections::BTreeMap;

use async_trait::async_trait;
use shelf_kernel::Migration;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{CatalogStore, StoreError, StoreResult};
use crate::model::{
    Author, AuthorWithBookCount, AuthorWithBooks, Book, BookPatch, BookWithAuthor, NewBook,
    SearchFilter,
};

#[derive(Debug, Default)]
struct State {
    authors: BTreeMap<i64, Author>,
    books: BTreeMap<i64, Book>,
    last_author_id: i64,
    last_book_id: i64,
}

impl State {
    fn join(&self, book: &Book) -> StoreResult<BookWithAuthor> {
        let author = self.authors.get(&book.author_id).ok_or_else(|| {
            StoreError::Unexpected(anyhow::anyhow!(
                "book {} references missing author {}",
                book.id,
                book.author_id
            ))
        })?;
        Ok(BookWithAuthor {
            book: book.clone(),
            author: author.clone(),
        })
    }

    fn books_of(&self, author_id: i64) -> impl Iterator<Item = &Book> {
        self.books
            .values()
            .filter(move |book| book.author_id == author_id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_authors(&self) -> StoreResult<Vec<AuthorWithBookCount>> {
        let state = self.state.read().await;
        Ok(state
            .authors
            .values()
            .map(|author| AuthorWithBookCount {
                author: author.clone(),
                book_count: state.books_of(author.id).count() as i64,
            })
            .collect())
    }

    async fn get_author(&self, id: i64) -> StoreResult<AuthorWithBooks> {
        let state = self.state.read().await;
        let author = state
            .authors
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("author {id}")))?;
        Ok(AuthorWithBooks {
            author,
            books: state.books_of(id).cloned().collect(),
        })
    }

    async fn create_author(&self, name: &str) -> StoreResult<Author> {
        let mut state = self.state.write().await;
        state.last_author_id += 1;
        let now = OffsetDateTime::now_utc();
        let author = Author {
            id: state.last_author_id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.authors.insert(author.id, author.clone());
        Ok(author)
    }

    async fn update_author(&self, id: i64, name: &str) -> StoreResult<Author> {
        let mut state = self.state.write().await;
        let author = state
            .authors
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("author {id}")))?;
        author.name = name.to_string();
        author.updated_at = OffsetDateTime::now_utc();
        Ok(author.clone())
    }

    async fn delete_author(&self, id: i64) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if !state.authors.contains_key(&id) {
            return Err(StoreError::NotFound(format!("author {id}")));
        }
        let book_ids: Vec<i64> = state.books_of(id).map(|book| book.id).collect();
        if !book_ids.is_empty() {
            return Err(StoreError::HasDependents {
                entity: format!("author {id}"),
                dependents: book_ids,
            });
        }
        state.authors.remove(&id);
        Ok(())
    }

    async fn list_books(&self) -> StoreResult<Vec<BookWithAuthor>> {
        let state = self.state.read().await;
        state.books.values().map(|book| state.join(book)).collect()
    }

    async fn get_book(&self, id: i64) -> StoreResult<BookWithAuthor> {
        let state = self.state.read().await;
        let book = state
            .books
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("book {id}")))?;
        state.join(book)
    }

    async fn create_book(&self, book: NewBook) -> StoreResult<BookWithAuthor> {
        let mut state = self.state.write().await;
        if !state.authors.contains_key(&book.author_id) {
            return Err(StoreError::InvalidReference(format!(
                "author {} does not exist",
                book.author_id
            )));
        }
        state.last_book_id += 1;
        let now = OffsetDateTime::now_utc();
        let created = Book {
            id: state.last_book_id,
            title: book.title,
            year: book.year,
            author_id: book.author_id,
            created_at: now,
            updated_at: now,
        };
        state.books.insert(created.id, created.clone());
        state.join(&created)
    }

    async fn update_book(&self, id: i64, patch: BookPatch) -> StoreResult<BookWithAuthor> {
        let mut state = self.state.write().await;
        if !state.books.contains_key(&id) {
            return Err(StoreError::NotFound(format!("book {id}")));
        }
        if let Some(author_id) = patch.author_id {
            if !state.authors.contains_key(&author_id) {
                return Err(StoreError::InvalidReference(format!(
                    "author {author_id} does not exist"
                )));
            }
        }

        let updated = {
            let book = state
                .books
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound(format!("book {id}")))?;
            if let Some(title) = patch.title {
                book.title = title;
            }
            if let Some(year) = patch.year {
                book.year = year;
            }
            if let Some(author_id) = patch.author_id {
                book.author_id = author_id;
            }
            book.updated_at = OffsetDateTime::now_utc();
            book.clone()
        };
        state.join(&updated)
    }

    async fn delete_book(&self, id: i64) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state
            .books
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("book {id}")))
    }

    async fn search_books(&self, filter: &SearchFilter) -> StoreResult<Vec<BookWithAuthor>> {
        let state = self.state.read().await;
        state
            .books
            .values()
            .map(|book| state.join(book))
            .filter(|joined| match joined {
                Ok(joined) => {
                    filter.matches_text(&joined.book.title)
                        || filter.year == Some(joined.book.year)
                        || filter.matches_text(&joined.author.name)
                }
                Err(_) => true,
            })
            .collect()
    }

    async fn search_authors(&self, filter: &SearchFilter) -> StoreResult<Vec<Author>> {
        let state = self.state.read().await;
        Ok(state
            .authors
            .values()
            .filter(|author| filter.matches_text(&author.name))
            .cloned()
            .collect())
    }

    async fn apply_migrations(&self, migrations: &[(String, Migration)]) -> StoreResult<usize> {
        tracing::debug!(
            count = migrations.len(),
            "memory store has no schema; skipping migrations"
        );
        Ok(0)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
