use shelf_db::{Author, AuthorWithBookCount, AuthorWithBooks, SharedStore};

use crate::catalog::{ensure_id, CatalogError, CatalogResult};

/// CRUD over authors.
#[derive(Clone)]
pub struct AuthorService {
    store: SharedStore,
}

impl AuthorService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Every author with its current book count
    pub async fn list(&self) -> CatalogResult<Vec<AuthorWithBookCount>> {
        Ok(self.store.list_authors().await?)
    }

    /// One author with all of its books
    pub async fn get(&self, id: i64) -> CatalogResult<AuthorWithBooks> {
        ensure_id(id)?;
        Ok(self.store.get_author(id).await?)
    }

    pub async fn create(&self, name: &str) -> CatalogResult<Author> {
        let name = required_name(name)?;
        let author = self.store.create_author(name).await?;
        tracing::info!(author_id = author.id, "author created");
        Ok(author)
    }

    pub async fn update(&self, id: i64, name: &str) -> CatalogResult<Author> {
        ensure_id(id)?;
        let name = required_name(name)?;
        let author = self.store.update_author(id, name).await?;
        tracing::info!(author_id = author.id, "author updated");
        Ok(author)
    }

    /// Delete an author that has no books.
    ///
    /// An author with books yields `HasDependents` carrying the book ids, and
    /// stays in place.
    pub async fn delete(&self, id: i64) -> CatalogResult<()> {
        ensure_id(id)?;
        self.store.delete_author(id).await.map_err(|err| {
            let err = CatalogError::from(err);
            tracing::debug!(author_id = id, kind = ?err.kind(), "author delete refused");
            err
        })?;
        tracing::info!(author_id = id, "author deleted");
        Ok(())
    }
}

fn required_name(name: &str) -> CatalogResult<&str> {
    if name.trim().is_empty() {
        return Err(CatalogError::invalid_field("name", "must not be empty"));
    }
    Ok(name)
}
