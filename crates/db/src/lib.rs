//! Persistence for the shelf catalog.
//!
//! Services depend on the [`CatalogStore`] trait object; [`open`] picks the
//! backend named in [`DatabaseSettings`].

use std::sync::Arc;

use anyhow::Context;
use shelf_kernel::settings::{DatabaseBackend, DatabaseSettings};

pub mod model;
pub mod store;

pub use model::{
    fold_case, Author, AuthorWithBookCount, AuthorWithBooks, Book, BookPatch, BookWithAuthor,
    NewBook, SearchFilter,
};
pub use store::memory::MemoryStore;
pub use store::sqlite::SqliteStore;
pub use store::{CatalogStore, StoreError, StoreResult};

/// Shared handle passed to every catalog service.
pub type SharedStore = Arc<dyn CatalogStore>;

/// Open the configured store.
pub async fn open(settings: &DatabaseSettings) -> anyhow::Result<SharedStore> {
    let store: SharedStore = match settings.backend {
        DatabaseBackend::Sqlite => Arc::new(
            SqliteStore::connect(settings)
                .await
                .with_context(|| "failed to open sqlite store")?,
        ),
        DatabaseBackend::Memory => Arc::new(MemoryStore::new()),
    };

    tracing::info!(
        target: "shelf-db",
        backend = store.backend_name(),
        "catalog store opened"
    );

    Ok(store)
}
