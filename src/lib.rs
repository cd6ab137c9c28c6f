//! Shelf catalog application
//!
//! Wires the catalog modules (authors, books, search) to a store and the
//! HTTP layer.

pub mod catalog;
pub mod modules;

use anyhow::Context;
use axum::Router;
use shelf_db::SharedStore;
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

pub use catalog::{CatalogError, CatalogResult, ErrorKind};
pub use modules::register_all;

/// A store plus the modules registered against it.
pub struct App {
    pub registry: ModuleRegistry,
    pub store: SharedStore,
}

impl App {
    /// Open the configured store, then initialise, migrate and start every module
    pub async fn bootstrap(settings: &Settings) -> anyhow::Result<Self> {
        let store = shelf_db::open(&settings.database).await?;
        Self::with_store(settings, store).await
    }

    /// Same as [`App::bootstrap`] with an existing store
    pub async fn with_store(settings: &Settings, store: SharedStore) -> anyhow::Result<Self> {
        let mut registry = ModuleRegistry::new();
        register_all(&mut registry, store.clone())?;

        let ctx = InitCtx { settings };
        registry.init_modules(&ctx).await?;
        apply_migrations(&registry, &store).await?;
        registry.start_modules(&ctx).await?;

        Ok(Self { registry, store })
    }

    pub fn router(&self, settings: &Settings) -> Router {
        shelf_http::build_router(&self.registry, settings, self.store.clone())
    }

    /// Serve HTTP until shutdown, then stop the modules
    pub async fn serve(&self, settings: &Settings) -> anyhow::Result<()> {
        shelf_http::start_server(&self.registry, settings, self.store.clone()).await?;
        self.registry.stop_modules().await
    }
}

/// Apply pending migrations without starting anything; returns how many ran
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let store = shelf_db::open(&settings.database).await?;
    let mut registry = ModuleRegistry::new();
    register_all(&mut registry, store.clone())?;
    apply_migrations(&registry, &store).await
}

async fn apply_migrations(registry: &ModuleRegistry, store: &SharedStore) -> anyhow::Result<usize> {
    let migrations = registry.collect_migrations();
    let applied = store
        .apply_migrations(&migrations)
        .await
        .with_context(|| "failed to apply migrations")?;

    tracing::info!(
        backend = store.backend_name(),
        applied,
        known = migrations.len(),
        "migrations complete"
    );
    Ok(applied)
}
