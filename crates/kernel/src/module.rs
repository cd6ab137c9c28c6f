use async_trait::async_trait;
use axum::Router;

/// Context handed to modules while the application boots.
///
/// Storage is not part of the context: modules receive their store handle
/// when they are constructed.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// A schema migration contributed by a module.
///
/// `up` may hold several `;`-separated statements. Migrations are identified
/// by `(module name, id)` and applied at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// A unit of catalog functionality: routes, OpenAPI fragment, schema.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name, also used as the route prefix `/api/{name}`
    fn name(&self) -> &'static str;

    /// Called once at startup, before migrations run
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Axum router for this module, mounted under `/api/{name}`
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment (`paths` relative to the module prefix, plus
    /// `components.schemas`) merged into the application document
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Migrations owned by this module, in application order
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Called after migrations are complete
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during shutdown, in reverse registration order
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
