pub mod routes;
pub mod service;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use shelf_db::SharedStore;
use shelf_kernel::{InitCtx, Module};

pub use service::{SearchResults, SearchService};

/// Search module: substring search over titles, author names, and years
pub struct SearchModule {
    service: SearchService,
}

impl SearchModule {
    pub fn new(store: SharedStore) -> Self {
        Self {
            service: SearchService::new(store),
        }
    }
}

#[async_trait]
impl Module for SearchModule {
    fn name(&self) -> &'static str {
        "search"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "search module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "Search books and authors",
                        "description": "Case-insensitive substring match on book titles and author names; a whole-number query also matches book years.",
                        "tags": ["Search"],
                        "parameters": [{
                            "name": "q",
                            "in": "query",
                            "required": true,
                            "allowEmptyValue": true,
                            "schema": { "type": "string" }
                        }],
                        "responses": {
                            "200": {
                                "description": "Matching books and authors",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/SearchResults" }
                                    }
                                }
                            },
                            "400": {
                                "description": "Missing q parameter",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "SearchResults": {
                        "type": "object",
                        "properties": {
                            "books": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/BookWithAuthor" }
                            },
                            "authors": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Author" }
                            }
                        },
                        "required": ["books", "authors"]
                    }
                }
            }
        }))
    }
}

/// Create a new instance of the search module
pub fn create_module(store: SharedStore) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(SearchModule::new(store))
}
