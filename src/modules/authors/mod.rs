pub mod models;
pub mod routes;
pub mod service;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use shelf_db::SharedStore;
use shelf_kernel::{InitCtx, Migration, Module};

pub use service::AuthorService;

/// Authors: CRUD with book counts, refuses to delete authors that still have books
pub struct AuthorsModule {
    service: AuthorService,
}

impl AuthorsModule {
    pub fn new(store: SharedStore) -> Self {
        Self {
            service: AuthorService::new(store),
        }
    }
}

#[async_trait]
impl Module for AuthorsModule {
    fn name(&self) -> &'static str {
        "authors"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "authors module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = json!({
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                }
            }
        });
        let with_description = |description: &str| {
            let mut response = error.clone();
            response["description"] = json!(description);
            response
        };
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer", "minimum": 1 }
        });
        let payload_body = json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/AuthorPayload" }
                }
            }
        });
        let author_response = |description: &str, schema: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": format!("#/components/schemas/{schema}") }
                    }
                }
            })
        };

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List authors with book counts",
                        "tags": ["Authors"],
                        "responses": {
                            "200": {
                                "description": "Every author",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/AuthorWithBookCount" }
                                        }
                                    }
                                }
                            },
                            "500": with_description("Internal server error")
                        }
                    },
                    "post": {
                        "summary": "Create an author",
                        "tags": ["Authors"],
                        "requestBody": payload_body.clone(),
                        "responses": {
                            "201": author_response("Created author", "Author"),
                            "400": with_description("Missing or empty name")
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get an author with its books",
                        "tags": ["Authors"],
                        "parameters": [id_param.clone()],
                        "responses": {
                            "200": author_response("Author with books", "AuthorWithBooks"),
                            "400": with_description("Invalid id"),
                            "404": with_description("Author not found")
                        }
                    },
                    "put": {
                        "summary": "Rename an author",
                        "tags": ["Authors"],
                        "parameters": [id_param.clone()],
                        "requestBody": payload_body,
                        "responses": {
                            "200": author_response("Updated author", "Author"),
                            "400": with_description("Missing or empty name"),
                            "404": with_description("Author not found")
                        }
                    },
                    "delete": {
                        "summary": "Delete an author without books",
                        "tags": ["Authors"],
                        "parameters": [id_param],
                        "responses": {
                            "200": { "description": "Author deleted" },
                            "400": with_description("Author still has books"),
                            "404": with_description("Author not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Author": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "name": { "type": "string" },
                            "createdAt": { "type": "string", "format": "date-time" },
                            "updatedAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "name", "createdAt", "updatedAt"]
                    },
                    "AuthorWithBookCount": {
                        "allOf": [
                            { "$ref": "#/components/schemas/Author" },
                            {
                                "type": "object",
                                "properties": { "bookCount": { "type": "integer" } },
                                "required": ["bookCount"]
                            }
                        ]
                    },
                    "AuthorWithBooks": {
                        "allOf": [
                            { "$ref": "#/components/schemas/Author" },
                            {
                                "type": "object",
                                "properties": {
                                    "books": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Book" }
                                    }
                                },
                                "required": ["books"]
                            }
                        ]
                    },
                    "AuthorPayload": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string", "minLength": 1 }
                        },
                        "required": ["name"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE IF NOT EXISTS authors (
                    id         INTEGER PRIMARY KEY AUTOINCREMENT,
                    name       TEXT NOT NULL CHECK (length(trim(name)) > 0),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "authors module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "authors module stopped");
        Ok(())
    }
}

/// Create a new instance of the authors module
pub fn create_module(store: SharedStore) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(AuthorsModule::new(store))
}
