pub mod models;
pub mod repository;
pub mod routes;
pub mod service;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use goweli_kernel::{InitCtx, Migration, Module};

use repository::BookRepository;
use service::Library;

/// Book storage: CRUD, search and JSON backup over the `books` table
pub struct BooksModule {
    library: Library,
}

impl BooksModule {
    pub fn new(library: Library) -> Self {
        Self { library }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.library.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            serde_json::json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let book_json = serde_json::json!({
            "application/json": { "schema": { "$ref": "#/components/schemas/Book" } }
        });
        let book_list_json = serde_json::json!({
            "application/json": {
                "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } }
            }
        });
        let draft_body = serde_json::json!({
            "required": true,
            "content": {
                "application/json": { "schema": { "$ref": "#/components/schemas/BookDraft" } }
            }
        });
        let id_param = serde_json::json!([{
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer", "format": "int64" }
        }]);

        Some(serde_json::json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "responses": {
                            "200": { "description": "All books", "content": book_list_json },
                            "500": error("Internal server error")
                        }
                    },
                    "post": {
                        "summary": "Add a book",
                        "tags": ["Books"],
                        "requestBody": draft_body,
                        "responses": {
                            "201": { "description": "Book created", "content": book_json },
                            "422": error("Title or author missing, or a field is too long")
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "parameters": id_param,
                        "responses": {
                            "200": { "description": "The book", "content": book_json },
                            "404": error("Book not found")
                        }
                    },
                    "put": {
                        "summary": "Replace a book's fields",
                        "tags": ["Books"],
                        "parameters": id_param,
                        "requestBody": draft_body,
                        "responses": {
                            "204": { "description": "Updated" },
                            "400": error("Body ID does not match path ID"),
                            "404": error("Book not found"),
                            "422": error("Validation error")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": id_param,
                        "responses": {
                            "204": { "description": "Deleted" },
                            "404": error("Book not found")
                        }
                    }
                },
                "/search": {
                    "get": {
                        "summary": "Case-insensitive substring search",
                        "tags": ["Books"],
                        "parameters": [
                            {
                                "name": "field",
                                "in": "query",
                                "schema": { "type": "string", "enum": ["title", "author", "isbn"] }
                            },
                            {
                                "name": "q",
                                "in": "query",
                                "required": true,
                                "schema": { "type": "string" }
                            }
                        ],
                        "responses": {
                            "200": { "description": "Matching books", "content": book_list_json },
                            "400": error("Empty search text")
                        }
                    }
                },
                "/export": {
                    "get": {
                        "summary": "Export every book as JSON",
                        "tags": ["Books"],
                        "responses": {
                            "200": { "description": "Backup document", "content": book_list_json }
                        }
                    }
                },
                "/import": {
                    "post": {
                        "summary": "Import books from an export document",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": book_list_json
                        },
                        "responses": {
                            "200": {
                                "description": "Number of books added",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": { "imported": { "type": "integer" } }
                                        }
                                    }
                                }
                            },
                            "400": error("Invalid or empty import data")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Books health check",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64" },
                            "bookTitle": { "type": "string", "maxLength": models::MAX_TITLE_LEN },
                            "authorName": { "type": "string", "maxLength": models::MAX_AUTHOR_LEN },
                            "isbn": { "type": ["string", "null"], "maxLength": models::MAX_ISBN_LEN },
                            "synopsis": { "type": ["string", "null"], "maxLength": models::MAX_SYNOPSIS_LEN },
                            "isChecked": { "type": "boolean", "description": "Read flag" },
                            "coverUrl": { "type": ["string", "null"], "maxLength": models::MAX_COVER_URL_LEN }
                        },
                        "required": ["id", "bookTitle", "authorName", "isChecked"]
                    },
                    "BookDraft": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64", "description": "Must match the path ID on PUT" },
                            "bookTitle": { "type": "string" },
                            "authorName": { "type": "string" },
                            "isbn": { "type": ["string", "null"] },
                            "synopsis": { "type": ["string", "null"] },
                            "isChecked": { "type": "boolean" },
                            "coverUrl": { "type": ["string", "null"] }
                        },
                        "required": ["bookTitle", "authorName"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        repository::migrations()
    }

    async fn start(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let count = BookRepository::new(ctx.db.clone())
            .count()
            .await
            .context("failed to count stored books")?;
        tracing::info!(module = self.name(), books = count, "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(library: Library) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(library))
}
