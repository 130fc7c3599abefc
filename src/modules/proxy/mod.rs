pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use goweli_catalog::OpenLibraryClient;
use goweli_kernel::{InitCtx, Module};

/// Browser-facing passthrough to the OpenLibrary search and covers services
pub struct ProxyModule {
    client: Arc<OpenLibraryClient>,
}

impl ProxyModule {
    pub fn new(client: Arc<OpenLibraryClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Module for ProxyModule {
    fn name(&self) -> &'static str {
        "proxy"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            search_base_url = %ctx.settings.catalog.search_base_url,
            covers_base_url = %ctx.settings.catalog.covers_base_url,
            "proxy module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.client.clone())
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
        let size_param = serde_json::json!({
            "name": "size",
            "in": "query",
            "schema": { "type": "string", "enum": ["S", "M", "L"], "default": "M" }
        });
        let jpeg = serde_json::json!({
            "description": "Cover image",
            "content": { "image/jpeg": { "schema": { "type": "string", "format": "binary" } } }
        });

        Some(serde_json::json!({
            "paths": {
                "/search": {
                    "get": {
                        "summary": "Search OpenLibrary by title",
                        "tags": ["Proxy"],
                        "parameters": [
                            { "name": "title", "in": "query", "required": true, "schema": { "type": "string" } },
                            { "name": "limit", "in": "query", "schema": { "type": "integer", "default": 20 } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Raw OpenLibrary search response",
                                "content": { "application/json": { "schema": { "type": "object" } } }
                            },
                            "502": error("Error communicating with OpenLibrary API")
                        }
                    }
                },
                "/covers": {
                    "get": {
                        "summary": "Cover candidates for a title",
                        "tags": ["Proxy"],
                        "parameters": [
                            { "name": "title", "in": "query", "required": true, "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Candidates in search order",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/CoverCandidate" }
                                        }
                                    }
                                }
                            },
                            "404": error("No book covers found")
                        }
                    }
                },
                "/validateCover": {
                    "get": {
                        "summary": "Check that a cover URL serves a real image",
                        "tags": ["Proxy"],
                        "parameters": [
                            { "name": "coverUrl", "in": "query", "required": true, "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Validation result",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/CoverValidation" }
                                    }
                                }
                            },
                            "400": error("Invalid cover URL")
                        }
                    }
                },
                "/cover/{key}": {
                    "get": {
                        "summary": "Cover image by edition key",
                        "tags": ["Proxy"],
                        "parameters": [
                            { "name": "key", "in": "path", "required": true, "schema": { "type": "string" } },
                            size_param
                        ],
                        "responses": { "200": jpeg, "502": error("Error fetching book cover") }
                    }
                },
                "/coverById/{id}": {
                    "get": {
                        "summary": "Cover image by numeric cover id",
                        "tags": ["Proxy"],
                        "parameters": [
                            { "name": "id", "in": "path", "required": true, "schema": { "type": "integer" } },
                            size_param
                        ],
                        "responses": { "200": jpeg, "502": error("Error fetching book cover") }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Proxy health check",
                        "tags": ["Proxy"],
                        "responses": { "200": { "description": "OK" } }
                    }
                }
            },
            "components": {
                "schemas": {
                    "CoverCandidate": {
                        "type": "object",
                        "properties": {
                            "type": { "type": "string", "enum": ["olid", "id"] },
                            "key": { "type": "string" },
                            "url": { "type": "string" }
                        },
                        "required": ["type", "key", "url"]
                    },
                    "CoverValidation": {
                        "type": "object",
                        "properties": {
                            "isValid": { "type": "boolean" },
                            "imageBytes": { "type": "string", "format": "byte" }
                        },
                        "required": ["isValid", "imageBytes"]
                    }
                }
            }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "proxy module stopped");
        Ok(())
    }
}

/// Create a new instance of the proxy module
pub fn create_module(client: Arc<OpenLibraryClient>) -> Arc<dyn Module> {
    Arc::new(ProxyModule::new(client))
}
