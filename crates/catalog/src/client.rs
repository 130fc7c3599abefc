//! HTTP client for the OpenLibrary search and covers services.

use std::time::Duration;

use async_trait::async_trait;
use goweli_kernel::settings::CatalogSettings;
use serde::{Deserialize, Serialize};

use crate::cover::{
    candidates_from_docs, cover_url, CoverCandidate, CoverCatalog, CoverFetcher, CoverKind,
    CoverSize,
};
use crate::error::CatalogError;

const DEFAULT_USER_AGENT: &str = concat!("goweli/", env!("CARGO_PKG_VERSION"));

/// The subset of a search document we care about
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchDoc {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author_name: Vec<String>,
    #[serde(default)]
    pub first_publish_year: Option<i32>,
    #[serde(default)]
    pub cover_edition_key: Option<String>,
    #[serde(default)]
    pub cover_i: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

/// Result of checking that a cover URL serves a real image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverValidation {
    pub is_valid: bool,
    /// Empty unless the image is valid
    pub image_bytes: Vec<u8>,
}

pub struct OpenLibraryClient {
    http: reqwest::Client,
    search_base_url: String,
    covers_base_url: String,
    search_limit: u32,
    min_cover_bytes: usize,
}

impl OpenLibraryClient {
    pub fn new(settings: &CatalogSettings) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .user_agent(
                settings
                    .user_agent
                    .clone()
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            )
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(CatalogError::Client)?;

        Ok(Self {
            http,
            search_base_url: settings.search_base_url.trim_end_matches('/').to_string(),
            covers_base_url: settings.covers_base_url.trim_end_matches('/').to_string(),
            search_limit: settings.search_limit,
            min_cover_bytes: settings.min_cover_bytes,
        })
    }

    pub fn search_limit(&self) -> u32 {
        self.search_limit
    }

    /// Title search, returning the catalog's JSON untouched
    pub async fn search_raw(&self, title: &str, limit: u32) -> Result<String, CatalogError> {
        let url = format!("{}/search.json", self.search_base_url);
        tracing::info!(%title, limit, "searching catalog");

        let limit = limit.to_string();
        let response = self
            .http
            .get(&url)
            .query(&[("title", title), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|source| CatalogError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), %url, "catalog search failed");
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url,
            });
        }

        response
            .text()
            .await
            .map_err(|source| CatalogError::Transport { url, source })
    }

    /// Title search, parsed into documents
    pub async fn search(&self, title: &str, limit: u32) -> Result<Vec<SearchDoc>, CatalogError> {
        let body = self.search_raw(title, limit).await?;
        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|source| CatalogError::Decode {
                url: format!("{}/search.json", self.search_base_url),
                source,
            })?;
        Ok(parsed.docs)
    }

    /// Cover bytes for an edition key or numeric id
    pub async fn fetch_cover(
        &self,
        kind: CoverKind,
        key: &str,
        size: CoverSize,
    ) -> Result<Vec<u8>, CatalogError> {
        let url = cover_url(&self.covers_base_url, kind, key, size);
        tracing::info!(?kind, %key, size = size.as_str(), "fetching cover");
        self.get_bytes(&url).await
    }

    /// Download a cover URL and report whether it is more than a placeholder
    pub async fn validate_cover(&self, url: &str) -> Result<CoverValidation, CatalogError> {
        tracing::info!(%url, "validating cover URL");
        let bytes = self.get_bytes(url).await?;

        if bytes.len() < self.min_cover_bytes {
            tracing::warn!(%url, size = bytes.len(), "cover validation failed - image too small");
            return Ok(CoverValidation {
                is_valid: false,
                image_bytes: Vec::new(),
            });
        }

        tracing::info!(%url, size = bytes.len(), "cover validated");
        Ok(CoverValidation {
            is_valid: true,
            image_bytes: bytes,
        })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| CatalogError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| CatalogError::Transport {
                url: url.to_string(),
                source,
            })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl CoverFetcher for OpenLibraryClient {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        self.get_bytes(url).await
    }
}

#[async_trait]
impl CoverCatalog for OpenLibraryClient {
    async fn cover_candidates(&self, title: &str) -> Result<Vec<CoverCandidate>, CatalogError> {
        let docs = self.search(title, self.search_limit).await?;
        let candidates = candidates_from_docs(&docs, &self.covers_base_url, CoverSize::M);
        tracing::info!(%title, docs = docs.len(), candidates = candidates.len(), "cover candidates collected");
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query},
        http::StatusCode,
        routing::get,
        Json, Router,
    };
    use std::collections::HashMap;

    /// Minimal stand-in for openlibrary.org and covers.openlibrary.org
    async fn spawn_fake_catalog() -> String {
        async fn search(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
            let title = params.get("title").cloned().unwrap_or_default();
            Json(serde_json::json!({
                "numFound": 3,
                "docs": [
                    { "title": title, "author_name": ["Frank Herbert"], "cover_edition_key": "OL1M", "cover_i": 1 },
                    { "title": "No edition", "cover_i": 22 },
                    { "title": "Nothing" }
                ]
            }))
        }

        async fn olid(Path(file): Path<String>) -> (StatusCode, Vec<u8>) {
            match file.as_str() {
                "OL1M-M.jpg" => (StatusCode::OK, vec![7; 2048]),
                "OLTINY-M.jpg" => (StatusCode::OK, vec![7; 43]),
                _ => (StatusCode::NOT_FOUND, Vec::new()),
            }
        }

        let app = Router::new()
            .route("/search.json", get(search))
            .route("/b/olid/{file}", get(olid));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn client() -> (OpenLibraryClient, String) {
        let base = spawn_fake_catalog().await;
        let settings = CatalogSettings {
            search_base_url: base.clone(),
            covers_base_url: base.clone(),
            ..CatalogSettings::default()
        };
        (OpenLibraryClient::new(&settings).unwrap(), base)
    }

    #[tokio::test]
    async fn search_parses_docs() {
        let (client, _) = client().await;
        let docs = client.search("Dune", 20).await.unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].title.as_deref(), Some("Dune"));
        assert_eq!(docs[0].author_name, vec!["Frank Herbert".to_string()]);
    }

    #[tokio::test]
    async fn cover_candidates_use_configured_covers_base() {
        let (client, base) = client().await;
        let candidates = client.cover_candidates("Dune").await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].url, format!("{}/b/olid/OL1M-M.jpg", base));
        assert_eq!(candidates[1].url, format!("{}/b/id/22-M.jpg", base));
    }

    #[tokio::test]
    async fn validate_cover_rejects_placeholders() {
        let (client, base) = client().await;

        let valid = client
            .validate_cover(&format!("{}/b/olid/OL1M-M.jpg", base))
            .await
            .unwrap();
        assert!(valid.is_valid);
        assert_eq!(valid.image_bytes.len(), 2048);

        let tiny = client
            .validate_cover(&format!("{}/b/olid/OLTINY-M.jpg", base))
            .await
            .unwrap();
        assert_eq!(
            tiny,
            CoverValidation {
                is_valid: false,
                image_bytes: Vec::new()
            }
        );
    }

    #[tokio::test]
    async fn missing_cover_reports_upstream_status() {
        let (client, _) = client().await;
        let err = client
            .fetch_cover(CoverKind::Olid, "OLNOPE", CoverSize::L)
            .await
            .unwrap_err();
        assert_eq!(err.upstream_status(), Some(404));
    }
}
