//! Cover candidates and the sequential accept/reject scan over them.
//!
//! A title search yields a short list of candidates. The scan fetches each
//! image in turn, skips OpenLibrary's tiny "no cover" placeholders and
//! failed downloads on its own, and hands every real image to a
//! [`CoverDecider`] until one is accepted or the list runs out.

use std::time::Duration;

use async_trait::async_trait;
use goweli_kernel::settings::CatalogSettings;
use serde::Serialize;

use crate::client::SearchDoc;
use crate::error::CatalogError;

/// Cover image size letter understood by the covers service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoverSize {
    S,
    #[default]
    M,
    L,
}

impl CoverSize {
    /// Parse a size letter, falling back to `M` for anything unexpected
    pub fn lenient(value: Option<&str>) -> Self {
        match value {
            Some("S") => CoverSize::S,
            Some("L") => CoverSize::L,
            _ => CoverSize::M,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CoverSize::S => "S",
            CoverSize::M => "M",
            CoverSize::L => "L",
        }
    }
}

/// How a cover is addressed on the covers service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverKind {
    /// Edition key, e.g. `OL7353617M`
    Olid,
    /// Numeric cover id
    Id,
}

impl CoverKind {
    fn path_segment(self) -> &'static str {
        match self {
            CoverKind::Olid => "olid",
            CoverKind::Id => "id",
        }
    }
}

/// Build the image URL for a cover key
pub fn cover_url(covers_base_url: &str, kind: CoverKind, key: &str, size: CoverSize) -> String {
    format!(
        "{}/b/{}/{}-{}.jpg",
        covers_base_url.trim_end_matches('/'),
        kind.path_segment(),
        key,
        size.as_str()
    )
}

/// One image URL derived from a catalog search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverCandidate {
    #[serde(rename = "type")]
    pub kind: CoverKind,
    pub key: String,
    pub url: String,
}

/// Derive candidates from search docs, preferring the edition key over the
/// numeric cover id. Docs with neither are skipped.
pub fn candidates_from_docs(
    docs: &[SearchDoc],
    covers_base_url: &str,
    size: CoverSize,
) -> Vec<CoverCandidate> {
    docs.iter()
        .filter_map(|doc| {
            let (kind, key) = match (&doc.cover_edition_key, doc.cover_i) {
                (Some(edition), _) if !edition.trim().is_empty() => {
                    (CoverKind::Olid, edition.trim().to_string())
                }
                (_, Some(id)) => (CoverKind::Id, id.to_string()),
                _ => return None,
            };
            Some(CoverCandidate {
                url: cover_url(covers_base_url, kind, &key, size),
                kind,
                key,
            })
        })
        .collect()
}

/// Downloads cover images
#[async_trait]
pub trait CoverFetcher: Send + Sync {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, CatalogError>;
}

/// A catalog able to list cover candidates for a title
#[async_trait]
pub trait CoverCatalog: CoverFetcher {
    async fn cover_candidates(&self, title: &str) -> Result<Vec<CoverCandidate>, CatalogError>;
}

/// An image waiting for a decision
#[derive(Debug, Clone)]
pub struct CoverPreview {
    pub url: String,
    pub bytes: Vec<u8>,
    /// Zero-based index of the candidate
    pub position: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverDecision {
    Accept,
    /// Try the next candidate
    Reject,
    /// Stop scanning and keep no cover
    Abandon,
}

/// Whoever looks at a preview and accepts or rejects it
#[async_trait]
pub trait CoverDecider: Send {
    async fn decide(&mut self, preview: &CoverPreview) -> CoverDecision;
}

/// Accepts the first real image
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptFirst;

#[async_trait]
impl CoverDecider for AcceptFirst {
    async fn decide(&mut self, _preview: &CoverPreview) -> CoverDecision {
        CoverDecision::Accept
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub min_cover_bytes: usize,
    /// Pause after a failed download before moving on
    pub retry_delay: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from(&CatalogSettings::default())
    }
}

impl From<&CatalogSettings> for ScanOptions {
    fn from(settings: &CatalogSettings) -> Self {
        Self {
            min_cover_bytes: settings.min_cover_bytes,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
        }
    }
}

/// Linear walk over a fixed list of candidates
pub struct CoverScan<'a, F: ?Sized> {
    fetcher: &'a F,
    candidates: Vec<CoverCandidate>,
    index: usize,
    options: ScanOptions,
}

impl<'a, F: CoverFetcher + ?Sized> CoverScan<'a, F> {
    pub fn new(fetcher: &'a F, candidates: Vec<CoverCandidate>, options: ScanOptions) -> Self {
        Self {
            fetcher,
            candidates,
            index: 0,
            options,
        }
    }

    /// Candidates not yet tried, including the current one
    pub fn remaining(&self) -> usize {
        self.candidates.len().saturating_sub(self.index)
    }

    /// Fetch candidates from the current position until one is a real image.
    ///
    /// The returned preview stays current until [`CoverScan::reject`] is called.
    pub async fn next_preview(&mut self) -> Option<CoverPreview> {
        while let Some(candidate) = self.candidates.get(self.index) {
            match self.fetcher.fetch_image(&candidate.url).await {
                Ok(bytes) if bytes.len() < self.options.min_cover_bytes => {
                    tracing::debug!(
                        url = %candidate.url,
                        size = bytes.len(),
                        "skipping placeholder cover"
                    );
                    self.index += 1;
                }
                Ok(bytes) => {
                    return Some(CoverPreview {
                        url: candidate.url.clone(),
                        bytes,
                        position: self.index,
                        total: self.candidates.len(),
                    });
                }
                Err(err) => {
                    tracing::warn!(url = %candidate.url, error = %err, "cover download failed");
                    tokio::time::sleep(self.options.retry_delay).await;
                    self.index += 1;
                }
            }
        }
        None
    }

    /// Discard the current candidate
    pub fn reject(&mut self) {
        self.index += 1;
        tracing::debug!(remaining = self.remaining(), "cover rejected");
    }

    /// Run the scan to completion, returning the accepted cover URL
    pub async fn resolve<D: CoverDecider + ?Sized>(mut self, decider: &mut D) -> Option<String> {
        while let Some(preview) = self.next_preview().await {
            match decider.decide(&preview).await {
                CoverDecision::Accept => {
                    tracing::info!(url = %preview.url, "cover accepted");
                    return Some(preview.url);
                }
                CoverDecision::Reject => self.reject(),
                CoverDecision::Abandon => {
                    tracing::info!("cover selection abandoned");
                    return None;
                }
            }
        }
        tracing::info!("cover candidates exhausted");
        None
    }
}
