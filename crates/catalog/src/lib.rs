//! OpenLibrary catalog access and the sequential cover-candidate scan.

pub mod client;
pub mod cover;
pub mod error;

pub use client::{CoverValidation, OpenLibraryClient, SearchDoc};
pub use cover::{
    candidates_from_docs, AcceptFirst, CoverCandidate, CoverCatalog, CoverDecider, CoverDecision,
    CoverFetcher, CoverKind, CoverPreview, CoverScan, CoverSize, ScanOptions,
};
pub use error::CatalogError;
