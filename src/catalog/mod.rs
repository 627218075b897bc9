//! Remote catalog integration
//!
//! This module provides the client and types for reading the remotely published chain and asset
//! catalogs. The catalogs are JSON arrays fetched over HTTP and decoded permissively.

/// HTTP client for the remote catalogs
mod client;
/// Permissive array decoding
mod decode;
/// Type definitions for catalog entries
mod types;

pub use client::{CatalogFetcher, RemoteCatalogClient, parse_catalog_url};
pub use decode::{decode_optional_array, decode_valid_objects};
pub use types::*;
