//! Chain catalog synchronization.
//!
//! Keeps a local copy of a remotely published catalog of blockchain networks and their assets in
//! sync: fetch both catalogs and the local snapshot, join and diff them, persist the diff
//! atomically, announce the outcome to subscribers, and retry failed passes with backoff.

pub mod catalog;
pub mod config;
pub mod registry;

pub use catalog::{
	AssetCatalogEntry, CatalogError, CatalogFetcher, ChainAssetLink, ChainCatalogEntry, ChainId,
	RemoteCatalogClient,
};
pub use config::{ConfigError, SyncConfig};
pub use registry::sync::{
	ChainRepository, ChainSyncEvent, ChainSyncEventHandler, ChainSyncPipeline, EventCenter,
	FileChainRepository, InMemoryChainRepository, ReconnectionStrategy,
};
pub use registry::{ChainRegistry, ChainSyncError, ChainSyncService, SyncChanges};
