//! Chain Catalog Synchronization Module
//!
//! This module provides the engine that keeps the local chain catalog in sync with the remotely
//! published one. It is composed of several submodules, each responsible for one aspect of a pass:
//!
//! - `service`: The coordinator. It admits sync requests, tracks attempts, emits lifecycle events and schedules retries.
//! - `pipeline`: Fetches both remote catalogs and the local snapshot concurrently, joins and diffs them, and persists the diff.
//! - `events`: Event types, the handler trait, and the `EventCenter` that delivers events to subscribers.
//! - `repositories`: The local storage seam and its in-memory and file-backed implementations.
//! - `strategies`: Pluggable retry policies.
//!
//! At most one pass runs at a time. A failed pass never touches the local store and is retried
//! according to the configured strategy.

/// Event system for decoupled communication of sync outcomes
pub mod events;
/// Fetch, diff and persist pipeline
pub mod pipeline;
/// Local chain catalog storage
pub mod repositories;
/// Sync coordinator
pub mod service;
/// Pluggable retry strategies
pub mod strategies;

pub use events::{ChainSyncEvent, ChainSyncEventHandler, EventCenter, LoggingEventHandler};
pub use pipeline::ChainSyncPipeline;
pub use repositories::{ChainRepository, FileChainRepository, InMemoryChainRepository};
pub use service::ChainSyncService;
pub use strategies::{
    ConstantReconnection, ExponentialReconnection, NoReconnection, ReconnectionStrategy,
};
