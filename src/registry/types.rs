use crate::catalog::{CatalogError, ChainCatalogEntry, ChainId};

/// Result of one sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncChanges {
	/// Chains that are new or differ from their stored version
	pub new_or_updated: Vec<ChainCatalogEntry>,
	/// Chains that are stored locally but absent from the remote catalog
	pub removed: Vec<ChainCatalogEntry>,
}

impl SyncChanges {
	pub fn is_empty(&self) -> bool {
		self.new_or_updated.is_empty() && self.removed.is_empty()
	}

	pub fn removed_ids(&self) -> Vec<ChainId> {
		self.removed.iter().map(|c| c.chain_id.clone()).collect()
	}
}

/// Error types for chain catalog synchronization
#[derive(Debug, thiserror::Error)]
pub enum ChainSyncError {
	/// Remote data decoded and joined into zero chains with at least one asset
	#[error("Invalid data received: no chain has any resolvable asset")]
	InvalidDataReceived,

	#[error("Catalog error: {0}")]
	CatalogError(#[from] CatalogError),

	#[error("Persistence error: {0}")]
	PersistenceError(String),

	#[error("Unexpected result: {0}")]
	UnexpectedResult(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("Serialization error: {0}")]
	SerializationError(#[from] serde_json::Error),
}
