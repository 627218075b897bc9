use crate::catalog::{ChainCatalogEntry, ChainId};
use crate::registry::ChainSyncError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Repository for the locally persisted chain catalog
#[async_trait::async_trait]
pub trait ChainRepository: Send + Sync {
	/// Read the full local snapshot.
	async fn fetch_all(&self) -> Result<Vec<ChainCatalogEntry>, ChainSyncError>;

	/// Upsert `upserts` and delete `remove_ids` in one atomic operation.
	async fn save(
		&self,
		upserts: &[ChainCatalogEntry],
		remove_ids: &[ChainId],
	) -> Result<(), ChainSyncError>;
}

/// Apply an upsert/remove batch to a snapshot, preserving the order of existing entries and
/// appending new ones.
pub fn apply_changes(
	mut chains: Vec<ChainCatalogEntry>,
	upserts: &[ChainCatalogEntry],
	remove_ids: &[ChainId],
) -> Vec<ChainCatalogEntry> {
	let removed: HashSet<&ChainId> = remove_ids.iter().collect();
	chains.retain(|c| !removed.contains(&c.chain_id));

	for upsert in upserts {
		match chains.iter_mut().find(|c| c.chain_id == upsert.chain_id) {
			Some(existing) => *existing = upsert.clone(),
			None => chains.push(upsert.clone()),
		}
	}

	chains
}

/// In-memory implementation of ChainRepository
#[derive(Default)]
pub struct InMemoryChainRepository {
	chains: RwLock<Vec<ChainCatalogEntry>>,
}

impl InMemoryChainRepository {
	pub fn new(chains: Vec<ChainCatalogEntry>) -> Self {
		Self {
			chains: RwLock::new(chains),
		}
	}
}

#[async_trait::async_trait]
impl ChainRepository for InMemoryChainRepository {
	async fn fetch_all(&self) -> Result<Vec<ChainCatalogEntry>, ChainSyncError> {
		Ok(self.chains.read().await.clone())
	}

	async fn save(
		&self,
		upserts: &[ChainCatalogEntry],
		remove_ids: &[ChainId],
	) -> Result<(), ChainSyncError> {
		let mut chains = self.chains.write().await;
		let updated = apply_changes(chains.clone(), upserts, remove_ids);
		*chains = updated;
		Ok(())
	}
}

/// File-based implementation of ChainRepository
///
/// The catalog is stored as one JSON document next to a metadata sidecar. Saves serialize under
/// a lock, write to a temporary file and rename it over the snapshot, so a failed save leaves the
/// previous snapshot intact.
pub struct FileChainRepository {
	data_dir: PathBuf,
	write_lock: tokio::sync::Mutex<()>,
}

impl FileChainRepository {
	pub fn new(data_dir: PathBuf) -> Self {
		Self {
			data_dir,
			write_lock: tokio::sync::Mutex::new(()),
		}
	}

	fn get_snapshot_filename(&self) -> PathBuf {
		self.data_dir.join("chains.json")
	}

	fn get_metadata_filename(&self) -> PathBuf {
		self.data_dir.join("chains.meta.json")
	}

	fn get_temp_filename(&self) -> PathBuf {
		self.data_dir.join("chains.json.tmp")
	}

	async fn read_snapshot(path: &Path) -> Result<Vec<ChainCatalogEntry>, ChainSyncError> {
		if !tokio::fs::try_exists(path).await? {
			return Ok(Vec::new());
		}

		let content = tokio::fs::read(path).await.map_err(|e| {
			ChainSyncError::PersistenceError(format!("Failed to read chain snapshot: {}", e))
		})?;

		let chains: Vec<ChainCatalogEntry> = serde_json::from_slice(&content).map_err(|e| {
			ChainSyncError::PersistenceError(format!("Failed to parse chain snapshot: {}", e))
		})?;

		Ok(chains)
	}
}

#[async_trait::async_trait]
impl ChainRepository for FileChainRepository {
	async fn fetch_all(&self) -> Result<Vec<ChainCatalogEntry>, ChainSyncError> {
		let filename = self.get_snapshot_filename();
		let chains = Self::read_snapshot(&filename).await?;

		debug!("Loaded {} chains from {:?}", chains.len(), filename);
		Ok(chains)
	}

	async fn save(
		&self,
		upserts: &[ChainCatalogEntry],
		remove_ids: &[ChainId],
	) -> Result<(), ChainSyncError> {
		if upserts.is_empty() && remove_ids.is_empty() {
			debug!("No chain changes to persist");
			return Ok(());
		}

		let _guard = self.write_lock.lock().await;

		tokio::fs::create_dir_all(&self.data_dir).await.map_err(|e| {
			ChainSyncError::PersistenceError(format!("Failed to create data directory: {}", e))
		})?;

		let filename = self.get_snapshot_filename();
		let current = Self::read_snapshot(&filename).await?;
		let chains = apply_changes(current, upserts, remove_ids);

		let content = serde_json::to_vec_pretty(&chains)?;

		// Write state file
		let temp_filename = self.get_temp_filename();
		tokio::fs::write(&temp_filename, &content)
			.await
			.map_err(|e| {
				ChainSyncError::PersistenceError(format!("Failed to write chain snapshot: {}", e))
			})?;
		tokio::fs::rename(&temp_filename, &filename)
			.await
			.map_err(|e| {
				ChainSyncError::PersistenceError(format!("Failed to replace chain snapshot: {}", e))
			})?;

		// Metadata is informational; the snapshot is already committed
		let metadata = serde_json::json!({
			"chain_count": chains.len(),
			"timestamp": chrono::Utc::now().to_rfc3339(),
		});
		if let Err(e) =
			tokio::fs::write(self.get_metadata_filename(), serde_json::to_vec_pretty(&metadata)?)
				.await
		{
			tracing::warn!("Failed to write chain snapshot metadata: {}", e);
		}

		info!(
			"Saved {} chains to {:?} ({} upserted, {} removed)",
			chains.len(),
			filename,
			upserts.len(),
			remove_ids.len()
		);
		Ok(())
	}
}
