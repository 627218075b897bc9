//! Read-mostly view of the synced chain catalog.
//!
//! `ChainRegistry` is an event subscriber: it is seeded from the local repository and then applies
//! every completed change set, so the rest of an application can read chains between passes
//! without touching storage.

use crate::catalog::{ChainCatalogEntry, ChainId};
use crate::registry::ChainSyncError;
use crate::registry::sync::events::{ChainSyncEvent, ChainSyncEventHandler};
use crate::registry::sync::repositories::ChainRepository;

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

#[derive(Default)]
pub struct ChainRegistry {
    chains: RwLock<HashMap<ChainId, ChainCatalogEntry>>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the registry contents with the repository snapshot.
    pub async fn load_from(&self, repository: &dyn ChainRepository) -> Result<usize, ChainSyncError> {
        let chains = repository.fetch_all().await?;
        let count = chains.len();

        let mut guard = self.chains.write().unwrap_or_else(PoisonError::into_inner);
        *guard = chains.into_iter().map(|c| (c.chain_id.clone(), c)).collect();

        debug!("Chain registry seeded with {} chains", count);
        Ok(count)
    }

    pub fn chain(&self, chain_id: &str) -> Option<ChainCatalogEntry> {
        self.chains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(chain_id)
            .cloned()
    }

    /// All chains, ordered by name.
    pub fn chains(&self) -> Vec<ChainCatalogEntry> {
        let mut chains: Vec<_> = self
            .chains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        chains.sort_by(|a, b| a.name.cmp(&b.name));
        chains
    }

    pub fn len(&self) -> usize {
        self.chains.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl ChainSyncEventHandler for ChainRegistry {
    async fn handle(&self, event: &ChainSyncEvent) -> Result<(), ChainSyncError> {
        if let ChainSyncEvent::SyncCompleted { changes } = event {
            let mut chains = self.chains.write().unwrap_or_else(PoisonError::into_inner);

            for removed in &changes.removed {
                chains.remove(&removed.chain_id);
            }
            for chain in &changes.new_or_updated {
                chains.insert(chain.chain_id.clone(), chain.clone());
            }

            debug!("Chain registry now holds {} chains", chains.len());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ChainRegistry"
    }
}
