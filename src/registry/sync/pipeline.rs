//! Fetch, diff and persist pipeline for one sync pass.
//!
//! A pass fetches the remote asset catalog, the remote chain catalog and the local snapshot as
//! three independent tasks. Once all three have finished, the remote payloads are decoded, assets
//! are joined onto chains, the result is diffed against the local snapshot, and the diff is written
//! to the repository in one atomic save.
//!
//! Transport failures degrade to an empty catalog and damaged elements are dropped. The pass fails
//! only on an integrity problem (no chain ends up with any asset), a repository failure, or a task
//! that did not finish.

use crate::catalog::{
    AssetCatalogEntry, CatalogFetcher, ChainCatalogEntry, ChainId, RemoteChainEntry,
    decode_valid_objects,
};
use crate::registry::sync::repositories::ChainRepository;
use crate::registry::{ChainSyncError, SyncChanges};

use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

const EMPTY_JSON_ARRAY: &[u8] = b"[]";

/// Pipeline that produces and persists the change set of one sync pass.
pub struct ChainSyncPipeline {
    chains_url: Url,
    assets_url: Url,
    fetcher: Arc<dyn CatalogFetcher>,
    repository: Arc<dyn ChainRepository>,
}

impl ChainSyncPipeline {
    pub fn new(
        chains_url: Url,
        assets_url: Url,
        fetcher: Arc<dyn CatalogFetcher>,
        repository: Arc<dyn ChainRepository>,
    ) -> Self {
        Self {
            chains_url,
            assets_url,
            fetcher,
            repository,
        }
    }

    /// Run one pass: fetch, decode, join, diff, persist.
    ///
    /// The returned change set has already been persisted.
    pub async fn run(&self) -> Result<SyncChanges, ChainSyncError> {
        let changes = self.fetch_and_diff().await?;

        self.repository
            .save(&changes.new_or_updated, &changes.removed_ids())
            .await?;

        Ok(changes)
    }

    async fn fetch_and_diff(&self) -> Result<SyncChanges, ChainSyncError> {
        let assets_task = tokio::spawn(fetch_or_empty(
            self.fetcher.clone(),
            self.assets_url.clone(),
        ));
        let chains_task = tokio::spawn(fetch_or_empty(
            self.fetcher.clone(),
            self.chains_url.clone(),
        ));
        let repository = self.repository.clone();
        let local_task = tokio::spawn(async move { repository.fetch_all().await });

        let (assets_data, chains_data, local_chains) =
            futures::future::join3(assets_task, chains_task, local_task).await;

        let assets_data = assets_data.map_err(unfinished_task)?;
        let chains_data = chains_data.map_err(unfinished_task)?;
        let remote_chains = join_catalogs(&chains_data, &assets_data)?;

        let local_chains = local_chains.map_err(unfinished_task)??;

        let changes = diff_chains(&remote_chains, &local_chains);
        debug!(
            "Computed chain diff: {} new or updated, {} removed",
            changes.new_or_updated.len(),
            changes.removed.len()
        );

        Ok(changes)
    }
}

async fn fetch_or_empty(fetcher: Arc<dyn CatalogFetcher>, url: Url) -> Vec<u8> {
    match fetcher.fetch(&url).await {
        Ok(data) => data,
        Err(e) => {
            warn!("Failed to fetch catalog from {}, using empty catalog: {}", url, e);
            EMPTY_JSON_ARRAY.to_vec()
        }
    }
}

fn unfinished_task(error: JoinError) -> ChainSyncError {
    ChainSyncError::UnexpectedResult(format!("sync task did not complete: {}", error))
}

/// Decode both catalogs and attach resolved assets to each chain.
///
/// Fails with `InvalidDataReceived` when no chain has a single resolved asset, which is what a
/// total outage of the asset catalog looks like. Chains that individually end up with no assets
/// are kept.
pub fn join_catalogs(
    chains_data: &[u8],
    assets_data: &[u8],
) -> Result<Vec<ChainCatalogEntry>, ChainSyncError> {
    let assets: Vec<AssetCatalogEntry> = decode_valid_objects(assets_data);
    let remote: Vec<RemoteChainEntry> = decode_valid_objects(chains_data);

    info!(
        "Decoded {} remote chains and {} remote assets",
        remote.len(),
        assets.len()
    );

    let chains: Vec<ChainCatalogEntry> = remote
        .into_iter()
        .map(|chain| ChainCatalogEntry::resolve(chain, &assets))
        .collect();

    if chains.iter().all(|chain| chain.assets.is_empty()) {
        // Keep the cached catalog rather than replacing it with an empty one
        return Err(ChainSyncError::InvalidDataReceived);
    }

    for chain in chains.iter().filter(|chain| chain.assets.is_empty()) {
        debug!("Chain {} has no resolvable assets", chain.chain_id);
    }

    Ok(chains)
}

/// Compute the change set between the remote and local catalogs.
///
/// Remote entries that are new or differ structurally from their local counterpart are upserted;
/// local entries without a remote counterpart are removed. Both lists keep source order.
pub fn diff_chains(remote: &[ChainCatalogEntry], local: &[ChainCatalogEntry]) -> SyncChanges {
    let remote_mapping: HashMap<&ChainId, &ChainCatalogEntry> =
        remote.iter().map(|c| (c.identifier(), c)).collect();
    let local_mapping: HashMap<&ChainId, &ChainCatalogEntry> =
        local.iter().map(|c| (c.identifier(), c)).collect();

    let new_or_updated = remote
        .iter()
        .filter(|item| match local_mapping.get(item.identifier()) {
            Some(local_item) => *local_item != *item,
            None => true,
        })
        .cloned()
        .collect();

    let removed = local
        .iter()
        .filter(|item| !remote_mapping.contains_key(item.identifier()))
        .cloned()
        .collect();

    SyncChanges {
        new_or_updated,
        removed,
    }
}
