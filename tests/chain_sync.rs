//! End-to-end tests of the sync coordinator with in-process catalog and storage doubles.

use chain_catalog_sync::registry::sync::ConstantReconnection;
use chain_catalog_sync::{
    CatalogError, CatalogFetcher, ChainCatalogEntry, ChainId, ChainRegistry, ChainRepository,
    ChainSyncError, ChainSyncEvent, ChainSyncEventHandler, ChainSyncPipeline, ChainSyncService,
    EventCenter, InMemoryChainRepository,
};
use reqwest::Url;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

const CHAINS_URL: &str = "https://catalog.test/chains.json";
const ASSETS_URL: &str = "https://catalog.test/assets.json";

/// Serves fixed catalogs and counts chain catalog requests.
struct CountingFetcher {
    delay: Duration,
    chain_requests: AtomicU32,
}

impl CountingFetcher {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            chain_requests: AtomicU32::new(0),
        }
    }
}

#[async_trait::async_trait]
impl CatalogFetcher for CountingFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, CatalogError> {
        tokio::time::sleep(self.delay).await;

        let body = if url.as_str() == CHAINS_URL {
            self.chain_requests.fetch_add(1, Ordering::SeqCst);
            json!([
                {
                    "chainId": "polkadot",
                    "name": "Polkadot",
                    "addressPrefix": 0,
                    "assets": [{ "assetId": "dot", "staking": "relaychain" }],
                    "nodes": [{ "url": "wss://rpc.polkadot.io", "name": "Parity" }]
                },
                {
                    "chainId": "kusama",
                    "name": "Kusama",
                    "addressPrefix": 2,
                    "assets": [{ "assetId": "ksm" }],
                    "nodes": [{ "url": "wss://kusama-rpc.polkadot.io", "name": "Parity" }]
                }
            ])
        } else {
            json!([
                { "id": "dot", "chainId": "polkadot", "precision": 10, "priceId": "polkadot" },
                { "id": "ksm", "chainId": "kusama", "precision": 12, "priceId": "kusama" }
            ])
        };

        Ok(serde_json::to_vec(&body).unwrap())
    }
}

/// Fails the first `failures` saves, then delegates.
struct FlakyRepository {
    inner: InMemoryChainRepository,
    failures: AtomicU32,
}

#[async_trait::async_trait]
impl ChainRepository for FlakyRepository {
    async fn fetch_all(&self) -> Result<Vec<ChainCatalogEntry>, ChainSyncError> {
        self.inner.fetch_all().await
    }

    async fn save(
        &self,
        upserts: &[ChainCatalogEntry],
        remove_ids: &[ChainId],
    ) -> Result<(), ChainSyncError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ChainSyncError::PersistenceError("disk full".to_string()));
        }
        self.inner.save(upserts, remove_ids).await
    }
}

struct EventRecorder {
    sender: mpsc::UnboundedSender<ChainSyncEvent>,
}

#[async_trait::async_trait]
impl ChainSyncEventHandler for EventRecorder {
    async fn handle(&self, event: &ChainSyncEvent) -> Result<(), ChainSyncError> {
        self.sender.send(event.clone()).ok();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "EventRecorder"
    }
}

fn pipeline(
    fetcher: Arc<CountingFetcher>,
    repository: Arc<dyn ChainRepository>,
) -> ChainSyncPipeline {
    ChainSyncPipeline::new(
        Url::parse(CHAINS_URL).unwrap(),
        Url::parse(ASSETS_URL).unwrap(),
        fetcher,
        repository,
    )
}

fn recording_center() -> (EventCenter, mpsc::UnboundedReceiver<ChainSyncEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let center = EventCenter::new();
    center.subscribe(Arc::new(EventRecorder { sender }));
    (center, receiver)
}

/// Collect events up to and including the first `SyncCompleted`.
async fn events_until_completed(
    receiver: &mut mpsc::UnboundedReceiver<ChainSyncEvent>,
) -> Vec<ChainSyncEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
            .await
            .expect("timed out waiting for sync events")
            .expect("event center stopped");
        let done = matches!(event, ChainSyncEvent::SyncCompleted { .. });
        events.push(event);
        if done {
            return events;
        }
    }
}

#[tokio::test]
async fn test_trigger_during_pass_is_dropped() {
    let fetcher = Arc::new(CountingFetcher::new(Duration::from_millis(50)));
    let repository = Arc::new(InMemoryChainRepository::default());
    let (center, mut receiver) = recording_center();
    let service = ChainSyncService::new(
        pipeline(fetcher.clone(), repository),
        center,
        Arc::new(ConstantReconnection::new(Duration::from_millis(10))),
    );

    service.sync_up();
    service.sync_up();

    let events = events_until_completed(&mut receiver).await;
    let started = events
        .iter()
        .filter(|e| matches!(e, ChainSyncEvent::SyncStarted { .. }))
        .count();

    assert_eq!(started, 1);
    assert_eq!(fetcher.chain_requests.load(Ordering::SeqCst), 1);
    assert!(!service.is_syncing());
}

#[tokio::test]
async fn test_persistence_failures_are_retried() {
    let fetcher = Arc::new(CountingFetcher::new(Duration::ZERO));
    let repository = Arc::new(FlakyRepository {
        inner: InMemoryChainRepository::default(),
        failures: AtomicU32::new(3),
    });
    let (center, mut receiver) = recording_center();
    let service = ChainSyncService::new(
        pipeline(fetcher, repository.clone()),
        center,
        Arc::new(ConstantReconnection::new(Duration::from_millis(10))),
    );

    service.sync_up();
    let events = events_until_completed(&mut receiver).await;

    let failed_attempts: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            ChainSyncEvent::SyncFailed { attempt, error } => {
                assert!(matches!(**error, ChainSyncError::PersistenceError(_)));
                Some(*attempt)
            }
            _ => None,
        })
        .collect();
    let started_attempts: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            ChainSyncEvent::SyncStarted { attempt } => Some(*attempt),
            _ => None,
        })
        .collect();

    assert_eq!(failed_attempts, vec![1, 2, 3]);
    assert_eq!(started_attempts, vec![1, 2, 3, 4]);
    assert_eq!(service.retry_attempt(), 0);
    assert_eq!(repository.fetch_all().await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_registry_follows_sync_from_foreign_thread() {
    let fetcher = Arc::new(CountingFetcher::new(Duration::from_millis(5)));
    let repository = Arc::new(InMemoryChainRepository::default());
    let registry = Arc::new(ChainRegistry::new());
    let (center, mut receiver) = recording_center();
    center.subscribe(registry.clone());

    let service = ChainSyncService::new(
        pipeline(fetcher, repository),
        center,
        Arc::new(ConstantReconnection::new(Duration::from_millis(10))),
    );

    let trigger = service.clone();
    std::thread::spawn(move || trigger.sync_up())
        .join()
        .unwrap();

    let events = events_until_completed(&mut receiver).await;
    let Some(ChainSyncEvent::SyncCompleted { changes }) = events.last() else {
        panic!("expected completion");
    };
    assert_eq!(changes.new_or_updated.len(), 2);

    // The registry is registered after the recorder, so give delivery a moment
    tokio::time::sleep(Duration::from_millis(20)).await;
    let names: Vec<_> = registry.chains().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["Kusama", "Polkadot"]);

    // A second pass against the same catalog changes nothing
    service.sync_up();
    let events = events_until_completed(&mut receiver).await;
    let Some(ChainSyncEvent::SyncCompleted { changes }) = events.last() else {
        panic!("expected completion");
    };
    assert!(changes.is_empty());
}
