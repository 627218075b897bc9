//! Chain sync service: the coordinator of sync passes.
//!
//! `ChainSyncService` owns the sync state (whether a pass is in flight and how many consecutive
//! attempts have been made), admits or drops sync requests, runs the pipeline on the tokio runtime,
//! announces the outcome on the `EventCenter`, and schedules retries according to a pluggable
//! `ReconnectionStrategy`.
//!
//! State transitions happen under one mutex owned by the service and never held across I/O.
//! Events are enqueued from inside the locked section, so subscribers observe them in the same
//! order as the state changes they describe.

use crate::registry::{ChainSyncError, SyncChanges};
use crate::registry::sync::{
    events::{ChainSyncEvent, EventCenter},
    pipeline::ChainSyncPipeline,
    strategies::ReconnectionStrategy,
};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, error, info};

#[derive(Default)]
struct SyncState {
    retry_attempt: u32,
    is_syncing: bool,
    scheduled_retry: Option<ScheduledRetry>,
    next_retry_id: u64,
}

struct ScheduledRetry {
    id: u64,
    handle: AbortHandle,
}

struct ServiceInner {
    pipeline: Arc<ChainSyncPipeline>,
    event_center: EventCenter,
    retry_strategy: Arc<dyn ReconnectionStrategy>,
    runtime: Handle,
    state: Mutex<SyncState>,
}

/// Coordinator that keeps the local chain catalog in sync with the remote one.
///
/// Cloning yields another handle to the same service. Pending retries hold only a weak reference,
/// so they are abandoned once every handle is dropped.
#[derive(Clone)]
pub struct ChainSyncService {
    inner: Arc<ServiceInner>,
}

impl ChainSyncService {
    /// Create a service that runs on the current tokio runtime.
    ///
    /// Must be called from within a runtime; `sync_up` may afterwards be called from any thread.
    pub fn new(
        pipeline: ChainSyncPipeline,
        event_center: EventCenter,
        retry_strategy: Arc<dyn ReconnectionStrategy>,
    ) -> Self {
        Self::with_runtime(pipeline, event_center, retry_strategy, Handle::current())
    }

    pub fn with_runtime(
        pipeline: ChainSyncPipeline,
        event_center: EventCenter,
        retry_strategy: Arc<dyn ReconnectionStrategy>,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                pipeline: Arc::new(pipeline),
                event_center,
                retry_strategy,
                runtime,
                state: Mutex::new(SyncState::default()),
            }),
        }
    }

    /// Request a sync pass.
    ///
    /// Returns immediately. If a pass is already running the request is dropped; otherwise any
    /// scheduled retry is cancelled and a new pass starts. Completion is observed through
    /// `SyncCompleted` / `SyncFailed` events.
    pub fn sync_up(&self) {
        let mut state = self.inner.lock_state();

        if !state.is_syncing {
            if let Some(retry) = state.scheduled_retry.take() {
                debug!("Cancelling scheduled chain sync retry");
                retry.handle.abort();
            }
        }

        self.inner.perform_sync_up_if_needed(&mut state);
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.lock_state().is_syncing
    }

    /// Number of consecutive attempts in the current streak; zero after a successful pass.
    pub fn retry_attempt(&self) -> u32 {
        self.inner.lock_state().retry_attempt
    }
}

impl ServiceInner {
    fn lock_state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn perform_sync_up_if_needed(self: &Arc<Self>, state: &mut SyncState) {
        if state.is_syncing {
            debug!("Tried to sync up chains but already syncing");
            return;
        }

        state.is_syncing = true;
        state.retry_attempt += 1;

        debug!("Will start chain sync with attempt {}", state.retry_attempt);

        self.event_center.notify(ChainSyncEvent::SyncStarted {
            attempt: state.retry_attempt,
        });

        self.execute_sync();
    }

    fn execute_sync(self: &Arc<Self>) {
        let pipeline = self.pipeline.clone();
        let service = Arc::downgrade(self);

        self.runtime.spawn(async move {
            let result = match tokio::spawn(async move { pipeline.run().await }).await {
                Ok(result) => result,
                Err(e) => Err(ChainSyncError::UnexpectedResult(format!(
                    "sync pass did not complete: {}",
                    e
                ))),
            };

            if let Some(service) = service.upgrade() {
                service.complete(result);
            }
        });
    }

    fn complete(self: &Arc<Self>, result: Result<SyncChanges, ChainSyncError>) {
        let mut state = self.lock_state();

        state.is_syncing = false;

        match result {
            Ok(changes) => {
                debug!(
                    "Sync completed: {:?} (new or updated), {:?} (removed)",
                    changes
                        .new_or_updated
                        .iter()
                        .map(|c| &c.chain_id)
                        .collect::<Vec<_>>(),
                    changes.removed_ids()
                );

                state.retry_attempt = 0;

                self.event_center
                    .notify(ChainSyncEvent::SyncCompleted { changes });
            }
            Err(error) => {
                error!("Sync failed with error: {}", error);

                self.event_center.notify(ChainSyncEvent::SyncFailed {
                    attempt: state.retry_attempt,
                    error: Arc::new(error),
                });

                self.retry(&mut state);
            }
        }
    }

    fn retry(self: &Arc<Self>, state: &mut SyncState) {
        let Some(delay) = self.retry_strategy.reconnect_after(state.retry_attempt) else {
            info!(
                "No automatic chain sync retry after attempt {}",
                state.retry_attempt
            );
            return;
        };

        debug!("Scheduling chain sync retry after {:?}", delay);

        state.next_retry_id += 1;
        let id = state.next_retry_id;
        let service: Weak<Self> = Arc::downgrade(self);

        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            if let Some(service) = service.upgrade() {
                service.did_trigger(id);
            }
        });

        state.scheduled_retry = Some(ScheduledRetry {
            id,
            handle: handle.abort_handle(),
        });
    }

    fn did_trigger(self: &Arc<Self>, retry_id: u64) {
        let mut state = self.lock_state();

        let is_current = state
            .scheduled_retry
            .as_ref()
            .is_some_and(|retry| retry.id == retry_id);
        if !is_current {
            // Superseded by a manual trigger
            return;
        }
        state.scheduled_retry = None;

        self.perform_sync_up_if_needed(&mut state);
    }
}
