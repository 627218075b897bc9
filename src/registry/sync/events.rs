//! Event system for chain catalog synchronization.
//!
//! This module defines the events emitted over the lifetime of a sync pass, the handler trait that
//! subscribers implement, and the `EventCenter` that delivers events to them. The subscriber
//! registry is owned by whoever composes the application; there is no global event bus.
//!
//! Events are enqueued without blocking and delivered in order by a single delivery task. Every
//! subscriber sees an event before any subscriber sees the next one.

use crate::registry::{ChainSyncError, SyncChanges};
use std::sync::{Arc, RwLock};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Events that occur during chain catalog synchronization
#[derive(Debug, Clone)]
pub enum ChainSyncEvent {
    /// A sync pass has started
    SyncStarted { attempt: u32 },
    /// A sync pass persisted its changes
    SyncCompleted { changes: SyncChanges },
    /// A sync pass failed; a retry may be scheduled
    SyncFailed {
        attempt: u32,
        error: Arc<ChainSyncError>,
    },
}

impl ChainSyncEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChainSyncEvent::SyncStarted { .. } => "SyncStarted",
            ChainSyncEvent::SyncCompleted { .. } => "SyncCompleted",
            ChainSyncEvent::SyncFailed { .. } => "SyncFailed",
        }
    }
}

/// Trait for handling sync events.
///
/// Implementors receive all sync events and can perform side effects or state updates.
#[async_trait::async_trait]
pub trait ChainSyncEventHandler: Send + Sync {
    /// Handle a sync event.
    async fn handle(&self, event: &ChainSyncEvent) -> Result<(), ChainSyncError>;

    /// Get the name of this handler for logging and diagnostics.
    fn name(&self) -> &'static str;
}

type HandlerRegistry = Arc<RwLock<Vec<Arc<dyn ChainSyncEventHandler>>>>;

/// Publish/subscribe hub for sync events.
///
/// Cloning an `EventCenter` yields another handle to the same registry and delivery task.
#[derive(Clone)]
pub struct EventCenter {
    handlers: HandlerRegistry,
    sender: mpsc::UnboundedSender<ChainSyncEvent>,
}

impl EventCenter {
    /// Create an event center whose delivery task runs on the current tokio runtime.
    ///
    /// Must be called from within a runtime.
    pub fn new() -> Self {
        Self::with_runtime(&Handle::current())
    }

    /// Create an event center whose delivery task runs on `runtime`.
    pub fn with_runtime(runtime: &Handle) -> Self {
        let handlers: HandlerRegistry = Arc::new(RwLock::new(Vec::new()));
        let (sender, receiver) = mpsc::unbounded_channel();

        runtime.spawn(deliver(receiver, handlers.clone()));

        Self { handlers, sender }
    }

    /// Register a new event handler.
    ///
    /// Handlers are called in the order they are registered.
    pub fn subscribe(&self, handler: Arc<dyn ChainSyncEventHandler>) {
        match self.handlers.write() {
            Ok(mut handlers) => handlers.push(handler),
            Err(poisoned) => poisoned.into_inner().push(handler),
        }
    }

    /// Enqueue an event for delivery to all registered handlers.
    ///
    /// Never blocks. Events are delivered in the order they were enqueued.
    pub fn notify(&self, event: ChainSyncEvent) {
        if self.sender.send(event).is_err() {
            debug!("Event delivery task has stopped, dropping event");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().map(|h| h.len()).unwrap_or(0)
    }
}

async fn deliver(
    mut receiver: mpsc::UnboundedReceiver<ChainSyncEvent>,
    handlers: HandlerRegistry,
) {
    while let Some(event) = receiver.recv().await {
        // Snapshot so the lock is not held across handler awaits
        let snapshot: Vec<Arc<dyn ChainSyncEventHandler>> = match handlers.read() {
            Ok(handlers) => handlers.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        for handler in snapshot {
            if let Err(e) = handler.handle(&event).await {
                error!(
                    "Handler {} failed to process event {}: {}",
                    handler.name(),
                    event.name(),
                    e
                );
                // Continue processing with other handlers
            }
        }
    }
}

/// Handler that logs every sync event.
pub struct LoggingEventHandler;

#[async_trait::async_trait]
impl ChainSyncEventHandler for LoggingEventHandler {
    async fn handle(&self, event: &ChainSyncEvent) -> Result<(), ChainSyncError> {
        match event {
            ChainSyncEvent::SyncStarted { attempt } => {
                tracing::info!("Chain sync started (attempt {})", attempt);
            }
            ChainSyncEvent::SyncCompleted { changes } => {
                tracing::info!(
                    "Chain sync completed: {} new or updated, {} removed",
                    changes.new_or_updated.len(),
                    changes.removed.len()
                );
            }
            ChainSyncEvent::SyncFailed { attempt, error } => {
                tracing::warn!("Chain sync attempt {} failed: {}", attempt, error);
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LoggingEventHandler"
    }
}
