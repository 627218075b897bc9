use chain_catalog_sync::registry::sync::LoggingEventHandler;
use chain_catalog_sync::{
	ChainRegistry, ChainSyncError, ChainSyncEvent, ChainSyncEventHandler, ChainSyncPipeline,
	ChainSyncService, EventCenter, FileChainRepository, ReconnectionStrategy, RemoteCatalogClient,
	SyncConfig,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Forwards events to the main task so it can stop after the first outcome.
struct OutcomeForwarder {
	sender: mpsc::UnboundedSender<ChainSyncEvent>,
}

#[async_trait::async_trait]
impl ChainSyncEventHandler for OutcomeForwarder {
	async fn handle(&self, event: &ChainSyncEvent) -> Result<(), ChainSyncError> {
		let _ = self.sender.send(event.clone());
		Ok(())
	}

	fn name(&self) -> &'static str {
		"OutcomeForwarder"
	}
}

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.init();

	let config = match std::env::args().nth(1) {
		Some(path) => SyncConfig::load(Path::new(&path)),
		None => {
			info!("No config file given, using defaults");
			Ok(SyncConfig::default())
		}
	};

	let config = match config {
		Ok(config) => config,
		Err(e) => {
			error!("Failed to load configuration: {}", e);
			return;
		}
	};

	let (chains_url, assets_url) = match (config.chains_url(), config.assets_url()) {
		(Ok(chains), Ok(assets)) => (chains, assets),
		(Err(e), _) | (_, Err(e)) => {
			error!("Invalid catalog URL: {}", e);
			return;
		}
	};

	let client = match RemoteCatalogClient::new(config.request_timeout(), config.fetch_max_elapsed())
	{
		Ok(client) => client,
		Err(e) => {
			error!("Failed to create catalog client: {}", e);
			return;
		}
	};

	let repository = Arc::new(FileChainRepository::new(config.storage.data_dir.clone()));

	let registry = Arc::new(ChainRegistry::new());
	match registry.load_from(&*repository).await {
		Ok(count) => info!("Loaded {} cached chains", count),
		Err(e) => error!("Failed to load cached chains: {}", e),
	}

	let (sender, mut outcomes) = mpsc::unbounded_channel();
	let event_center = EventCenter::new();
	event_center.subscribe(Arc::new(LoggingEventHandler));
	event_center.subscribe(registry.clone());
	event_center.subscribe(Arc::new(OutcomeForwarder { sender }));

	let retry_strategy = Arc::new(config.retry_strategy());
	let pipeline = ChainSyncPipeline::new(chains_url, assets_url, Arc::new(client), repository);
	let service = ChainSyncService::new(pipeline, event_center, retry_strategy.clone());

	info!("Starting chain catalog sync");
	service.sync_up();

	while let Some(event) = outcomes.recv().await {
		match event {
			ChainSyncEvent::SyncCompleted { .. } => {
				info!("Chain registry holds {} chains", registry.len());
				for chain in registry.chains() {
					info!(
						"  {} ({}): {} assets, {} nodes",
						chain.name,
						chain.chain_id,
						chain.assets.len(),
						chain.nodes.len()
					);
				}
				break;
			}
			ChainSyncEvent::SyncFailed { attempt, .. }
				if retry_strategy.reconnect_after(attempt).is_none() =>
			{
				error!("Giving up after {} attempts", attempt);
				break;
			}
			_ => {}
		}
	}
}
