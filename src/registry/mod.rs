pub mod chain_registry;
pub mod sync;
pub mod types;

pub use chain_registry::ChainRegistry;
pub use sync::ChainSyncService;
pub use types::*;
