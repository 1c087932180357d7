// macven - Core Library
// MAC prefix → vendor resolution against a local copy of the IEEE OUI registry

pub mod commands;
pub mod db;
pub mod error;
pub mod fetch;
pub mod gate;
pub mod logging;
pub mod normalizer;
pub mod output;
pub mod parser;
pub mod state;

// Re-export commonly used types
pub use commands::{lookup, refresh, LookupOutcome, RefreshOutcome};
pub use db::{open_store, CsvStore, OuiRecord, RecordStore, SqliteStore, StoreBackend};
pub use error::{MacvenError, Result};
pub use fetch::{HttpFetcher, RegistryFetcher};
pub use gate::{GateStatus, UpdateGate};
pub use logging::{init_logging, LogLevel};
pub use normalizer::{MacVariant, OuiPrefix, VariantStyle};
pub use parser::{ParseAnomaly, ParseReport, RegistryParser};
pub use state::{JsonStateFile, RefreshState, StateStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
