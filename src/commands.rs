// 🚦 Commands
// refresh: gate → fetch → parse → save → record timestamp
// lookup:  normalize → store lookup

use crate::db::{open_store, parent_dir, OuiRecord};
use crate::error::{MacvenError, Result};
use crate::fetch::RegistryFetcher;
use crate::gate::UpdateGate;
use crate::normalizer::{MacVariant, OuiPrefix};
use crate::parser::{ParseAnomaly, RegistryParser};
use crate::state::{RefreshState, StateStore};
use chrono::{DateTime, Duration, Utc};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

// ============================================================================
// REFRESH
// ============================================================================

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub records: usize,
    pub anomalies: Vec<ParseAnomaly>,
    pub duplicates: usize,
    pub discarded: usize,
    pub bytes_downloaded: u64,
    pub store_path: PathBuf,
    pub state: RefreshState,
}

/// Download, parse and persist the registry if the gate allows it
///
/// Store and state stay untouched on every failure before the save. A
/// ConcurrentWriteConflict means the records were saved but the timestamp
/// was not.
pub fn refresh(
    state_store: &dyn StateStore,
    fetcher: &dyn RegistryFetcher,
    gate: &UpdateGate,
    now: DateTime<Utc>,
) -> Result<RefreshOutcome> {
    let state = state_store.load()?;
    gate.check(&state, now)?;

    let dir = parent_dir(&state.csv_path);
    std::fs::create_dir_all(dir).map_err(|e| MacvenError::io(dir, e))?;

    // Dropped (and deleted) when this function returns
    let mut staging = NamedTempFile::new_in(dir).map_err(|e| MacvenError::io(dir, e))?;
    let bytes_downloaded = fetcher.fetch(state.registry_url(), staging.as_file_mut())?;
    staging
        .as_file_mut()
        .flush()
        .map_err(|e| MacvenError::io(staging.path(), e))?;

    let parser = RegistryParser::new();
    tracing::debug!(version = parser.version(), path = %staging.path().display(), "parsing staged registry");
    let report = parser.parse_file(staging.path())?;

    if report.records.is_empty() {
        return Err(MacvenError::Network {
            url: state.registry_url().to_string(),
            reason: format!("downloaded {} bytes but found no registry records", bytes_downloaded),
        });
    }

    let store = open_store(&state.csv_path);
    let records = store.save(&report.records)?;

    let next = gate.record_refresh(state_store, &state, now)?;

    Ok(RefreshOutcome {
        records,
        anomalies: report.anomalies,
        duplicates: report.duplicates,
        discarded: report.discarded,
        bytes_downloaded,
        store_path: state.csv_path.clone(),
        state: next,
    })
}

// ============================================================================
// LOOKUP
// ============================================================================

#[derive(Debug, Clone)]
pub struct LookupOutcome {
    pub input: String,
    pub prefix: OuiPrefix,
    pub record: OuiRecord,
    pub variants: [MacVariant; 4],
    /// How old the local data is (None if never refreshed)
    pub data_age: Option<Duration>,
    pub store_path: PathBuf,
}

/// Resolve a user-supplied MAC address to its vendor
pub fn lookup(
    state_store: &dyn StateStore,
    gate: &UpdateGate,
    input: &str,
    now: DateTime<Utc>,
) -> Result<LookupOutcome> {
    // Rejected input never touches state or store
    let prefix = OuiPrefix::normalize(input)?;

    let state = state_store.load()?;
    let data_age = gate.time_since_update(&state, now);
    let store = open_store(&state.csv_path);

    tracing::debug!(%prefix, store = %state.csv_path.display(), "looking up prefix");
    match store.lookup(&prefix)? {
        Some(record) => Ok(LookupOutcome {
            input: input.to_string(),
            variants: prefix.variants(),
            prefix,
            record,
            data_age,
            store_path: state.csv_path,
        }),
        None => Err(MacvenError::NotFound {
            prefix: prefix.to_string(),
            data_age,
        }),
    }
}
