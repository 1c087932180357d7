// ⏳ Refresh State
// last_updated + csv_path, persisted as a small JSON file shared by every invocation.
//
// The state is an explicit value: commands receive it, return the next one, and
// only a StateStore writes it to disk.

use crate::db::parent_dir;
use crate::error::{MacvenError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const DEFAULT_STATE_PATH: &str = "config.json";
pub const DEFAULT_STORE_PATH: &str = "oui.csv";
pub const DEFAULT_REGISTRY_URL: &str = "http://standards-oui.ieee.org/oui/oui.txt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshState {
    /// Most recent successful refresh (None = never refreshed)
    #[serde(default, with = "timestamp")]
    pub last_updated: Option<DateTime<Utc>>,

    /// Where the record store lives
    pub csv_path: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,
}

impl Default for RefreshState {
    fn default() -> Self {
        RefreshState {
            last_updated: None,
            csv_path: PathBuf::from(DEFAULT_STORE_PATH),
            registry_url: None,
        }
    }
}

impl RefreshState {
    pub fn registry_url(&self) -> &str {
        self.registry_url.as_deref().unwrap_or(DEFAULT_REGISTRY_URL)
    }

    /// Same state with `last_updated` moved to `now`, never backwards
    pub fn refreshed_at(&self, now: DateTime<Utc>) -> RefreshState {
        let mut next = self.clone();
        next.last_updated = Some(self.last_updated.map_or(now, |prev| prev.max(now)));
        next
    }
}

/// `last_updated` on disk: RFC 3339, or the naive local form older files carry
/// (`2024-03-01 09:15:42.123456`)
mod timestamp {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NAIVE_FORMATS.iter().find_map(|fmt| {
            let naive = NaiveDateTime::parse_from_str(raw, fmt).ok()?;
            Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
        })
    }

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse(s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp '{}'", s))),
        }
    }
}

// ============================================================================
// PERSISTENCE
// ============================================================================

/// StateStore - injected persistence for RefreshState
pub trait StateStore {
    /// Current state; a store that was never written yields the default
    fn load(&self) -> Result<RefreshState>;

    /// Write `state` under an exclusive lock and return what was written.
    /// `last_updated` never moves behind the value already persisted.
    /// Lock contention fails with ConcurrentWriteConflict.
    fn commit(&self, state: &RefreshState) -> Result<RefreshState>;
}

/// JSON file next to a `<name>.lock` sibling used for mutual exclusion
pub struct JsonStateFile {
    path: PathBuf,
}

impl JsonStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonStateFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn acquire_lock(&self) -> Result<File> {
        let lock_path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| MacvenError::io(&lock_path, e))?;

        match file.try_lock() {
            Ok(()) => Ok(file),
            Err(TryLockError::WouldBlock) => Err(MacvenError::ConcurrentWriteConflict {
                path: self.path.clone(),
            }),
            Err(TryLockError::Error(e)) => Err(MacvenError::io(&lock_path, e)),
        }
    }

    fn write_atomic(&self, state: &RefreshState) -> Result<()> {
        let dir = parent_dir(&self.path);
        let mut staged = NamedTempFile::new_in(dir).map_err(|e| MacvenError::io(dir, e))?;

        serde_json::to_writer_pretty(&mut staged, state).map_err(|e| MacvenError::State {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        staged
            .as_file()
            .sync_all()
            .map_err(|e| MacvenError::io(&self.path, e))?;
        staged
            .persist(&self.path)
            .map_err(|e| MacvenError::io(&self.path, e.error))?;
        Ok(())
    }
}

impl StateStore for JsonStateFile {
    fn load(&self) -> Result<RefreshState> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no state file yet, using defaults");
            return Ok(RefreshState::default());
        }

        let contents =
            std::fs::read_to_string(&self.path).map_err(|e| MacvenError::io(&self.path, e))?;
        serde_json::from_str(&contents).map_err(|e| MacvenError::State {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn commit(&self, state: &RefreshState) -> Result<RefreshState> {
        let lock = self.acquire_lock()?;

        // Another refresh may have landed since this process read the file
        let on_disk = self.load()?;
        let mut next = state.clone();
        if let (Some(disk), Some(ours)) = (on_disk.last_updated, state.last_updated) {
            next.last_updated = Some(disk.max(ours));
        }

        let written = self.write_atomic(&next);
        drop(lock);
        written?;

        tracing::info!(
            path = %self.path.display(),
            last_updated = ?next.last_updated,
            "refresh state committed"
        );
        Ok(next)
    }
}

/// In-process StateStore for command tests
#[cfg(test)]
pub(crate) struct MemoryStateStore {
    pub state: std::cell::RefCell<RefreshState>,
    pub contended: std::cell::Cell<bool>,
    pub commits: std::cell::Cell<usize>,
}

#[cfg(test)]
impl MemoryStateStore {
    pub fn new(state: RefreshState) -> Self {
        MemoryStateStore {
            state: std::cell::RefCell::new(state),
            contended: std::cell::Cell::new(false),
            commits: std::cell::Cell::new(0),
        }
    }
}

#[cfg(test)]
impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<RefreshState> {
        Ok(self.state.borrow().clone())
    }

    fn commit(&self, state: &RefreshState) -> Result<RefreshState> {
        if self.contended.get() {
            return Err(MacvenError::ConcurrentWriteConflict {
                path: PathBuf::from("memory"),
            });
        }
        self.commits.set(self.commits.get() + 1);
        *self.state.borrow_mut() = state.clone();
        Ok(state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonStateFile::new(dir.path().join("config.json"));

        let state = file.load().unwrap();
        assert_eq!(state, RefreshState::default());
        assert_eq!(state.registry_url(), DEFAULT_REGISTRY_URL);
    }

    #[test]
    fn test_commit_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonStateFile::new(dir.path().join("config.json"));
        let state = RefreshState {
            last_updated: Some(t0()),
            csv_path: PathBuf::from("/neteng/db/oui.csv"),
            registry_url: None,
        };

        file.commit(&state).unwrap();
        assert_eq!(file.load().unwrap(), state);

        let raw = std::fs::read_to_string(file.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["csv_path"], "/neteng/db/oui.csv");
        assert!(json.get("registry_url").is_none());
    }

    #[test]
    fn test_commit_never_moves_backwards() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonStateFile::new(dir.path().join("config.json"));
        let later = RefreshState::default().refreshed_at(t0() + Duration::hours(5));
        file.commit(&later).unwrap();

        let stale = RefreshState::default().refreshed_at(t0());
        let written = file.commit(&stale).unwrap();
        assert_eq!(written.last_updated, Some(t0() + Duration::hours(5)));
        assert_eq!(file.load().unwrap().last_updated, written.last_updated);
    }

    #[test]
    fn test_refreshed_at_is_monotonic() {
        let state = RefreshState::default().refreshed_at(t0());
        assert_eq!(state.last_updated, Some(t0()));

        let earlier = state.refreshed_at(t0() - Duration::minutes(1));
        assert_eq!(earlier.last_updated, Some(t0()));
    }

    #[test]
    fn test_lock_contention_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonStateFile::new(dir.path().join("config.json"));
        let original = RefreshState::default().refreshed_at(t0());
        file.commit(&original).unwrap();

        let holder = File::create(file.lock_path()).unwrap();
        holder.lock().unwrap();

        let result = file.commit(&original.refreshed_at(t0() + Duration::days(2)));
        assert!(matches!(
            result,
            Err(MacvenError::ConcurrentWriteConflict { .. })
        ));
        assert_eq!(file.load().unwrap(), original);

        holder.unlock().unwrap();
        assert!(file.commit(&original).is_ok());
    }

    #[test]
    fn test_legacy_naive_timestamp_is_accepted() {
        let json = r#"{"last_updated": "2024-03-01 09:15:42.123456", "csv_path": "oui.csv"}"#;
        let state: RefreshState = serde_json::from_str(json).unwrap();
        assert!(state.last_updated.is_some());

        let rfc = r#"{"last_updated": "2026-03-01T12:00:00+00:00", "csv_path": "oui.csv"}"#;
        let state: RefreshState = serde_json::from_str(rfc).unwrap();
        assert_eq!(state.last_updated, Some(t0()));
    }

    #[test]
    fn test_missing_or_null_timestamp_means_never() {
        let state: RefreshState = serde_json::from_str(r#"{"csv_path": "oui.csv"}"#).unwrap();
        assert_eq!(state.last_updated, None);

        let state: RefreshState =
            serde_json::from_str(r#"{"last_updated": null, "csv_path": "oui.csv"}"#).unwrap();
        assert_eq!(state.last_updated, None);
    }

    #[test]
    fn test_corrupt_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"last_updated": "yesterday", "csv_path": "oui.csv"}"#).unwrap();

        let err = JsonStateFile::new(&path).load().unwrap_err();
        assert!(matches!(err, MacvenError::State { .. }));
    }
}
