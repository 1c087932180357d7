// 🗄️ Record Store
// Persists the parsed registry and answers exact-prefix lookups.
// CSV is the default layout; a .db/.sqlite path switches to SQLite.

use crate::error::{MacvenError, Result};
use crate::normalizer::OuiPrefix;
use rusqlite::{params, types::Type, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// One registry assignment
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct OuiRecord {
    #[serde(rename = "Prefix")]
    pub prefix: OuiPrefix,

    #[serde(rename = "Vendor")]
    pub vendor_name: String,

    /// Annotation from the registry, e.g. "hex" or "base 16"
    #[serde(rename = "Type")]
    pub vendor_type: Option<String>,

    /// Address lines joined with spaces
    #[serde(rename = "Address")]
    pub address: Option<String>,
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// RecordStore - where refreshes write and lookups read
pub trait RecordStore {
    /// Replace the full record set; readers never observe a half-written store
    fn save(&self, records: &[OuiRecord]) -> Result<usize>;

    /// Read every record back, in saved order
    fn load(&self) -> Result<Vec<OuiRecord>>;

    /// First record whose prefix equals `prefix`
    fn lookup(&self, prefix: &OuiPrefix) -> Result<Option<OuiRecord>>;

    fn path(&self) -> &Path;

    fn exists(&self) -> bool {
        self.path().exists()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Csv,
    Sqlite,
}

impl StoreBackend {
    /// Pick the backend from the file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "db" | "sqlite" | "sqlite3" => StoreBackend::Sqlite,
            _ => StoreBackend::Csv,
        }
    }
}

/// Factory: store for a configured path
pub fn open_store(path: &Path) -> Box<dyn RecordStore> {
    match StoreBackend::from_path(path) {
        StoreBackend::Csv => Box::new(CsvStore::new(path)),
        StoreBackend::Sqlite => Box::new(SqliteStore::new(path)),
    }
}

/// Directory a store file lives in (`.` for bare file names)
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

// ============================================================================
// CSV BACKEND
// ============================================================================

/// Prefix,Vendor,Type,Address
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvStore { path: path.into() }
    }

    fn reader(&self) -> Result<csv::Reader<std::fs::File>> {
        if !self.path.exists() {
            return Err(MacvenError::StoreMissing {
                path: self.path.clone(),
            });
        }
        Ok(csv::Reader::from_path(&self.path)?)
    }
}

impl RecordStore for CsvStore {
    fn save(&self, records: &[OuiRecord]) -> Result<usize> {
        let dir = parent_dir(&self.path);
        let mut staged = NamedTempFile::new_in(dir).map_err(|e| MacvenError::io(dir, e))?;

        {
            let mut writer = csv::Writer::from_writer(staged.as_file_mut());
            for record in records {
                writer.serialize(record)?;
            }
            writer
                .flush()
                .map_err(|e| MacvenError::io(&self.path, e))?;
        }

        staged
            .persist(&self.path)
            .map_err(|e| MacvenError::io(&self.path, e.error))?;

        tracing::debug!(path = %self.path.display(), count = records.len(), "csv store written");
        Ok(records.len())
    }

    fn load(&self) -> Result<Vec<OuiRecord>> {
        let mut rdr = self.reader()?;
        let mut records = Vec::new();
        for result in rdr.deserialize() {
            let record: OuiRecord = result?;
            records.push(record);
        }
        Ok(records)
    }

    fn lookup(&self, prefix: &OuiPrefix) -> Result<Option<OuiRecord>> {
        let mut rdr = self.reader()?;
        for result in rdr.deserialize() {
            let record: OuiRecord = result?;
            if &record.prefix == prefix {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

// ============================================================================
// SQLITE BACKEND
// ============================================================================

pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SqliteStore { path: path.into() }
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        setup_database(&conn)?;
        Ok(conn)
    }

    fn connect_existing(&self) -> Result<Connection> {
        if !self.path.exists() {
            return Err(MacvenError::StoreMissing {
                path: self.path.clone(),
            });
        }
        self.connect()
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL keeps readers off a store being replaced
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS oui_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            prefix TEXT UNIQUE NOT NULL,
            vendor_name TEXT NOT NULL,
            vendor_type TEXT,
            address TEXT
        )",
        [],
    )?;

    Ok(())
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<OuiRecord> {
    let raw: String = row.get(0)?;
    let prefix = OuiPrefix::try_from(raw)
        .map_err(|msg| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, msg.into()))?;

    Ok(OuiRecord {
        prefix,
        vendor_name: row.get(1)?,
        vendor_type: row.get(2)?,
        address: row.get(3)?,
    })
}

impl RecordStore for SqliteStore {
    fn save(&self, records: &[OuiRecord]) -> Result<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;

        tx.execute("DELETE FROM oui_records", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO oui_records (prefix, vendor_name, vendor_type, address)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in records {
                inserted += stmt.execute(params![
                    record.prefix.as_str(),
                    record.vendor_name,
                    record.vendor_type,
                    record.address,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(path = %self.path.display(), inserted, "sqlite store written");
        Ok(inserted)
    }

    fn load(&self) -> Result<Vec<OuiRecord>> {
        let conn = self.connect_existing()?;
        let mut stmt = conn.prepare(
            "SELECT prefix, vendor_name, vendor_type, address FROM oui_records ORDER BY id",
        )?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn lookup(&self, prefix: &OuiPrefix) -> Result<Option<OuiRecord>> {
        let conn = self.connect_existing()?;
        let record = conn
            .query_row(
                "SELECT prefix, vendor_name, vendor_type, address FROM oui_records
                 WHERE prefix = ?1 ORDER BY id LIMIT 1",
                params![prefix.as_str()],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
