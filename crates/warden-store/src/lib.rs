//! Warden Storage Layer
//!
//! Implements the PunishmentStore trait on SQLite.
//!
//! # Architecture
//!
//! - `punishments`: one row per unified punishment entry, all fields in one row
//!   so a replacement is a single-row UPDATE
//! - `import_provenance`: one row per imported legacy record, keyed by
//!   (source, native id)
//! - `import_runs`: finished import jobs
//!
//! The database runs in WAL mode: readers on other connections only ever see
//! committed transactions, so an entry is never observed half-written.
//!
//! # Examples
//!
//! ```no_run
//! use warden_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for import jobs
//! ```

#![warn(missing_docs)]

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;
use warden_domain::traits::{EntryQuery, PunishmentStore, StoreTransaction};
use warden_domain::{
    EnforcementState, EntryId, Expiration, KnownDetails, NativeId, NetworkAddress, Operator,
    Origin, PortablePunishment, ProvenanceRecord, PunishmentEntry, PunishmentType, RunSummary,
    Scope, SourceKind, Victim,
};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Entry not found
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Provenance record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

const ENTRY_COLUMNS: &str = "id, kind, reason, scope, start_time, end_time, state, \
     victim_type, victim_uuid, victim_address, victim_name, operator_type, operator_uuid, \
     origin_source, origin_native_id, updated_at";

/// SQLite-based implementation of PunishmentStore
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Share one store behind a mutex, or
/// open one SqliteStore per thread on the same database file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use warden_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("punishments.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        // In-memory databases answer "memory"; either answer is fine
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "foreign_keys", true)?;

        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Convert EntryId to bytes for storage
    fn entry_id_to_bytes(id: EntryId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    /// Convert bytes to EntryId
    fn bytes_to_entry_id(bytes: &[u8]) -> Result<EntryId, StoreError> {
        if bytes.len() != 16 {
            return Err(StoreError::InvalidData(format!(
                "Expected 16 bytes for EntryId, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(bytes);
        Ok(EntryId::from_value(u128::from_be_bytes(arr)))
    }

    /// Delete every entry, provenance record and run (used by tests and `--reset`)
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "DELETE FROM import_provenance; DELETE FROM punishments; DELETE FROM import_runs;",
        )?;
        Ok(())
    }
}

/// Map a decoding failure into the error rusqlite expects from row closures
fn conversion_error(idx: usize, ty: Type, e: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(e))
}

fn parse_uuid(idx: usize, value: Option<String>) -> rusqlite::Result<Uuid> {
    let value = value.ok_or_else(|| {
        conversion_error(idx, Type::Null, StoreError::InvalidData("missing uuid".into()))
    })?;
    Uuid::parse_str(&value).map_err(|e| {
        conversion_error(idx, Type::Text, StoreError::InvalidData(format!("Invalid uuid {}: {}", value, e)))
    })
}

fn parse_address(idx: usize, value: Option<String>) -> rusqlite::Result<NetworkAddress> {
    let value = value.ok_or_else(|| {
        conversion_error(idx, Type::Null, StoreError::InvalidData("missing address".into()))
    })?;
    NetworkAddress::parse(&value).ok_or_else(|| {
        conversion_error(idx, Type::Text, StoreError::InvalidData(format!("Invalid address: {}", value)))
    })
}

fn parse_source(idx: usize, value: &str) -> rusqlite::Result<SourceKind> {
    SourceKind::parse(value).ok_or_else(|| {
        conversion_error(idx, Type::Text, StoreError::InvalidData(format!("Unknown source: {}", value)))
    })
}

/// Decode one `punishments` row selected with [`ENTRY_COLUMNS`]
fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<PunishmentEntry> {
    let id_bytes: Vec<u8> = row.get(0)?;
    let id = SqliteStore::bytes_to_entry_id(&id_bytes)
        .map_err(|e| conversion_error(0, Type::Blob, e))?;

    let kind_str: String = row.get(1)?;
    let kind = PunishmentType::parse(&kind_str).ok_or_else(|| {
        conversion_error(1, Type::Text, StoreError::InvalidData(format!("Unknown kind: {}", kind_str)))
    })?;

    let scope_str: String = row.get(3)?;
    let scope = Scope::parse_label(&scope_str).ok_or_else(|| {
        conversion_error(3, Type::Text, StoreError::InvalidData(format!("Unknown scope: {}", scope_str)))
    })?;

    let state: Option<String> = row.get(6)?;
    let state = match state {
        Some(s) => Some(EnforcementState::parse(&s).ok_or_else(|| {
            conversion_error(6, Type::Text, StoreError::InvalidData(format!("Unknown state: {}", s)))
        })?),
        None => None,
    };

    let details = KnownDetails {
        kind,
        reason: row.get(2)?,
        scope,
        start: row.get(4)?,
        expiration: Expiration::from_sentinel(row.get::<_, Option<i64>>(5)?),
        state,
    };

    let victim_type: String = row.get(7)?;
    let victim = match victim_type.as_str() {
        "player" => Victim::Player(parse_uuid(8, row.get(8)?)?),
        "address" => Victim::Address(parse_address(9, row.get(9)?)?),
        "composite" => Victim::Composite(parse_uuid(8, row.get(8)?)?, parse_address(9, row.get(9)?)?),
        "unresolved" => Victim::UnresolvedName(row.get::<_, Option<String>>(10)?.unwrap_or_default()),
        other => {
            return Err(conversion_error(
                7,
                Type::Text,
                StoreError::InvalidData(format!("Unknown victim type: {}", other)),
            ))
        }
    };

    let operator_type: String = row.get(11)?;
    let operator = match operator_type.as_str() {
        "player" => Operator::Player(parse_uuid(12, row.get(12)?)?),
        "console" => Operator::Console,
        _ => Operator::Unknown,
    };

    let origin_source: String = row.get(13)?;
    let origin = Origin::new(parse_source(13, &origin_source)?, NativeId::new(row.get::<_, String>(14)?));

    Ok(PunishmentEntry {
        id,
        punishment: PortablePunishment::new(details, victim, operator),
        origin,
        updated_at: row.get::<_, i64>(15)? as u64,
    })
}

/// Decode one `import_provenance` row
fn row_to_provenance(row: &Row<'_>) -> rusqlite::Result<ProvenanceRecord> {
    let source_str: String = row.get(0)?;
    let entry_bytes: Vec<u8> = row.get(2)?;
    let entry_id = SqliteStore::bytes_to_entry_id(&entry_bytes)
        .map_err(|e| conversion_error(2, Type::Blob, e))?;
    let imported_json: String = row.get(3)?;
    let imported: PortablePunishment = serde_json::from_str(&imported_json)
        .map_err(|e| conversion_error(3, Type::Text, StoreError::Serialization(e)))?;

    Ok(ProvenanceRecord {
        source: parse_source(0, &source_str)?,
        native_id: NativeId::new(row.get::<_, String>(1)?),
        entry_id,
        imported,
        imported_at: row.get::<_, i64>(4)? as u64,
    })
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl PunishmentStore for SqliteStore {
    type Error = StoreError;
    type Transaction<'a> = SqliteTransaction<'a>;

    fn begin(&mut self) -> Result<Self::Transaction<'_>, Self::Error> {
        // IMMEDIATE takes the write lock up front, so two writers never both
        // pass a provenance check and then race on insert
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(SqliteTransaction {
            tx,
            now: current_timestamp(),
        })
    }

    fn get_entry(&self, id: EntryId) -> Result<Option<PunishmentEntry>, Self::Error> {
        let id_bytes = Self::entry_id_to_bytes(id);
        let entry = self
            .conn
            .query_row(
                &format!("SELECT {} FROM punishments WHERE id = ?1", ENTRY_COLUMNS),
                params![&id_bytes],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    fn list_entries(&self, query: &EntryQuery) -> Result<Vec<PunishmentEntry>, Self::Error> {
        let mut sql = format!("SELECT {} FROM punishments WHERE 1=1", ENTRY_COLUMNS);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(kind) = query.kind {
            sql.push_str(" AND kind = ?");
            params.push(Box::new(kind.as_str()));
        }

        if let Some(uuid) = query.victim_uuid {
            sql.push_str(" AND victim_uuid = ?");
            params.push(Box::new(uuid.to_string()));
        }

        if let Some(source) = query.source {
            sql.push_str(" AND origin_source = ?");
            params.push(Box::new(source.as_str()));
        }

        sql.push_str(" ORDER BY start_time DESC, id");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let entries = stmt
            .query_map(&param_refs[..], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn entry_count(&self) -> Result<usize, Self::Error> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM punishments", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn provenance_for_source(&self, source: SourceKind) -> Result<Vec<ProvenanceRecord>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT source, native_id, entry_id, imported_record, imported_at
             FROM import_provenance WHERE source = ?1 ORDER BY rowid",
        )?;
        let records = stmt
            .query_map(params![source.as_str()], row_to_provenance)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn entries_for_source(&self, source: SourceKind) -> Result<Vec<PunishmentEntry>, Self::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM punishments
             WHERE id IN (SELECT entry_id FROM import_provenance WHERE source = ?1)
             ORDER BY id",
            ENTRY_COLUMNS
        ))?;
        let entries = stmt
            .query_map(params![source.as_str()], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn record_run(&mut self, run: &RunSummary) -> Result<(), Self::Error> {
        self.conn.execute(
            "INSERT INTO import_runs (source, started_at, finished_at, outcome, accepted, replaced, rejected, failed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                run.source.as_str(),
                run.started_at as i64,
                run.finished_at as i64,
                &run.outcome,
                run.accepted as i64,
                run.replaced as i64,
                run.rejected as i64,
                run.failed as i64,
            ],
        )?;
        Ok(())
    }

    fn list_runs(&self, limit: usize) -> Result<Vec<RunSummary>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT source, started_at, finished_at, outcome, accepted, replaced, rejected, failed
             FROM import_runs ORDER BY id DESC LIMIT ?1",
        )?;
        let runs = stmt
            .query_map(params![limit as i64], |row| {
                let source: String = row.get(0)?;
                Ok(RunSummary {
                    source: parse_source(0, &source)?,
                    started_at: row.get::<_, i64>(1)? as u64,
                    finished_at: row.get::<_, i64>(2)? as u64,
                    outcome: row.get(3)?,
                    accepted: row.get::<_, i64>(4)? as usize,
                    replaced: row.get::<_, i64>(5)? as usize,
                    rejected: row.get::<_, i64>(6)? as usize,
                    failed: row.get::<_, i64>(7)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }
}

/// Write transaction on a [`SqliteStore`]
///
/// Rolls back when dropped without [`StoreTransaction::commit`].
pub struct SqliteTransaction<'a> {
    tx: rusqlite::Transaction<'a>,
    now: u64,
}

impl SqliteTransaction<'_> {
    /// Bind every column of an entry row in [`ENTRY_COLUMNS`] order, minus the id
    fn write_entry(
        &self,
        sql: &str,
        id: EntryId,
        punishment: &PortablePunishment,
        origin: &Origin,
    ) -> Result<usize, StoreError> {
        let details = &punishment.details;
        let victim = &punishment.victim;
        let victim_name = match victim {
            Victim::UnresolvedName(name) => Some(name.as_str()),
            _ => None,
        };

        let changed = self.tx.execute(
            sql,
            params![
                SqliteStore::entry_id_to_bytes(id),
                details.kind.as_str(),
                &details.reason,
                details.scope.to_label(),
                details.start,
                details.expiration.end(),
                details.state.map(|s| s.as_str()),
                victim.type_label(),
                victim.uuid().map(|u| u.to_string()),
                victim.address().map(|a| a.to_string()),
                victim_name,
                punishment.operator.type_label(),
                punishment.operator.uuid().map(|u| u.to_string()),
                origin.source.as_str(),
                origin.native_id.as_str(),
                self.now as i64,
            ],
        )?;
        Ok(changed)
    }
}

impl StoreTransaction for SqliteTransaction<'_> {
    type Error = StoreError;

    fn lookup_provenance(
        &self,
        source: SourceKind,
        native_id: &NativeId,
    ) -> Result<Option<ProvenanceRecord>, Self::Error> {
        let record = self
            .tx
            .query_row(
                "SELECT source, native_id, entry_id, imported_record, imported_at
                 FROM import_provenance WHERE source = ?1 AND native_id = ?2",
                params![source.as_str(), native_id.as_str()],
                row_to_provenance,
            )
            .optional()?;
        Ok(record)
    }

    fn insert(&mut self, punishment: &PortablePunishment, origin: &Origin) -> Result<EntryId, Self::Error> {
        let id = EntryId::new();
        self.write_entry(
            "INSERT INTO punishments (id, kind, reason, scope, start_time, end_time, state,
                 victim_type, victim_uuid, victim_address, victim_name, operator_type, operator_uuid,
                 origin_source, origin_native_id, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            id,
            punishment,
            origin,
        )?;
        Ok(id)
    }

    fn replace(&mut self, id: EntryId, punishment: &PortablePunishment, origin: &Origin) -> Result<(), Self::Error> {
        // One statement rewrites every column of the row
        let changed = self.write_entry(
            "UPDATE punishments SET kind = ?2, reason = ?3, scope = ?4, start_time = ?5,
                 end_time = ?6, state = ?7, victim_type = ?8, victim_uuid = ?9,
                 victim_address = ?10, victim_name = ?11, operator_type = ?12,
                 operator_uuid = ?13, origin_source = ?14, origin_native_id = ?15,
                 updated_at = ?16
             WHERE id = ?1",
            id,
            punishment,
            origin,
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn record_provenance(&mut self, record: &ProvenanceRecord) -> Result<(), Self::Error> {
        let imported = serde_json::to_string(&record.imported)?;
        self.tx.execute(
            "INSERT INTO import_provenance (source, native_id, entry_id, imported_record, imported_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(source, native_id) DO UPDATE SET
             entry_id = excluded.entry_id, imported_record = excluded.imported_record,
             imported_at = excluded.imported_at",
            params![
                record.source.as_str(),
                record.native_id.as_str(),
                SqliteStore::entry_id_to_bytes(record.entry_id),
                imported,
                record.imported_at as i64,
            ],
        )?;
        Ok(())
    }

    fn commit(self) -> Result<(), Self::Error> {
        self.tx.commit()?;
        Ok(())
    }
}
