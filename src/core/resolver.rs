//! Script classification lookups.
//!
//! The pipeline only needs one question answered: given a script hash, what
//! kind of script is it on chain? `ClassificationResolver` is that seam.
//! `SqliteResolver` answers from a local mirror of the db-sync `script`
//! table; `MemoryResolver` answers from an in-process table.
//!
//! Resolvers are owned through a `ResolverSession`, which must be closed
//! explicitly when a run ends, on success and on failure alike.

use crate::core::db;
use crate::core::error::RegistryError;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// One classification row, as reported by the lookup backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRecord {
    /// Raw type label, e.g. `plutusV2` or `timelock`.
    pub script_type: String,
    /// Hex-encoded script hash.
    pub hash: String,
    pub json: Option<String>,
    /// Hex-encoded serialized script.
    pub bytes: Option<String>,
    pub size: Option<i64>,
}

impl ClassificationRecord {
    pub fn new(script_type: &str, hash: &str) -> Self {
        Self {
            script_type: script_type.to_string(),
            hash: hash.to_string(),
            json: None,
            bytes: None,
            size: None,
        }
    }

    /// Plutus language version for this record, if it is a Plutus script.
    pub fn plutus_version(&self) -> Option<u8> {
        plutus_version_for(&self.script_type)
    }
}

/// Fixed mapping from lookup type label to Plutus version. Labels match exactly.
pub fn plutus_version_for(script_type: &str) -> Option<u8> {
    match script_type {
        "plutusV1" => Some(1),
        "plutusV2" => Some(2),
        "plutusV3" => Some(3),
        _ => None,
    }
}

pub trait ClassificationResolver {
    /// Look up a normalized 56-hex script hash. `Ok(None)` means "not found".
    fn lookup(&self, script_hash: &str) -> Result<Option<ClassificationRecord>, RegistryError>;

    /// Release the backing resource. Lookups after close fail with `ResolverClosed`.
    fn close(&mut self) -> Result<(), RegistryError>;
}

/// Resolver backed by a SQLite copy of the db-sync `script` table.
pub struct SqliteResolver {
    conn: Option<Connection>,
}

impl SqliteResolver {
    pub fn open(db_path: &Path) -> Result<Self, RegistryError> {
        let conn = db::db_connect_readonly(db_path)?;
        tracing::info!(db = %db_path.display(), "classification database opened");
        Ok(Self { conn: Some(conn) })
    }
}

impl ClassificationResolver for SqliteResolver {
    fn lookup(&self, script_hash: &str) -> Result<Option<ClassificationRecord>, RegistryError> {
        let conn = self.conn.as_ref().ok_or(RegistryError::ResolverClosed)?;
        let key = hex::decode(script_hash).map_err(|e| {
            RegistryError::InvalidInput(format!("script hash '{}' is not hex: {}", script_hash, e))
        })?;
        let mut stmt = conn.prepare_cached(
            "SELECT type, hash, json, bytes, serialised_size FROM script WHERE hash = ?1 LIMIT 1",
        )?;
        let row = stmt
            .query_row(params![key], |row| {
                let hash: Vec<u8> = row.get(1)?;
                let bytes: Option<Vec<u8>> = row.get(3)?;
                Ok(ClassificationRecord {
                    script_type: row.get(0)?,
                    hash: hex::encode(hash),
                    json: row.get(2)?,
                    bytes: bytes.map(hex::encode),
                    size: row.get(4)?,
                })
            })
            .optional()?;
        Ok(row)
    }

    fn close(&mut self) -> Result<(), RegistryError> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| RegistryError::RusqliteError(e))?;
            tracing::debug!("classification database closed");
        }
        Ok(())
    }
}

/// In-process resolver keyed by lowercase hash.
///
/// Keeps shared counters so a caller holding `handle()` can observe lookups
/// and closure after the resolver has been moved into a session.
#[derive(Debug, Default)]
pub struct MemoryResolver {
    records: HashMap<String, ClassificationRecord>,
    handle: MemoryResolverHandle,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryResolverHandle {
    closed: Arc<AtomicBool>,
    lookups: Arc<AtomicUsize>,
}

impl MemoryResolverHandle {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hash` with the given type label.
    pub fn with(mut self, hash: &str, script_type: &str) -> Self {
        self.insert(ClassificationRecord::new(script_type, &hash.to_ascii_lowercase()));
        self
    }

    pub fn insert(&mut self, record: ClassificationRecord) {
        self.records.insert(record.hash.to_ascii_lowercase(), record);
    }

    pub fn handle(&self) -> MemoryResolverHandle {
        self.handle.clone()
    }
}

impl ClassificationResolver for MemoryResolver {
    fn lookup(&self, script_hash: &str) -> Result<Option<ClassificationRecord>, RegistryError> {
        if self.handle.is_closed() {
            return Err(RegistryError::ResolverClosed);
        }
        self.handle.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.get(&script_hash.to_ascii_lowercase()).cloned())
    }

    fn close(&mut self) -> Result<(), RegistryError> {
        self.handle.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Owned resolver handle for the duration of one run.
///
/// `close` must be called on every exit path. A session dropped while still
/// open is logged as a leak and closed best-effort.
pub struct ResolverSession<R: ClassificationResolver> {
    resolver: R,
    open: bool,
}

impl<R: ClassificationResolver> ResolverSession<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            open: true,
        }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn close(mut self) -> Result<(), RegistryError> {
        self.open = false;
        self.resolver.close()
    }
}

impl<R: ClassificationResolver> Drop for ResolverSession<R> {
    fn drop(&mut self) {
        if self.open {
            tracing::warn!("resolver session dropped without explicit close; closing now");
            if let Err(e) = self.resolver.close() {
                tracing::warn!(error = %e, "failed to close leaked resolver session");
            }
        }
    }
}
