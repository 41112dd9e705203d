use crate::core::error;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Table holding the db-sync `script` mirror the resolver reads.
pub const SCRIPT_TABLE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS script (
        id INTEGER PRIMARY KEY,
        tx_id INTEGER,
        hash BLOB NOT NULL,
        type TEXT NOT NULL,
        json TEXT,
        bytes BLOB,
        serialised_size INTEGER
    )
";
pub const SCRIPT_TABLE_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_script_hash ON script(hash)";

/// Open a classification database for lookups only.
pub fn db_connect_readonly(db_path: &Path) -> Result<Connection, error::RegistryError> {
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::RegistryError::RusqliteError)?;
    Ok(conn)
}

/// Open (creating if needed) a writable classification database with the `script` table.
pub fn initialize_script_db(db_path: &Path) -> Result<Connection, error::RegistryError> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(error::RegistryError::IoError)?;
    }
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::RegistryError::RusqliteError)?;
    conn.execute(SCRIPT_TABLE_SCHEMA, [])?;
    conn.execute(SCRIPT_TABLE_INDEX, [])?;
    Ok(conn)
}
