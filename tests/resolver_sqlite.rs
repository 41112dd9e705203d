use dapp_registry::core::db;
use dapp_registry::core::error::RegistryError;
use dapp_registry::core::resolver::{ClassificationResolver, ResolverSession, SqliteResolver};
use rusqlite::params;
use tempfile::TempDir;

fn hash(c: char) -> String {
    std::iter::repeat(c).take(56).collect()
}

fn seed_db(tmp: &TempDir) -> std::path::PathBuf {
    let db_path = tmp.path().join("cardano").join("scripts.db");
    let conn = db::initialize_script_db(&db_path).expect("init db");
    let rows = [
        (hash('a'), "plutusV2", Some(vec![0x4d_u8, 0x01]), Some(2_i64)),
        (hash('b'), "timelock", None, None),
        (hash('c'), "plutusV3", None, Some(1024)),
    ];
    for (i, (h, ty, bytes, size)) in rows.iter().enumerate() {
        conn.execute(
            "INSERT INTO script(id, tx_id, hash, type, json, bytes, serialised_size) VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?6)",
            params![i as i64 + 1, 100 + i as i64, hex::decode(h).unwrap(), ty, bytes, size],
        )
        .expect("insert row");
    }
    db_path
}

#[test]
fn lookup_returns_classification_rows() {
    let tmp = TempDir::new().expect("tempdir");
    let db_path = seed_db(&tmp);
    let resolver = SqliteResolver::open(&db_path).expect("open resolver");

    let record = resolver.lookup(&hash('a')).unwrap().expect("row for a");
    assert_eq!(record.script_type, "plutusV2");
    assert_eq!(record.hash, hash('a'));
    assert_eq!(record.bytes.as_deref(), Some("4d01"));
    assert_eq!(record.size, Some(2));
    assert_eq!(record.plutus_version(), Some(2));

    let native = resolver.lookup(&hash('b')).unwrap().expect("row for b");
    assert_eq!(native.plutus_version(), None);

    let v3 = resolver.lookup(&hash('C')).unwrap().expect("uppercase hex matches");
    assert_eq!(v3.plutus_version(), Some(3));
}

#[test]
fn absent_hash_is_not_found() {
    let tmp = TempDir::new().expect("tempdir");
    let resolver = SqliteResolver::open(&seed_db(&tmp)).expect("open resolver");
    assert!(resolver.lookup(&hash('d')).unwrap().is_none());
}

#[test]
fn lookup_after_close_fails() {
    let tmp = TempDir::new().expect("tempdir");
    let mut resolver = SqliteResolver::open(&seed_db(&tmp)).expect("open resolver");
    resolver.close().expect("close");
    let err = resolver.lookup(&hash('a')).unwrap_err();
    assert!(matches!(err, RegistryError::ResolverClosed));
    resolver.close().expect("second close is a no-op");
}

#[test]
fn session_close_releases_connection() {
    let tmp = TempDir::new().expect("tempdir");
    let session = ResolverSession::new(SqliteResolver::open(&seed_db(&tmp)).expect("open"));
    assert!(session.is_open());
    assert!(session.resolver().lookup(&hash('a')).unwrap().is_some());
    session.close().expect("close session");
}

#[test]
fn open_missing_database_fails() {
    let tmp = TempDir::new().expect("tempdir");
    assert!(SqliteResolver::open(&tmp.path().join("missing.db")).is_err());
}
