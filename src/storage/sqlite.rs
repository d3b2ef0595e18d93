//! SQLite backend.
//!
//! One table (default `credential-store`) whose columns carry the record
//! attribute names.  `(name, version)` is the primary key, so the insert
//! precondition is enforced by SQLite itself.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode};

use super::{SecretBackend, StorageError, StorageResult};
use crate::record::SecretRecord;
use crate::version::Version;

/// Raw row as stored: name, version, key, contents, hmac, digest.
type Row = (String, String, String, String, String, Option<String>);

pub struct SqliteBackend {
    conn: Mutex<Connection>,
    table: String,
    path: Option<PathBuf>,
}

impl SqliteBackend {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path, table: &str) -> StorageResult<Self> {
        validate_table_name(table)?;
        let conn = Connection::open(path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(path, perms);
        }

        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
            path: Some(path.to_path_buf()),
        })
    }

    /// A private in-memory database.
    pub fn open_in_memory(table: &str) -> StorageResult<Self> {
        validate_table_name(table)?;
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            table: table.to_string(),
            path: None,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn query(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> StorageResult<Vec<SecretRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(args, |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(decode_row(row?)?);
        }
        Ok(records)
    }

    fn select(&self, clause: &str) -> String {
        format!(
            "SELECT name, version, key, contents, hmac, digest FROM \"{}\" {clause}",
            self.table
        )
    }
}

fn decode_row((name, version, key, contents, hmac, digest): Row) -> StorageResult<SecretRecord> {
    let version = match version.parse::<Version>() {
        Ok(v) => v,
        Err(e) => {
            return Err(StorageError::InvalidRecord {
                name,
                reason: e.to_string(),
            })
        }
    };
    SecretRecord::from_encoded(name.clone(), version, &key, &contents, &hmac, digest.as_deref())
        .map_err(|reason| StorageError::InvalidRecord { name, reason })
}

fn validate_table_name(table: &str) -> StorageResult<()> {
    let valid = !table.is_empty()
        && table.len() <= 128
        && table
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidTable(table.to_string()))
    }
}

impl SecretBackend for SqliteBackend {
    fn get(&self, name: &str, version: &Version) -> StorageResult<Option<SecretRecord>> {
        let sql = self.select("WHERE name = ?1 AND version = ?2");
        Ok(self
            .query(&sql, &[&name, &version.as_str()])?
            .into_iter()
            .next())
    }

    fn versions(&self, name: &str) -> StorageResult<Vec<SecretRecord>> {
        let sql = self.select("WHERE name = ?1 ORDER BY version ASC");
        self.query(&sql, &[&name])
    }

    fn highest(&self, name: &str) -> StorageResult<Option<SecretRecord>> {
        let sql = self.select("WHERE name = ?1 ORDER BY version DESC LIMIT 1");
        Ok(self.query(&sql, &[&name])?.into_iter().next())
    }

    fn scan(&self) -> StorageResult<Vec<SecretRecord>> {
        let sql = self.select("ORDER BY name ASC, version ASC");
        self.query(&sql, &[])
    }

    fn put_if_absent(&self, record: &SecretRecord) -> StorageResult<()> {
        let sql = format!(
            "INSERT INTO \"{}\" (name, version, key, contents, hmac, digest)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            self.table
        );
        let result = self.conn.lock().execute(
            &sql,
            params![
                record.name,
                record.version.as_str(),
                record.encoded_key(),
                record.encoded_contents(),
                record.encoded_hmac(),
                record.digest.name(),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StorageError::AlreadyExists {
                    name: record.name.clone(),
                    version: record.version.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, name: &str, version: &Version) -> StorageResult<bool> {
        let sql = format!(
            "DELETE FROM \"{}\" WHERE name = ?1 AND version = ?2",
            self.table
        );
        let affected = self
            .conn
            .lock()
            .execute(&sql, params![name, version.as_str()])?;
        Ok(affected > 0)
    }

    fn bootstrap(&self) -> StorageResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                name     TEXT NOT NULL,
                version  TEXT NOT NULL,
                key      TEXT NOT NULL,
                contents TEXT NOT NULL,
                hmac     TEXT NOT NULL,
                digest   TEXT,
                PRIMARY KEY (name, version)
            );",
            self.table
        );
        self.conn.lock().execute_batch(&sql)?;
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite:{} (table {})", path.display(), self.table),
            None => format!("sqlite::memory: (table {})", self.table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::DigestAlgorithm;
    use tempfile::TempDir;

    fn record(name: &str, version: u64, digest: DigestAlgorithm) -> SecretRecord {
        SecretRecord {
            name: name.into(),
            version: Version::pad(version).unwrap(),
            key: vec![9, 8, 7],
            contents: vec![1, 2, 3, 4],
            hmac: vec![0xde, 0xad],
            digest,
        }
    }

    fn backend() -> SqliteBackend {
        let b = SqliteBackend::open_in_memory("credential-store").unwrap();
        b.bootstrap().unwrap();
        b
    }

    #[test]
    fn insert_and_point_read() {
        let b = backend();
        let r = record("db.pass", 1, DigestAlgorithm::Sha512);
        b.put_if_absent(&r).unwrap();
        assert_eq!(b.get("db.pass", &r.version).unwrap(), Some(r));
        assert!(b.get("db.pass", &Version::pad(2).unwrap()).unwrap().is_none());
    }

    #[test]
    fn duplicate_insert_is_already_exists() {
        let b = backend();
        b.put_if_absent(&record("x", 1, DigestAlgorithm::Sha256)).unwrap();
        let err = b
            .put_if_absent(&record("x", 1, DigestAlgorithm::Md5))
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
        // The original record is untouched.
        let stored = b.get("x", &Version::pad(1).unwrap()).unwrap().unwrap();
        assert_eq!(stored.digest, DigestAlgorithm::Sha256);
    }

    #[test]
    fn versions_and_highest_use_string_order() {
        let b = backend();
        for v in [9, 10, 1, 100] {
            b.put_if_absent(&record("n", v, DigestAlgorithm::Sha256)).unwrap();
        }
        b.put_if_absent(&record("other", 500, DigestAlgorithm::Sha256)).unwrap();
        let versions: Vec<u64> = b
            .versions("n")
            .unwrap()
            .iter()
            .map(|r| r.version.value())
            .collect();
        assert_eq!(versions, vec![1, 9, 10, 100]);
        assert_eq!(b.highest("n").unwrap().unwrap().version.value(), 100);
    }

    #[test]
    fn scan_and_delete() {
        let b = backend();
        b.put_if_absent(&record("b", 1, DigestAlgorithm::Sha256)).unwrap();
        b.put_if_absent(&record("a", 2, DigestAlgorithm::Sha256)).unwrap();
        b.put_if_absent(&record("a", 1, DigestAlgorithm::Sha256)).unwrap();
        let names: Vec<(String, u64)> = b
            .scan()
            .unwrap()
            .into_iter()
            .map(|r| (r.name, r.version.value()))
            .collect();
        assert_eq!(
            names,
            vec![("a".into(), 1), ("a".into(), 2), ("b".into(), 1)]
        );

        assert!(b.delete("a", &Version::pad(1).unwrap()).unwrap());
        assert!(!b.delete("a", &Version::pad(1).unwrap()).unwrap());
        assert_eq!(b.scan().unwrap().len(), 2);
    }

    #[test]
    fn missing_digest_column_defaults_to_sha256() {
        let b = backend();
        b.conn
            .lock()
            .execute(
                "INSERT INTO \"credential-store\" (name, version, key, contents, hmac)
                 VALUES ('legacy', '0000000000000000001', 'AA==', 'AA==', '00')",
                [],
            )
            .unwrap();
        let r = b.get("legacy", &Version::pad(1).unwrap()).unwrap().unwrap();
        assert_eq!(r.digest, DigestAlgorithm::Sha256);
    }

    #[test]
    fn malformed_version_row_is_invalid_record() {
        let b = backend();
        b.conn
            .lock()
            .execute(
                "INSERT INTO \"credential-store\" (name, version, key, contents, hmac)
                 VALUES ('bad', 'hello world', 'AA==', 'AA==', '00')",
                [],
            )
            .unwrap();
        let err = b.versions("bad").unwrap_err();
        assert!(matches!(err, StorageError::InvalidRecord { .. }));
        assert!(err.to_string().contains("is not an int"));
    }

    #[test]
    fn rejects_unsafe_table_names() {
        assert!(SqliteBackend::open_in_memory("bad\"; DROP").is_err());
        assert!(SqliteBackend::open_in_memory("").is_err());
    }

    #[test]
    fn file_backend_persists_and_bootstrap_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secrets.db");
        {
            let b = SqliteBackend::open(&path, "creds").unwrap();
            b.bootstrap().unwrap();
            b.bootstrap().unwrap();
            b.put_if_absent(&record("x", 1, DigestAlgorithm::Sha256)).unwrap();
        }
        let b = SqliteBackend::open(&path, "creds").unwrap();
        assert_eq!(b.scan().unwrap().len(), 1);
        assert!(b.describe().contains("table creds"));
    }
}
