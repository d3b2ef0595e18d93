//! Audit log — SQLite-based operation history.
//!
//! Records every store operation (put, get, delete, setup, ...) in a
//! local SQLite database at `<store_dir>/audit.db`.  Values are never
//! logged, only names and versions.
//!
//! If the database can't be opened or written to, operations continue
//! without logging.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::errors::{CredVaultError, Result};
use crate::version::Version;

/// A single audit log entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub name: Option<String>,
    pub version: Option<String>,
    pub details: Option<String>,
}

impl AuditEntry {
    /// The entry's version parsed back into a `Version`, if it has one.
    pub fn parsed_version(&self) -> Option<Version> {
        self.version.as_deref().and_then(|v| v.parse().ok())
    }
}

/// Which entries `AuditLog::query` returns.
#[derive(Debug, Clone)]
pub struct AuditFilter {
    pub limit: usize,
    /// Only entries at or after this timestamp.
    pub since: Option<DateTime<Utc>>,
    /// Only entries about this secret.
    pub name: Option<String>,
}

impl AuditFilter {
    pub fn last(limit: usize) -> Self {
        Self {
            limit,
            since: None,
            name: None,
        }
    }
}

/// SQLite-backed audit log.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `<store_dir>/audit.db`.
    ///
    /// Returns `None` if the database can't be opened.
    pub fn open(store_dir: &Path) -> Option<Self> {
        let db_path = Self::db_path(store_dir);
        let conn = Connection::open(&db_path).ok()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&db_path, perms);
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                operation TEXT NOT NULL,
                name      TEXT,
                version   TEXT,
                details   TEXT
            );",
        )
        .ok()?;

        Some(Self { conn })
    }

    /// Record an operation. Errors are ignored.
    pub fn log(
        &self,
        operation: &str,
        name: Option<&str>,
        version: Option<&str>,
        details: Option<&str>,
    ) {
        let now = Utc::now().to_rfc3339();
        if let Err(e) = self.conn.execute(
            "INSERT INTO audit_log (timestamp, operation, name, version, details)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![now, operation, name, version, details],
        ) {
            tracing::debug!(error = %e, operation, "audit write failed");
        }
    }

    /// Entries matching `filter`, most recent first.
    pub fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let limit_i64 = i64::try_from(filter.limit).unwrap_or(i64::MAX);
        let since = filter.since.map(|ts| ts.to_rfc3339());

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, operation, name, version, details
                 FROM audit_log
                 WHERE (?1 IS NULL OR timestamp >= ?1)
                   AND (?2 IS NULL OR name = ?2)
                 ORDER BY id DESC
                 LIMIT ?3",
            )
            .map_err(|e| CredVaultError::AuditError(format!("query prepare: {e}")))?;

        let rows = stmt
            .query_map(rusqlite::params![since, filter.name, limit_i64], |row| {
                let ts_str: String = row.get(1)?;
                let timestamp = DateTime::parse_from_rfc3339(&ts_str)
                    .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp,
                    operation: row.get(2)?,
                    name: row.get(3)?,
                    version: row.get(4)?,
                    details: row.get(5)?,
                })
            })
            .map_err(|e| CredVaultError::AuditError(format!("query exec: {e}")))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| CredVaultError::AuditError(format!("row parse: {e}")))?);
        }

        Ok(entries)
    }

    pub fn db_path(store_dir: &Path) -> PathBuf {
        store_dir.join("audit.db")
    }
}

/// Log an audit event into `store_dir`, ignoring any failure.
pub fn log_audit(
    store_dir: &Path,
    operation: &str,
    name: Option<&str>,
    version: Option<&str>,
    details: Option<&str>,
) {
    if let Some(audit) = AuditLog::open(store_dir) {
        audit.log(operation, name, version, details);
    }
}
