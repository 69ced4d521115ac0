//! Immutable audit logging of credential access.
//!
//! Every encrypt, decrypt and validation attempt is recorded once, after the
//! caller has seen its outcome. The trail is append-only: sinks expose an
//! insert and a read-back, never an update or a delete.
//!
//! Logging is not coupled to the vault. A crash between a vault call and its
//! audit row loses the row; it never produces a wrong one.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::config::AuditConfig;
use crate::error::VaultError;

/// What was attempted on a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Encrypt,
    Decrypt,
    Validate,
}

impl AuditAction {
    /// The value stored in the `action` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
            Self::Validate => "validate",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "encrypt" => Some(Self::Encrypt),
            "decrypt" => Some(Self::Decrypt),
            "validate" => Some(Self::Validate),
            _ => None,
        }
    }
}

/// A caller-supplied description of one access attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub user_id: i64,
    pub credential_id: i64,
    pub action: AuditAction,
    /// Client address, if known. Empty strings are stored as absent.
    pub ip_address: Option<String>,
    /// Empty strings are stored as absent.
    pub user_agent: Option<String>,
    pub success: bool,
    /// Empty strings are stored as absent.
    pub error_message: Option<String>,
}

impl AuditEntry {
    /// An entry with no client details.
    pub fn new(
        user_id: i64,
        credential_id: i64,
        action: AuditAction,
        success: bool,
        error_message: Option<String>,
    ) -> Self {
        Self {
            user_id,
            credential_id,
            action,
            ip_address: None,
            user_agent: None,
            success,
            error_message,
        }
    }

    /// Attach the client address and user agent.
    pub fn with_client(
        mut self,
        ip_address: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        self.ip_address = Some(ip_address.into());
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// A permanent record: the entry as logged, plus when it was logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    #[serde(flatten)]
    pub entry: AuditEntry,
    pub accessed_at: DateTime<Utc>,
}

/// Durable storage for audit records. Implement this to forward records to a
/// database, a file, or a remote collector.
pub trait AuditSink: Send + Sync {
    /// Append one record. Must never modify records already written.
    fn append(&self, record: &AuditRecord) -> Result<(), VaultError>;
}

/// The audit trail used by callers of the vault.
///
/// Holds a primary sink and any number of forward sinks; every record goes
/// to all of them.
pub struct AuditLog {
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl AuditLog {
    pub fn new(sink: Box<dyn AuditSink>) -> Self {
        Self { sinks: vec![sink] }
    }

    /// Build a log from configuration: the SQLite table and/or the JSON lines
    /// file, or process memory when neither is configured.
    pub fn from_config(config: &AuditConfig) -> Result<Self, VaultError> {
        let mut sinks: Vec<Box<dyn AuditSink>> = Vec::new();
        if let Some(path) = &config.sqlite_path {
            sinks.push(Box::new(SqliteAuditSink::open(path)?));
        }
        if let Some(path) = &config.jsonl_path {
            sinks.push(Box::new(FileAuditSink::new(path)?));
        }
        if sinks.is_empty() {
            tracing::warn!("no audit store configured, records are kept in memory only");
            sinks.push(Box::new(MemoryAuditSink::new()));
        }
        Ok(Self { sinks })
    }

    /// Add a sink to receive a copy of every record.
    pub fn add_forward_sink(&mut self, sink: Box<dyn AuditSink>) {
        self.sinks.push(sink);
    }

    /// Timestamp `entry` and append it to the sink.
    ///
    /// Every sink is attempted. The first `Persistence` error is returned to
    /// the caller and each failure is logged; the vault operation the entry
    /// describes is unaffected.
    pub fn log(&self, mut entry: AuditEntry) -> Result<(), VaultError> {
        for field in [
            &mut entry.ip_address,
            &mut entry.user_agent,
            &mut entry.error_message,
        ] {
            if field.as_deref().is_some_and(str::is_empty) {
                *field = None;
            }
        }
        let record = AuditRecord {
            entry,
            accessed_at: Utc::now(),
        };

        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(err) = sink.append(&record) {
                tracing::warn!(
                    user_id = record.entry.user_id,
                    credential_id = record.entry.credential_id,
                    action = record.entry.action.as_str(),
                    error = %err,
                    "failed to write audit record"
                );
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn log_encrypt(
        &self,
        user_id: i64,
        credential_id: i64,
        success: bool,
        error_message: Option<String>,
    ) -> Result<(), VaultError> {
        self.log(AuditEntry::new(
            user_id,
            credential_id,
            AuditAction::Encrypt,
            success,
            error_message,
        ))
    }

    pub fn log_decrypt(
        &self,
        user_id: i64,
        credential_id: i64,
        success: bool,
        error_message: Option<String>,
    ) -> Result<(), VaultError> {
        self.log(AuditEntry::new(
            user_id,
            credential_id,
            AuditAction::Decrypt,
            success,
            error_message,
        ))
    }

    pub fn log_validation(
        &self,
        user_id: i64,
        credential_id: i64,
        success: bool,
        error_message: Option<String>,
    ) -> Result<(), VaultError> {
        self.log(AuditEntry::new(
            user_id,
            credential_id,
            AuditAction::Validate,
            success,
            error_message,
        ))
    }
}

// ---------------------------------------------------------------------------
// Built-in sink: memory
// ---------------------------------------------------------------------------

/// Keeps records in process memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of every record appended so far, oldest first.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, record: &AuditRecord) -> Result<(), VaultError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

// Lets a caller keep a handle on a shared sink while the log owns another.
impl<S: AuditSink + ?Sized> AuditSink for std::sync::Arc<S> {
    fn append(&self, record: &AuditRecord) -> Result<(), VaultError> {
        (**self).append(record)
    }
}

// ---------------------------------------------------------------------------
// Built-in sink: file
// ---------------------------------------------------------------------------

/// Appends one JSON object per record to a file, which is created on first
/// use and never truncated.
pub struct FileAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Open or create a file for append-only audit logging.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, VaultError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Read every record back from the file.
    pub fn records(&self) -> Result<Vec<AuditRecord>, VaultError> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

impl AuditSink for FileAuditSink {
    fn append(&self, record: &AuditRecord) -> Result<(), VaultError> {
        let line = serde_json::to_string(record)?;
        let mut file = self.file.lock();
        writeln!(file, "{line}")?;
        file.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Built-in sink: SQLite
// ---------------------------------------------------------------------------

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS api_key_access_log (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id         INTEGER NOT NULL,
        credential_id   INTEGER NOT NULL,
        action          TEXT NOT NULL,
        ip_address      TEXT,
        user_agent      TEXT NOT NULL DEFAULT '',
        success         INTEGER NOT NULL,
        error_message   TEXT NOT NULL DEFAULT '',
        accessed_at     TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_access_log_credential
        ON api_key_access_log(credential_id);
";

/// Inserts one row per record into the `api_key_access_log` table.
pub struct SqliteAuditSink {
    conn: Mutex<Connection>,
}

impl SqliteAuditSink {
    /// Open (or create) the audit database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VaultError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// An in-memory database, gone when the sink is dropped.
    pub fn open_in_memory() -> Result<Self, VaultError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, VaultError> {
        conn.execute_batch(CREATE_TABLE)?;
        tracing::debug!("audit table ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Every row for `credential_id`, oldest first.
    pub fn records_for_credential(
        &self,
        credential_id: i64,
    ) -> Result<Vec<AuditRecord>, VaultError> {
        self.query(
            "SELECT user_id, credential_id, action, ip_address, user_agent, success,
                    error_message, accessed_at
             FROM api_key_access_log WHERE credential_id = ?1 ORDER BY id",
            params![credential_id],
        )
    }

    /// Every row in the table, oldest first.
    pub fn records(&self) -> Result<Vec<AuditRecord>, VaultError> {
        self.query(
            "SELECT user_id, credential_id, action, ip_address, user_agent, success,
                    error_message, accessed_at
             FROM api_key_access_log ORDER BY id",
            params![],
        )
    }

    fn query(
        &self,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<AuditRecord>, VaultError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(args, |row| {
            let action: String = row.get(2)?;
            let user_agent: String = row.get(4)?;
            let error_message: String = row.get(6)?;
            let accessed_at: String = row.get(7)?;
            Ok((
                AuditEntry {
                    user_id: row.get(0)?,
                    credential_id: row.get(1)?,
                    action: AuditAction::Decrypt,
                    ip_address: row.get(3)?,
                    user_agent: non_empty(user_agent),
                    success: row.get(5)?,
                    error_message: non_empty(error_message),
                },
                action,
                accessed_at,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (mut entry, action, accessed_at) = row?;
            entry.action = AuditAction::parse(&action).ok_or_else(|| {
                VaultError::Persistence(format!("unknown audit action: {}", action))
            })?;
            let accessed_at = DateTime::parse_from_rfc3339(&accessed_at)
                .map_err(|e| VaultError::Persistence(format!("invalid accessed_at: {}", e)))?
                .with_timezone(&Utc);
            records.push(AuditRecord { entry, accessed_at });
        }
        Ok(records)
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl AuditSink for SqliteAuditSink {
    fn append(&self, record: &AuditRecord) -> Result<(), VaultError> {
        let entry = &record.entry;
        self.conn.lock().execute(
            "INSERT INTO api_key_access_log
                (user_id, credential_id, action, ip_address, user_agent, success,
                 error_message, accessed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.user_id,
                entry.credential_id,
                entry.action.as_str(),
                entry.ip_address.as_deref().filter(|ip| !ip.is_empty()),
                entry.user_agent.as_deref().unwrap_or_default(),
                entry.success,
                entry.error_message.as_deref().unwrap_or_default(),
                record.accessed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_empty_ip_is_recorded_as_absent() {
        let sink = Arc::new(MemoryAuditSink::new());
        let log = AuditLog::new(Box::new(Arc::clone(&sink)));

        let entry =
            AuditEntry::new(1, 2, AuditAction::Encrypt, true, None).with_client("", "curl/8");
        log.log(entry).unwrap();

        let records = sink.records();
        assert_eq!(records[0].entry.ip_address, None);
        assert_eq!(records[0].entry.user_agent.as_deref(), Some("curl/8"));
    }

    #[test]
    fn test_wrappers_fix_the_action() {
        let sink = Arc::new(MemoryAuditSink::new());
        let log = AuditLog::new(Box::new(Arc::clone(&sink)));

        log.log_encrypt(1, 10, true, None).unwrap();
        log.log_decrypt(1, 10, true, None).unwrap();
        log.log_validation(1, 10, false, Some("exchange rejected key".into())).unwrap();

        let actions: Vec<_> = sink.records().iter().map(|r| r.entry.action).collect();
        assert_eq!(
            actions,
            vec![AuditAction::Encrypt, AuditAction::Decrypt, AuditAction::Validate]
        );
    }

    #[test]
    fn test_action_serialises_lowercase() {
        let json = serde_json::to_string(&AuditAction::Validate).unwrap();
        assert_eq!(json, "\"validate\"");
    }

    #[test]
    fn test_sqlite_sink_stores_null_ip() {
        let sink = SqliteAuditSink::open_in_memory().unwrap();
        sink.append(&AuditRecord {
            entry: AuditEntry::new(3, 4, AuditAction::Decrypt, true, None).with_client("", ""),
            accessed_at: Utc::now(),
        })
        .unwrap();

        let nulls: i64 = sink
            .conn
            .lock()
            .query_row(
                "SELECT count(*) FROM api_key_access_log WHERE ip_address IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(nulls, 1);

        let records = sink.records().unwrap();
        assert_eq!(records[0].entry.user_agent, None);
        assert_eq!(records[0].entry.error_message, None);
    }

    #[test]
    fn test_empty_client_fields_read_back_unchanged() {
        let memory = Arc::new(MemoryAuditSink::new());
        let sqlite = Arc::new(SqliteAuditSink::open_in_memory().unwrap());
        let mut log = AuditLog::new(Box::new(Arc::clone(&memory)));
        log.add_forward_sink(Box::new(Arc::clone(&sqlite)));

        let entry = AuditEntry::new(5, 6, AuditAction::Validate, false, Some(String::new()))
            .with_client("", "");
        log.log(entry).unwrap();

        let logged = memory.records();
        assert_eq!(logged[0].entry.user_agent, None);
        assert_eq!(logged[0].entry.error_message, None);
        assert_eq!(sqlite.records().unwrap(), logged);
    }
}
