//! SQLite-backed storage for repository metadata

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

#[cfg(test)]
use mockall::automock;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::version::error::CacheError;
use crate::version::types::PackageRecord;

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: not_found column
    &["ALTER TABLE packages ADD COLUMN not_found INTEGER NOT NULL DEFAULT 0"],
];

/// Metadata of one package as last stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMetadata {
    pub records: Vec<PackageRecord>,
    /// Milliseconds since UNIX epoch
    pub updated_at: i64,
    /// The repository answered that it does not know the package
    pub not_found: bool,
}

impl CachedMetadata {
    /// Whether the entry was stored less than `refresh_interval` milliseconds before `now`
    pub fn is_fresh(&self, now: i64, refresh_interval: i64) -> bool {
        now - self.updated_at < refresh_interval
    }
}

/// Trait for storing and retrieving repository metadata
#[cfg_attr(test, automock)]
pub trait MetadataStorer: Send + Sync + 'static {
    /// Get the stored metadata of a package in a repository
    fn get_metadata(
        &self,
        repository: &str,
        package_name: &str,
    ) -> Result<Option<CachedMetadata>, CacheError>;

    /// Replace all stored records of a package
    fn replace_metadata(
        &self,
        repository: &str,
        package_name: &str,
        records: Vec<PackageRecord>,
    ) -> Result<(), CacheError>;

    /// Remember that the repository does not know a package
    fn mark_not_found(&self, repository: &str, package_name: &str) -> Result<(), CacheError>;

    /// Remove everything, returning the number of packages dropped
    fn clear(&self) -> Result<usize, CacheError>;
}

/// Get current timestamp in milliseconds since UNIX epoch
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct Cache {
    conn: Mutex<Connection>,
}

impl Cache {
    pub fn new(db_path: &Path) -> Result<Self, CacheError> {
        info!("Initializing cache database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        debug!("Database connection established");

        Self::with_connection(conn)
    }

    /// Cache that lives only as long as the process
    pub fn in_memory() -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CacheError> {
        let cache = Self {
            conn: Mutex::new(conn),
        };

        cache.create_schema()?;
        info!("Cache initialized successfully");

        Ok(cache)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        // Create base tables (without migration columns)
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS packages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                repository TEXT NOT NULL,
                package_name TEXT NOT NULL,
                metadata TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(repository, package_name)
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_updated_at ON packages(updated_at)",
            [],
        )?;

        // Apply migrations
        Self::apply_migrations(&conn)?;

        debug!("Database schema created successfully");
        Ok(())
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), CacheError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    // Databases created before the migration system may already have the column
                    match conn.execute(sql, []) {
                        Ok(_) => {}
                        Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
                            if msg.contains("duplicate column name") =>
                        {
                            debug!("Column already exists, skipping: {}", sql);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
            debug!("Updated schema version to v{}", target_version);
        }

        Ok(())
    }

    fn upsert(
        &self,
        repository: &str,
        package_name: &str,
        metadata: &str,
        not_found: bool,
    ) -> Result<(), CacheError> {
        let now = current_timestamp_ms();
        let package_name = package_name.to_ascii_lowercase();
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            INSERT INTO packages (repository, package_name, metadata, updated_at, not_found)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(repository, package_name) DO UPDATE SET
                metadata = excluded.metadata,
                updated_at = excluded.updated_at,
                not_found = excluded.not_found
            "#,
            (repository, package_name, metadata, now, not_found),
        )?;

        Ok(())
    }
}

impl MetadataStorer for Cache {
    fn get_metadata(
        &self,
        repository: &str,
        package_name: &str,
    ) -> Result<Option<CachedMetadata>, CacheError> {
        let conn = self.lock_conn()?;

        let row: Option<(String, i64, bool)> = conn
            .query_row(
                r#"
                SELECT metadata, updated_at, not_found FROM packages
                WHERE repository = ?1 AND package_name = ?2
                "#,
                (repository, package_name.to_ascii_lowercase()),
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((metadata, updated_at, not_found)) = row else {
            return Ok(None);
        };

        Ok(Some(CachedMetadata {
            records: serde_json::from_str(&metadata)?,
            updated_at,
            not_found,
        }))
    }

    fn replace_metadata(
        &self,
        repository: &str,
        package_name: &str,
        records: Vec<PackageRecord>,
    ) -> Result<(), CacheError> {
        debug!(
            "Saving {} records for {} from {}",
            records.len(),
            package_name,
            repository
        );

        let metadata = serde_json::to_string(&records)?;
        self.upsert(repository, package_name, &metadata, false)
    }

    fn mark_not_found(&self, repository: &str, package_name: &str) -> Result<(), CacheError> {
        debug!("Marking {} as not found in {}", package_name, repository);
        self.upsert(repository, package_name, "[]", true)
    }

    fn clear(&self) -> Result<usize, CacheError> {
        let conn = self.lock_conn()?;
        let removed = conn.execute("DELETE FROM packages", [])?;
        info!("Removed {} cached packages", removed);
        Ok(removed)
    }
}
