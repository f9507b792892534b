//! Minimal async ORM for gigboard (sqlite + sqlx)
//!
//! Usage:
//! let db = Db::connect("sqlite::memory:", 1).await?;
//! orm::auto_migrate(Arc::new(db.clone())).await?;
//! let mut tx = db.begin().await?;
//! // ... queries against &mut *tx ...
//! tx.commit().await?;
//!
//! Every request works inside one transaction from [`Db::begin`]. Dropping the
//! transaction without `commit` rolls it back, so an early `?` return never leaves
//! partial writes behind.
pub use futures::future::BoxFuture;
use log::{debug, info};
use sha2::{Digest, Sha256};
pub use sqlx::FromRow;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Executor, Row, Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use walkdir::WalkDir;

/// An async database pool wrapper.
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

/// The per-request transaction scope.
pub type Tx = Transaction<'static, Sqlite>;

pub type MigrationFuture = BoxFuture<'static, Result<(), sqlx::Error>>;

/// Migration function pointer for a model, registered by `#[derive(Model)]`.
pub type MigrationFn = fn(Arc<Db>) -> MigrationFuture;

pub struct Migration(pub MigrationFn);

impl std::ops::Deref for Migration {
    type Target = MigrationFn;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

const MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS __gigboard_migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT UNIQUE,
    table_name TEXT UNIQUE,
    schema_sql TEXT,
    hash TEXT,
    applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
)";

#[async_trait::async_trait]
pub trait Model: Send + Sync {
    fn table_name() -> &'static str;
    fn create_table_sql() -> String;
    fn columns() -> Vec<(String, String)>;

    /// Create the table on first run; afterwards add any columns the model gained.
    async fn migrate(db: Arc<Db>) -> Result<(), sqlx::Error> {
        let table_name = Self::table_name();
        let create_sql = Self::create_table_sql();
        let schema_hash = hash(&create_sql);

        db.execute(MIGRATIONS_TABLE).await?;

        let recorded: Option<String> =
            sqlx::query_scalar("SELECT hash FROM __gigboard_migrations WHERE table_name = ?")
                .bind(table_name)
                .fetch_optional(db.pool())
                .await?;

        let Some(recorded) = recorded else {
            db.execute(&create_sql).await?;
            sqlx::query(
                "INSERT INTO __gigboard_migrations (table_name, schema_sql, hash) VALUES (?, ?, ?)",
            )
            .bind(table_name)
            .bind(&create_sql)
            .bind(&schema_hash)
            .execute(db.pool())
            .await?;
            info!(
                "Migrated `{}` (table created, initial schema applied).",
                table_name
            );
            return Ok(());
        };

        if recorded == schema_hash {
            debug!("Schema for `{}` is up to date.", table_name);
            return Ok(());
        }

        let existing: Vec<String> = sqlx::query(&format!("PRAGMA table_info({})", table_name))
            .fetch_all(db.pool())
            .await?
            .into_iter()
            .map(|row: SqliteRow| row.get::<String, _>("name"))
            .collect();

        let mut added = Vec::new();
        for (name, definition) in Self::columns() {
            if !existing.contains(&name) {
                db.execute(&format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    table_name, name, definition
                ))
                .await?;
                added.push((name, definition));
            }
        }

        if added.is_empty() {
            info!("No column changes detected for `{}`.", table_name);
        } else {
            info!(
                "Schema changes detected for `{}`, the following columns were added:",
                table_name
            );
            for (name, definition) in &added {
                info!("  - {} {}", name, definition);
            }
        }

        sqlx::query(
            "UPDATE __gigboard_migrations \
             SET schema_sql = ?, hash = ?, applied_at = CURRENT_TIMESTAMP \
             WHERE table_name = ?",
        )
        .bind(&create_sql)
        .bind(&schema_hash)
        .bind(table_name)
        .execute(db.pool())
        .await?;
        Ok(())
    }
}

fn hash(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn is_in_memory(uri: &str) -> bool {
    uri.contains(":memory:") || uri.contains("mode=memory")
}

impl Db {
    /// Connect (or create) a SQLite database at the given URI with foreign keys enforced.
    ///
    /// In-memory databases are per-connection in SQLite, so they get exactly one
    /// long-lived pooled connection.
    pub async fn connect(uri: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        info!("Connecting to SQLite database at URI: {}", uri);
        let options = SqliteConnectOptions::from_str(uri)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = if is_in_memory(uri) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .connect_with(options)
                .await?
        };
        info!("Connected to SQLite database: {}", uri);
        Ok(Db { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open the transaction scope for one request.
    pub async fn begin(&self) -> Result<Tx, sqlx::Error> {
        self.pool.begin().await
    }

    /// Execute an arbitrary SQL statement, e.g. DDL, INSERT, UPDATE.
    pub async fn execute(&self, sql: &str) -> Result<(), sqlx::Error> {
        debug!("Executing SQL: {}", sql);
        let result = self.pool.execute(sql).await;
        match &result {
            Ok(done) => debug!("SQL executed, {} rows affected", done.rows_affected()),
            Err(e) => log::error!("SQL execution failed: {}", e),
        }
        result.map(|_| ())
    }
}

/// Migrate all registered models using the inventory pattern.
pub async fn auto_migrate(db: Arc<Db>) -> Result<(), sqlx::Error> {
    info!("Starting auto migration of all registered models...");
    let mut total = 0;
    for m in inventory::iter::<Migration> {
        total += 1;
        if let Err(e) = m(db.clone()).await {
            log::error!("Auto-migration failed for a model: {}", e);
            return Err(e);
        }
    }
    info!("Auto migration completed for {} models.", total);
    Ok(())
}

/// Applies file-based migrations located in `migrations_dir`.
/// Each migration file is a `*.sql` file; files run in filename order and
/// already-applied ones are skipped based on the filename recorded in
/// `__gigboard_migrations`. A file and its bookkeeping row commit together.
pub async fn apply_migration_files(db: Arc<Db>, migrations_dir: &Path) -> crate::Result<usize> {
    db.execute(MIGRATIONS_TABLE).await?;

    let mut files: Vec<_> = WalkDir::new(migrations_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|f| f.file_type().is_file())
        .filter(|f| f.path().extension().map(|e| e == "sql").unwrap_or(false))
        .collect();
    files.sort_by_key(|f| f.file_name().to_os_string());

    let mut applied_count = 0;
    for entry in files {
        let filename = entry.file_name().to_string_lossy().to_string();
        let applied: Option<i64> =
            sqlx::query_scalar("SELECT id FROM __gigboard_migrations WHERE filename = ?")
                .bind(&filename)
                .fetch_optional(db.pool())
                .await?;
        if applied.is_some() {
            debug!("Migration `{}` already applied.", filename);
            continue;
        }

        let sql = std::fs::read_to_string(entry.path())?;
        info!("Applying migration file: {}", filename);
        let mut tx = db.begin().await?;
        (&mut *tx).execute(sql.as_str()).await?;
        sqlx::query("INSERT INTO __gigboard_migrations (filename, hash) VALUES (?, ?)")
            .bind(&filename)
            .bind(hash(&sql))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!("Migration `{}` applied.", filename);
        applied_count += 1;
    }

    Ok(applied_count)
}
