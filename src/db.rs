use std::path::Path;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::error::Result;

pub fn open(path: &Path) -> Result<Connection> {
    info!("opening database at {}", path.display());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;

    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.busy_timeout(Duration::from_secs(5))?;

    migrate(&conn)?;
    Ok(conn)
}

/// Open the database, retrying with exponential backoff.  Used once at
/// startup; a database that stays unavailable aborts the process.
pub async fn connect(path: &Path, store: &StoreConfig) -> Result<Connection> {
    let backoff = ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(store.connect_backoff_ms))
        .with_max_times(store.connect_retries);

    (|| async move { open(path) })
        .retry(backoff)
        .notify(|err, delay| {
            warn!(err = %err, retry_in = ?delay, "database open failed, retrying");
        })
        .await
}

/// Run database migrations. Exposed for tests that use in-memory DBs.
pub(crate) fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS farming_requests (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL DEFAULT '',
            phone       TEXT NOT NULL DEFAULT '',
            location    TEXT NOT NULL DEFAULT '',
            soil_type   TEXT NOT NULL DEFAULT '',
            crop        TEXT NOT NULL DEFAULT '',
            issue_type  TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            language    TEXT NOT NULL DEFAULT 'english',
            rating      TEXT CHECK (
                rating IS NULL
                OR rating IN ('poor', 'bad', 'ok', 'good', 'excellent')
            ),
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_farming_requests_created
            ON farming_requests(created_at);
        ",
    )?;

    add_column_if_missing(conn, "farming_requests", "answer", "TEXT")?;

    Ok(())
}

fn add_column_if_missing(conn: &Connection, table: &str, column: &str, col_type: &str) -> Result<()> {
    let exists: bool = conn.query_row(
        &format!("SELECT COUNT(*) FROM pragma_table_info('{table}') WHERE name = ?1"),
        [column],
        |row| row.get(0),
    )?;
    if !exists {
        conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {col_type};"))?;
        info!(table, column, "added column via migration");
    }
    Ok(())
}

/// Creates an in-memory database with migrations applied. Use in tests.
#[cfg(test)]
pub(crate) fn test_db() -> std::sync::Arc<tokio::sync::Mutex<Connection>> {
    use std::sync::Arc;

    let conn = Connection::open_in_memory().unwrap();
    migrate(&conn).unwrap();
    Arc::new(tokio::sync::Mutex::new(conn))
}
