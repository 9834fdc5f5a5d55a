//! Database connection abstraction.
//!
//! Supports multiple backends:
//! - Local SQLite file: `path/to/db.sqlite` or `file:path` or `sqlite://path`
//! - In-memory: `:memory:`
//! - Remote Turso: `libsql://...` or `https://...` (requires TURSO_AUTH_TOKEN env var)
//!
//! Also owns the relational schema every resource kind persists into, and a
//! handful of helpers for moving values between rows and domain types.

use std::sync::Arc;

use jiff::Timestamp;
use libsql::{Builder, Connection, Database, Row, Value};

/// Shared database handle.
pub type Handle = Arc<Database>;

/// Connect to the database.
///
/// # URL formats
/// - Local file: `mydata.db`, `file:path/to/db.sqlite`, `sqlite://path`
/// - In-memory: `:memory:`
/// - Remote Turso: `libsql://your-db.turso.io` (requires `TURSO_AUTH_TOKEN` env var)
pub async fn connect(url: &str) -> crate::Result<Database> {
    let db = if url.starts_with("libsql://") || url.starts_with("https://") {
        // Remote Turso database
        let token = std::env::var("TURSO_AUTH_TOKEN").map_err(|_| {
            crate::Error::Internal("TURSO_AUTH_TOKEN not set for remote database".into())
        })?;
        Builder::new_remote(url.to_string(), token).build().await?
    } else if url == ":memory:" {
        // In-memory database
        Builder::new_local(":memory:").build().await?
    } else {
        // Local file - strip sqlite:// or file: prefix if present
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("file:"))
            .unwrap_or(url);
        Builder::new_local(path).build().await?
    };

    Ok(db)
}

/// Get a connection from the database.
pub fn connection(db: &Database) -> crate::Result<Connection> {
    Ok(db.connect()?)
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL DEFAULT '',
    search_key TEXT NOT NULL DEFAULT '',
    created INTEGER NOT NULL,
    updated INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS namespaces (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    owner_id INTEGER NOT NULL,
    search_key TEXT NOT NULL DEFAULT '',
    created INTEGER NOT NULL,
    updated INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS lists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    namespace_id INTEGER NOT NULL,
    owner_id INTEGER NOT NULL,
    search_key TEXT NOT NULL DEFAULT '',
    created INTEGER NOT NULL,
    updated INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS lists_namespace ON lists (namespace_id);
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    done INTEGER NOT NULL DEFAULT 0,
    done_at INTEGER,
    due_date INTEGER,
    reminders TEXT NOT NULL DEFAULT '[]',
    repeat_after INTEGER NOT NULL DEFAULT 0,
    priority INTEGER NOT NULL DEFAULT 0,
    start_date INTEGER,
    end_date INTEGER,
    list_id INTEGER NOT NULL,
    created_by_id INTEGER NOT NULL,
    search_key TEXT NOT NULL DEFAULT '',
    created INTEGER NOT NULL,
    updated INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS tasks_list ON tasks (list_id);
CREATE TABLE IF NOT EXISTS task_assignees (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    created INTEGER NOT NULL,
    UNIQUE (task_id, user_id)
);
CREATE TABLE IF NOT EXISTS labels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    hex_color TEXT NOT NULL DEFAULT '',
    created_by_id INTEGER NOT NULL,
    search_key TEXT NOT NULL DEFAULT '',
    created INTEGER NOT NULL,
    updated INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS label_task (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id INTEGER NOT NULL,
    label_id INTEGER NOT NULL,
    created INTEGER NOT NULL,
    UNIQUE (task_id, label_id)
);
CREATE TABLE IF NOT EXISTS teams (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_by_id INTEGER NOT NULL,
    search_key TEXT NOT NULL DEFAULT '',
    created INTEGER NOT NULL,
    updated INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS team_members (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    team_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    admin INTEGER NOT NULL DEFAULT 0,
    created INTEGER NOT NULL,
    UNIQUE (team_id, user_id)
);
CREATE INDEX IF NOT EXISTS team_members_user ON team_members (user_id);
CREATE TABLE IF NOT EXISTS team_lists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    team_id INTEGER NOT NULL,
    list_id INTEGER NOT NULL,
    permission INTEGER NOT NULL DEFAULT 0,
    created INTEGER NOT NULL,
    updated INTEGER NOT NULL,
    UNIQUE (team_id, list_id)
);
CREATE TABLE IF NOT EXISTS team_namespaces (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    team_id INTEGER NOT NULL,
    namespace_id INTEGER NOT NULL,
    permission INTEGER NOT NULL DEFAULT 0,
    created INTEGER NOT NULL,
    updated INTEGER NOT NULL,
    UNIQUE (team_id, namespace_id)
);
CREATE TABLE IF NOT EXISTS users_lists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    list_id INTEGER NOT NULL,
    permission INTEGER NOT NULL DEFAULT 0,
    created INTEGER NOT NULL,
    updated INTEGER NOT NULL,
    UNIQUE (user_id, list_id)
);
CREATE TABLE IF NOT EXISTS users_namespaces (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    namespace_id INTEGER NOT NULL,
    permission INTEGER NOT NULL DEFAULT 0,
    created INTEGER NOT NULL,
    updated INTEGER NOT NULL,
    UNIQUE (user_id, namespace_id)
);
CREATE TABLE IF NOT EXISTS link_sharing (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hash TEXT NOT NULL UNIQUE,
    list_id INTEGER NOT NULL,
    permission INTEGER NOT NULL DEFAULT 0,
    shared_by_id INTEGER NOT NULL,
    expires INTEGER,
    created INTEGER NOT NULL,
    updated INTEGER NOT NULL
);
"#;

/// Create every table and index if missing.
pub async fn migrate(conn: &Connection) -> crate::Result<()> {
    conn.execute_batch(SCHEMA).await?;
    tracing::debug!("database schema is up to date");
    Ok(())
}

/// Current time truncated to the second, the resolution timestamps are stored at.
pub fn now() -> Timestamp {
    Timestamp::from_second(Timestamp::now().as_second()).unwrap_or_else(|_| Timestamp::now())
}

/// Convert stored unix seconds into a timestamp.
pub fn timestamp(seconds: i64) -> crate::Result<Timestamp> {
    Timestamp::from_second(seconds)
        .map_err(|e| crate::Error::Internal(format!("Stored timestamp out of range: {e}")))
}

/// Read a required integer column.
pub fn int(row: &Row, idx: i32) -> crate::Result<i64> {
    Ok(row.get::<i64>(idx)?)
}

/// Read a required text column.
pub fn text(row: &Row, idx: i32) -> crate::Result<String> {
    Ok(row.get::<String>(idx)?)
}

/// Read a required integer column as a boolean flag.
pub fn flag(row: &Row, idx: i32) -> crate::Result<bool> {
    Ok(int(row, idx)? != 0)
}

/// Read a required timestamp column.
pub fn time(row: &Row, idx: i32) -> crate::Result<Timestamp> {
    timestamp(int(row, idx)?)
}

/// Read a nullable timestamp column.
pub fn optional_time(row: &Row, idx: i32) -> crate::Result<Option<Timestamp>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Integer(seconds) => timestamp(seconds).map(Some),
        other => Err(crate::Error::Internal(format!(
            "Expected integer timestamp in column {idx}, got {other:?}"
        ))),
    }
}

/// Bind an optional timestamp as a nullable integer parameter.
pub fn optional_seconds(value: Option<Timestamp>) -> Value {
    match value {
        Some(ts) => Value::Integer(ts.as_second()),
        None => Value::Null,
    }
}

/// Case-folded copy of a searchable name, stored in the `search_key` column.
///
/// SQLite's `LIKE` and `lower()` only fold ASCII, so folding happens here.
pub fn search_key(text: &str) -> String {
    text.to_lowercase()
}

/// Build a `LIKE` pattern matching `search` anywhere in a `search_key`
/// column, with wildcards in the search text escaped. Use together with
/// `ESCAPE '\'`.
pub fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search_key(search).chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Count rows returned by a `SELECT COUNT(*)` style query.
pub async fn count(
    conn: &Connection,
    sql: &str,
    params: impl libsql::params::IntoParams,
) -> crate::Result<i64> {
    let mut rows = conn.query(sql, params).await?;
    match rows.next().await? {
        Some(row) => int(&row, 0),
        None => Ok(0),
    }
}

/// Whether a `SELECT 1 ...` style query yields at least one row.
pub async fn exists(
    conn: &Connection,
    sql: &str,
    params: impl libsql::params::IntoParams,
) -> crate::Result<bool> {
    let mut rows = conn.query(sql, params).await?;
    Ok(rows.next().await?.is_some())
}

// Re-export commonly used libsql types for convenience
pub use libsql::{Connection as DbConnection, Database as Db, params};
