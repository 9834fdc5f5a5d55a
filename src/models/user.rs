//! Users as stored by the account layer.
//!
//! Registration and credentials live outside this crate; resources only need
//! to look users up by id or username and to render them.

use jiff::Timestamp;
use libsql::{Connection, Row, params};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Never rendered to other users.
    #[serde(skip_serializing)]
    pub email: String,
    #[serde(skip_deserializing)]
    pub created: Timestamp,
    #[serde(skip_deserializing)]
    pub updated: Timestamp,
}

pub(crate) const COLUMNS: &str = "users.id, users.username, users.email, users.created, users.updated";

impl User {
    pub(crate) fn from_row(row: &Row) -> Result<Self> {
        Self::from_row_at(row, 0)
    }

    /// Read the user columns starting at `offset`, for joined queries.
    pub(crate) fn from_row_at(row: &Row, offset: i32) -> Result<Self> {
        Ok(Self {
            id: db::int(row, offset)?,
            username: db::text(row, offset + 1)?,
            email: db::text(row, offset + 2)?,
            created: db::time(row, offset + 3)?,
            updated: db::time(row, offset + 4)?,
        })
    }

    /// Insert a new user.
    pub async fn create(conn: &Connection, username: &str, email: &str) -> Result<User> {
        if username.trim().is_empty() {
            return Err(Error::Validation("username cannot be empty".into()));
        }
        if Self::by_username(conn, username).await.is_ok() {
            return Err(Error::Conflict(format!("username {username} is taken")));
        }
        let now = db::now();
        conn.execute(
            "INSERT INTO users (username, email, created, updated, search_key) \
             VALUES (?1, ?2, ?3, ?3, ?4)",
            params![username, email, now.as_second(), db::search_key(username)],
        )
        .await?;
        Ok(User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            email: email.to_string(),
            created: now,
            updated: now,
        })
    }

    pub async fn by_id(conn: &Connection, id: i64) -> Result<User> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE users.id = ?1");
        let mut rows = conn.query(&sql, params![id]).await?;
        match rows.next().await? {
            Some(row) => Self::from_row(&row),
            None => Err(Error::NotFound(format!("user {id}"))),
        }
    }

    pub async fn by_username(conn: &Connection, username: &str) -> Result<User> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE users.username = ?1");
        let mut rows = conn.query(&sql, params![username]).await?;
        match rows.next().await? {
            Some(row) => Self::from_row(&row),
            None => Err(Error::NotFound(format!("user {username}"))),
        }
    }
}
