//! Namespaces: the top of the ownership hierarchy.

use jiff::Timestamp;
use libsql::{Connection, Row, Value, params};
use serde::{Deserialize, Serialize};

use crate::crud::{Crud, Listing, Rights, Session};
use crate::metrics::{self, CountKey};
use crate::models::list;
use crate::models::user::{self, User};
use crate::models::validate_name;
use crate::pagination::Pagination;
use crate::permission::Right;
use crate::principal::Principal;
use crate::rights::{self, Visibility};
use crate::{Error, Result, db};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Namespace {
    #[serde(skip_deserializing)]
    pub id: i64,
    pub name: String,
    pub description: String,
    #[serde(skip)]
    pub owner_id: i64,
    #[serde(skip_deserializing)]
    pub owner: Option<User>,
    #[serde(skip_deserializing)]
    pub created: Timestamp,
    #[serde(skip_deserializing)]
    pub updated: Timestamp,
}

const COLUMNS: &str = "namespaces.id, namespaces.name, namespaces.description, \
    namespaces.owner_id, namespaces.created, namespaces.updated";

impl Namespace {
    fn from_row(row: &Row) -> Result<Self> {
        let owner = match row.get_value(6)? {
            Value::Integer(_) => Some(User::from_row_at(row, 6)?),
            _ => None,
        };
        Ok(Self {
            id: db::int(row, 0)?,
            name: db::text(row, 1)?,
            description: db::text(row, 2)?,
            owner_id: db::int(row, 3)?,
            created: db::time(row, 4)?,
            updated: db::time(row, 5)?,
            owner,
        })
    }

    pub async fn by_id(conn: &Connection, id: i64) -> Result<Namespace> {
        let sql = format!(
            "SELECT {COLUMNS}, {} FROM namespaces \
             LEFT JOIN users ON users.id = namespaces.owner_id WHERE namespaces.id = ?1",
            user::COLUMNS
        );
        let mut rows = conn.query(&sql, params![id]).await?;
        match rows.next().await? {
            Some(row) => Self::from_row(&row),
            None => Err(Error::NotFound(format!("namespace {id}"))),
        }
    }
}

impl Crud for Namespace {
    const KIND: &'static str = "namespace";
    type Item = Namespace;

    async fn create(&mut self, s: &Session<'_>, p: &Principal) -> Result<()> {
        let owner = p.require_user(Self::KIND, "create")?.clone();
        validate_name("namespace name", &self.name)?;

        let now = db::now();
        s.conn
            .execute(
                "INSERT INTO namespaces (name, description, owner_id, created, updated, search_key) \
                 VALUES (?1, ?2, ?3, ?4, ?4, ?5)",
                params![
                    self.name.as_str(),
                    self.description.as_str(),
                    owner.id,
                    now.as_second(),
                    db::search_key(&self.name)
                ],
            )
            .await?;
        self.id = s.conn.last_insert_rowid();
        self.owner_id = owner.id;
        self.owner = Some(owner);
        self.created = now;
        self.updated = now;

        metrics::record(s.metrics, CountKey::Namespaces, 1);
        Ok(())
    }

    async fn read_one(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        *self = Namespace::by_id(s.conn, self.id).await?;
        Ok(())
    }

    async fn read_all(
        &self,
        s: &Session<'_>,
        p: &Principal,
        search: &str,
        page: Pagination,
    ) -> Result<Listing<Namespace>> {
        let visibility = Visibility::of(p);
        let filter = format!(
            "{} AND namespaces.search_key LIKE ?2 ESCAPE '\\'",
            visibility.namespace_predicate()
        );
        let pattern = db::like_pattern(search);

        let total = db::count(
            s.conn,
            &format!("SELECT COUNT(*) FROM namespaces WHERE {filter}"),
            params![visibility.param(), pattern.as_str()],
        )
        .await?;

        let (limit, offset) = page.limit_offset();
        let sql = format!(
            "SELECT {COLUMNS}, {} FROM namespaces \
             LEFT JOIN users ON users.id = namespaces.owner_id \
             WHERE {filter} ORDER BY namespaces.id LIMIT ?3 OFFSET ?4",
            user::COLUMNS
        );
        let mut rows = s
            .conn
            .query(
                &sql,
                params![visibility.param(), pattern.as_str(), limit, offset],
            )
            .await?;
        let mut namespaces = Vec::new();
        while let Some(row) = rows.next().await? {
            namespaces.push(Self::from_row(&row)?);
        }
        Ok(Listing::new(namespaces, total))
    }

    async fn update(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        validate_name("namespace name", &self.name)?;
        Namespace::by_id(s.conn, self.id).await?;

        s.conn
            .execute(
                "UPDATE namespaces SET name = ?1, description = ?2, updated = ?3, search_key = ?5 \
                 WHERE id = ?4",
                params![
                    self.name.as_str(),
                    self.description.as_str(),
                    db::now().as_second(),
                    self.id,
                    db::search_key(&self.name)
                ],
            )
            .await?;
        *self = Namespace::by_id(s.conn, self.id).await?;
        Ok(())
    }

    /// Delete the namespace with all of its lists, tasks and shares.
    async fn delete(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        let tx = s.conn.transaction().await?;

        let mut list_ids = Vec::new();
        let mut rows = tx
            .query(
                "SELECT id FROM lists WHERE namespace_id = ?1",
                params![self.id],
            )
            .await?;
        while let Some(row) = rows.next().await? {
            list_ids.push(db::int(&row, 0)?);
        }
        drop(rows);

        let mut tasks = 0;
        for list_id in &list_ids {
            tasks += list::purge(&tx, *list_id).await?;
        }
        for table in ["team_namespaces", "users_namespaces"] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE namespace_id = ?1"),
                params![self.id],
            )
            .await?;
        }
        let removed = tx
            .execute("DELETE FROM namespaces WHERE id = ?1", params![self.id])
            .await?;
        if removed == 0 {
            return Err(Error::NotFound(format!("namespace {}", self.id)));
        }
        tx.commit().await?;

        metrics::record(s.metrics, CountKey::Namespaces, -1);
        metrics::record(s.metrics, CountKey::Lists, -(list_ids.len() as i64));
        metrics::record(s.metrics, CountKey::Tasks, -tasks);
        Ok(())
    }
}

impl Rights for Namespace {
    async fn can_create(&mut self, _s: &Session<'_>, p: &Principal) -> Result<bool> {
        Ok(p.user().is_some())
    }

    async fn can_read(&mut self, s: &Session<'_>, p: &Principal) -> Result<(bool, Right)> {
        let right = rights::namespace_right(s.conn, p, self.id).await?;
        Ok((right >= Right::Read, right))
    }

    async fn can_update(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        self.is_admin(s, p).await
    }

    async fn can_delete(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        self.is_admin(s, p).await
    }

    async fn is_admin(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        Ok(rights::namespace_right(s.conn, p, self.id).await? == Right::Admin)
    }
}
