//! Lists: containers of tasks, always inside one namespace.

use jiff::Timestamp;
use libsql::{Connection, Row, params};
use serde::{Deserialize, Serialize};

use crate::crud::{Crud, Listing, Rights, Session};
use crate::metrics::{self, CountKey};
use crate::models::user::{self, User};
use crate::models::validate_name;
use crate::pagination::Pagination;
use crate::permission::Right;
use crate::principal::Principal;
use crate::rights::{self, Visibility};
use crate::{Error, Result, db};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct List {
    #[serde(skip_deserializing)]
    pub id: i64,
    pub title: String,
    pub description: String,
    pub namespace_id: i64,
    #[serde(skip)]
    pub owner_id: i64,
    #[serde(skip_deserializing)]
    pub owner: Option<User>,
    #[serde(skip_deserializing)]
    pub created: Timestamp,
    #[serde(skip_deserializing)]
    pub updated: Timestamp,
}

const COLUMNS: &str = "lists.id, lists.title, lists.description, lists.namespace_id, \
    lists.owner_id, lists.created, lists.updated";

impl List {
    fn from_row(row: &Row) -> Result<Self> {
        let mut list = Self {
            id: db::int(row, 0)?,
            title: db::text(row, 1)?,
            description: db::text(row, 2)?,
            namespace_id: db::int(row, 3)?,
            owner_id: db::int(row, 4)?,
            created: db::time(row, 5)?,
            updated: db::time(row, 6)?,
            owner: None,
        };
        if let libsql::Value::Integer(_) = row.get_value(7)? {
            list.owner = Some(User::from_row_at(row, 7)?);
        }
        Ok(list)
    }

    pub async fn by_id(conn: &Connection, id: i64) -> Result<List> {
        let sql = format!(
            "SELECT {COLUMNS}, {} FROM lists LEFT JOIN users ON users.id = lists.owner_id \
             WHERE lists.id = ?1",
            user::COLUMNS
        );
        let mut rows = conn.query(&sql, params![id]).await?;
        match rows.next().await? {
            Some(row) => Self::from_row(&row),
            None => Err(Error::NotFound(format!("list {id}"))),
        }
    }
}

/// Delete a list and everything hanging off it. Returns the number of tasks
/// removed. Run inside the caller's transaction.
pub(crate) async fn purge(conn: &Connection, list_id: i64) -> Result<i64> {
    for sql in [
        "DELETE FROM task_assignees WHERE task_id IN (SELECT id FROM tasks WHERE list_id = ?1)",
        "DELETE FROM label_task WHERE task_id IN (SELECT id FROM tasks WHERE list_id = ?1)",
    ] {
        conn.execute(sql, params![list_id]).await?;
    }
    let tasks = conn
        .execute("DELETE FROM tasks WHERE list_id = ?1", params![list_id])
        .await?;
    for table in ["team_lists", "users_lists", "link_sharing"] {
        conn.execute(
            &format!("DELETE FROM {table} WHERE list_id = ?1"),
            params![list_id],
        )
        .await?;
    }
    let removed = conn
        .execute("DELETE FROM lists WHERE id = ?1", params![list_id])
        .await?;
    if removed == 0 {
        return Err(Error::NotFound(format!("list {list_id}")));
    }
    Ok(tasks as i64)
}

impl Crud for List {
    const KIND: &'static str = "list";
    type Item = List;

    async fn create(&mut self, s: &Session<'_>, p: &Principal) -> Result<()> {
        let owner = p.require_user(Self::KIND, "create")?.clone();
        validate_name("list title", &self.title)?;

        let now = db::now();
        s.conn
            .execute(
                "INSERT INTO lists (title, description, namespace_id, owner_id, created, updated, \
                 search_key) VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6)",
                params![
                    self.title.as_str(),
                    self.description.as_str(),
                    self.namespace_id,
                    owner.id,
                    now.as_second(),
                    db::search_key(&self.title)
                ],
            )
            .await?;
        self.id = s.conn.last_insert_rowid();
        self.owner_id = owner.id;
        self.owner = Some(owner);
        self.created = now;
        self.updated = now;

        metrics::record(s.metrics, CountKey::Lists, 1);
        Ok(())
    }

    async fn read_one(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        *self = List::by_id(s.conn, self.id).await?;
        Ok(())
    }

    /// Lists visible to `p`, within one namespace when `namespace_id` is set.
    async fn read_all(
        &self,
        s: &Session<'_>,
        p: &Principal,
        search: &str,
        page: Pagination,
    ) -> Result<Listing<List>> {
        let visibility = Visibility::of(p);
        let filter = format!(
            "{} AND lists.search_key LIKE ?2 ESCAPE '\\' AND (?3 = 0 OR lists.namespace_id = ?3)",
            visibility.list_predicate()
        );
        let pattern = db::like_pattern(search);

        let total = db::count(
            s.conn,
            &format!(
                "SELECT COUNT(*) FROM lists \
                 LEFT JOIN namespaces ON namespaces.id = lists.namespace_id WHERE {filter}"
            ),
            params![visibility.param(), pattern.as_str(), self.namespace_id],
        )
        .await?;

        let (limit, offset) = page.limit_offset();
        let sql = format!(
            "SELECT {COLUMNS}, {} FROM lists \
             LEFT JOIN namespaces ON namespaces.id = lists.namespace_id \
             LEFT JOIN users ON users.id = lists.owner_id \
             WHERE {filter} ORDER BY lists.id LIMIT ?4 OFFSET ?5",
            user::COLUMNS
        );
        let mut rows = s
            .conn
            .query(
                &sql,
                params![
                    visibility.param(),
                    pattern.as_str(),
                    self.namespace_id,
                    limit,
                    offset
                ],
            )
            .await?;
        let mut lists = Vec::new();
        while let Some(row) = rows.next().await? {
            lists.push(Self::from_row(&row)?);
        }
        Ok(Listing::new(lists, total))
    }

    /// Update title and description. The namespace stays where it is.
    async fn update(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        validate_name("list title", &self.title)?;
        List::by_id(s.conn, self.id).await?;

        s.conn
            .execute(
                "UPDATE lists SET title = ?1, description = ?2, updated = ?3, search_key = ?5 \
                 WHERE id = ?4",
                params![
                    self.title.as_str(),
                    self.description.as_str(),
                    db::now().as_second(),
                    self.id,
                    db::search_key(&self.title)
                ],
            )
            .await?;
        *self = List::by_id(s.conn, self.id).await?;
        Ok(())
    }

    async fn delete(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        let tx = s.conn.transaction().await?;
        let tasks = purge(&tx, self.id).await?;
        tx.commit().await?;

        metrics::record(s.metrics, CountKey::Lists, -1);
        metrics::record(s.metrics, CountKey::Tasks, -tasks);
        Ok(())
    }
}

impl Rights for List {
    async fn can_create(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        if p.user().is_none() {
            return Ok(false);
        }
        Ok(rights::namespace_right(s.conn, p, self.namespace_id).await? >= Right::Write)
    }

    async fn can_read(&mut self, s: &Session<'_>, p: &Principal) -> Result<(bool, Right)> {
        let right = rights::list_right(s.conn, p, self.id).await?;
        Ok((right >= Right::Read, right))
    }

    async fn can_update(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        Ok(rights::list_right(s.conn, p, self.id).await? >= Right::Write)
    }

    async fn can_delete(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        Ok(rights::list_right(s.conn, p, self.id).await? == Right::Admin)
    }
}
