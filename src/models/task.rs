//! Tasks, the leaves of the ownership hierarchy.
//!
//! A task's rights are its list's rights. Updates go through the bulk
//! engine in [`crate::models::bulk_task`], with a single target.

use jiff::Timestamp;
use libsql::{Connection, Row, params};
use serde::{Deserialize, Serialize};

use crate::crud::{Crud, Listing, Rights, Session};
use crate::metrics::{self, CountKey};
use crate::models::label::{self, Label};
use crate::models::user::{self, User};
use crate::models::validate_name;
use crate::pagination::Pagination;
use crate::permission::Right;
use crate::principal::Principal;
use crate::rights::{self, Visibility};
use crate::{Error, Result, db};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    #[serde(skip_deserializing)]
    pub id: i64,
    pub title: String,
    pub description: String,
    pub done: bool,
    #[serde(skip_deserializing)]
    pub done_at: Option<Timestamp>,
    pub due_date: Option<Timestamp>,
    pub reminders: Vec<Timestamp>,
    /// Recurrence interval in seconds. Zero means the task does not repeat.
    pub repeat_after: i64,
    pub priority: i64,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    #[serde(skip_deserializing)]
    pub list_id: i64,
    /// Creating user id, or the negated share id for tasks made through a
    /// link share.
    #[serde(skip)]
    pub created_by_id: i64,
    #[serde(skip_deserializing)]
    pub created_by: Option<User>,
    #[serde(skip_deserializing)]
    pub assignees: Vec<User>,
    #[serde(skip_deserializing)]
    pub labels: Vec<Label>,
    #[serde(skip_deserializing)]
    pub created: Timestamp,
    #[serde(skip_deserializing)]
    pub updated: Timestamp,
}

const COLUMNS: &str = "tasks.id, tasks.title, tasks.description, tasks.done, tasks.done_at, \
    tasks.due_date, tasks.reminders, tasks.repeat_after, tasks.priority, tasks.start_date, \
    tasks.end_date, tasks.list_id, tasks.created_by_id, tasks.created, tasks.updated";

/// Reminders are stored as a JSON array of unix seconds.
fn encode_reminders(reminders: &[Timestamp]) -> Result<String> {
    let seconds: Vec<i64> = reminders.iter().map(|r| r.as_second()).collect();
    Ok(serde_json::to_string(&seconds)?)
}

fn decode_reminders(raw: &str) -> Result<Vec<Timestamp>> {
    let seconds: Vec<i64> = serde_json::from_str(raw)?;
    seconds.into_iter().map(db::timestamp).collect()
}

impl Task {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: db::int(row, 0)?,
            title: db::text(row, 1)?,
            description: db::text(row, 2)?,
            done: db::flag(row, 3)?,
            done_at: db::optional_time(row, 4)?,
            due_date: db::optional_time(row, 5)?,
            reminders: decode_reminders(&db::text(row, 6)?)?,
            repeat_after: db::int(row, 7)?,
            priority: db::int(row, 8)?,
            start_date: db::optional_time(row, 9)?,
            end_date: db::optional_time(row, 10)?,
            list_id: db::int(row, 11)?,
            created_by_id: db::int(row, 12)?,
            created: db::time(row, 13)?,
            updated: db::time(row, 14)?,
            ..Default::default()
        })
    }

    /// Load a task with creator, assignees and labels.
    pub async fn by_id(conn: &Connection, id: i64) -> Result<Task> {
        let sql = format!("SELECT {COLUMNS} FROM tasks WHERE tasks.id = ?1");
        let mut rows = conn.query(&sql, params![id]).await?;
        let mut task = match rows.next().await? {
            Some(row) => Self::from_row(&row)?,
            None => return Err(Error::NotFound(format!("task {id}"))),
        };
        task.load_details(conn).await?;
        Ok(task)
    }

    async fn load_details(&mut self, conn: &Connection) -> Result<()> {
        self.created_by = if self.created_by_id > 0 {
            match User::by_id(conn, self.created_by_id).await {
                Ok(user) => Some(user),
                Err(Error::NotFound(_)) => None,
                Err(e) => return Err(e),
            }
        } else {
            None
        };
        self.assignees = assignees_of(conn, self.id).await?;
        self.labels = label::labels_of(conn, self.id).await?;
        Ok(())
    }

    /// Write the mutable columns back. Identity, list and creator are never
    /// touched here.
    pub(crate) async fn store(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "UPDATE tasks SET title = ?1, description = ?2, done = ?3, done_at = ?4, \
             due_date = ?5, reminders = ?6, repeat_after = ?7, priority = ?8, \
             start_date = ?9, end_date = ?10, updated = ?11, search_key = ?13 WHERE id = ?12",
            params![
                self.title.as_str(),
                self.description.as_str(),
                i64::from(self.done),
                db::optional_seconds(self.done_at),
                db::optional_seconds(self.due_date),
                encode_reminders(&self.reminders)?,
                self.repeat_after,
                self.priority,
                db::optional_seconds(self.start_date),
                db::optional_seconds(self.end_date),
                self.updated.as_second(),
                self.id,
                db::search_key(&self.title)
            ],
        )
        .await?;
        Ok(())
    }
}

async fn assignees_of(conn: &Connection, task_id: i64) -> Result<Vec<User>> {
    let sql = format!(
        "SELECT {} FROM task_assignees JOIN users ON users.id = task_assignees.user_id \
         WHERE task_assignees.task_id = ?1 ORDER BY task_assignees.id",
        user::COLUMNS
    );
    let mut rows = conn.query(&sql, params![task_id]).await?;
    let mut users = Vec::new();
    while let Some(row) = rows.next().await? {
        users.push(User::from_row(&row)?);
    }
    Ok(users)
}

/// Replace the assignee set of a task.
pub(crate) async fn set_assignees(conn: &Connection, task_id: i64, user_ids: &[i64]) -> Result<()> {
    conn.execute(
        "DELETE FROM task_assignees WHERE task_id = ?1",
        params![task_id],
    )
    .await?;
    let now = db::now().as_second();
    for user_id in user_ids {
        conn.execute(
            "INSERT OR IGNORE INTO task_assignees (task_id, user_id, created) VALUES (?1, ?2, ?3)",
            params![task_id, *user_id, now],
        )
        .await?;
    }
    Ok(())
}

/// Delete a task and its assignee and label rows.
pub(crate) async fn purge(conn: &Connection, task_id: i64) -> Result<()> {
    for table in ["task_assignees", "label_task"] {
        conn.execute(
            &format!("DELETE FROM {table} WHERE task_id = ?1"),
            params![task_id],
        )
        .await?;
    }
    let removed = conn
        .execute("DELETE FROM tasks WHERE id = ?1", params![task_id])
        .await?;
    if removed == 0 {
        return Err(Error::NotFound(format!("task {task_id}")));
    }
    Ok(())
}

impl Crud for Task {
    const KIND: &'static str = "task";
    type Item = Task;

    async fn create(&mut self, s: &Session<'_>, p: &Principal) -> Result<()> {
        validate_name("task title", &self.title)?;
        if self.repeat_after < 0 {
            return Err(Error::Validation("repeat_after cannot be negative".into()));
        }

        let now = db::now();
        self.done_at = self.done.then_some(now);
        self.created_by_id = match p {
            Principal::User(user) => user.id,
            Principal::LinkShare(share) => -share.id,
        };
        s.conn
            .execute(
                "INSERT INTO tasks (title, description, done, done_at, due_date, reminders, \
                 repeat_after, priority, start_date, end_date, list_id, created_by_id, \
                 created, updated, search_key) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13, ?14)",
                params![
                    self.title.as_str(),
                    self.description.as_str(),
                    i64::from(self.done),
                    db::optional_seconds(self.done_at),
                    db::optional_seconds(self.due_date),
                    encode_reminders(&self.reminders)?,
                    self.repeat_after,
                    self.priority,
                    db::optional_seconds(self.start_date),
                    db::optional_seconds(self.end_date),
                    self.list_id,
                    self.created_by_id,
                    now.as_second(),
                    db::search_key(&self.title)
                ],
            )
            .await?;
        let id = s.conn.last_insert_rowid();
        *self = Task::by_id(s.conn, id).await?;

        metrics::record(s.metrics, CountKey::Tasks, 1);
        Ok(())
    }

    async fn read_one(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        *self = Task::by_id(s.conn, self.id).await?;
        Ok(())
    }

    /// Tasks of every list `p` can see, or of one list when `list_id` is set.
    async fn read_all(
        &self,
        s: &Session<'_>,
        p: &Principal,
        search: &str,
        page: Pagination,
    ) -> Result<Listing<Task>> {
        let visibility = Visibility::of(p);
        let from = format!(
            "FROM tasks JOIN lists ON lists.id = tasks.list_id \
             LEFT JOIN namespaces ON namespaces.id = lists.namespace_id \
             WHERE {} AND tasks.search_key LIKE ?2 ESCAPE '\\' AND (?3 = 0 OR tasks.list_id = ?3)",
            visibility.list_predicate()
        );
        let pattern = db::like_pattern(search);

        let total = db::count(
            s.conn,
            &format!("SELECT COUNT(*) {from}"),
            params![visibility.param(), pattern.as_str(), self.list_id],
        )
        .await?;

        let (limit, offset) = page.limit_offset();
        let sql = format!("SELECT {COLUMNS} {from} ORDER BY tasks.id LIMIT ?4 OFFSET ?5");
        let mut rows = s
            .conn
            .query(
                &sql,
                params![
                    visibility.param(),
                    pattern.as_str(),
                    self.list_id,
                    limit,
                    offset
                ],
            )
            .await?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            tasks.push(Self::from_row(&row)?);
        }
        drop(rows);
        for task in &mut tasks {
            task.load_details(s.conn).await?;
        }
        Ok(Listing::new(tasks, total))
    }

    async fn delete(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        let tx = s.conn.transaction().await?;
        purge(&tx, self.id).await?;
        tx.commit().await?;

        metrics::record(s.metrics, CountKey::Tasks, -1);
        Ok(())
    }
}

impl Rights for Task {
    async fn can_create(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        Ok(rights::list_right(s.conn, p, self.list_id).await? >= Right::Write)
    }

    async fn can_read(&mut self, s: &Session<'_>, p: &Principal) -> Result<(bool, Right)> {
        let right = rights::task_right(s.conn, p, self.id).await?;
        Ok((right >= Right::Read, right))
    }

    async fn can_delete(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        Ok(rights::task_right(s.conn, p, self.id).await? >= Right::Write)
    }
}
