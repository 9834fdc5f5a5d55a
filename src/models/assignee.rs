//! Task assignees.

use jiff::Timestamp;
use libsql::params;
use serde::{Deserialize, Serialize};

use crate::crud::{Crud, Listing, Rights, Session};
use crate::models::user::{self, User};
use crate::pagination::Pagination;
use crate::permission::Right;
use crate::principal::Principal;
use crate::rights;
use crate::{Error, Result, db};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskAssignee {
    #[serde(skip_deserializing)]
    pub task_id: i64,
    pub user_id: i64,
    #[serde(skip_deserializing)]
    pub created: Timestamp,
}

/// Fail unless `user_id` exists and can read `list_id`.
pub(crate) async fn ensure_assignable(
    conn: &libsql::Connection,
    list_id: i64,
    user_id: i64,
) -> Result<()> {
    let user = User::by_id(conn, user_id).await?;
    let right = rights::list_right(conn, &Principal::User(user), list_id).await?;
    if right < Right::Read {
        return Err(Error::Validation(format!(
            "user {user_id} cannot access list {list_id}"
        )));
    }
    Ok(())
}

impl Crud for TaskAssignee {
    const KIND: &'static str = "assignee";
    type Item = User;

    async fn create(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        let list_id = rights::task_list(s.conn, self.task_id).await?;
        ensure_assignable(s.conn, list_id, self.user_id).await?;

        let present = db::exists(
            s.conn,
            "SELECT 1 FROM task_assignees WHERE task_id = ?1 AND user_id = ?2",
            params![self.task_id, self.user_id],
        )
        .await?;
        if present {
            return Err(Error::Conflict("user is already assigned to this task".into()));
        }

        let now = db::now();
        s.conn
            .execute(
                "INSERT INTO task_assignees (task_id, user_id, created) VALUES (?1, ?2, ?3)",
                params![self.task_id, self.user_id, now.as_second()],
            )
            .await?;
        self.created = now;
        Ok(())
    }

    async fn read_all(
        &self,
        s: &Session<'_>,
        p: &Principal,
        search: &str,
        page: Pagination,
    ) -> Result<Listing<User>> {
        if rights::task_right(s.conn, p, self.task_id).await? < Right::Read {
            return Err(Error::forbidden(Self::KIND, "list"));
        }

        let pattern = db::like_pattern(search);
        let from = "FROM task_assignees JOIN users ON users.id = task_assignees.user_id \
                    WHERE task_assignees.task_id = ?1 AND users.search_key LIKE ?2 ESCAPE '\\'";
        let total = db::count(
            s.conn,
            &format!("SELECT COUNT(*) {from}"),
            params![self.task_id, pattern.as_str()],
        )
        .await?;

        let (limit, offset) = page.limit_offset();
        let sql = format!(
            "SELECT {} {from} ORDER BY task_assignees.id LIMIT ?3 OFFSET ?4",
            user::COLUMNS
        );
        let mut rows = s
            .conn
            .query(&sql, params![self.task_id, pattern.as_str(), limit, offset])
            .await?;
        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(User::from_row(&row)?);
        }
        Ok(Listing::new(users, total))
    }

    async fn delete(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        let removed = s
            .conn
            .execute(
                "DELETE FROM task_assignees WHERE task_id = ?1 AND user_id = ?2",
                params![self.task_id, self.user_id],
            )
            .await?;
        if removed == 0 {
            return Err(Error::NotFound(format!(
                "assignee {} on task {}",
                self.user_id, self.task_id
            )));
        }
        Ok(())
    }
}

impl Rights for TaskAssignee {
    async fn can_create(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        Ok(rights::task_right(s.conn, p, self.task_id).await? >= Right::Write)
    }

    async fn can_delete(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        self.can_create(s, p).await
    }
}
