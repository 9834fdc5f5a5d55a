//! Labels. Owned by their creator, readable wherever they are attached to a
//! visible task.

use jiff::Timestamp;
use libsql::{Connection, Row, params};
use serde::{Deserialize, Serialize};

use crate::crud::{Crud, Listing, Rights, Session};
use crate::models::validate_name;
use crate::pagination::Pagination;
use crate::permission::Right;
use crate::principal::Principal;
use crate::rights::{self, Visibility};
use crate::{Error, Result, db};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Label {
    #[serde(skip_deserializing)]
    pub id: i64,
    pub title: String,
    pub description: String,
    pub hex_color: String,
    #[serde(skip_deserializing)]
    pub created_by_id: i64,
    #[serde(skip_deserializing)]
    pub created: Timestamp,
    #[serde(skip_deserializing)]
    pub updated: Timestamp,
}

const COLUMNS: &str = "labels.id, labels.title, labels.description, labels.hex_color, \
    labels.created_by_id, labels.created, labels.updated";

impl Label {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: db::int(row, 0)?,
            title: db::text(row, 1)?,
            description: db::text(row, 2)?,
            hex_color: db::text(row, 3)?,
            created_by_id: db::int(row, 4)?,
            created: db::time(row, 5)?,
            updated: db::time(row, 6)?,
        })
    }

    pub async fn by_id(conn: &Connection, id: i64) -> Result<Label> {
        let sql = format!("SELECT {COLUMNS} FROM labels WHERE labels.id = ?1");
        let mut rows = conn.query(&sql, params![id]).await?;
        match rows.next().await? {
            Some(row) => Self::from_row(&row),
            None => Err(Error::NotFound(format!("label {id}"))),
        }
    }

    fn validate(&self) -> Result<()> {
        validate_name("label title", &self.title)?;
        let color = self.hex_color.trim_start_matches('#');
        if !color.is_empty() && (color.len() != 6 || !color.chars().all(|c| c.is_ascii_hexdigit()))
        {
            return Err(Error::Validation(format!(
                "'{}' is not a hex color",
                self.hex_color
            )));
        }
        Ok(())
    }
}

/// Labels attached to a task.
pub(crate) async fn labels_of(conn: &Connection, task_id: i64) -> Result<Vec<Label>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM label_task JOIN labels ON labels.id = label_task.label_id \
         WHERE label_task.task_id = ?1 ORDER BY label_task.id"
    );
    let mut rows = conn.query(&sql, params![task_id]).await?;
    let mut labels = Vec::new();
    while let Some(row) = rows.next().await? {
        labels.push(Label::from_row(&row)?);
    }
    Ok(labels)
}

impl Crud for Label {
    const KIND: &'static str = "label";
    type Item = Label;

    async fn create(&mut self, s: &Session<'_>, p: &Principal) -> Result<()> {
        let user = p.require_user(Self::KIND, "create")?;
        self.validate()?;

        let now = db::now();
        s.conn
            .execute(
                "INSERT INTO labels (title, description, hex_color, created_by_id, created, updated, \
                 search_key) VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6)",
                params![
                    self.title.as_str(),
                    self.description.as_str(),
                    self.hex_color.as_str(),
                    user.id,
                    now.as_second(),
                    db::search_key(&self.title)
                ],
            )
            .await?;
        self.id = s.conn.last_insert_rowid();
        self.created_by_id = user.id;
        self.created = now;
        self.updated = now;
        Ok(())
    }

    async fn read_one(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        *self = Label::by_id(s.conn, self.id).await?;
        Ok(())
    }

    /// Labels `p` created plus those on tasks in lists `p` can see.
    async fn read_all(
        &self,
        s: &Session<'_>,
        p: &Principal,
        search: &str,
        page: Pagination,
    ) -> Result<Listing<Label>> {
        let visibility = Visibility::of(p);
        let creator = p.user().map_or(0, |user| user.id);
        let filter = format!(
            "(labels.created_by_id = ?3 OR EXISTS (SELECT 1 FROM label_task \
               JOIN tasks ON tasks.id = label_task.task_id \
               JOIN lists ON lists.id = tasks.list_id \
               LEFT JOIN namespaces ON namespaces.id = lists.namespace_id \
               WHERE label_task.label_id = labels.id AND {})) \
             AND labels.search_key LIKE ?2 ESCAPE '\\'",
            visibility.list_predicate()
        );
        let pattern = db::like_pattern(search);

        let total = db::count(
            s.conn,
            &format!("SELECT COUNT(*) FROM labels WHERE {filter}"),
            params![visibility.param(), pattern.as_str(), creator],
        )
        .await?;

        let (limit, offset) = page.limit_offset();
        let sql = format!(
            "SELECT {COLUMNS} FROM labels WHERE {filter} ORDER BY labels.id LIMIT ?4 OFFSET ?5"
        );
        let mut rows = s
            .conn
            .query(
                &sql,
                params![visibility.param(), pattern.as_str(), creator, limit, offset],
            )
            .await?;
        let mut labels = Vec::new();
        while let Some(row) = rows.next().await? {
            labels.push(Self::from_row(&row)?);
        }
        Ok(Listing::new(labels, total))
    }

    async fn update(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        self.validate()?;
        Label::by_id(s.conn, self.id).await?;

        s.conn
            .execute(
                "UPDATE labels SET title = ?1, description = ?2, hex_color = ?3, updated = ?4, \
                 search_key = ?6 WHERE id = ?5",
                params![
                    self.title.as_str(),
                    self.description.as_str(),
                    self.hex_color.as_str(),
                    db::now().as_second(),
                    self.id,
                    db::search_key(&self.title)
                ],
            )
            .await?;
        *self = Label::by_id(s.conn, self.id).await?;
        Ok(())
    }

    async fn delete(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        let tx = s.conn.transaction().await?;
        tx.execute(
            "DELETE FROM label_task WHERE label_id = ?1",
            params![self.id],
        )
        .await?;
        let removed = tx
            .execute("DELETE FROM labels WHERE id = ?1", params![self.id])
            .await?;
        if removed == 0 {
            return Err(Error::NotFound(format!("label {}", self.id)));
        }
        tx.commit().await?;
        Ok(())
    }
}

impl Rights for Label {
    async fn can_create(&mut self, _s: &Session<'_>, p: &Principal) -> Result<bool> {
        Ok(p.user().is_some())
    }

    async fn can_read(&mut self, s: &Session<'_>, p: &Principal) -> Result<(bool, Right)> {
        let right = rights::label_right(s.conn, p, self.id).await?;
        Ok((right >= Right::Read, right))
    }

    async fn can_update(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        self.is_admin(s, p).await
    }

    async fn can_delete(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        self.is_admin(s, p).await
    }

    async fn is_admin(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        Ok(rights::label_right(s.conn, p, self.id).await? == Right::Admin)
    }
}
