//! Labels attached to tasks.

use jiff::Timestamp;
use libsql::params;
use serde::{Deserialize, Serialize};

use crate::crud::{Crud, Listing, Rights, Session};
use crate::models::label::{self, Label};
use crate::pagination::Pagination;
use crate::permission::Right;
use crate::principal::Principal;
use crate::rights;
use crate::{Error, Result, db};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelTask {
    #[serde(skip_deserializing)]
    pub task_id: i64,
    pub label_id: i64,
    #[serde(skip_deserializing)]
    pub created: Timestamp,
}

impl Crud for LabelTask {
    const KIND: &'static str = "label task";
    type Item = Label;

    async fn create(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        let present = db::exists(
            s.conn,
            "SELECT 1 FROM label_task WHERE task_id = ?1 AND label_id = ?2",
            params![self.task_id, self.label_id],
        )
        .await?;
        if present {
            return Err(Error::Conflict("label is already on this task".into()));
        }

        let now = db::now();
        s.conn
            .execute(
                "INSERT INTO label_task (task_id, label_id, created) VALUES (?1, ?2, ?3)",
                params![self.task_id, self.label_id, now.as_second()],
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
    ) -> Result<Listing<Label>> {
        if rights::task_right(s.conn, p, self.task_id).await? < Right::Read {
            return Err(Error::forbidden(Self::KIND, "list"));
        }

        let needle = search.to_lowercase();
        let labels: Vec<Label> = label::labels_of(s.conn, self.task_id)
            .await?
            .into_iter()
            .filter(|label| label.title.to_lowercase().contains(&needle))
            .collect();
        let total = labels.len() as i64;

        let (limit, offset) = page.limit_offset();
        let items = labels
            .into_iter()
            .skip(offset as usize)
            .take(if limit < 0 { usize::MAX } else { limit as usize })
            .collect();
        Ok(Listing::new(items, total))
    }

    async fn delete(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        let removed = s
            .conn
            .execute(
                "DELETE FROM label_task WHERE task_id = ?1 AND label_id = ?2",
                params![self.task_id, self.label_id],
            )
            .await?;
        if removed == 0 {
            return Err(Error::NotFound(format!(
                "label {} on task {}",
                self.label_id, self.task_id
            )));
        }
        Ok(())
    }
}

impl Rights for LabelTask {
    /// Needs write on the task and read on the label.
    async fn can_create(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        if rights::task_right(s.conn, p, self.task_id).await? < Right::Write {
            return Ok(false);
        }
        Ok(rights::label_right(s.conn, p, self.label_id).await? >= Right::Read)
    }

    async fn can_delete(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        Ok(rights::task_right(s.conn, p, self.task_id).await? >= Right::Write)
    }
}
