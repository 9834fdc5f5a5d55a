//! Bulk task updates.
//!
//! One [`TaskPatch`] is applied to every target task. All targets must live in
//! the same list, and write access to that list authorizes the whole batch.
//! Each task is persisted in its own transaction: a failure stops the batch
//! and leaves the tasks already written committed.
//!
//! Completing a repeating task does not mark it done. Its dates move forward
//! by one interval instead and the payload's own date fields are ignored.

use jiff::{SignedDuration, Timestamp};
use libsql::Connection;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::crud::{Crud, Rights, Session};
use crate::models::assignee;
use crate::models::task::{self, Task};
use crate::models::validate_name;
use crate::patch::Patch;
use crate::permission::{Grant, Right, level};
use crate::principal::Principal;
use crate::rights;
use crate::{Error, Result, db};

/// Changes to apply to a task. Absent fields leave the task alone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TaskPatch {
    pub title: Patch<String>,
    pub description: Patch<String>,
    pub done: Patch<bool>,
    pub due_date: Patch<Timestamp>,
    pub reminders: Patch<Vec<Timestamp>>,
    pub repeat_after: Patch<i64>,
    pub priority: Patch<i64>,
    pub start_date: Patch<Timestamp>,
    pub end_date: Patch<Timestamp>,
    /// Replaces the assignee set when present.
    pub assignees: Patch<Vec<i64>>,
}

impl TaskPatch {
    pub fn validate(&self) -> Result<()> {
        match &self.title {
            Patch::Set(title) => validate_name("task title", title)?,
            Patch::Clear => return Err(Error::Validation("task title cannot be empty".into())),
            Patch::Keep => {}
        }
        if matches!(self.repeat_after, Patch::Set(interval) if interval < 0) {
            return Err(Error::Validation("repeat_after cannot be negative".into()));
        }
        Ok(())
    }

    /// Merge into `task` as of `now`.
    pub fn apply_to(&self, task: &mut Task, now: Timestamp) -> Result<()> {
        let was_done = task.done;
        let repeats = !was_done && matches!(self.done, Patch::Set(true)) && task.repeat_after > 0;

        if repeats {
            advance(task)?;
            task.done = false;
        } else {
            self.done.clone().apply(&mut task.done);
            self.due_date.clone().apply_option(&mut task.due_date);
            self.reminders.clone().apply(&mut task.reminders);
            self.start_date.clone().apply_option(&mut task.start_date);
            self.end_date.clone().apply_option(&mut task.end_date);
        }
        self.title.clone().apply(&mut task.title);
        self.description.clone().apply(&mut task.description);
        self.repeat_after.clone().apply(&mut task.repeat_after);
        self.priority.clone().apply(&mut task.priority);

        match (was_done, task.done) {
            (false, true) => task.done_at = Some(now),
            (_, false) => task.done_at = None,
            (true, true) => {}
        }
        task.updated = now;
        Ok(())
    }
}

/// Move every date of a repeating task one interval forward.
fn advance(task: &mut Task) -> Result<()> {
    let interval = SignedDuration::from_secs(task.repeat_after);
    let shift = |ts: Timestamp| {
        ts.checked_add(interval)
            .map_err(|e| Error::Validation(format!("cannot repeat task: {e}")))
    };

    task.due_date = task.due_date.map(shift).transpose()?;
    task.start_date = task.start_date.map(shift).transpose()?;
    task.end_date = task.end_date.map(shift).transpose()?;
    task.reminders = task
        .reminders
        .iter()
        .copied()
        .map(shift)
        .collect::<Result<_>>()?;
    Ok(())
}

/// Load the targets and make sure they share a list. Ids that do not resolve
/// are skipped.
pub(crate) async fn load_targets(conn: &Connection, ids: &[i64]) -> Result<(i64, Vec<Task>)> {
    let mut tasks = Vec::with_capacity(ids.len());
    for id in ids {
        match Task::by_id(conn, *id).await {
            Ok(task) => tasks.push(task),
            Err(Error::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }

    let first = tasks.first().ok_or(Error::BulkTasksNeedAtLeastOne)?.list_id;
    if let Some(other) = tasks.iter().find(|task| task.list_id != first) {
        return Err(Error::BulkTasksMustBeInSameList {
            first,
            conflicting: other.list_id,
        });
    }
    Ok((first, tasks))
}

/// Apply `patch` to `targets`, one transaction per task. Returns the tasks as
/// stored afterwards.
pub(crate) async fn persist(
    conn: &Connection,
    grant: Grant<level::Write>,
    list_id: i64,
    targets: &[Task],
    patch: &TaskPatch,
) -> Result<Vec<Task>> {
    patch.validate()?;
    if let Patch::Set(user_ids) = &patch.assignees {
        for user_id in user_ids {
            assignee::ensure_assignable(conn, list_id, *user_id).await?;
        }
    }

    let now = db::now();
    let mut updated = Vec::with_capacity(targets.len());
    for target in targets {
        let mut task = target.clone();
        patch.apply_to(&mut task, now)?;

        let tx = conn.transaction().await?;
        task.store(&tx).await?;
        match &patch.assignees {
            Patch::Set(user_ids) => task::set_assignees(&tx, task.id, user_ids).await?,
            Patch::Clear => task::set_assignees(&tx, task.id, &[]).await?,
            Patch::Keep => {}
        }
        tx.commit().await?;

        updated.push(Task::by_id(conn, task.id).await?);
    }

    tracing::debug!(
        list_id,
        count = updated.len(),
        right = %grant.held(),
        "tasks updated"
    );
    Ok(updated)
}

/// Several tasks updated with one payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BulkTask {
    pub task_ids: Vec<i64>,
    #[serde(flatten)]
    pub patch: TaskPatch,
    /// Targets, loaded during authorization and replaced by the stored
    /// results after the update.
    #[serde(skip)]
    pub tasks: Vec<Task>,
    #[serde(skip)]
    list_id: i64,
}

impl Serialize for BulkTask {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BulkTask", 2)?;
        state.serialize_field("task_ids", &self.task_ids)?;
        state.serialize_field("tasks", &self.tasks)?;
        state.end()
    }
}

impl BulkTask {
    pub fn new(task_ids: Vec<i64>, patch: TaskPatch) -> Self {
        Self {
            task_ids,
            patch,
            ..Default::default()
        }
    }

    async fn ensure_loaded(&mut self, conn: &Connection) -> Result<()> {
        if self.tasks.is_empty() {
            let (list_id, tasks) = load_targets(conn, &self.task_ids).await?;
            self.list_id = list_id;
            self.tasks = tasks;
        }
        Ok(())
    }
}

impl Crud for BulkTask {
    const KIND: &'static str = "bulk task";
    type Item = Task;

    async fn update(&mut self, s: &Session<'_>, p: &Principal) -> Result<()> {
        self.ensure_loaded(s.conn).await?;
        let grant = Grant::<level::Write>::require(
            rights::list_right(s.conn, p, self.list_id).await?,
            Self::KIND,
            "update",
        )?;
        self.tasks = persist(s.conn, grant, self.list_id, &self.tasks, &self.patch).await?;
        Ok(())
    }
}

impl Rights for BulkTask {
    async fn can_update(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        self.ensure_loaded(s.conn).await?;
        Ok(rights::list_right(s.conn, p, self.list_id).await? >= Right::Write)
    }
}

/// A single task update, run through the bulk engine with one target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub id: i64,
    pub patch: TaskPatch,
    /// The stored task after the update.
    pub task: Task,
}

impl TaskUpdate {
    pub fn new(id: i64, patch: TaskPatch) -> Self {
        Self {
            id,
            patch,
            task: Task::default(),
        }
    }
}

impl Serialize for TaskUpdate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.task.serialize(serializer)
    }
}

impl Crud for TaskUpdate {
    const KIND: &'static str = "task";
    type Item = Task;

    async fn update(&mut self, s: &Session<'_>, p: &Principal) -> Result<()> {
        let (list_id, targets) = load_targets(s.conn, &[self.id]).await.map_err(|e| match e {
            Error::BulkTasksNeedAtLeastOne => Error::NotFound(format!("task {}", self.id)),
            other => other,
        })?;
        let grant = Grant::<level::Write>::require(
            rights::list_right(s.conn, p, list_id).await?,
            Self::KIND,
            "update",
        )?;
        let mut updated = persist(s.conn, grant, list_id, &targets, &self.patch).await?;
        self.task = updated
            .pop()
            .ok_or_else(|| Error::NotFound(format!("task {}", self.id)))?;
        Ok(())
    }
}

impl Rights for TaskUpdate {
    async fn can_update(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        Ok(rights::task_right(s.conn, p, self.id).await? >= Right::Write)
    }
}
