//! Transport adapter: one generic HTTP handler per verb.
//!
//! Each handler binds the request into a resource kind through [`Bind`],
//! resolves the principal, and hands both to [`crate::handler`]. Verbs follow
//! the usual layout of this API: `PUT` creates, `GET` reads, `POST` updates,
//! `DELETE` deletes.

use serde::Serialize;

use crate::crud::{Crud, Rights, Session};
use crate::handler;
use crate::models::{
    BulkTask, Label, LabelTask, LinkShare, List, Namespace, Task, TaskAssignee, TaskUpdate, Team,
    TeamMember, TeamShare, UserShare,
};
use crate::pagination::Pagination;
use crate::response::{self, HttpResponse};
use crate::rights::Container;
use crate::router::Context;
use crate::{Error, Result};

/// Build a resource kind from the path parameters and body of a request.
pub trait Bind: Sized {
    fn bind(ctx: &Context) -> Result<Self>;
}

/// Numeric path parameter, if the route has it.
fn optional_id(ctx: &Context, name: &str) -> Result<Option<i64>> {
    match ctx.param(name) {
        Some(_) => ctx.id_param(name).map(Some),
        None => Ok(None),
    }
}

fn query_number(value: Option<&String>, name: &str) -> Result<Option<i64>> {
    value
        .map(|raw| {
            raw.parse()
                .map_err(|_| Error::InvalidRequest(format!("{name} must be a number, got '{raw}'")))
        })
        .transpose()
}

/// `PUT`: create.
pub async fn create<T>(ctx: Context) -> Result<HttpResponse>
where
    T: Bind + Crud + Rights + Serialize,
{
    let conn = ctx.connection()?;
    let principal = ctx.principal(&conn).await?;
    let obj = T::bind(&ctx)?;

    let session = Session::new(&conn, ctx.metrics.as_ref());
    let obj = handler::create(&session, &principal, obj).await?;
    response::created(&obj)
}

/// `GET` on one entity. The caller's right goes into `x-max-right`.
pub async fn read_one<T>(ctx: Context) -> Result<HttpResponse>
where
    T: Bind + Crud + Rights + Serialize,
{
    let conn = ctx.connection()?;
    let principal = ctx.principal(&conn).await?;
    let obj = T::bind(&ctx)?;

    let session = Session::new(&conn, ctx.metrics.as_ref());
    let (obj, right) = handler::read_one(&session, &principal, obj).await?;
    response::entity(&obj, right)
}

/// `GET` on a collection, with `page`, `per_page` and `s` from the query.
pub async fn read_all<T>(ctx: Context) -> Result<HttpResponse>
where
    T: Bind + Crud,
{
    let query = ctx.query();
    let pagination = Pagination::resolve(
        query_number(query.get("page"), "page")?,
        query_number(query.get("per_page"), "per_page")?,
        ctx.config.service.max_items_per_page,
    )?;
    let search = query.get("s").map(String::as_str).unwrap_or_default();

    let conn = ctx.connection()?;
    let principal = ctx.principal(&conn).await?;
    let obj = T::bind(&ctx)?;

    let session = Session::new(&conn, ctx.metrics.as_ref());
    let page = handler::read_all(&session, &principal, &obj, search, pagination).await?;
    response::paginated(&page)
}

/// `POST`: update.
pub async fn update<T>(ctx: Context) -> Result<HttpResponse>
where
    T: Bind + Crud + Rights + Serialize,
{
    let conn = ctx.connection()?;
    let principal = ctx.principal(&conn).await?;
    let obj = T::bind(&ctx)?;

    let session = Session::new(&conn, ctx.metrics.as_ref());
    let obj = handler::update(&session, &principal, obj).await?;
    response::ok(&obj)
}

/// `DELETE`.
pub async fn delete<T>(ctx: Context) -> Result<HttpResponse>
where
    T: Bind + Crud + Rights,
{
    let conn = ctx.connection()?;
    let principal = ctx.principal(&conn).await?;
    let obj = T::bind(&ctx)?;

    let session = Session::new(&conn, ctx.metrics.as_ref());
    handler::delete(&session, &principal, obj).await?;
    response::ok(&serde_json::json!({ "message": "Successfully deleted." }))
}

impl Bind for Namespace {
    fn bind(ctx: &Context) -> Result<Self> {
        let mut namespace: Namespace = ctx.json()?;
        if let Some(id) = optional_id(ctx, "namespace")? {
            namespace.id = id;
        }
        Ok(namespace)
    }
}

impl Bind for List {
    fn bind(ctx: &Context) -> Result<Self> {
        let mut list: List = ctx.json()?;
        if let Some(id) = optional_id(ctx, "list")? {
            list.id = id;
        }
        if let Some(namespace_id) = optional_id(ctx, "namespace")? {
            list.namespace_id = namespace_id;
        }
        Ok(list)
    }
}

impl Bind for Task {
    fn bind(ctx: &Context) -> Result<Self> {
        let mut task: Task = ctx.json()?;
        if let Some(id) = optional_id(ctx, "task")? {
            task.id = id;
        }
        if let Some(list_id) = optional_id(ctx, "list")? {
            task.list_id = list_id;
        }
        Ok(task)
    }
}

impl Bind for TaskUpdate {
    fn bind(ctx: &Context) -> Result<Self> {
        Ok(TaskUpdate::new(ctx.id_param("task")?, ctx.json()?))
    }
}

impl Bind for BulkTask {
    fn bind(ctx: &Context) -> Result<Self> {
        ctx.json()
    }
}

impl Bind for TaskAssignee {
    fn bind(ctx: &Context) -> Result<Self> {
        let mut assignee: TaskAssignee = ctx.json()?;
        assignee.task_id = ctx.id_param("task")?;
        if let Some(user_id) = optional_id(ctx, "user")? {
            assignee.user_id = user_id;
        }
        Ok(assignee)
    }
}

impl Bind for Label {
    fn bind(ctx: &Context) -> Result<Self> {
        let mut label: Label = ctx.json()?;
        if let Some(id) = optional_id(ctx, "label")? {
            label.id = id;
        }
        Ok(label)
    }
}

impl Bind for LabelTask {
    fn bind(ctx: &Context) -> Result<Self> {
        let mut label_task: LabelTask = ctx.json()?;
        label_task.task_id = ctx.id_param("task")?;
        if let Some(label_id) = optional_id(ctx, "label")? {
            label_task.label_id = label_id;
        }
        Ok(label_task)
    }
}

impl Bind for Team {
    fn bind(ctx: &Context) -> Result<Self> {
        let mut team: Team = ctx.json()?;
        if let Some(id) = optional_id(ctx, "team")? {
            team.id = id;
        }
        Ok(team)
    }
}

impl Bind for TeamMember {
    fn bind(ctx: &Context) -> Result<Self> {
        let mut member: TeamMember = ctx.json()?;
        member.team_id = ctx.id_param("team")?;
        if let Some(username) = ctx.param("user") {
            member.username = username.to_string();
        }
        Ok(member)
    }
}

impl Bind for LinkShare {
    fn bind(ctx: &Context) -> Result<Self> {
        let mut share: LinkShare = ctx.json()?;
        share.list_id = ctx.id_param("list")?;
        if let Some(id) = optional_id(ctx, "share")? {
            share.id = id;
        }
        Ok(share)
    }
}

impl<C: Container> Bind for TeamShare<C> {
    fn bind(ctx: &Context) -> Result<Self> {
        let mut share: TeamShare<C> = ctx.json()?;
        share.container_id = ctx.id_param(C::KIND)?;
        if let Some(team_id) = optional_id(ctx, "team")? {
            share.team_id = team_id;
        }
        Ok(share)
    }
}

impl<C: Container> Bind for UserShare<C> {
    fn bind(ctx: &Context) -> Result<Self> {
        let mut share: UserShare<C> = ctx.json()?;
        share.container_id = ctx.id_param(C::KIND)?;
        if let Some(username) = ctx.param("user") {
            share.username = username.to_string();
        }
        Ok(share)
    }
}
