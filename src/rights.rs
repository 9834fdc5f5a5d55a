//! Rights resolution.
//!
//! Answers "what is the highest right principal P holds on resource R" by
//! walking the ownership hierarchy Task → List → Namespace:
//!
//! 1. A link share holds its ceiling (read or write) on exactly its own list
//!    and nothing anywhere else.
//! 2. The owner of the resource, or of any ancestor, holds admin.
//! 3. Otherwise each level contributes its direct user grant and the grants of
//!    every team the user belongs to. A team's write grant counts as admin for
//!    members flagged admin. The highest level found wins.
//! 4. No grant anywhere means [`Right::None`].
//!
//! Nothing is cached: every call reads the current grants.
//!
//! Listings do not call the resolver per row. They filter with
//! [`Visibility`], whose SQL predicates admit exactly the rows on which the
//! resolver would return at least [`Right::Read`].

use std::future::Future;

use libsql::{Connection, Value, params};

use crate::db;
use crate::permission::{Right, SharingRight};
use crate::principal::Principal;
use crate::{Error, Result};

/// A container other resources can be shared through.
pub trait Container: Default + Send + Sync + 'static {
    /// Name used in errors and logs.
    const KIND: &'static str;
    /// Table holding the container rows.
    const TABLE: &'static str;
    /// Foreign key column in the share tables.
    const ID_COLUMN: &'static str;
    /// Team grants on this container.
    const TEAM_TABLE: &'static str;
    /// Direct user grants on this container.
    const USER_TABLE: &'static str;

    /// Right `p` holds on container `id`.
    fn right(conn: &Connection, p: &Principal, id: i64)
    -> impl Future<Output = Result<Right>> + Send;
}

/// Lists as sharing containers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListScope;

impl Container for ListScope {
    const KIND: &'static str = "list";
    const TABLE: &'static str = "lists";
    const ID_COLUMN: &'static str = "list_id";
    const TEAM_TABLE: &'static str = "team_lists";
    const USER_TABLE: &'static str = "users_lists";

    async fn right(conn: &Connection, p: &Principal, id: i64) -> Result<Right> {
        list_right(conn, p, id).await
    }
}

/// Namespaces as sharing containers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NamespaceScope;

impl Container for NamespaceScope {
    const KIND: &'static str = "namespace";
    const TABLE: &'static str = "namespaces";
    const ID_COLUMN: &'static str = "namespace_id";
    const TEAM_TABLE: &'static str = "team_namespaces";
    const USER_TABLE: &'static str = "users_namespaces";

    async fn right(conn: &Connection, p: &Principal, id: i64) -> Result<Right> {
        namespace_right(conn, p, id).await
    }
}

/// Right `p` holds on list `list_id`.
pub async fn list_right(conn: &Connection, p: &Principal, list_id: i64) -> Result<Right> {
    let mut rows = conn
        .query(
            "SELECT lists.namespace_id, lists.owner_id, namespaces.owner_id \
             FROM lists LEFT JOIN namespaces ON namespaces.id = lists.namespace_id \
             WHERE lists.id = ?1",
            params![list_id],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| Error::NotFound(format!("list {list_id}")))?;
    let namespace_id = db::int(&row, 0)?;
    let list_owner = db::int(&row, 1)?;
    let namespace_owner = match row.get_value(2)? {
        Value::Integer(id) => Some(id),
        _ => None,
    };

    if let Some(right) = p.link_share_right(list_id) {
        return Ok(right);
    }

    let user_id = p.id();
    if list_owner == user_id || namespace_owner == Some(user_id) {
        return Ok(Right::Admin);
    }

    let list_level = level_grant::<ListScope>(conn, list_id, user_id).await?;
    if list_level == Right::Admin {
        return Ok(list_level);
    }
    let namespace_level = level_grant::<NamespaceScope>(conn, namespace_id, user_id).await?;
    Ok(list_level.max(namespace_level))
}

/// Right `p` holds on namespace `namespace_id`.
pub async fn namespace_right(conn: &Connection, p: &Principal, namespace_id: i64) -> Result<Right> {
    let mut rows = conn
        .query(
            "SELECT owner_id FROM namespaces WHERE id = ?1",
            params![namespace_id],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| Error::NotFound(format!("namespace {namespace_id}")))?;
    let owner = db::int(&row, 0)?;

    let Principal::User(user) = p else {
        return Ok(Right::None);
    };
    if owner == user.id {
        return Ok(Right::Admin);
    }
    level_grant::<NamespaceScope>(conn, namespace_id, user.id).await
}

/// Right `p` holds on task `task_id`, which is the right on its list.
pub async fn task_right(conn: &Connection, p: &Principal, task_id: i64) -> Result<Right> {
    let list_id = task_list(conn, task_id).await?;
    list_right(conn, p, list_id).await
}

/// List a task belongs to.
pub async fn task_list(conn: &Connection, task_id: i64) -> Result<i64> {
    let mut rows = conn
        .query("SELECT list_id FROM tasks WHERE id = ?1", params![task_id])
        .await?;
    match rows.next().await? {
        Some(row) => db::int(&row, 0),
        None => Err(Error::NotFound(format!("task {task_id}"))),
    }
}

/// Right `p` holds on team `team_id`.
///
/// The creator and admin members hold admin, other members read. Link shares
/// never see teams.
pub async fn team_right(conn: &Connection, p: &Principal, team_id: i64) -> Result<Right> {
    let mut rows = conn
        .query(
            "SELECT created_by_id FROM teams WHERE id = ?1",
            params![team_id],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| Error::NotFound(format!("team {team_id}")))?;
    let creator = db::int(&row, 0)?;

    let Principal::User(user) = p else {
        return Ok(Right::None);
    };
    if creator == user.id {
        return Ok(Right::Admin);
    }

    let mut rows = conn
        .query(
            "SELECT admin FROM team_members WHERE team_id = ?1 AND user_id = ?2",
            params![team_id, user.id],
        )
        .await?;
    match rows.next().await? {
        Some(row) if db::flag(&row, 0)? => Ok(Right::Admin),
        Some(_) => Ok(Right::Read),
        None => Ok(Right::None),
    }
}

/// Right `p` holds on label `label_id`.
///
/// The creator holds admin. Anyone who can read a task carrying the label may
/// read it.
pub async fn label_right(conn: &Connection, p: &Principal, label_id: i64) -> Result<Right> {
    let mut rows = conn
        .query(
            "SELECT created_by_id FROM labels WHERE id = ?1",
            params![label_id],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| Error::NotFound(format!("label {label_id}")))?;
    let creator = db::int(&row, 0)?;

    if p.user().is_some_and(|user| user.id == creator) {
        return Ok(Right::Admin);
    }

    let visibility = Visibility::of(p);
    let sql = format!(
        "SELECT 1 FROM label_task \
         JOIN tasks ON tasks.id = label_task.task_id \
         JOIN lists ON lists.id = tasks.list_id \
         LEFT JOIN namespaces ON namespaces.id = lists.namespace_id \
         WHERE label_task.label_id = ?2 AND {} LIMIT 1",
        visibility.list_predicate()
    );
    if db::exists(conn, &sql, params![visibility.param(), label_id]).await? {
        Ok(Right::Read)
    } else {
        Ok(Right::None)
    }
}

/// Highest grant `user_id` holds directly on one container, personally or
/// through a team.
async fn level_grant<C: Container>(conn: &Connection, id: i64, user_id: i64) -> Result<Right> {
    let mut best = Right::None;

    let sql = format!(
        "SELECT permission FROM {} WHERE {} = ?1 AND user_id = ?2",
        C::USER_TABLE,
        C::ID_COLUMN
    );
    let mut rows = conn.query(&sql, params![id, user_id]).await?;
    while let Some(row) = rows.next().await? {
        best = best.max(SharingRight::from_code(db::int(&row, 0)?)?.into());
    }

    let sql = format!(
        "SELECT g.permission, m.admin FROM {} g \
         JOIN team_members m ON m.team_id = g.team_id \
         WHERE g.{} = ?1 AND m.user_id = ?2",
        C::TEAM_TABLE,
        C::ID_COLUMN
    );
    let mut rows = conn.query(&sql, params![id, user_id]).await?;
    while let Some(row) = rows.next().await? {
        let granted = SharingRight::from_code(db::int(&row, 0)?)?;
        best = best.max(team_member_right(granted, db::flag(&row, 1)?));
    }

    Ok(best)
}

/// Right a team member derives from the team's grant.
pub fn team_member_right(granted: SharingRight, member_is_admin: bool) -> Right {
    match granted {
        SharingRight::Write if member_is_admin => Right::Admin,
        other => other.into(),
    }
}

/// Row filter for listings, bound to one principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Lists a user reaches through ownership or any grant.
    User(i64),
    /// The single list a link share points at.
    LinkShare(i64),
}

const USER_VISIBLE_LIST: &str = "(lists.owner_id = ?1 \
    OR namespaces.owner_id = ?1 \
    OR EXISTS (SELECT 1 FROM users_lists ul WHERE ul.list_id = lists.id AND ul.user_id = ?1) \
    OR EXISTS (SELECT 1 FROM users_namespaces un WHERE un.namespace_id = lists.namespace_id AND un.user_id = ?1) \
    OR EXISTS (SELECT 1 FROM team_lists tl JOIN team_members tm ON tm.team_id = tl.team_id \
               WHERE tl.list_id = lists.id AND tm.user_id = ?1) \
    OR EXISTS (SELECT 1 FROM team_namespaces tn JOIN team_members tm ON tm.team_id = tn.team_id \
               WHERE tn.namespace_id = lists.namespace_id AND tm.user_id = ?1))";

const USER_VISIBLE_NAMESPACE: &str = "(namespaces.owner_id = ?1 \
    OR EXISTS (SELECT 1 FROM users_namespaces un WHERE un.namespace_id = namespaces.id AND un.user_id = ?1) \
    OR EXISTS (SELECT 1 FROM team_namespaces tn JOIN team_members tm ON tm.team_id = tn.team_id \
               WHERE tn.namespace_id = namespaces.id AND tm.user_id = ?1))";

impl Visibility {
    pub fn of(p: &Principal) -> Self {
        match p {
            Principal::User(user) => Visibility::User(user.id),
            Principal::LinkShare(share) => Visibility::LinkShare(share.list_id),
        }
    }

    /// Value to bind as `?1`.
    pub fn param(&self) -> i64 {
        match *self {
            Visibility::User(id) | Visibility::LinkShare(id) => id,
        }
    }

    /// Predicate over `lists` (with `namespaces` left-joined on
    /// `lists.namespace_id`) using `?1`.
    pub fn list_predicate(&self) -> &'static str {
        match self {
            Visibility::User(_) => USER_VISIBLE_LIST,
            Visibility::LinkShare(_) => "(lists.id = ?1)",
        }
    }

    /// Predicate over `namespaces` using `?1`. Link shares see none.
    pub fn namespace_predicate(&self) -> &'static str {
        match self {
            Visibility::User(_) => USER_VISIBLE_NAMESPACE,
            Visibility::LinkShare(_) => "(0 = ?1 AND 0)",
        }
    }
}
