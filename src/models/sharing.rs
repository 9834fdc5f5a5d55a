//! Sharing a container with a team or a single user.
//!
//! [`TeamShare`] and [`UserShare`] are written once and instantiated for
//! lists and namespaces through their [`Container`] scope. Managing shares
//! needs admin on the container; reading them needs read.

use std::marker::PhantomData;

use jiff::Timestamp;
use libsql::params;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::crud::{Crud, Listing, Rights, Session};
use crate::models::team::{self, Team};
use crate::models::user::{self, User};
use crate::pagination::Pagination;
use crate::permission::{Right, SharingRight};
use crate::principal::Principal;
use crate::rights::{Container, ListScope, NamespaceScope};
use crate::{Error, Result, db};

pub type TeamList = TeamShare<ListScope>;
pub type TeamNamespace = TeamShare<NamespaceScope>;
pub type ListUser = UserShare<ListScope>;
pub type NamespaceUser = UserShare<NamespaceScope>;

/// A team's grant on a container.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, bound = "")]
pub struct TeamShare<C: Container> {
    #[serde(skip)]
    pub id: i64,
    pub team_id: i64,
    /// The list or namespace shared.
    #[serde(skip)]
    pub container_id: i64,
    pub right: SharingRight,
    #[serde(skip)]
    pub created: Timestamp,
    #[serde(skip)]
    pub updated: Timestamp,
    #[serde(skip)]
    _scope: PhantomData<C>,
}

/// A user's grant on a container. The user is named by username.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, bound = "")]
pub struct UserShare<C: Container> {
    #[serde(skip)]
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub user_id: i64,
    #[serde(skip)]
    pub container_id: i64,
    pub right: SharingRight,
    #[serde(skip)]
    pub created: Timestamp,
    #[serde(skip)]
    pub updated: Timestamp,
    #[serde(skip)]
    _scope: PhantomData<C>,
}

/// A team as listed on a container, with its grant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedTeam {
    #[serde(flatten)]
    pub team: Team,
    pub right: SharingRight,
}

/// A user as listed on a container, with their grant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedUser {
    #[serde(flatten)]
    pub user: User,
    pub right: SharingRight,
}

impl<C: Container> TeamShare<C> {
    pub fn new(container_id: i64, team_id: i64, right: SharingRight) -> Self {
        Self {
            team_id,
            container_id,
            right,
            ..Default::default()
        }
    }
}

impl<C: Container> UserShare<C> {
    pub fn new(container_id: i64, username: impl Into<String>, right: SharingRight) -> Self {
        Self {
            username: username.into(),
            container_id,
            right,
            ..Default::default()
        }
    }
}

impl<C: Container> Serialize for TeamShare<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TeamShare", 6)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("team_id", &self.team_id)?;
        state.serialize_field(C::ID_COLUMN, &self.container_id)?;
        state.serialize_field("right", &self.right)?;
        state.serialize_field("created", &self.created)?;
        state.serialize_field("updated", &self.updated)?;
        state.end()
    }
}

impl<C: Container> Serialize for UserShare<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("UserShare", 7)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("username", &self.username)?;
        state.serialize_field("user_id", &self.user_id)?;
        state.serialize_field(C::ID_COLUMN, &self.container_id)?;
        state.serialize_field("right", &self.right)?;
        state.serialize_field("created", &self.created)?;
        state.serialize_field("updated", &self.updated)?;
        state.end()
    }
}

/// Admin on the container, held by a user.
async fn manages<C: Container>(s: &Session<'_>, p: &Principal, container_id: i64) -> Result<bool> {
    if p.user().is_none() {
        return Ok(false);
    }
    Ok(C::right(s.conn, p, container_id).await? == Right::Admin)
}

fn take_page<T>(items: Vec<T>, page: Pagination) -> Vec<T> {
    let (limit, offset) = page.limit_offset();
    items
        .into_iter()
        .skip(offset as usize)
        .take(if limit < 0 { usize::MAX } else { limit as usize })
        .collect()
}

impl<C: Container> Crud for TeamShare<C> {
    const KIND: &'static str = "team share";
    type Item = SharedTeam;

    async fn create(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        Team::by_id(s.conn, self.team_id).await?;

        let present = db::exists(
            s.conn,
            &format!(
                "SELECT 1 FROM {} WHERE team_id = ?1 AND {} = ?2",
                C::TEAM_TABLE,
                C::ID_COLUMN
            ),
            params![self.team_id, self.container_id],
        )
        .await?;
        if present {
            return Err(Error::Conflict(format!(
                "team already has access to this {}",
                C::KIND
            )));
        }

        let now = db::now();
        s.conn
            .execute(
                &format!(
                    "INSERT INTO {} (team_id, {}, permission, created, updated) \
                     VALUES (?1, ?2, ?3, ?4, ?4)",
                    C::TEAM_TABLE,
                    C::ID_COLUMN
                ),
                params![
                    self.team_id,
                    self.container_id,
                    self.right.code(),
                    now.as_second()
                ],
            )
            .await?;
        self.id = s.conn.last_insert_rowid();
        self.created = now;
        self.updated = now;
        Ok(())
    }

    async fn read_all(
        &self,
        s: &Session<'_>,
        p: &Principal,
        search: &str,
        page: Pagination,
    ) -> Result<Listing<SharedTeam>> {
        if C::right(s.conn, p, self.container_id).await? < Right::Read {
            return Err(Error::forbidden(Self::KIND, "list"));
        }

        let sql = format!(
            "SELECT {}, g.permission FROM {} g JOIN teams ON teams.id = g.team_id \
             WHERE g.{} = ?1 AND teams.search_key LIKE ?2 ESCAPE '\\' ORDER BY g.id",
            team::COLUMNS,
            C::TEAM_TABLE,
            C::ID_COLUMN
        );
        let pattern = db::like_pattern(search);
        let mut rows = s
            .conn
            .query(&sql, params![self.container_id, pattern.as_str()])
            .await?;
        let mut shared = Vec::new();
        while let Some(row) = rows.next().await? {
            shared.push(SharedTeam {
                team: Team::from_row(&row)?,
                right: SharingRight::from_code(db::int(&row, 6)?)?,
            });
        }
        let total = shared.len() as i64;
        Ok(Listing::new(take_page(shared, page), total))
    }

    async fn update(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        let now = db::now();
        let changed = s
            .conn
            .execute(
                &format!(
                    "UPDATE {} SET permission = ?1, updated = ?2 WHERE team_id = ?3 AND {} = ?4",
                    C::TEAM_TABLE,
                    C::ID_COLUMN
                ),
                params![
                    self.right.code(),
                    now.as_second(),
                    self.team_id,
                    self.container_id
                ],
            )
            .await?;
        if changed == 0 {
            return Err(Error::NotFound(format!(
                "team {} on {} {}",
                self.team_id,
                C::KIND,
                self.container_id
            )));
        }
        self.updated = now;
        Ok(())
    }

    async fn delete(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        let removed = s
            .conn
            .execute(
                &format!(
                    "DELETE FROM {} WHERE team_id = ?1 AND {} = ?2",
                    C::TEAM_TABLE,
                    C::ID_COLUMN
                ),
                params![self.team_id, self.container_id],
            )
            .await?;
        if removed == 0 {
            return Err(Error::NotFound(format!(
                "team {} on {} {}",
                self.team_id,
                C::KIND,
                self.container_id
            )));
        }
        Ok(())
    }
}

impl<C: Container> Rights for TeamShare<C> {
    async fn can_create(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        manages::<C>(s, p, self.container_id).await
    }

    async fn can_update(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        manages::<C>(s, p, self.container_id).await
    }

    async fn can_delete(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        manages::<C>(s, p, self.container_id).await
    }
}

impl<C: Container> Crud for UserShare<C> {
    const KIND: &'static str = "user share";
    type Item = SharedUser;

    async fn create(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        let user = User::by_username(s.conn, &self.username).await?;

        let present = db::exists(
            s.conn,
            &format!(
                "SELECT 1 FROM {} WHERE user_id = ?1 AND {} = ?2",
                C::USER_TABLE,
                C::ID_COLUMN
            ),
            params![user.id, self.container_id],
        )
        .await?;
        if present {
            return Err(Error::Conflict(format!(
                "user already has access to this {}",
                C::KIND
            )));
        }

        let now = db::now();
        s.conn
            .execute(
                &format!(
                    "INSERT INTO {} (user_id, {}, permission, created, updated) \
                     VALUES (?1, ?2, ?3, ?4, ?4)",
                    C::USER_TABLE,
                    C::ID_COLUMN
                ),
                params![
                    user.id,
                    self.container_id,
                    self.right.code(),
                    now.as_second()
                ],
            )
            .await?;
        self.id = s.conn.last_insert_rowid();
        self.user_id = user.id;
        self.created = now;
        self.updated = now;
        Ok(())
    }

    async fn read_all(
        &self,
        s: &Session<'_>,
        p: &Principal,
        search: &str,
        page: Pagination,
    ) -> Result<Listing<SharedUser>> {
        if C::right(s.conn, p, self.container_id).await? < Right::Read {
            return Err(Error::forbidden(Self::KIND, "list"));
        }

        let sql = format!(
            "SELECT {}, g.permission FROM {} g JOIN users ON users.id = g.user_id \
             WHERE g.{} = ?1 AND users.search_key LIKE ?2 ESCAPE '\\' ORDER BY g.id",
            user::COLUMNS,
            C::USER_TABLE,
            C::ID_COLUMN
        );
        let pattern = db::like_pattern(search);
        let mut rows = s
            .conn
            .query(&sql, params![self.container_id, pattern.as_str()])
            .await?;
        let mut shared = Vec::new();
        while let Some(row) = rows.next().await? {
            shared.push(SharedUser {
                user: User::from_row(&row)?,
                right: SharingRight::from_code(db::int(&row, 5)?)?,
            });
        }
        let total = shared.len() as i64;
        Ok(Listing::new(take_page(shared, page), total))
    }

    async fn update(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        let user = User::by_username(s.conn, &self.username).await?;
        let now = db::now();
        let changed = s
            .conn
            .execute(
                &format!(
                    "UPDATE {} SET permission = ?1, updated = ?2 WHERE user_id = ?3 AND {} = ?4",
                    C::USER_TABLE,
                    C::ID_COLUMN
                ),
                params![
                    self.right.code(),
                    now.as_second(),
                    user.id,
                    self.container_id
                ],
            )
            .await?;
        if changed == 0 {
            return Err(Error::NotFound(format!(
                "{} on {} {}",
                self.username,
                C::KIND,
                self.container_id
            )));
        }
        self.user_id = user.id;
        self.updated = now;
        Ok(())
    }

    async fn delete(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        let user = User::by_username(s.conn, &self.username).await?;
        let removed = s
            .conn
            .execute(
                &format!(
                    "DELETE FROM {} WHERE user_id = ?1 AND {} = ?2",
                    C::USER_TABLE,
                    C::ID_COLUMN
                ),
                params![user.id, self.container_id],
            )
            .await?;
        if removed == 0 {
            return Err(Error::NotFound(format!(
                "{} on {} {}",
                self.username,
                C::KIND,
                self.container_id
            )));
        }
        Ok(())
    }
}

impl<C: Container> Rights for UserShare<C> {
    async fn can_create(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        manages::<C>(s, p, self.container_id).await
    }

    async fn can_update(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        manages::<C>(s, p, self.container_id).await
    }

    async fn can_delete(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        manages::<C>(s, p, self.container_id).await
    }
}
