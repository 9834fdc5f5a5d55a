//! Team membership.
//!
//! Clients name the member by username. The stored row only carries the
//! numeric user id, resolved here, so no payload can smuggle in an id.

use jiff::Timestamp;
use libsql::{Connection, params};
use serde::{Deserialize, Serialize};

use crate::crud::{Crud, Listing, Rights, Session};
use crate::models::team::{self, TeamUser};
use crate::models::user::User;
use crate::pagination::Pagination;
use crate::permission::Right;
use crate::principal::Principal;
use crate::rights;
use crate::{Error, Result, db};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamMember {
    #[serde(skip_deserializing)]
    pub id: i64,
    #[serde(skip_deserializing)]
    pub team_id: i64,
    pub username: String,
    #[serde(skip)]
    pub user_id: i64,
    pub admin: bool,
    #[serde(skip_deserializing)]
    pub created: Timestamp,
}

/// Insert a membership row. Fails with `Conflict` if the user already belongs
/// to the team.
pub(crate) async fn insert(conn: &Connection, team_id: i64, user_id: i64, admin: bool) -> Result<i64> {
    let present = db::exists(
        conn,
        "SELECT 1 FROM team_members WHERE team_id = ?1 AND user_id = ?2",
        params![team_id, user_id],
    )
    .await?;
    if present {
        return Err(Error::Conflict("user is already a member of this team".into()));
    }

    conn.execute(
        "INSERT INTO team_members (team_id, user_id, admin, created) VALUES (?1, ?2, ?3, ?4)",
        params![team_id, user_id, i64::from(admin), db::now().as_second()],
    )
    .await?;
    Ok(conn.last_insert_rowid())
}

async fn admin_count(conn: &Connection, team_id: i64) -> Result<i64> {
    db::count(
        conn,
        "SELECT COUNT(*) FROM team_members WHERE team_id = ?1 AND admin = 1",
        params![team_id],
    )
    .await
}

impl TeamMember {
    /// Resolve the username into the stored membership row.
    async fn load(&mut self, conn: &Connection) -> Result<()> {
        let user = User::by_username(conn, &self.username).await?;
        let mut rows = conn
            .query(
                "SELECT id, admin, created FROM team_members WHERE team_id = ?1 AND user_id = ?2",
                params![self.team_id, user.id],
            )
            .await?;
        let row = rows.next().await?.ok_or_else(|| {
            Error::NotFound(format!("{} in team {}", self.username, self.team_id))
        })?;
        self.user_id = user.id;
        self.id = db::int(&row, 0)?;
        self.admin = db::flag(&row, 1)?;
        self.created = db::time(&row, 2)?;
        Ok(())
    }
}

impl Crud for TeamMember {
    const KIND: &'static str = "team member";
    type Item = TeamUser;

    async fn create(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        let user = User::by_username(s.conn, &self.username).await?;
        self.id = insert(s.conn, self.team_id, user.id, self.admin).await?;
        self.user_id = user.id;
        self.created = db::now();
        Ok(())
    }

    async fn read_all(
        &self,
        s: &Session<'_>,
        p: &Principal,
        search: &str,
        page: Pagination,
    ) -> Result<Listing<TeamUser>> {
        if rights::team_right(s.conn, p, self.team_id).await? < Right::Read {
            return Err(Error::forbidden(Self::KIND, "list"));
        }

        let needle = search.to_lowercase();
        let members: Vec<TeamUser> = team::members_of(s.conn, self.team_id)
            .await?
            .into_iter()
            .filter(|member| member.user.username.to_lowercase().contains(&needle))
            .collect();
        let total = members.len() as i64;

        let (limit, offset) = page.limit_offset();
        let items = members
            .into_iter()
            .skip(offset as usize)
            .take(if limit < 0 { usize::MAX } else { limit as usize })
            .collect();
        Ok(Listing::new(items, total))
    }

    /// Toggle the member's admin flag.
    async fn update(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        self.load(s.conn).await?;
        if self.admin && admin_count(s.conn, self.team_id).await? <= 1 {
            return Err(Error::Validation(
                "cannot demote the last admin of a team".into(),
            ));
        }

        self.admin = !self.admin;
        s.conn
            .execute(
                "UPDATE team_members SET admin = ?1 WHERE id = ?2",
                params![i64::from(self.admin), self.id],
            )
            .await?;
        Ok(())
    }

    async fn delete(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        self.load(s.conn).await?;
        if self.admin && admin_count(s.conn, self.team_id).await? <= 1 {
            return Err(Error::Validation(
                "cannot remove the last admin of a team".into(),
            ));
        }

        s.conn
            .execute("DELETE FROM team_members WHERE id = ?1", params![self.id])
            .await?;
        Ok(())
    }
}

impl Rights for TeamMember {
    async fn can_create(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        Ok(rights::team_right(s.conn, p, self.team_id).await? == Right::Admin)
    }

    async fn can_update(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        self.can_create(s, p).await
    }

    async fn can_delete(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        self.can_create(s, p).await
    }
}
