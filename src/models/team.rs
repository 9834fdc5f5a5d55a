//! Teams: named groups of users that lists and namespaces can be shared with.

use jiff::Timestamp;
use libsql::{Connection, Row, params};
use serde::{Deserialize, Serialize};

use crate::crud::{Crud, Listing, Rights, Session};
use crate::metrics::{self, CountKey};
use crate::models::team_member;
use crate::models::user::{self, User};
use crate::models::validate_name;
use crate::pagination::Pagination;
use crate::permission::Right;
use crate::principal::Principal;
use crate::rights::{self, Visibility};
use crate::{Error, Result, db};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Team {
    #[serde(skip_deserializing)]
    pub id: i64,
    pub name: String,
    pub description: String,
    #[serde(skip)]
    pub created_by_id: i64,
    /// The user who created this team.
    #[serde(skip_deserializing)]
    pub created_by: Option<User>,
    #[serde(skip_deserializing)]
    pub members: Vec<TeamUser>,
    #[serde(skip_deserializing)]
    pub created: Timestamp,
    #[serde(skip_deserializing)]
    pub updated: Timestamp,
}

/// A user as seen through one team membership.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamUser {
    #[serde(flatten)]
    pub user: User,
    pub admin: bool,
}

pub(crate) const COLUMNS: &str =
    "teams.id, teams.name, teams.description, teams.created_by_id, teams.created, teams.updated";

/// Teams `?1` created or belongs to.
const USER_TEAMS: &str = "(teams.created_by_id = ?1 \
    OR EXISTS (SELECT 1 FROM team_members m WHERE m.team_id = teams.id AND m.user_id = ?1))";

impl Team {
    pub(crate) fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: db::int(row, 0)?,
            name: db::text(row, 1)?,
            description: db::text(row, 2)?,
            created_by_id: db::int(row, 3)?,
            created: db::time(row, 4)?,
            updated: db::time(row, 5)?,
            ..Default::default()
        })
    }

    /// Load a team with its creator and members.
    pub async fn by_id(conn: &Connection, id: i64) -> Result<Team> {
        if id < 1 {
            return Err(Error::NotFound(format!("team {id}")));
        }
        let sql = format!("SELECT {COLUMNS} FROM teams WHERE teams.id = ?1");
        let mut rows = conn.query(&sql, params![id]).await?;
        let mut team = match rows.next().await? {
            Some(row) => Self::from_row(&row)?,
            None => return Err(Error::NotFound(format!("team {id}"))),
        };
        team.load_details(conn).await?;
        Ok(team)
    }

    /// Fill in the creator and member list.
    pub(crate) async fn load_details(&mut self, conn: &Connection) -> Result<()> {
        self.members = members_of(conn, self.id).await?;
        self.created_by = match User::by_id(conn, self.created_by_id).await {
            Ok(user) => Some(user),
            Err(Error::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        Ok(())
    }
}

/// Members of a team in the order they joined.
pub(crate) async fn members_of(conn: &Connection, team_id: i64) -> Result<Vec<TeamUser>> {
    let sql = format!(
        "SELECT {}, team_members.admin FROM team_members \
         JOIN users ON users.id = team_members.user_id \
         WHERE team_members.team_id = ?1 ORDER BY team_members.id",
        user::COLUMNS
    );
    let mut rows = conn.query(&sql, params![team_id]).await?;
    let mut members = Vec::new();
    while let Some(row) = rows.next().await? {
        members.push(TeamUser {
            user: User::from_row(&row)?,
            admin: db::flag(&row, 5)?,
        });
    }
    Ok(members)
}

impl Crud for Team {
    const KIND: &'static str = "team";
    type Item = Team;

    async fn create(&mut self, s: &Session<'_>, p: &Principal) -> Result<()> {
        let doer = p.require_user(Self::KIND, "create")?.clone();
        validate_name("team name", &self.name)?;

        let now = db::now();
        let tx = s.conn.transaction().await?;
        tx.execute(
            "INSERT INTO teams (name, description, created_by_id, created, updated, search_key) \
             VALUES (?1, ?2, ?3, ?4, ?4, ?5)",
            params![
                self.name.as_str(),
                self.description.as_str(),
                doer.id,
                now.as_second(),
                db::search_key(&self.name)
            ],
        )
        .await?;
        let team_id = tx.last_insert_rowid();
        team_member::insert(&tx, team_id, doer.id, true).await?;
        tx.commit().await?;

        self.id = team_id;
        self.created_by_id = doer.id;
        self.created = now;
        self.updated = now;
        self.members = vec![TeamUser {
            user: doer.clone(),
            admin: true,
        }];
        self.created_by = Some(doer);

        metrics::record(s.metrics, CountKey::Teams, 1);
        Ok(())
    }

    async fn read_one(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        *self = Team::by_id(s.conn, self.id).await?;
        Ok(())
    }

    async fn read_all(
        &self,
        s: &Session<'_>,
        p: &Principal,
        search: &str,
        page: Pagination,
    ) -> Result<Listing<Team>> {
        let Visibility::User(user_id) = Visibility::of(p) else {
            return Err(Error::forbidden(Self::KIND, "list"));
        };

        let pattern = db::like_pattern(search);
        let total = db::count(
            s.conn,
            &format!(
                "SELECT COUNT(*) FROM teams WHERE {USER_TEAMS} AND teams.search_key LIKE ?2 ESCAPE '\\'"
            ),
            params![user_id, pattern.as_str()],
        )
        .await?;

        let (limit, offset) = page.limit_offset();
        let sql = format!(
            "SELECT {COLUMNS} FROM teams WHERE {USER_TEAMS} AND teams.search_key LIKE ?2 ESCAPE '\\' \
             ORDER BY teams.id LIMIT ?3 OFFSET ?4"
        );
        let mut rows = s
            .conn
            .query(&sql, params![user_id, pattern.as_str(), limit, offset])
            .await?;
        let mut teams = Vec::new();
        while let Some(row) = rows.next().await? {
            teams.push(Self::from_row(&row)?);
        }
        for team in &mut teams {
            team.load_details(s.conn).await?;
        }
        Ok(Listing::new(teams, total))
    }

    async fn update(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        validate_name("team name", &self.name)?;
        Team::by_id(s.conn, self.id).await?;

        s.conn
            .execute(
                "UPDATE teams SET name = ?1, description = ?2, updated = ?3, search_key = ?5 \
                 WHERE id = ?4",
                params![
                    self.name.as_str(),
                    self.description.as_str(),
                    db::now().as_second(),
                    self.id,
                    db::search_key(&self.name)
                ],
            )
            .await?;

        *self = Team::by_id(s.conn, self.id).await?;
        Ok(())
    }

    async fn delete(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        let tx = s.conn.transaction().await?;
        let removed = tx
            .execute("DELETE FROM teams WHERE id = ?1", params![self.id])
            .await?;
        if removed == 0 {
            return Err(Error::NotFound(format!("team {}", self.id)));
        }
        for table in ["team_members", "team_namespaces", "team_lists"] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE team_id = ?1"),
                params![self.id],
            )
            .await?;
        }
        tx.commit().await?;

        metrics::record(s.metrics, CountKey::Teams, -1);
        Ok(())
    }
}

impl Rights for Team {
    async fn can_create(&mut self, _s: &Session<'_>, p: &Principal) -> Result<bool> {
        Ok(p.user().is_some())
    }

    async fn can_read(&mut self, s: &Session<'_>, p: &Principal) -> Result<(bool, Right)> {
        let right = rights::team_right(s.conn, p, self.id).await?;
        Ok((right >= Right::Read, right))
    }

    async fn can_update(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        self.is_admin(s, p).await
    }

    async fn can_delete(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        self.is_admin(s, p).await
    }

    async fn is_admin(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        Ok(rights::team_right(s.conn, p, self.id).await? == Right::Admin)
    }
}
