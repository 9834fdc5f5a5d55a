//! Link shares: access to one list through a shared token.

use jiff::Timestamp;
use libsql::{Connection, Row, params};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

use crate::crud::{Crud, Listing, Rights, Session};
use crate::pagination::Pagination;
use crate::permission::{Right, SharingRight};
use crate::principal::Principal;
use crate::rights;
use crate::{Error, Result, db};

const HASH_LENGTH: usize = 40;

const COLUMNS: &str = "id, hash, list_id, permission, shared_by_id, expires, created, updated";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkShare {
    #[serde(skip_deserializing)]
    pub id: i64,
    /// Token identifying the share in links.
    #[serde(skip_deserializing)]
    pub hash: String,
    #[serde(skip_deserializing)]
    pub list_id: i64,
    /// Ceiling for principals using this share. Admin is refused.
    pub right: SharingRight,
    #[serde(skip_deserializing)]
    pub shared_by_id: i64,
    /// After this instant the share no longer authenticates.
    pub expires: Option<Timestamp>,
    #[serde(skip_deserializing)]
    pub created: Timestamp,
    #[serde(skip_deserializing)]
    pub updated: Timestamp,
}

impl LinkShare {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: db::int(row, 0)?,
            hash: db::text(row, 1)?,
            list_id: db::int(row, 2)?,
            right: SharingRight::from_code(db::int(row, 3)?)?,
            shared_by_id: db::int(row, 4)?,
            expires: db::optional_time(row, 5)?,
            created: db::time(row, 6)?,
            updated: db::time(row, 7)?,
        })
    }

    pub async fn by_id(conn: &Connection, id: i64) -> Result<LinkShare> {
        let sql = format!("SELECT {COLUMNS} FROM link_sharing WHERE id = ?1");
        let mut rows = conn.query(&sql, params![id]).await?;
        match rows.next().await? {
            Some(row) => Self::from_row(&row),
            None => Err(Error::NotFound(format!("link share {id}"))),
        }
    }

    pub async fn by_hash(conn: &Connection, hash: &str) -> Result<LinkShare> {
        let sql = format!("SELECT {COLUMNS} FROM link_sharing WHERE hash = ?1");
        let mut rows = conn.query(&sql, params![hash]).await?;
        match rows.next().await? {
            Some(row) => Self::from_row(&row),
            None => Err(Error::NotFound("link share".to_string())),
        }
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    async fn admin_on_list(&self, conn: &Connection, p: &Principal) -> Result<bool> {
        if p.user().is_none() {
            return Ok(false);
        }
        Ok(rights::list_right(conn, p, self.list_id).await? == Right::Admin)
    }
}

fn new_hash() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(HASH_LENGTH)
        .map(char::from)
        .collect()
}

impl Crud for LinkShare {
    const KIND: &'static str = "link share";
    type Item = LinkShare;

    async fn create(&mut self, s: &Session<'_>, p: &Principal) -> Result<()> {
        let user = p.require_user(Self::KIND, "create")?;
        if self.right == SharingRight::Admin {
            return Err(Error::Validation(
                "link shares can only grant read or write access".into(),
            ));
        }
        let now = db::now();
        if self.is_expired(now) {
            return Err(Error::Validation("expiry must lie in the future".into()));
        }

        self.hash = new_hash();
        self.shared_by_id = user.id;
        self.created = now;
        self.updated = now;
        s.conn
            .execute(
                "INSERT INTO link_sharing \
                 (hash, list_id, permission, shared_by_id, expires, created, updated) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    self.hash.as_str(),
                    self.list_id,
                    self.right.code(),
                    self.shared_by_id,
                    db::optional_seconds(self.expires),
                    now.as_second()
                ],
            )
            .await?;
        self.id = s.conn.last_insert_rowid();
        Ok(())
    }

    async fn read_one(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        let share = Self::by_id(s.conn, self.id).await?;
        if share.list_id != self.list_id {
            return Err(Error::NotFound(format!("link share {}", self.id)));
        }
        *self = share;
        Ok(())
    }

    async fn read_all(
        &self,
        s: &Session<'_>,
        p: &Principal,
        search: &str,
        page: Pagination,
    ) -> Result<Listing<LinkShare>> {
        if !self.admin_on_list(s.conn, p).await? {
            return Err(Error::forbidden(Self::KIND, "list"));
        }

        let pattern = db::like_pattern(search);
        let total = db::count(
            s.conn,
            "SELECT COUNT(*) FROM link_sharing WHERE list_id = ?1 AND hash LIKE ?2 ESCAPE '\\'",
            params![self.list_id, pattern.as_str()],
        )
        .await?;

        let (limit, offset) = page.limit_offset();
        let sql = format!(
            "SELECT {COLUMNS} FROM link_sharing WHERE list_id = ?1 AND hash LIKE ?2 ESCAPE '\\' \
             ORDER BY id LIMIT ?3 OFFSET ?4"
        );
        let mut rows = s
            .conn
            .query(&sql, params![self.list_id, pattern.as_str(), limit, offset])
            .await?;
        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(Self::from_row(&row)?);
        }
        Ok(Listing::new(items, total))
    }

    async fn delete(&mut self, s: &Session<'_>, _p: &Principal) -> Result<()> {
        let removed = s
            .conn
            .execute(
                "DELETE FROM link_sharing WHERE id = ?1 AND list_id = ?2",
                params![self.id, self.list_id],
            )
            .await?;
        if removed == 0 {
            return Err(Error::NotFound(format!("link share {}", self.id)));
        }
        Ok(())
    }
}

impl Rights for LinkShare {
    async fn can_create(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        self.admin_on_list(s.conn, p).await
    }

    async fn can_read(&mut self, s: &Session<'_>, p: &Principal) -> Result<(bool, Right)> {
        let admin = self.admin_on_list(s.conn, p).await?;
        Ok((admin, if admin { Right::Admin } else { Right::None }))
    }

    async fn can_delete(&mut self, s: &Session<'_>, p: &Principal) -> Result<bool> {
        self.admin_on_list(s.conn, p).await
    }
}
