//! Shared setup: one migrated in-memory database per test.

use taskgate::crud::Session;
use taskgate::db::{self, DbConnection, Db};
use taskgate::handler;
use taskgate::metrics::Counters;
use taskgate::models::{LinkShare, List, Namespace, Task, Team, TeamList, TeamMember, User};
use taskgate::{Principal, SharingRight};

pub struct Fixture {
    _db: Db,
    pub conn: DbConnection,
    pub metrics: Counters,
}

impl Fixture {
    pub async fn new() -> Self {
        let database = db::connect(":memory:").await.unwrap();
        let conn = db::connection(&database).unwrap();
        db::migrate(&conn).await.unwrap();
        Self {
            _db: database,
            conn,
            metrics: Counters::new(),
        }
    }

    pub fn session(&self) -> Session<'_> {
        Session::new(&self.conn, &self.metrics)
    }

    pub async fn user(&self, username: &str) -> Principal {
        let user = User::create(&self.conn, username, &format!("{username}@example.com"))
            .await
            .unwrap();
        Principal::User(user)
    }

    pub async fn namespace(&self, owner: &Principal, name: &str) -> Namespace {
        let namespace = Namespace {
            name: name.to_string(),
            ..Default::default()
        };
        handler::create(&self.session(), owner, namespace).await.unwrap()
    }

    pub async fn list(&self, owner: &Principal, namespace_id: i64, title: &str) -> List {
        let list = List {
            title: title.to_string(),
            namespace_id,
            ..Default::default()
        };
        handler::create(&self.session(), owner, list).await.unwrap()
    }

    /// A namespace with one list in it, both owned by `owner`.
    pub async fn project(&self, owner: &Principal, title: &str) -> List {
        let namespace = self.namespace(owner, &format!("{title} space")).await;
        self.list(owner, namespace.id, title).await
    }

    pub async fn task(&self, p: &Principal, list_id: i64, title: &str) -> Task {
        let task = Task {
            title: title.to_string(),
            list_id,
            ..Default::default()
        };
        handler::create(&self.session(), p, task).await.unwrap()
    }

    pub async fn team(&self, creator: &Principal, name: &str) -> Team {
        let team = Team {
            name: name.to_string(),
            ..Default::default()
        };
        handler::create(&self.session(), creator, team).await.unwrap()
    }

    pub async fn add_member(&self, admin: &Principal, team_id: i64, member: &Principal, is_admin: bool) {
        let member = TeamMember {
            team_id,
            username: member.user().unwrap().username.clone(),
            admin: is_admin,
            ..Default::default()
        };
        handler::create(&self.session(), admin, member).await.unwrap();
    }

    pub async fn share_list_with_team(
        &self,
        admin: &Principal,
        list_id: i64,
        team_id: i64,
        right: SharingRight,
    ) {
        handler::create(&self.session(), admin, TeamList::new(list_id, team_id, right))
            .await
            .unwrap();
    }

    /// A link share on `list_id` and the principal acting through it.
    pub async fn link_share(&self, admin: &Principal, list_id: i64, right: SharingRight) -> Principal {
        let share = LinkShare {
            list_id,
            right,
            ..Default::default()
        };
        let share = handler::create(&self.session(), admin, share).await.unwrap();
        Principal::LinkShare(share)
    }

    pub async fn rows(&self, sql: &str, id: i64) -> i64 {
        db::count(&self.conn, sql, db::params![id]).await.unwrap()
    }
}
