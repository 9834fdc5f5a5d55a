//! The resource API under `/api/v1`.

use serde::Serialize;

use crate::models::sharing::{ListUser, NamespaceUser, TeamList, TeamNamespace};
use crate::models::{
    BulkTask, Label, LabelTask, LinkShare, List, Namespace, Task, TaskAssignee, TaskUpdate, Team,
    TeamMember,
};
use crate::module::Module;
use crate::response::{self, HttpResponse};
use crate::router::{Context, Router};
use crate::web::{create, delete, read_all, read_one, update};
use crate::{Error, Result, auth, db};

/// Every resource kind, wired to the generic handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Api;

impl Module for Api {
    fn name(&self) -> &'static str {
        "api"
    }

    fn routes(&self, r: &mut Router) {
        r.get("/api/v1/namespaces", read_all::<Namespace>);
        r.put("/api/v1/namespaces", create::<Namespace>);
        r.get("/api/v1/namespaces/{namespace}", read_one::<Namespace>);
        r.post("/api/v1/namespaces/{namespace}", update::<Namespace>);
        r.delete("/api/v1/namespaces/{namespace}", delete::<Namespace>);
        r.get("/api/v1/namespaces/{namespace}/lists", read_all::<List>);
        r.put("/api/v1/namespaces/{namespace}/lists", create::<List>);

        r.get("/api/v1/namespaces/{namespace}/teams", read_all::<TeamNamespace>);
        r.put("/api/v1/namespaces/{namespace}/teams", create::<TeamNamespace>);
        r.post("/api/v1/namespaces/{namespace}/teams/{team}", update::<TeamNamespace>);
        r.delete("/api/v1/namespaces/{namespace}/teams/{team}", delete::<TeamNamespace>);
        r.get("/api/v1/namespaces/{namespace}/users", read_all::<NamespaceUser>);
        r.put("/api/v1/namespaces/{namespace}/users", create::<NamespaceUser>);
        r.post("/api/v1/namespaces/{namespace}/users/{user}", update::<NamespaceUser>);
        r.delete("/api/v1/namespaces/{namespace}/users/{user}", delete::<NamespaceUser>);

        r.get("/api/v1/lists", read_all::<List>);
        r.get("/api/v1/lists/{list}", read_one::<List>);
        r.post("/api/v1/lists/{list}", update::<List>);
        r.delete("/api/v1/lists/{list}", delete::<List>);
        r.get("/api/v1/lists/{list}/tasks", read_all::<Task>);
        r.put("/api/v1/lists/{list}/tasks", create::<Task>);

        r.get("/api/v1/lists/{list}/teams", read_all::<TeamList>);
        r.put("/api/v1/lists/{list}/teams", create::<TeamList>);
        r.post("/api/v1/lists/{list}/teams/{team}", update::<TeamList>);
        r.delete("/api/v1/lists/{list}/teams/{team}", delete::<TeamList>);
        r.get("/api/v1/lists/{list}/users", read_all::<ListUser>);
        r.put("/api/v1/lists/{list}/users", create::<ListUser>);
        r.post("/api/v1/lists/{list}/users/{user}", update::<ListUser>);
        r.delete("/api/v1/lists/{list}/users/{user}", delete::<ListUser>);

        r.get("/api/v1/lists/{list}/shares", read_all::<LinkShare>);
        r.put("/api/v1/lists/{list}/shares", create::<LinkShare>);
        r.get("/api/v1/lists/{list}/shares/{share}", read_one::<LinkShare>);
        r.delete("/api/v1/lists/{list}/shares/{share}", delete::<LinkShare>);
        r.post("/api/v1/shares/{hash}/auth", share_auth);

        r.get("/api/v1/tasks/all", read_all::<Task>);
        r.post("/api/v1/tasks/bulk", update::<BulkTask>);
        r.get("/api/v1/tasks/{task}", read_one::<Task>);
        r.post("/api/v1/tasks/{task}", update::<TaskUpdate>);
        r.delete("/api/v1/tasks/{task}", delete::<Task>);
        r.get("/api/v1/tasks/{task}/assignees", read_all::<TaskAssignee>);
        r.put("/api/v1/tasks/{task}/assignees", create::<TaskAssignee>);
        r.delete("/api/v1/tasks/{task}/assignees/{user}", delete::<TaskAssignee>);
        r.get("/api/v1/tasks/{task}/labels", read_all::<LabelTask>);
        r.put("/api/v1/tasks/{task}/labels", create::<LabelTask>);
        r.delete("/api/v1/tasks/{task}/labels/{label}", delete::<LabelTask>);

        r.get("/api/v1/labels", read_all::<Label>);
        r.put("/api/v1/labels", create::<Label>);
        r.get("/api/v1/labels/{label}", read_one::<Label>);
        r.post("/api/v1/labels/{label}", update::<Label>);
        r.delete("/api/v1/labels/{label}", delete::<Label>);

        r.get("/api/v1/teams", read_all::<Team>);
        r.put("/api/v1/teams", create::<Team>);
        r.get("/api/v1/teams/{team}", read_one::<Team>);
        r.post("/api/v1/teams/{team}", update::<Team>);
        r.delete("/api/v1/teams/{team}", delete::<Team>);
        r.get("/api/v1/teams/{team}/members", read_all::<TeamMember>);
        r.put("/api/v1/teams/{team}/members", create::<TeamMember>);
        r.post("/api/v1/teams/{team}/members/{user}", update::<TeamMember>);
        r.delete("/api/v1/teams/{team}/members/{user}", delete::<TeamMember>);
    }
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
}

/// Exchange a share hash for a token acting as that link share.
async fn share_auth(ctx: Context) -> Result<HttpResponse> {
    let conn = ctx.connection()?;
    let share = match LinkShare::by_hash(&conn, ctx.require_param("hash")?).await {
        Ok(share) => share,
        Err(Error::NotFound(_)) => return Err(Error::Unauthorized),
        Err(e) => return Err(e),
    };
    if share.is_expired(db::now()) {
        return Err(Error::TokenExpired);
    }

    let token = auth::create_link_share_token(&ctx.config.auth, &share)?;
    tracing::debug!(share = share.id, list = share.list_id, "link share authenticated");
    response::ok(&TokenResponse { token })
}
