use taskgate::handler;
use taskgate::models::{List, ListUser, Namespace, NamespaceUser, Task, TeamNamespace};
use taskgate::pagination::Pagination;
use taskgate::rights::{list_right, namespace_right, task_right};
use taskgate::{Error, Right, SharingRight};

use crate::fixtures::Fixture;

#[tokio::test]
async fn owner_holds_admin_down_the_hierarchy() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let list = fx.project(&ana, "Groceries").await;
    let task = fx.task(&ana, list.id, "milk").await;

    assert_eq!(list_right(&fx.conn, &ana, list.id).await.unwrap(), Right::Admin);
    assert_eq!(
        namespace_right(&fx.conn, &ana, list.namespace_id).await.unwrap(),
        Right::Admin
    );
    assert_eq!(task_right(&fx.conn, &ana, task.id).await.unwrap(), Right::Admin);
}

#[tokio::test]
async fn stranger_holds_nothing() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let bob = fx.user("bob").await;
    let list = fx.project(&ana, "Groceries").await;
    let task = fx.task(&ana, list.id, "milk").await;

    assert_eq!(list_right(&fx.conn, &bob, list.id).await.unwrap(), Right::None);
    assert_eq!(task_right(&fx.conn, &bob, task.id).await.unwrap(), Right::None);

    let err = handler::read_one(&fx.session(), &bob, Task { id: task.id, ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));

    let err = handler::delete(&fx.session(), &bob, List { id: list.id, ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));
}

#[tokio::test]
async fn missing_resource_is_not_found() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;

    let err = list_right(&fx.conn, &ana, 404).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    let err = handler::read_one(&fx.session(), &ana, Task { id: 404, ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn namespace_grant_reaches_its_lists() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let bob = fx.user("bob").await;
    let list = fx.project(&ana, "Groceries").await;

    handler::create(
        &fx.session(),
        &ana,
        NamespaceUser::new(list.namespace_id, "bob", SharingRight::Write),
    )
    .await
    .unwrap();

    assert_eq!(list_right(&fx.conn, &bob, list.id).await.unwrap(), Right::Write);
    let (_, max) = handler::read_one(&fx.session(), &bob, List { id: list.id, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(max, Right::Write);
}

#[tokio::test]
async fn list_grant_outranks_lower_namespace_grant() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let bob = fx.user("bob").await;
    let list = fx.project(&ana, "Groceries").await;

    handler::create(
        &fx.session(),
        &ana,
        NamespaceUser::new(list.namespace_id, "bob", SharingRight::Read),
    )
    .await
    .unwrap();
    handler::create(&fx.session(), &ana, ListUser::new(list.id, "bob", SharingRight::Admin))
        .await
        .unwrap();

    assert_eq!(list_right(&fx.conn, &bob, list.id).await.unwrap(), Right::Admin);
    assert_eq!(
        namespace_right(&fx.conn, &bob, list.namespace_id).await.unwrap(),
        Right::Read
    );
}

#[tokio::test]
async fn team_write_grant_is_admin_for_admin_members() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let bob = fx.user("bob").await;
    let cy = fx.user("cy").await;
    let list = fx.project(&ana, "Roadmap").await;
    let team = fx.team(&ana, "Ops").await;
    fx.add_member(&ana, team.id, &bob, true).await;
    fx.add_member(&ana, team.id, &cy, false).await;
    fx.share_list_with_team(&ana, list.id, team.id, SharingRight::Write).await;

    assert_eq!(list_right(&fx.conn, &bob, list.id).await.unwrap(), Right::Admin);
    assert_eq!(list_right(&fx.conn, &cy, list.id).await.unwrap(), Right::Write);
}

#[tokio::test]
async fn team_namespace_grant_is_inherited() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let bob = fx.user("bob").await;
    let list = fx.project(&ana, "Roadmap").await;
    let team = fx.team(&ana, "Ops").await;
    fx.add_member(&ana, team.id, &bob, false).await;

    handler::create(
        &fx.session(),
        &ana,
        TeamNamespace::new(list.namespace_id, team.id, SharingRight::Read),
    )
    .await
    .unwrap();

    assert_eq!(list_right(&fx.conn, &bob, list.id).await.unwrap(), Right::Read);
    let err = handler::update(
        &fx.session(),
        &bob,
        List { id: list.id, title: "Renamed".into(), ..Default::default() },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));
}

#[tokio::test]
async fn link_share_is_capped_and_scoped() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let list = fx.project(&ana, "Groceries").await;
    let other = fx.list(&ana, list.namespace_id, "Hardware").await;
    let share = fx.link_share(&ana, list.id, SharingRight::Write).await;

    assert_eq!(list_right(&fx.conn, &share, list.id).await.unwrap(), Right::Write);
    assert_eq!(list_right(&fx.conn, &share, other.id).await.unwrap(), Right::None);
    assert_eq!(
        namespace_right(&fx.conn, &share, list.namespace_id).await.unwrap(),
        Right::None
    );

    // Write is enough to add tasks; the creator is recorded as the share.
    let task = fx.task(&share, list.id, "eggs").await;
    assert_eq!(task_right(&fx.conn, &share, task.id).await.unwrap(), Right::Write);

    let err = handler::delete(&fx.session(), &share, List { id: list.id, ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));
}

#[tokio::test]
async fn listings_only_return_visible_rows() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let bob = fx.user("bob").await;
    let shared = fx.project(&ana, "Shared").await;
    let private = fx.project(&ana, "Private").await;
    fx.task(&ana, shared.id, "visible").await;
    fx.task(&ana, private.id, "hidden").await;

    handler::create(&fx.session(), &ana, ListUser::new(shared.id, "bob", SharingRight::Read))
        .await
        .unwrap();

    let lists = handler::read_all(&fx.session(), &bob, &List::default(), "", Pagination::Disabled)
        .await
        .unwrap();
    let titles: Vec<_> = lists.items.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, ["Shared"]);

    let tasks = handler::read_all(&fx.session(), &bob, &Task::default(), "", Pagination::Disabled)
        .await
        .unwrap();
    let titles: Vec<_> = tasks.items.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["visible"]);

    for item in &tasks.items {
        assert!(task_right(&fx.conn, &bob, item.id).await.unwrap() >= Right::Read);
    }

    // A direct list grant does not expose the namespace itself.
    let namespaces =
        handler::read_all(&fx.session(), &bob, &Namespace::default(), "", Pagination::Disabled)
            .await
            .unwrap();
    assert!(namespaces.items.is_empty());
}

#[tokio::test]
async fn revoked_grant_takes_effect_immediately() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let bob = fx.user("bob").await;
    let list = fx.project(&ana, "Groceries").await;

    handler::create(&fx.session(), &ana, ListUser::new(list.id, "bob", SharingRight::Write))
        .await
        .unwrap();
    assert_eq!(list_right(&fx.conn, &bob, list.id).await.unwrap(), Right::Write);

    handler::delete(&fx.session(), &ana, ListUser::new(list.id, "bob", SharingRight::Write))
        .await
        .unwrap();
    assert_eq!(list_right(&fx.conn, &bob, list.id).await.unwrap(), Right::None);
}
