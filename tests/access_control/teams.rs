use taskgate::handler;
use taskgate::metrics::CountKey;
use taskgate::models::{Team, TeamMember};
use taskgate::pagination::Pagination;
use taskgate::rights::{list_right, team_right};
use taskgate::{Error, Right, SharingRight};

use crate::fixtures::Fixture;

fn member(team_id: i64, username: &str) -> TeamMember {
    TeamMember {
        team_id,
        username: username.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn creator_becomes_the_only_admin_member() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let team = fx.team(&ana, "Ops").await;

    assert_eq!(team.members.len(), 1);
    assert_eq!(team.members[0].user.username, "ana");
    assert!(team.members[0].admin);
    assert_eq!(team.created_by.as_ref().map(|u| u.id), Some(ana.id()));

    let (stored, max) = handler::read_one(&fx.session(), &ana, Team { id: team.id, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(stored.members.len(), 1);
    assert_eq!(max, Right::Admin);
    assert_eq!(fx.metrics.get(CountKey::Teams), 1);
}

#[tokio::test]
async fn team_names_are_validated() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;

    let err = handler::create(&fx.session(), &ana, Team::default()).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let long = Team {
        name: "x".repeat(251),
        ..Default::default()
    };
    let err = handler::create(&fx.session(), &ana, long).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn link_shares_cannot_use_teams() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let list = fx.project(&ana, "Groceries").await;
    let share = fx.link_share(&ana, list.id, SharingRight::Read).await;

    let err = handler::create(&fx.session(), &share, Team { name: "Ops".into(), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));

    let err = handler::read_all(&fx.session(), &share, &Team::default(), "", Pagination::Disabled)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));
}

#[tokio::test]
async fn members_see_their_teams_only() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let bob = fx.user("bob").await;
    let ops = fx.team(&ana, "Ops").await;
    fx.team(&ana, "Finance").await;
    fx.add_member(&ana, ops.id, &bob, false).await;

    let page = handler::read_all(&fx.session(), &bob, &Team::default(), "", Pagination::Disabled)
        .await
        .unwrap();
    let names: Vec<_> = page.items.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["Ops"]);
    assert_eq!(team_right(&fx.conn, &bob, ops.id).await.unwrap(), Right::Read);

    let err = handler::update(
        &fx.session(),
        &bob,
        Team { id: ops.id, name: "Taken over".into(), ..Default::default() },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));
}

#[tokio::test]
async fn admin_renames_team() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let team = fx.team(&ana, "Ops").await;

    let renamed = handler::update(
        &fx.session(),
        &ana,
        Team { id: team.id, name: "Platform".into(), ..Default::default() },
    )
    .await
    .unwrap();
    assert_eq!(renamed.name, "Platform");
    assert_eq!(renamed.members.len(), 1);
}

#[tokio::test]
async fn duplicate_member_conflicts() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let bob = fx.user("bob").await;
    let team = fx.team(&ana, "Ops").await;
    fx.add_member(&ana, team.id, &bob, false).await;

    let err = handler::create(&fx.session(), &ana, member(team.id, "bob")).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    let err = handler::create(&fx.session(), &ana, member(team.id, "nobody")).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn only_team_admins_manage_members() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let bob = fx.user("bob").await;
    fx.user("cy").await;
    let team = fx.team(&ana, "Ops").await;
    fx.add_member(&ana, team.id, &bob, false).await;

    let err = handler::create(&fx.session(), &bob, member(team.id, "cy")).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));

    let listed = handler::read_all(&fx.session(), &bob, &member(team.id, ""), "", Pagination::Disabled)
        .await
        .unwrap();
    assert_eq!(listed.result_count, 2);
}

#[tokio::test]
async fn last_admin_cannot_leave_or_be_demoted() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let bob = fx.user("bob").await;
    let team = fx.team(&ana, "Ops").await;
    fx.add_member(&ana, team.id, &bob, false).await;

    let err = handler::delete(&fx.session(), &ana, member(team.id, "ana")).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    let err = handler::update(&fx.session(), &ana, member(team.id, "ana")).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // Promote bob, after which ana may step down.
    let promoted = handler::update(&fx.session(), &ana, member(team.id, "bob")).await.unwrap();
    assert!(promoted.admin);
    let demoted = handler::update(&fx.session(), &ana, member(team.id, "ana")).await.unwrap();
    assert!(!demoted.admin);
}

#[tokio::test]
async fn deleting_a_team_removes_its_grants() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let bob = fx.user("bob").await;
    let list = fx.project(&ana, "Roadmap").await;
    let team = fx.team(&ana, "Ops").await;
    fx.add_member(&ana, team.id, &bob, false).await;
    fx.share_list_with_team(&ana, list.id, team.id, SharingRight::Read).await;
    assert_eq!(list_right(&fx.conn, &bob, list.id).await.unwrap(), Right::Read);

    handler::delete(&fx.session(), &ana, Team { id: team.id, ..Default::default() })
        .await
        .unwrap();

    assert_eq!(fx.rows("SELECT COUNT(*) FROM teams WHERE id = ?1", team.id).await, 0);
    assert_eq!(fx.rows("SELECT COUNT(*) FROM team_members WHERE team_id = ?1", team.id).await, 0);
    assert_eq!(fx.rows("SELECT COUNT(*) FROM team_lists WHERE team_id = ?1", team.id).await, 0);
    assert_eq!(list_right(&fx.conn, &bob, list.id).await.unwrap(), Right::None);
    assert_eq!(fx.metrics.get(CountKey::Teams), 0);

    let err = handler::read_one(&fx.session(), &ana, Team { id: team.id, ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}
