use taskgate::handler;
use taskgate::models::{Label, Task, Team};
use taskgate::pagination::{ALL_PAGES, Pagination};

use crate::fixtures::Fixture;

const MAX: i64 = 50;

async fn seeded(count: usize) -> (Fixture, taskgate::Principal) {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let list = fx.project(&ana, "Inbox").await;
    for n in 0..count {
        fx.task(&ana, list.id, &format!("task {n:03}")).await;
    }
    (fx, ana)
}

#[tokio::test]
async fn pages_split_the_matches() {
    let (fx, ana) = seeded(25).await;

    let first = Pagination::resolve(Some(1), Some(10), MAX).unwrap();
    let page = handler::read_all(&fx.session(), &ana, &Task::default(), "", first)
        .await
        .unwrap();
    assert_eq!(page.result_count, 10);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.items[0].title, "task 000");

    let last = Pagination::resolve(Some(3), Some(10), MAX).unwrap();
    let page = handler::read_all(&fx.session(), &ana, &Task::default(), "", last)
        .await
        .unwrap();
    assert_eq!(page.result_count, 5);
    assert_eq!(page.items[0].title, "task 020");
}

#[tokio::test]
async fn per_page_is_bounded_by_the_configured_maximum() {
    let (fx, ana) = seeded(7).await;

    let clamped = Pagination::resolve(Some(1), Some(500), 5).unwrap();
    let page = handler::read_all(&fx.session(), &ana, &Task::default(), "", clamped)
        .await
        .unwrap();
    assert_eq!(page.result_count, 5);
    assert_eq!(page.total_pages, 2);

    let defaulted = Pagination::resolve(Some(1), Some(0), 5).unwrap();
    let page = handler::read_all(&fx.session(), &ana, &Task::default(), "", defaulted)
        .await
        .unwrap();
    assert_eq!(page.result_count, 5);
}

#[tokio::test]
async fn disabled_pagination_returns_everything() {
    let (fx, ana) = seeded(60).await;

    let all = Pagination::resolve(Some(ALL_PAGES), None, MAX).unwrap();
    let page = handler::read_all(&fx.session(), &ana, &Task::default(), "", all)
        .await
        .unwrap();
    assert_eq!(page.result_count, 60);
    assert_eq!(page.total_pages, 1);
}

#[tokio::test]
async fn empty_result_has_no_pages() {
    let (fx, ana) = seeded(3).await;

    let page = handler::read_all(
        &fx.session(),
        &ana,
        &Task::default(),
        "no such task",
        Pagination::resolve(None, None, MAX).unwrap(),
    )
    .await
    .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total_pages, 0);

    let past_end = Pagination::resolve(Some(9), Some(10), MAX).unwrap();
    let page = handler::read_all(&fx.session(), &ana, &Task::default(), "", past_end)
        .await
        .unwrap();
    assert_eq!(page.result_count, 0);
    assert_eq!(page.total_pages, 0);
}

#[tokio::test]
async fn search_filters_and_escapes_wildcards() {
    let (fx, ana) = seeded(12).await;

    let page = handler::read_all(&fx.session(), &ana, &Task::default(), "task 01", Pagination::Disabled)
        .await
        .unwrap();
    assert_eq!(page.result_count, 2);

    let page = handler::read_all(&fx.session(), &ana, &Task::default(), "%", Pagination::Disabled)
        .await
        .unwrap();
    assert_eq!(page.result_count, 0);
}

#[tokio::test]
async fn labels_list_own_and_reachable() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let bob = fx.user("bob").await;

    let label = Label {
        title: "urgent".into(),
        hex_color: "ff0000".into(),
        ..Default::default()
    };
    handler::create(&fx.session(), &ana, label).await.unwrap();

    let own = handler::read_all(&fx.session(), &ana, &Label::default(), "", Pagination::Disabled)
        .await
        .unwrap();
    assert_eq!(own.result_count, 1);

    let other = handler::read_all(&fx.session(), &bob, &Label::default(), "", Pagination::Disabled)
        .await
        .unwrap();
    assert_eq!(other.result_count, 0);
}

#[tokio::test]
async fn search_ignores_case_beyond_ascii() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let list = fx.project(&ana, "Finanzen").await;
    fx.task(&ana, list.id, "Überweisung prüfen").await;
    fx.task(&ana, list.id, "Steuern").await;

    let page = handler::read_all(&fx.session(), &ana, &Task::default(), "über", Pagination::Disabled)
        .await
        .unwrap();
    assert_eq!(page.result_count, 1);
    assert_eq!(page.items[0].title, "Überweisung prüfen");

    let page = handler::read_all(&fx.session(), &ana, &Task::default(), "PRÜFEN", Pagination::Disabled)
        .await
        .unwrap();
    assert_eq!(page.result_count, 1);

    // Renaming keeps the folded key in step with the title.
    let team = fx.team(&ana, "Büro").await;
    let renamed = Team {
        id: team.id,
        name: "Ämter".into(),
        ..Default::default()
    };
    handler::update(&fx.session(), &ana, renamed).await.unwrap();
    let page = handler::read_all(&fx.session(), &ana, &Team::default(), "äMT", Pagination::Disabled)
        .await
        .unwrap();
    assert_eq!(page.result_count, 1);
    let page = handler::read_all(&fx.session(), &ana, &Team::default(), "büro", Pagination::Disabled)
        .await
        .unwrap();
    assert_eq!(page.result_count, 0);
}
