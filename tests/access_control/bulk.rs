use jiff::Timestamp;
use taskgate::handler;
use taskgate::models::{BulkTask, ListUser, Task, TaskPatch, TaskUpdate};
use taskgate::{Error, Patch, SharingRight};

use crate::fixtures::Fixture;

fn at(seconds: i64) -> Timestamp {
    Timestamp::from_second(seconds).unwrap()
}

fn done(value: bool) -> TaskPatch {
    TaskPatch {
        done: Patch::Set(value),
        ..Default::default()
    }
}

#[tokio::test]
async fn tasks_from_different_lists_are_rejected() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let first = fx.project(&ana, "Home").await;
    let second = fx.list(&ana, first.namespace_id, "Work").await;
    let a = fx.task(&ana, first.id, "dishes").await;
    let b = fx.task(&ana, second.id, "report").await;

    let err = handler::update(&fx.session(), &ana, BulkTask::new(vec![a.id, b.id], done(true)))
        .await
        .unwrap_err();
    match err {
        Error::BulkTasksMustBeInSameList { first: f, conflicting } => {
            assert_eq!(f, first.id);
            assert_eq!(conflicting, second.id);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let untouched = Task::by_id(&fx.conn, a.id).await.unwrap();
    assert!(!untouched.done);
}

#[tokio::test]
async fn empty_or_unknown_ids_need_at_least_one_task() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;

    let err = handler::update(&fx.session(), &ana, BulkTask::new(vec![], done(true)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BulkTasksNeedAtLeastOne));

    let err = handler::update(&fx.session(), &ana, BulkTask::new(vec![404, 405], done(true)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BulkTasksNeedAtLeastOne));
}

#[tokio::test]
async fn unknown_ids_are_skipped() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let list = fx.project(&ana, "Home").await;
    let a = fx.task(&ana, list.id, "dishes").await;

    let bulk = handler::update(&fx.session(), &ana, BulkTask::new(vec![a.id, 404], done(true)))
        .await
        .unwrap();
    assert_eq!(bulk.tasks.len(), 1);
    assert!(bulk.tasks[0].done);
}

#[tokio::test]
async fn explicit_false_is_persisted() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let list = fx.project(&ana, "Home").await;
    let a = fx.task(&ana, list.id, "dishes").await;
    let b = fx.task(&ana, list.id, "laundry").await;

    let ids = vec![a.id, b.id];
    let bulk = handler::update(&fx.session(), &ana, BulkTask::new(ids.clone(), done(true)))
        .await
        .unwrap();
    assert!(bulk.tasks.iter().all(|t| t.done && t.done_at.is_some()));

    handler::update(&fx.session(), &ana, BulkTask::new(ids, done(false)))
        .await
        .unwrap();
    for id in [a.id, b.id] {
        let task = Task::by_id(&fx.conn, id).await.unwrap();
        assert!(!task.done);
        assert_eq!(task.done_at, None);
        assert_eq!(task.list_id, list.id);
        assert_eq!(task.created_by_id, ana.id());
    }
}

#[tokio::test]
async fn completing_a_repeating_task_moves_its_dates() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let list = fx.project(&ana, "Home").await;
    let task = Task {
        title: "water plants".into(),
        list_id: list.id,
        repeat_after: 86_400,
        due_date: Some(at(1_700_000_000)),
        reminders: vec![at(1_699_990_000)],
        ..Default::default()
    };
    let task = handler::create(&fx.session(), &ana, task).await.unwrap();

    let patch = TaskPatch {
        done: Patch::Set(true),
        due_date: Patch::Set(at(1_800_000_000)),
        ..Default::default()
    };
    handler::update(&fx.session(), &ana, BulkTask::new(vec![task.id], patch))
        .await
        .unwrap();

    let stored = Task::by_id(&fx.conn, task.id).await.unwrap();
    assert!(!stored.done);
    assert_eq!(stored.due_date, Some(at(1_700_086_400)));
    assert_eq!(stored.reminders, vec![at(1_700_076_400)]);
}

#[tokio::test]
async fn read_only_access_cannot_bulk_edit() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let bob = fx.user("bob").await;
    let list = fx.project(&ana, "Home").await;
    let a = fx.task(&ana, list.id, "dishes").await;
    handler::create(&fx.session(), &ana, ListUser::new(list.id, "bob", SharingRight::Read))
        .await
        .unwrap();

    let err = handler::update(&fx.session(), &bob, BulkTask::new(vec![a.id], done(true)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));

    let err = handler::update(&fx.session(), &bob, TaskUpdate::new(a.id, done(true)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));
    assert!(!Task::by_id(&fx.conn, a.id).await.unwrap().done);
}

#[tokio::test]
async fn assignees_are_replaced() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let bob = fx.user("bob").await;
    let list = fx.project(&ana, "Home").await;
    handler::create(&fx.session(), &ana, ListUser::new(list.id, "bob", SharingRight::Read))
        .await
        .unwrap();
    let a = fx.task(&ana, list.id, "dishes").await;

    let patch = TaskPatch {
        assignees: Patch::Set(vec![ana.id(), bob.id()]),
        ..Default::default()
    };
    let bulk = handler::update(&fx.session(), &ana, BulkTask::new(vec![a.id], patch))
        .await
        .unwrap();
    assert_eq!(bulk.tasks[0].assignees.len(), 2);

    let patch = TaskPatch {
        assignees: Patch::Set(vec![bob.id()]),
        ..Default::default()
    };
    handler::update(&fx.session(), &ana, BulkTask::new(vec![a.id], patch))
        .await
        .unwrap();
    let stored = Task::by_id(&fx.conn, a.id).await.unwrap();
    let ids: Vec<_> = stored.assignees.iter().map(|u| u.id).collect();
    assert_eq!(ids, [bob.id()]);
}

#[tokio::test]
async fn assignees_without_list_access_are_rejected() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let mallory = fx.user("mallory").await;
    let list = fx.project(&ana, "Home").await;
    let a = fx.task(&ana, list.id, "dishes").await;

    let patch = TaskPatch {
        title: Patch::Set("renamed".into()),
        assignees: Patch::Set(vec![mallory.id()]),
        ..Default::default()
    };
    let err = handler::update(&fx.session(), &ana, BulkTask::new(vec![a.id], patch))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let stored = Task::by_id(&fx.conn, a.id).await.unwrap();
    assert_eq!(stored.title, "dishes");
    assert!(stored.assignees.is_empty());
}

#[tokio::test]
async fn single_update_runs_through_the_bulk_path() {
    let fx = Fixture::new().await;
    let ana = fx.user("ana").await;
    let list = fx.project(&ana, "Home").await;
    let a = fx.task(&ana, list.id, "dishes").await;

    let patch = TaskPatch {
        title: Patch::Set("dishes and pans".into()),
        priority: Patch::Set(3),
        ..Default::default()
    };
    let updated = handler::update(&fx.session(), &ana, TaskUpdate::new(a.id, patch))
        .await
        .unwrap();
    assert_eq!(updated.task.title, "dishes and pans");
    assert_eq!(updated.task.priority, 3);
    assert_eq!(updated.task.list_id, list.id);

    let err = handler::update(&fx.session(), &ana, TaskUpdate::new(404, done(true)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}
