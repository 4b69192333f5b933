mod common;

use elitetrack_core::{
    models::{Actor, RecordId, Role, StepStatus},
    NoticeKind, ScopeId,
};
use jiff::{tz::TimeZone, Timestamp, ToSpan};

use common::{create_session, create_test_store, project_for, wait_for};

fn next_week() -> jiff::civil::Date {
    Timestamp::now()
        .to_zoned(TimeZone::system())
        .date()
        .checked_add(7.days())
        .expect("date in range")
}

#[tokio::test]
async fn test_client_follows_timeline_through_push() {
    let (_temp_dir, gateway, bridge) = create_test_store().await;
    let ana = gateway
        .add_client("Ana", "ana@example.com", None)
        .await
        .expect("Failed to add client");

    let staff = create_session(
        Actor::new("exe_1", "Carlos", Role::Executor),
        &gateway,
        &bridge,
    )
    .await;
    let pending = staff
        .create_project(project_for(&ana.id, "QR-100", &["Check-in", "Glass"]))
        .await
        .expect("Failed to create project");
    let provisional = pending.id().clone();
    pending.settled().await.expect("Create was not stored");
    let project = staff.project(&provisional).expect("Project vanished");
    assert_eq!(project.id, RecordId::new("prj_1"));

    let client = create_session(Actor::new(ana.id.clone(), "Ana", Role::Client), &gateway, &bridge).await;
    client.refresh().await.expect("Failed to refresh");
    assert_eq!(client.projects().len(), 1);
    client
        .activate_scope(ScopeId::Project(project.id.clone()))
        .await
        .expect("Failed to activate scope");

    // Staff works on the first step with the provisional step id it still holds
    let first_step = project.timeline[0].id.clone();
    staff
        .complete_step(&provisional, &first_step, Some(next_week()))
        .await
        .expect("Failed to complete step")
        .settled()
        .await
        .expect("Completion was not stored");

    wait_for(&client, |s| {
        s.project(&RecordId::new("prj_1"))
            .is_some_and(|p| p.timeline[0].status == StepStatus::Completed && p.progress == 50)
    })
    .await;
    let seen = client.project(&project.id).unwrap();
    assert_eq!(seen.timeline[1].estimated_date, Some(next_week()));

    // The client may look but not touch
    let err = client
        .start_step(&project.id, &seen.timeline[1].id)
        .await
        .unwrap_err();
    assert!(matches!(err, elitetrack_core::TrackerError::GuardViolation { .. }));

    client.shutdown().await;
    staff.shutdown().await;
}

#[tokio::test]
async fn test_chat_between_sessions() {
    let (_temp_dir, gateway, bridge) = create_test_store().await;
    let client_id = RecordId::new("cli_1");

    let staff = create_session(
        Actor::new("exe_1", "Carlos", Role::Executor),
        &gateway,
        &bridge,
    )
    .await;
    staff
        .create_project(project_for(&client_id, "QR-200", &["Check-in"]))
        .await
        .unwrap()
        .settled()
        .await
        .unwrap();
    let project_id = RecordId::new("prj_1");
    staff
        .activate_scope(ScopeId::Project(project_id.clone()))
        .await
        .unwrap();

    let client = create_session(Actor::new(client_id.clone(), "Ana", Role::Client), &gateway, &bridge).await;
    client.refresh().await.unwrap();
    let mut notices = client.notices();

    // The client opens the chat and writes before the conversation is stored
    let (conversation, _) = client.open_conversation(&project_id).await.unwrap();
    assert!(conversation.id.is_provisional());
    client
        .send_message(&conversation.id, "Is the car ready for pickup?")
        .await
        .unwrap()
        .settled()
        .await
        .unwrap();
    let conversation = client.conversation(&conversation.id).unwrap();
    assert_eq!(conversation.id, RecordId::new("cnv_1"));
    let kinds = [notices.recv().await.unwrap().kind, notices.recv().await.unwrap().kind];
    assert_eq!(kinds, [NoticeKind::Reconciled, NoticeKind::Reconciled]);

    // Staff learns about the conversation through the project scope
    wait_for(&staff, |s| s.conversation(&RecordId::new("cnv_1")).is_some()).await;
    staff.refresh().await.unwrap();
    assert_eq!(staff.unread_count(&conversation.id), 1);
    staff
        .activate_scope(ScopeId::Conversation(conversation.id.clone()))
        .await
        .unwrap();

    client
        .send_message(&conversation.id, "I can come on Friday")
        .await
        .unwrap()
        .settled()
        .await
        .unwrap();
    wait_for(&staff, |s| s.messages_in(&RecordId::new("cnv_1")).count() == 2).await;
    assert_eq!(staff.unread_count(&conversation.id), 2);

    staff
        .mark_conversation_read(&conversation.id)
        .await
        .unwrap()
        .settled()
        .await
        .unwrap();
    assert_eq!(staff.total_unread(), 0);

    client.refresh().await.unwrap();
    assert!(client.messages(&conversation.id).iter().all(|m| m.read));
}
