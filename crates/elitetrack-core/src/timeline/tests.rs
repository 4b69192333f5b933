use jiff::{civil::date, Timestamp};

use super::*;
use crate::{error::ErrorCategory, models::Role};

fn now() -> Timestamp {
    Timestamp::from_second(1_735_732_800).unwrap() // 2025-01-01 12:00:00 UTC
}

fn today() -> Date {
    date(2025, 1, 1)
}

fn tomorrow() -> Date {
    date(2025, 1, 2)
}

fn technician() -> Actor {
    Actor::new("exe_1", "Carlos", Role::Executor)
}

fn create_test_project(titles: &[&str]) -> ProjectRecord {
    let project_id = RecordId::new("prj_1");
    let created = Timestamp::from_second(1_735_000_000).unwrap();
    let timeline = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            TimelineStep::new(
                RecordId::new(format!("stp_{}", i + 1)),
                project_id.clone(),
                i as u32,
                *title,
                created,
            )
        })
        .collect();
    ProjectRecord {
        id: project_id,
        client_id: RecordId::new("cli_1"),
        vehicle_id: RecordId::new("veh_1"),
        qr_code: "ELITE-QR-1".to_string(),
        status: ProjectStatus::Pending,
        progress: 0,
        timeline,
        start_date: Some(date(2024, 12, 20)),
        estimated_delivery: None,
        actual_delivery: None,
        created_at: created,
        updated_at: created,
    }
}

fn step_id(n: usize) -> RecordId {
    RecordId::new(format!("stp_{n}"))
}

fn complete_all(mut project: ProjectRecord) -> ProjectRecord {
    let n = project.timeline.len();
    for i in 1..=n {
        project =
            request_completion(&project, &step_id(i), Some(tomorrow()), &technician(), today(), now())
                .unwrap();
    }
    project
}

#[test]
fn test_worked_example_three_steps() {
    let project = create_test_project(&["A", "B", "C"]);

    let project = start_step(&project, &step_id(1), &technician(), now()).unwrap();
    assert_eq!(project.timeline[0].status, StepStatus::InProgress);

    let err =
        request_completion(&project, &step_id(1), None, &technician(), today(), now()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);

    let project = request_completion(
        &project,
        &step_id(1),
        Some(tomorrow()),
        &technician(),
        today(),
        now(),
    )
    .unwrap();
    assert_eq!(project.timeline[0].status, StepStatus::Completed);
    assert_eq!(project.timeline[0].completion_date, Some(now()));
    assert_eq!(project.timeline[1].estimated_date, Some(tomorrow()));
    assert_eq!(project.progress, 33);
    assert_eq!(project.status, ProjectStatus::InProgress);

    let project = start_step(&project, &step_id(2), &technician(), now()).unwrap();
    assert_eq!(project.timeline[1].status, StepStatus::InProgress);

    let before = project.clone();
    let err = start_step(&project, &step_id(3), &technician(), now()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::GuardViolation);
    assert_eq!(project, before);
}

#[test]
fn test_out_of_order_start_rejected_for_every_middle_step() {
    let project = create_test_project(&["A", "B", "C", "D"]);
    for i in 2..=4 {
        let err = start_step(&project, &step_id(i), &technician(), now()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::GuardViolation);
    }
    assert!(can_start(&project, 0));
    assert!(!can_start(&project, 1));
}

#[test]
fn test_last_step_needs_no_forecast() {
    let mut project = create_test_project(&["A", "B"]);
    project =
        request_completion(&project, &step_id(1), Some(today()), &technician(), today(), now())
            .unwrap();
    project =
        request_completion(&project, &step_id(2), None, &technician(), today(), now()).unwrap();
    assert_eq!(project.progress, 100);
    assert_eq!(project.status, ProjectStatus::Completed);
}

#[test]
fn test_forecast_in_the_past_rejected() {
    let project = create_test_project(&["A", "B"]);
    let err = request_completion(
        &project,
        &step_id(1),
        Some(date(2024, 12, 31)),
        &technician(),
        today(),
        now(),
    )
    .unwrap_err();
    match err {
        TrackerError::Validation { field, .. } => assert_eq!(field, "forecast_date"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_completing_gated_pending_step_rejected() {
    let project = create_test_project(&["A", "B", "C"]);
    let err = request_completion(
        &project,
        &step_id(2),
        Some(tomorrow()),
        &technician(),
        today(),
        now(),
    )
    .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::GuardViolation);
}

#[test]
fn test_progress_rounding() {
    assert_eq!(progress_percent(0, 0), 0);
    assert_eq!(progress_percent(1, 3), 33);
    assert_eq!(progress_percent(2, 3), 67);
    assert_eq!(progress_percent(1, 8), 13);
    assert_eq!(progress_percent(1, 200), 1);
    assert_eq!(progress_percent(11, 11), 100);
}

#[test]
fn test_locked_project_rejects_every_step_mutation() {
    let project = complete_all(create_test_project(&["A", "B"]));
    assert_eq!(project.status, ProjectStatus::Completed);

    let actor = technician();
    let errors = [
        start_step(&project, &step_id(1), &actor, now()).unwrap_err(),
        request_completion(&project, &step_id(2), None, &actor, today(), now()).unwrap_err(),
        edit_step_fields(
            &project,
            &step_id(1),
            &StepFields {
                notes: Some("late note".into()),
                ..Default::default()
            },
            &actor,
            now(),
        )
        .unwrap_err(),
        reopen_step(&project, &step_id(1), &actor, now()).unwrap_err(),
        add_photo(&project, &step_id(1), "file:///p.jpg", &actor, now()).unwrap_err(),
    ];
    for err in errors {
        assert_eq!(err.category(), ErrorCategory::GuardViolation);
    }

    let delivered = mark_delivered(&project, &actor, now()).unwrap();
    assert_eq!(delivered.status, ProjectStatus::Delivered);
    assert_eq!(delivered.actual_delivery, Some(now()));
    assert!(reopen_step(&delivered, &step_id(2), &actor, now()).is_err());
}

#[test]
fn test_mark_delivered_requires_completed() {
    let project = create_test_project(&["A"]);
    let err = mark_delivered(&project, &technician(), now()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::GuardViolation);
}

#[test]
fn test_reopen_keeps_later_forecasts() {
    let project = create_test_project(&["A", "B", "C"]);
    let project = request_completion(
        &project,
        &step_id(1),
        Some(tomorrow()),
        &technician(),
        today(),
        now(),
    )
    .unwrap();

    let reopened = reopen_step(&project, &step_id(1), &technician(), now()).unwrap();
    assert_eq!(reopened.timeline[0].status, StepStatus::InProgress);
    assert_eq!(reopened.timeline[0].completion_date, None);
    assert_eq!(reopened.timeline[1].estimated_date, Some(tomorrow()));
    assert_eq!(reopened.progress, 0);
    assert_eq!(reopened.status, ProjectStatus::Pending);

    let err = reopen_step(&reopened, &step_id(2), &technician(), now()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::GuardViolation);
}

#[test]
fn test_client_cannot_mutate_timeline() {
    let project = create_test_project(&["A"]);
    let client = Actor::new("cli_1", "Ana", Role::Client);
    let err = start_step(&project, &step_id(1), &client, now()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::GuardViolation);
}

#[test]
fn test_unknown_step_is_not_found() {
    let project = create_test_project(&["A"]);
    let err = start_step(&project, &step_id(9), &technician(), now()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

#[test]
fn test_add_photo_is_a_set() {
    let project = create_test_project(&["A"]);
    let project = add_photo(&project, &step_id(1), "file:///a.jpg", &technician(), now()).unwrap();
    let project = add_photo(&project, &step_id(1), "file:///b.jpg", &technician(), now()).unwrap();
    let project = add_photo(&project, &step_id(1), "file:///a.jpg", &technician(), now()).unwrap();
    assert_eq!(
        project.timeline[0].photos,
        vec!["file:///a.jpg".to_string(), "file:///b.jpg".to_string()]
    );
}

#[test]
fn test_edit_fields_on_unlocked_project() {
    let project = create_test_project(&["A", "B"]);
    let fields = StepFields {
        notes: Some("Doors removed".into()),
        technician: Some("Rui".into()),
        ..Default::default()
    };
    let edited = edit_step_fields(&project, &step_id(2), &fields, &technician(), now()).unwrap();
    assert_eq!(edited.timeline[1].notes.as_deref(), Some("Doors removed"));
    assert_eq!(edited.timeline[1].technician.as_deref(), Some("Rui"));
    assert_eq!(edited.timeline[1].status, StepStatus::Pending);
}
