use elitetrack_core::{
    db::Database,
    models::{
        ConversationFilter, ConversationRecord, MessageFilter, MessagePatch, MessageRecord,
        ProjectFilter, ProjectPatch, ProjectRecord, ProjectStatus, QuoteFilter, QuotePatch,
        QuoteRecord, QuoteStatus, QuoteVehicle, RecordId, Role, StepPatch, StepStatus,
        TimelineStep, Vehicle,
    },
    TrackerError,
};
use jiff::{civil::date, Timestamp};
use tempfile::NamedTempFile;

/// Helper function to create a temporary database for testing
fn create_test_db() -> (NamedTempFile, Database) {
    let temp_file = NamedTempFile::new().expect("Failed to create temporary file");
    let db = Database::new(temp_file.path()).expect("Failed to create test database");
    (temp_file, db)
}

fn draft_project(qr: &str, titles: &[&str]) -> ProjectRecord {
    let now = Timestamp::now();
    let id = RecordId::new("local-prj-1-0");
    ProjectRecord {
        id: id.clone(),
        client_id: RecordId::new("cli_1"),
        vehicle_id: RecordId::new("veh_1"),
        qr_code: qr.to_string(),
        status: ProjectStatus::Pending,
        progress: 0,
        timeline: titles
            .iter()
            .enumerate()
            .map(|(n, title)| {
                TimelineStep::new(
                    RecordId::new(format!("local-stp-1-{n}")),
                    id.clone(),
                    n as u32,
                    *title,
                    now,
                )
            })
            .collect(),
        start_date: Some(date(2025, 1, 1)),
        estimated_delivery: None,
        actual_delivery: None,
        created_at: now,
        updated_at: now,
    }
}

fn draft_quote(client: &str) -> QuoteRecord {
    QuoteRecord {
        id: RecordId::new("local-quo-1-0"),
        client_id: RecordId::new(client),
        project_id: None,
        vehicle: QuoteVehicle {
            brand: "Jeep".to_string(),
            model: "Compass".to_string(),
            year: None,
            plate: Some("ABC1D23".to_string()),
        },
        protection_level: None,
        service_type: "Glass replacement".to_string(),
        description: None,
        status: QuoteStatus::Pending,
        created_at: Timestamp::now(),
        estimated_price: None,
        estimated_days: None,
        executor_notes: None,
        executor_id: None,
        executor_name: None,
        responded_at: None,
        client_response: None,
        approved_at: None,
        rejected_at: None,
    }
}

#[test]
fn test_database_initialization() {
    let (temp_file, _db) = create_test_db();
    assert!(temp_file.path().exists());

    // Opening an initialized file again is fine
    assert!(Database::new(temp_file.path()).is_ok());
}

#[test]
fn test_insert_project_assigns_canonical_ids() {
    let (_temp_file, mut db) = create_test_db();

    let project = db
        .insert_project(&draft_project("QR-1", &["A", "B"]))
        .expect("Failed to insert project");

    assert_eq!(project.id, RecordId::new("prj_1"));
    assert_eq!(project.qr_code, "QR-1");
    assert_eq!(project.start_date, Some(date(2025, 1, 1)));
    let ids: Vec<_> = project.timeline.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["stp_1", "stp_2"]);
    assert!(project.timeline.iter().all(|s| s.project_id == project.id));
    assert_eq!(project.timeline[1].position, 1);
}

#[test]
fn test_insert_project_rejects_duplicate_qr_code() {
    let (_temp_file, mut db) = create_test_db();
    db.insert_project(&draft_project("QR-1", &["A"])).unwrap();

    let err = db
        .insert_project(&draft_project("QR-1", &["A"]))
        .unwrap_err();
    assert!(matches!(err, TrackerError::Validation { ref field, .. } if field == "qr_code"));
    assert_eq!(db.list_projects(&ProjectFilter::default()).unwrap().len(), 1);
}

#[test]
fn test_list_projects_filters() {
    let (_temp_file, mut db) = create_test_db();
    db.insert_project(&draft_project("QR-1", &["A"])).unwrap();
    let mut other = draft_project("QR-2", &["A"]);
    other.client_id = RecordId::new("cli_2");
    db.insert_project(&other).unwrap();

    assert_eq!(db.list_projects(&ProjectFilter::default()).unwrap().len(), 2);

    let mine = db
        .list_projects(&ProjectFilter::for_client(RecordId::new("cli_2")))
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].qr_code, "QR-2");

    let by_qr = db
        .list_projects(&ProjectFilter {
            qr_code: Some("QR-1".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_qr.len(), 1);
    assert_eq!(by_qr[0].timeline.len(), 1);
}

#[test]
fn test_update_step_and_project() {
    let (_temp_file, mut db) = create_test_db();
    let project = db.insert_project(&draft_project("QR-1", &["A", "B"])).unwrap();

    let stored = db
        .update_step(
            &project.timeline[0].id,
            &StepPatch {
                status: Some(StepStatus::Completed),
                completion_date: Some(Some(Timestamp::now())),
                notes: Some(Some("done".to_string())),
                photos: Some(vec!["file:///tmp/a.jpg".to_string()]),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(stored.timeline[0].status, StepStatus::Completed);
    assert_eq!(stored.timeline[0].notes.as_deref(), Some("done"));
    assert_eq!(stored.timeline[0].photos, ["file:///tmp/a.jpg"]);
    assert_eq!(stored.timeline[1].status, StepStatus::Pending);

    let stored = db
        .update_project(
            &project.id,
            &ProjectPatch {
                status: Some(ProjectStatus::InProgress),
                progress: Some(50),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(stored.status, ProjectStatus::InProgress);
    assert_eq!(stored.progress, 50);
}

#[test]
fn test_update_unknown_records() {
    let (_temp_file, mut db) = create_test_db();

    let err = db
        .update_step(&RecordId::new("stp_99"), &StepPatch::default())
        .unwrap_err();
    assert!(matches!(err, TrackerError::NotFound { kind: "step", .. }));

    // Provisional ids never reach a row
    let err = db
        .update_project(&RecordId::new("local-prj-1-0"), &ProjectPatch::default())
        .unwrap_err();
    assert!(matches!(err, TrackerError::NotFound { kind: "project", .. }));
}

#[test]
fn test_conversation_is_unique_per_project() {
    let (_temp_file, mut db) = create_test_db();
    let draft = ConversationRecord {
        id: RecordId::new("local-cnv-1-0"),
        project_id: RecordId::new("prj_1"),
        participants: vec![RecordId::new("cli_1"), RecordId::new("exe_1")],
        created_at: Timestamp::now(),
    };

    let first = db.insert_conversation(&draft).unwrap();
    let second = db.insert_conversation(&draft).unwrap();
    assert_eq!(first.id, RecordId::new("cnv_1"));
    assert_eq!(second.id, first.id);
    assert_eq!(first.participants, draft.participants);

    let listed = db
        .list_conversations(&ConversationFilter {
            project_id: Some(RecordId::new("prj_1")),
        })
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[test]
fn test_messages_round_trip() {
    let (_temp_file, mut db) = create_test_db();
    let conversation = db
        .insert_conversation(&ConversationRecord {
            id: RecordId::new("local-cnv-1-0"),
            project_id: RecordId::new("prj_1"),
            participants: vec![RecordId::new("cli_1")],
            created_at: Timestamp::now(),
        })
        .unwrap();

    let draft = MessageRecord {
        id: RecordId::new("local-msg-1-0"),
        conversation_id: conversation.id.clone(),
        sender_id: RecordId::new("cli_1"),
        sender_name: "Ana".to_string(),
        sender_role: Role::Client,
        content: "When is the glass arriving?".to_string(),
        created_at: Timestamp::now(),
        read: false,
    };
    let stored = db.insert_message(&draft).unwrap();
    assert_eq!(stored.id, RecordId::new("msg_1"));
    assert_eq!(stored.content, draft.content);

    let updated = db
        .update_message(&stored.id, &MessagePatch { read: Some(true) })
        .unwrap();
    assert!(updated.read);

    let listed = db
        .list_messages(&MessageFilter {
            conversation_id: Some(conversation.id),
        })
        .unwrap();
    assert_eq!(listed, [updated]);

    // Messages need a stored conversation
    let err = db
        .insert_message(&MessageRecord {
            conversation_id: RecordId::new("cnv_9"),
            ..draft
        })
        .unwrap_err();
    assert!(matches!(err, TrackerError::NotFound { kind: "conversation", .. }));
}

#[test]
fn test_quotes_round_trip() {
    let (_temp_file, mut db) = create_test_db();
    let quote = db.insert_quote(&draft_quote("cli_1")).unwrap();
    db.insert_quote(&draft_quote("cli_2")).unwrap();
    assert_eq!(quote.id, RecordId::new("quo_1"));
    assert_eq!(quote.vehicle.plate.as_deref(), Some("ABC1D23"));

    let updated = db
        .update_quote(
            &quote.id,
            &QuotePatch {
                status: Some(QuoteStatus::Sent),
                estimated_price: Some(Some(12_500.0)),
                estimated_days: Some(Some(5)),
                executor_name: Some(Some("Carlos".to_string())),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.status, QuoteStatus::Sent);
    assert_eq!(updated.estimated_price, Some(12_500.0));

    let mine = db
        .list_quotes(&QuoteFilter {
            client_id: Some(RecordId::new("cli_1")),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(mine, [updated]);
    assert_eq!(db.list_quotes(&QuoteFilter::default()).unwrap().len(), 2);
}

#[test]
fn test_directory() {
    let (_temp_file, mut db) = create_test_db();
    let client = db
        .insert_client("Ana Souza", "ana@example.com", Some("+55 11 5555-0000"))
        .unwrap();
    assert_eq!(client.id, RecordId::new("cli_1"));

    let err = db
        .insert_client("Ana", "ANA@example.com", None)
        .unwrap_err();
    assert!(matches!(err, TrackerError::Validation { ref field, .. } if field == "email"));

    let found = db.get_client_by_email("ana@example.com").unwrap().unwrap();
    assert_eq!(found, client);

    let vehicle = db
        .insert_vehicle(&Vehicle {
            id: RecordId::default(),
            client_id: client.id.clone(),
            brand: "Toyota".to_string(),
            model: "SW4".to_string(),
            year: Some(2023),
            plate: None,
            protection_level: Some("III-A".to_string()),
        })
        .unwrap();
    assert_eq!(vehicle.id, RecordId::new("veh_1"));
    assert_eq!(db.get_vehicle(&vehicle.id).unwrap(), Some(vehicle));
    assert_eq!(db.get_vehicle(&RecordId::new("veh_7")).unwrap(), None);
}
