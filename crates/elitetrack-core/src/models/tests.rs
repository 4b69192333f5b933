#[cfg(test)]
mod model_tests {
    use jiff::Timestamp;

    use crate::{
        error::ErrorCategory,
        models::{
            Actor, MessagePatch, MessageRecord, QuoteAction, QuoteFilter, QuotePatch,
            QuoteRecord, QuoteStatus, QuoteVehicle, RecordId, Role, StepPatch, StepStatus,
            TimelineStep, Vehicle,
        },
    };

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_second(secs).unwrap()
    }

    fn create_test_quote(status: QuoteStatus) -> QuoteRecord {
        QuoteRecord {
            id: RecordId::new("quo_7"),
            client_id: RecordId::new("cli_1"),
            project_id: None,
            vehicle: QuoteVehicle {
                brand: "Toyota".to_string(),
                model: "Hilux".to_string(),
                year: Some(2024),
                plate: None,
            },
            protection_level: Some("NIJ III-A".to_string()),
            service_type: "full_armoring".to_string(),
            description: None,
            status,
            created_at: ts(1_700_000_000),
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

    fn executor() -> Actor {
        Actor::new("exe_1", "Carlos", Role::Executor)
    }

    fn client() -> Actor {
        Actor::new("cli_1", "Ana", Role::Client)
    }

    #[test]
    fn test_quote_pipeline_happy_path() {
        let now = ts(1_700_000_500);
        let quote = create_test_quote(QuoteStatus::Pending);

        let analyzed = quote.apply(&QuoteAction::Analyze, &executor(), now).unwrap();
        assert_eq!(analyzed.status, QuoteStatus::Analyzed);

        let sent = analyzed
            .apply(
                &QuoteAction::Send {
                    price: 185_000.0,
                    days: 45,
                    notes: Some("Includes run-flat tires".to_string()),
                },
                &executor(),
                now,
            )
            .unwrap();
        assert_eq!(sent.status, QuoteStatus::Sent);
        assert_eq!(sent.estimated_days, Some(45));
        assert_eq!(sent.executor_name.as_deref(), Some("Carlos"));
        assert_eq!(sent.responded_at, Some(now));

        let approved = sent
            .apply(
                &QuoteAction::Approve {
                    response: Some("Go ahead".to_string()),
                },
                &client(),
                now,
            )
            .unwrap();
        assert_eq!(approved.status, QuoteStatus::Approved);
        assert_eq!(approved.approved_at, Some(now));
        assert_eq!(approved.client_response.as_deref(), Some("Go ahead"));
    }

    #[test]
    fn test_quote_answer_requires_sent_and_client() {
        let now = ts(1_700_000_500);
        let pending = create_test_quote(QuoteStatus::Pending);
        let err = pending
            .apply(&QuoteAction::Approve { response: None }, &client(), now)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::GuardViolation);

        let sent = create_test_quote(QuoteStatus::Sent);
        let err = sent
            .apply(&QuoteAction::Reject { response: None }, &executor(), now)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::GuardViolation);

        let stranger = Actor::new("cli_9", "Other", Role::Client);
        assert!(sent
            .apply(&QuoteAction::Approve { response: None }, &stranger, now)
            .is_err());
    }

    #[test]
    fn test_quote_pipeline_never_moves_backward() {
        let now = ts(1_700_000_500);
        let holding = create_test_quote(QuoteStatus::Holding);
        assert!(holding.apply(&QuoteAction::Analyze, &executor(), now).is_err());
        assert!(holding.apply(&QuoteAction::Hold, &executor(), now).is_err());
        assert!(holding.apply(&QuoteAction::Expire, &executor(), now).is_ok());

        let rejected = create_test_quote(QuoteStatus::Rejected);
        assert!(rejected.apply(&QuoteAction::Expire, &executor(), now).is_err());
    }

    #[test]
    fn test_quote_send_validates_amounts() {
        let now = ts(1_700_000_500);
        let quote = create_test_quote(QuoteStatus::Analyzed);
        let err = quote
            .apply(
                &QuoteAction::Send {
                    price: 0.0,
                    days: 10,
                    notes: None,
                },
                &executor(),
                now,
            )
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_client_cannot_drive_staff_transitions() {
        let quote = create_test_quote(QuoteStatus::Pending);
        let err = quote
            .apply(&QuoteAction::Analyze, &client(), ts(1))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::GuardViolation);
    }

    #[test]
    fn test_step_patch_diff_only_changed_fields() {
        let before = TimelineStep::new(
            RecordId::new("stp_1"),
            RecordId::new("prj_1"),
            0,
            "Disassembly",
            ts(10),
        );
        let mut after = before.clone();
        after.status = StepStatus::Completed;
        after.completion_date = Some(ts(20));

        let patch = StepPatch::diff(&before, &after);
        assert_eq!(patch.status, Some(StepStatus::Completed));
        assert_eq!(patch.completion_date, Some(Some(ts(20))));
        assert_eq!(patch.notes, None);
        assert!(!patch.is_empty());

        let mut replayed = before.clone();
        patch.apply_to(&mut replayed);
        replayed.updated_at = after.updated_at;
        assert_eq!(replayed, after);

        assert!(StepPatch::diff(&before, &before).is_empty());
    }

    #[test]
    fn test_message_and_quote_patch() {
        let message = MessageRecord {
            id: RecordId::new("msg_1"),
            conversation_id: RecordId::new("cnv_1"),
            sender_id: RecordId::new("cli_1"),
            sender_name: "Ana".to_string(),
            sender_role: Role::Client,
            content: "Hi".to_string(),
            created_at: ts(5),
            read: false,
        };
        let mut read = message.clone();
        read.read = true;
        assert_eq!(MessagePatch::diff(&message, &read).read, Some(true));

        let quote = create_test_quote(QuoteStatus::Pending);
        let analyzed = quote.apply(&QuoteAction::Analyze, &executor(), ts(6)).unwrap();
        let patch = QuotePatch::diff(&quote, &analyzed);
        assert_eq!(patch.status, Some(QuoteStatus::Analyzed));
        assert_eq!(patch.estimated_price, None);
    }

    #[test]
    fn test_quote_filter_matches() {
        let filter = QuoteFilter {
            client_id: None,
            statuses: vec![QuoteStatus::Pending, QuoteStatus::Analyzed],
        };
        assert!(filter.matches(&RecordId::new("cli_1"), QuoteStatus::Analyzed));
        assert!(!filter.matches(&RecordId::new("cli_1"), QuoteStatus::Sent));

        let by_client = QuoteFilter {
            client_id: Some(RecordId::new("cli_2")),
            statuses: vec![],
        };
        assert!(!by_client.matches(&RecordId::new("cli_1"), QuoteStatus::Sent));
    }

    #[test]
    fn test_vehicle_label() {
        let vehicle = Vehicle {
            id: RecordId::new("veh_1"),
            client_id: RecordId::new("cli_1"),
            brand: "BMW".to_string(),
            model: "X5".to_string(),
            year: Some(2023),
            plate: None,
            protection_level: None,
        };
        assert_eq!(vehicle.label(), "BMW X5 (2023)");
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("in_progress".parse::<StepStatus>(), Ok(StepStatus::InProgress));
        assert_eq!("Holding".parse::<QuoteStatus>(), Ok(QuoteStatus::Holding));
        assert!("archived".parse::<QuoteStatus>().is_err());
        assert!("admin".parse::<Role>().unwrap().is_staff());
        assert!(!Role::Client.is_staff());
    }
}
