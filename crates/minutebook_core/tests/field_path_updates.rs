use minutebook_core::{
    open_db_in_memory, ActionItem, AddressingError, FieldPath, FieldValue, Meeting,
    MeetingRepository, MeetingService, MeetingServiceError, SqliteMeetingRepository,
};

fn sample_meeting() -> Meeting {
    let mut meeting = Meeting::with_id("m1", "2024-11-24T12:00:00Z", "Kickoff");
    meeting.summary_heading = "Kickoff recap".to_string();
    meeting.key_points = vec!["a".to_string(), "b".to_string()];
    meeting.action_items = vec![ActionItem::new("Ann", "x", Some("2024-12-01".to_string()))];
    meeting.decisions = vec!["d1".to_string()];
    meeting
}

#[test]
fn scalar_update_persists_root_field() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = MeetingService::new(SqliteMeetingRepository::try_new(&mut conn).unwrap());
    let mut meeting = sample_meeting();
    service.save(&meeting).unwrap();

    service
        .update_field(&mut meeting, &FieldPath::scalar("title"), "Kickoff v2".into())
        .unwrap();

    assert_eq!(meeting.title, "Kickoff v2");
    assert_eq!(service.get("m1").unwrap().unwrap(), meeting);
}

#[test]
fn list_element_update_replaces_one_position() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = MeetingService::new(SqliteMeetingRepository::try_new(&mut conn).unwrap());
    let mut meeting = sample_meeting();
    service.save(&meeting).unwrap();

    service
        .update_field(&mut meeting, &FieldPath::element("key_points", 1), "B".into())
        .unwrap();

    let stored = service.get("m1").unwrap().unwrap();
    assert_eq!(stored.key_points, vec!["a".to_string(), "B".to_string()]);
    assert_eq!(stored.decisions, vec!["d1".to_string()]);
    assert_eq!(service.repository().child_row_count("m1").unwrap(), 4);
}

#[test]
fn map_field_update_changes_one_action_item_key() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = MeetingService::new(SqliteMeetingRepository::try_new(&mut conn).unwrap());
    let mut meeting = sample_meeting();
    service.save(&meeting).unwrap();

    service
        .update_field(
            &mut meeting,
            &FieldPath::key("action_items", 0, "assignee"),
            "Bob".into(),
        )
        .unwrap();
    service
        .update_field(
            &mut meeting,
            &FieldPath::key("action_items", 0, "deadline"),
            FieldValue::Null,
        )
        .unwrap();

    let stored = service.get("m1").unwrap().unwrap();
    assert_eq!(stored.action_items, vec![ActionItem::new("Bob", "x", None)]);
    assert_eq!(stored, meeting);
}

#[test]
fn out_of_range_index_writes_nothing() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = MeetingService::new(SqliteMeetingRepository::try_new(&mut conn).unwrap());
    let mut meeting = sample_meeting();
    service.save(&meeting).unwrap();
    let before = meeting.clone();

    let err = service
        .update_field(&mut meeting, &FieldPath::element("key_points", 5), "z".into())
        .unwrap_err();

    assert!(matches!(
        err,
        MeetingServiceError::Addressing(AddressingError::IndexOutOfRange {
            index: 5,
            len: 2,
            ..
        })
    ));
    assert_eq!(meeting, before);
    assert_eq!(service.get("m1").unwrap().unwrap(), before);
}

#[test]
fn shape_and_name_errors_are_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = MeetingService::new(SqliteMeetingRepository::try_new(&mut conn).unwrap());
    let mut meeting = sample_meeting();
    service.save(&meeting).unwrap();

    let cases = [
        (FieldPath::scalar("key_points"), FieldValue::from("x")),
        (FieldPath::element("action_items", 0), FieldValue::from("x")),
        (FieldPath::element("title", 0), FieldValue::from("x")),
    ];
    for (path, value) in cases {
        let err = service.update_field(&mut meeting, &path, value).unwrap_err();
        assert!(
            matches!(
                err,
                MeetingServiceError::Addressing(AddressingError::WrongShape { .. })
            ),
            "{path:?} -> {err}"
        );
    }

    let unknown = service
        .update_field(&mut meeting, &FieldPath::scalar("location"), "HQ".into())
        .unwrap_err();
    assert!(matches!(
        unknown,
        MeetingServiceError::Addressing(AddressingError::UnknownField(_))
    ));

    let bad_key = service
        .update_field(
            &mut meeting,
            &FieldPath::key("action_items", 0, "priority"),
            "high".into(),
        )
        .unwrap_err();
    assert!(matches!(
        bad_key,
        MeetingServiceError::Addressing(AddressingError::UnknownKey { .. })
    ));

    assert_eq!(service.get("m1").unwrap().unwrap(), sample_meeting());
}

#[test]
fn id_and_required_values_are_protected() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = MeetingService::new(SqliteMeetingRepository::try_new(&mut conn).unwrap());
    let mut meeting = sample_meeting();
    service.save(&meeting).unwrap();

    let id_err = service
        .update_field(&mut meeting, &FieldPath::scalar("id"), "m9".into())
        .unwrap_err();
    assert!(matches!(
        id_err,
        MeetingServiceError::Addressing(AddressingError::ImmutableField(_))
    ));

    let null_err = service
        .update_field(
            &mut meeting,
            &FieldPath::key("action_items", 0, "task"),
            FieldValue::Null,
        )
        .unwrap_err();
    assert!(matches!(
        null_err,
        MeetingServiceError::Addressing(AddressingError::NullNotAllowed(_))
    ));

    let date_err = service
        .update_field(&mut meeting, &FieldPath::scalar("created_at"), "soon".into())
        .unwrap_err();
    assert!(matches!(
        date_err,
        MeetingServiceError::Addressing(AddressingError::InvalidValue { .. })
    ));

    assert_eq!(meeting, sample_meeting());
}

#[test]
fn child_edit_of_unsaved_meeting_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = MeetingService::new(SqliteMeetingRepository::try_new(&mut conn).unwrap());
    let mut meeting = sample_meeting();

    let err = service
        .update_field(&mut meeting, &FieldPath::element("decisions", 0), "d2".into())
        .unwrap_err();
    assert!(matches!(err, MeetingServiceError::MeetingNotFound(_)));
    assert_eq!(meeting.decisions, vec!["d1".to_string()]);
    assert_eq!(service.repository().child_row_count("m1").unwrap(), 0);
}

#[test]
fn created_at_edit_is_stored_in_utc() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = MeetingService::new(SqliteMeetingRepository::try_new(&mut conn).unwrap());
    let mut meeting = sample_meeting();
    service.save(&meeting).unwrap();

    service
        .update_field(
            &mut meeting,
            &FieldPath::scalar("created_at"),
            "2024-11-24T10:00:00.250+05:00".into(),
        )
        .unwrap();

    assert_eq!(meeting.created_at, "2024-11-24T05:00:00Z");
    assert_eq!(service.get("m1").unwrap().unwrap(), meeting);
}

#[test]
fn failing_child_rewrite_keeps_previous_rows() {
    let mut conn = open_db_in_memory().unwrap();
    let mut meeting = sample_meeting();
    {
        let mut repo = SqliteMeetingRepository::try_new(&mut conn).unwrap();
        repo.save_meeting(&meeting).unwrap();
    }
    conn.execute_batch(
        "CREATE TRIGGER reject_key_points BEFORE INSERT ON key_points
         BEGIN
             SELECT RAISE(ABORT, 'key point rejected');
         END;",
    )
    .unwrap();
    let mut service = MeetingService::new(SqliteMeetingRepository::try_new(&mut conn).unwrap());

    let err = service
        .update_field(&mut meeting, &FieldPath::element("key_points", 0), "A".into())
        .unwrap_err();
    assert!(matches!(err, MeetingServiceError::Repo(_)));

    assert_eq!(meeting, sample_meeting());
    assert_eq!(service.get("m1").unwrap().unwrap(), sample_meeting());
    assert_eq!(service.repository().child_row_count("m1").unwrap(), 4);
}
