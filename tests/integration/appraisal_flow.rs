// Submission, scoring, publication and acknowledgement of appraisal records.

mod common;

use appraisal_engine::error::AppError;
use appraisal_engine::models::appraisal::{
    AppraisalListFilters, AppraisalRecordStatus, AppraisalSubmitInput, RatingEntry,
};
use appraisal_engine::models::assignment::AssignmentStatus;
use appraisal_engine::models::dispute::DisputeCreateInput;
use appraisal_engine::models::principal::Principal;
use appraisal_engine::models::template::TemplateCriterion;
use appraisal_engine::services::directory::{EmployeeDirectory, SqliteDirectory};
use common::{
    assignment_input, cycle_input, day, harness, hr, rating, template_input, Harness,
};

fn submit_values(
    h: &Harness,
    assignment_id: &str,
    values: &[f64],
) -> Result<appraisal_engine::models::appraisal::AppraisalRecord, AppError> {
    h.state.appraisals().submit_record(
        AppraisalSubmitInput {
            assignment_id: assignment_id.into(),
            ratings: values
                .iter()
                .enumerate()
                .map(|(index, value)| rating(&format!("c{index}"), *value))
                .collect(),
        },
        &Principal::manager("m1"),
    )
}

#[test]
fn ratings_inside_scale_sum_to_total_score() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    let assignment = h.assign(&cycle, &template, "e1");

    let record = submit_values(&h, &assignment.id, &[4.0, 5.0]).expect("submit");
    assert_eq!(record.total_score, 9.0);
    assert_eq!(record.status, AppraisalRecordStatus::ManagerSubmitted);
    assert_eq!(record.assignment_id, assignment.id);
    assert_eq!(record.manager_profile_id, "m1");

    let stored = h
        .state
        .assignments()
        .get_assignment_by_id(&assignment.id, &hr())
        .expect("assignment");
    assert_eq!(stored.status, AssignmentStatus::Submitted);
    assert_eq!(stored.latest_appraisal_id.as_deref(), Some(record.id.as_str()));
    assert!(stored.submitted_at.is_some());
}

#[test]
fn ratings_outside_scale_are_rejected_without_side_effects() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    let assignment = h.assign(&cycle, &template, "e1");

    for values in [[0.0, 3.0], [3.0, 6.0], [5.01, 1.0]] {
        let err = submit_values(&h, &assignment.id, &values).unwrap_err();
        assert!(err.is_validation(), "values {values:?}");
    }

    let stored = h
        .state
        .assignments()
        .get_assignment_by_id(&assignment.id, &hr())
        .expect("assignment");
    assert_eq!(stored.status, AssignmentStatus::NotStarted);
    assert!(h
        .state
        .appraisals()
        .list_records(AppraisalListFilters::default())
        .expect("records")
        .is_empty());
}

#[test]
fn weighted_scores_drive_the_total() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    let assignment = h.assign(&cycle, &template, "e1");

    let record = h
        .state
        .appraisals()
        .submit_record(
            AppraisalSubmitInput {
                assignment_id: assignment.id.clone(),
                ratings: vec![
                    RatingEntry {
                        weighted_score: Some(2.5),
                        ..rating("quality", 5.0)
                    },
                    RatingEntry {
                        rating_value: None,
                        weighted_score: Some(1.5),
                        ..rating("delivery", 0.0)
                    },
                ],
            },
            &Principal::manager("m1"),
        )
        .expect("submit");
    assert_eq!(record.total_score, 4.0);
}

#[test]
fn empty_or_valueless_ratings_are_rejected() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    let assignment = h.assign(&cycle, &template, "e1");

    assert!(submit_values(&h, &assignment.id, &[]).unwrap_err().is_validation());

    let err = h
        .state
        .appraisals()
        .submit_record(
            AppraisalSubmitInput {
                assignment_id: assignment.id.clone(),
                ratings: vec![RatingEntry {
                    rating_value: None,
                    ..rating("quality", 0.0)
                }],
            },
            &Principal::manager("m1"),
        )
        .unwrap_err();
    assert!(err.is_validation());

    assert!(submit_values(&h, "missing", &[3.0]).unwrap_err().is_validation());
}

#[test]
fn submission_only_from_open_statuses() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    let assignment = h.assign(&cycle, &template, "e1");

    h.state
        .assignments()
        .start_assignment(&assignment.id, &Principal::manager("m1"))
        .expect("start");
    submit_values(&h, &assignment.id, &[3.0]).expect("submit from in progress");

    let err = submit_values(&h, &assignment.id, &[3.0]).unwrap_err();
    assert!(err.is_conflict());
}

#[test]
fn only_the_assigned_manager_or_hr_submits() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    let assignment = h.assign(&cycle, &template, "e1");

    let err = h
        .state
        .appraisals()
        .submit_record(
            AppraisalSubmitInput {
                assignment_id: assignment.id.clone(),
                ratings: vec![rating("quality", 3.0)],
            },
            &Principal::manager("head1"),
        )
        .unwrap_err();
    assert!(err.is_forbidden());

    let record = h
        .state
        .appraisals()
        .submit_record(
            AppraisalSubmitInput {
                assignment_id: assignment.id.clone(),
                ratings: vec![rating("quality", 3.0)],
            },
            &hr(),
        )
        .expect("hr submits on behalf");
    assert_eq!(record.manager_profile_id, "m1");
}

#[test]
fn template_criteria_shape_the_submission() {
    let h = harness();
    let mut input = template_input("Criteria");
    input.criteria = vec![
        TemplateCriterion {
            key: "quality".into(),
            title: "Quality".into(),
            details: None,
            weight: None,
            max_score: None,
            required: true,
        },
        TemplateCriterion {
            key: "growth".into(),
            title: "Growth".into(),
            details: None,
            weight: None,
            max_score: None,
            required: false,
        },
    ];
    input.rating_scale.labels = vec![
        "Poor".into(),
        "Fair".into(),
        "Good".into(),
        "Strong".into(),
        "Outstanding".into(),
    ];
    let template = h.state.templates().create_template(input).expect("template");
    let cycle = h
        .state
        .cycles()
        .create_cycle(cycle_input("Criteria cycle", &template.id, &["d1"], day(0), day(60)))
        .expect("cycle");
    let assignment = h
        .state
        .assignments()
        .bulk_assign(vec![assignment_input(&cycle, &template, "e1", Some("m1"), "d1")])
        .expect("assign")
        .remove(0);

    let submit = |ratings: Vec<RatingEntry>| {
        h.state.appraisals().submit_record(
            AppraisalSubmitInput {
                assignment_id: assignment.id.clone(),
                ratings,
            },
            &Principal::manager("m1"),
        )
    };

    assert!(submit(vec![rating("growth", 4.0)]).unwrap_err().is_validation());
    assert!(submit(vec![rating("quality", 4.0), rating("unknown", 2.0)])
        .unwrap_err()
        .is_validation());

    let record = submit(vec![rating("quality", 4.0), rating("growth", 5.0)]).expect("submit");
    assert_eq!(record.ratings[0].rating_label.as_deref(), Some("Strong"));
    assert_eq!(record.ratings[1].rating_label.as_deref(), Some("Outstanding"));
}

#[test]
fn publish_stamps_record_history_and_assignment() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    let assignment = h.assign(&cycle, &template, "e1");
    let record = submit_values(&h, &assignment.id, &[4.0, 5.0]).expect("submit");

    h.clock.set(day(10));
    let published = h
        .state
        .appraisals()
        .publish_record(&record.id, Some("hr1"))
        .expect("publish");
    assert_eq!(published.status, AppraisalRecordStatus::HrPublished);
    assert_eq!(published.hr_published_at, Some(day(10)));
    assert_eq!(published.published_by_employee_id.as_deref(), Some("hr1"));

    let stored = h
        .state
        .assignments()
        .get_assignment_by_id(&assignment.id, &hr())
        .expect("assignment");
    assert_eq!(stored.status, AssignmentStatus::Published);
    assert_eq!(stored.published_at, Some(day(10)));

    let history = h
        .db
        .with_connection(|conn| SqliteDirectory.list_appraisal_history(conn, "e1"))
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].appraisal_id, record.id);
    assert_eq!(history[0].total_score, 9.0);

    let again = h
        .state
        .appraisals()
        .publish_record(&record.id, None)
        .unwrap_err();
    assert!(again.is_conflict());
}

#[test]
fn publish_rejects_unknown_publisher() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    let assignment = h.assign(&cycle, &template, "e1");
    let record = submit_values(&h, &assignment.id, &[3.0]).expect("submit");

    let err = h
        .state
        .appraisals()
        .publish_record(&record.id, Some("ghost"))
        .unwrap_err();
    assert!(err.is_validation());

    let stored = h
        .state
        .appraisals()
        .get_record_by_id(&record.id, &hr())
        .expect("record");
    assert_eq!(stored.status, AppraisalRecordStatus::ManagerSubmitted);
}

#[test]
fn publish_in_closed_cycle_is_a_conflict() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    let assignment = h.assign(&cycle, &template, "e1");
    let record = submit_values(&h, &assignment.id, &[3.0]).expect("submit");
    h.state.cycles().close_cycle(&cycle.id).expect("close");

    let err = h
        .state
        .appraisals()
        .publish_record(&record.id, Some("hr1"))
        .unwrap_err();
    match err {
        AppError::Conflict { message } => assert_eq!(message, "Cannot publish for a closed cycle"),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[test]
fn acknowledgement_rules() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    let assignment = h.assign(&cycle, &template, "e1");
    let record = submit_values(&h, &assignment.id, &[4.0]).expect("submit");
    let appraisals = h.state.appraisals();

    let unpublished = appraisals
        .acknowledge_record(&record.id, "e1", None, &Principal::employee("e1"))
        .unwrap_err();
    assert!(unpublished.is_conflict());

    appraisals
        .publish_record(&record.id, Some("hr1"))
        .expect("publish");

    let other_employee = appraisals
        .acknowledge_record(&record.id, "e1", None, &Principal::employee("e2"))
        .unwrap_err();
    assert!(other_employee.is_forbidden());

    let mismatch = appraisals
        .acknowledge_record(&record.id, "e2", None, &hr())
        .unwrap_err();
    assert!(mismatch.is_validation());

    let acknowledged = appraisals
        .acknowledge_record(
            &record.id,
            "e1",
            Some("  Thanks for the feedback ".into()),
            &Principal::employee("e1"),
        )
        .expect("acknowledge");
    assert!(acknowledged.employee_acknowledged_at.is_some());
    assert_eq!(
        acknowledged.employee_acknowledgement_comment.as_deref(),
        Some("Thanks for the feedback")
    );

    let stored = h
        .state
        .assignments()
        .get_assignment_by_id(&assignment.id, &hr())
        .expect("assignment");
    assert_eq!(stored.status, AssignmentStatus::Acknowledged);

    let twice = appraisals
        .acknowledge_record(&record.id, "e1", None, &Principal::employee("e1"))
        .unwrap_err();
    assert!(twice.is_conflict());
}

#[test]
fn active_dispute_blocks_acknowledgement() {
    let h = harness();
    let (_cycle, record) = h.published_record();

    h.state
        .disputes()
        .raise_dispute(
            DisputeCreateInput {
                appraisal_id: record.id.clone(),
                raised_by_employee_id: "e1".into(),
                reason: "Scores ignore the Q3 launch".into(),
                details: None,
            },
            &Principal::employee("e1"),
        )
        .expect("raise");

    let err = h
        .state
        .appraisals()
        .acknowledge_record(&record.id, "e1", None, &Principal::employee("e1"))
        .unwrap_err();
    assert!(err.is_conflict());
}

#[test]
fn record_reads_are_scoped() {
    let h = harness();
    let (_cycle, record) = h.published_record();
    let appraisals = h.state.appraisals();

    appraisals
        .get_record_by_id(&record.id, &Principal::employee("e1"))
        .expect("employee");
    appraisals
        .get_record_by_id(&record.id, &Principal::manager("m1"))
        .expect("manager");
    assert!(appraisals
        .get_record_by_id(&record.id, &Principal::employee("e2"))
        .unwrap_err()
        .is_forbidden());
    assert!(appraisals
        .get_record_by_id("missing", &hr())
        .unwrap_err()
        .is_not_found());
}
