// The async command surface: payload plumbing and error code mapping.

mod common;

use appraisal_engine::commands::appraisals::{
    appraisals_acknowledge, appraisals_get, appraisals_publish, appraisals_submit,
    AcknowledgePayload, PublishPayload,
};
use appraisal_engine::commands::assignments::{assignments_bulk_assign, assignments_for_manager};
use appraisal_engine::commands::cycles::{cycles_activate, cycles_create, cycles_get};
use appraisal_engine::commands::reports::{reports_cycle, reports_export};
use appraisal_engine::commands::settings::{settings_get, settings_update};
use appraisal_engine::commands::templates::{templates_create, templates_list};
use appraisal_engine::models::appraisal::{AppraisalRecordStatus, AppraisalSubmitInput};
use appraisal_engine::models::assignment::AssignmentStatus;
use appraisal_engine::models::principal::Principal;
use appraisal_engine::models::report::ExportFormat;
use appraisal_engine::models::settings::AppraisalSettingsUpdate;
use common::{assignment_input, cycle_input, day, harness, hr, rating, template_input};
use serde_json::json;

#[tokio::test]
async fn full_lifecycle_through_commands() {
    let h = harness();
    let state = &h.state;

    let template = templates_create(state, template_input("Annual"))
        .await
        .expect("template");
    let cycle = cycles_create(
        state,
        cycle_input("FY2025", &template.id, &["d1"], day(0), day(90)),
    )
    .await
    .expect("cycle");
    cycles_activate(state, cycle.id.clone()).await.expect("activate");

    let assignments = assignments_bulk_assign(
        state,
        vec![assignment_input(&cycle, &template, "e1", None, "d1")],
    )
    .await
    .expect("assign");
    assert_eq!(assignments[0].manager_profile_id.as_deref(), Some("head1"));

    let record = appraisals_submit(
        state,
        AppraisalSubmitInput {
            assignment_id: assignments[0].id.clone(),
            ratings: vec![rating("quality", 4.0), rating("delivery", 3.0)],
        },
        Principal::manager("head1"),
    )
    .await
    .expect("submit");
    assert_eq!(record.total_score, 7.0);

    let published = appraisals_publish(
        state,
        record.id.clone(),
        PublishPayload {
            hr_published_by_id: Some("hr1".into()),
        },
    )
    .await
    .expect("publish");
    assert_eq!(published.status, AppraisalRecordStatus::HrPublished);

    appraisals_acknowledge(
        state,
        record.id.clone(),
        AcknowledgePayload {
            employee_id: "e1".into(),
            comment: None,
        },
        Principal::employee("e1"),
    )
    .await
    .expect("acknowledge");

    let mine = assignments_for_manager(state, "head1".into(), Principal::manager("head1"))
        .await
        .expect("manager list");
    assert_eq!(mine[0].status, AssignmentStatus::Acknowledged);

    let report = reports_cycle(state, cycle.id.clone()).await.expect("report");
    assert_eq!(report.acknowledged_records, 1);
    assert_eq!(report.assignments.acknowledged, 1);

    let export = reports_export(state, None).await.expect("export");
    assert_eq!(export.format, ExportFormat::Json);
    assert_eq!(export.record_count, 1);
}

#[tokio::test]
async fn error_codes_follow_the_taxonomy() {
    let h = harness();
    let state = &h.state;

    let template = templates_create(state, template_input("Annual"))
        .await
        .expect("template");
    let duplicate = templates_create(state, template_input("Annual"))
        .await
        .unwrap_err();
    assert_eq!(duplicate.code, "CONFLICT");
    assert_eq!(duplicate.message, "Template name already exists");

    let missing = cycles_get(state, "missing".into()).await.unwrap_err();
    assert_eq!(missing.code, "NOT_FOUND");

    let mut bad_dates = cycle_input("Bad", &template.id, &["d1"], day(10), day(0));
    bad_dates.manager_due_date = None;
    let invalid = cycles_create(state, bad_dates).await.unwrap_err();
    assert_eq!(invalid.code, "VALIDATION_ERROR");

    let forbidden = assignments_for_manager(state, "m1".into(), Principal::employee("e1"))
        .await
        .unwrap_err();
    assert_eq!(forbidden.code, "FORBIDDEN");

    let listed = templates_list(state, None).await.expect("list");
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn out_of_scale_rating_carries_details() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    let assignment = h.assign(&cycle, &template, "e1");

    let err = appraisals_submit(
        &h.state,
        AppraisalSubmitInput {
            assignment_id: assignment.id.clone(),
            ratings: vec![rating("quality", 7.0)],
        },
        Principal::manager("m1"),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code, "VALIDATION_ERROR");
    assert_eq!(err.details, Some(json!({ "key": "quality", "value": 7.0 })));

    let hidden = appraisals_get(&h.state, "missing".into(), hr())
        .await
        .unwrap_err();
    assert_eq!(hidden.code, "NOT_FOUND");
}

#[tokio::test]
async fn settings_round_trip_and_validation() {
    let h = harness();
    let state = &h.state;

    let defaults = settings_get(state).await.expect("defaults");
    assert_eq!(defaults.dispute_window_days, 7);
    assert_eq!(defaults.default_assignment_status, AssignmentStatus::NotStarted);
    assert!(defaults.manager_fallback_to_department_head);
    assert_eq!(defaults.trend_history_limit, 10);

    let updated = settings_update(
        state,
        AppraisalSettingsUpdate {
            dispute_window_days: Some(10),
            default_assignment_status: Some(AssignmentStatus::InProgress),
            ..Default::default()
        },
    )
    .await
    .expect("update");
    assert_eq!(updated.dispute_window_days, 10);
    assert_eq!(updated.default_assignment_status, AssignmentStatus::InProgress);

    let reread = settings_get(state).await.expect("reread");
    assert_eq!(reread, updated);

    let rejected = settings_update(
        state,
        AppraisalSettingsUpdate {
            dispute_window_days: Some(0),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(rejected.code, "VALIDATION_ERROR");

    let published_default = settings_update(
        state,
        AppraisalSettingsUpdate {
            default_assignment_status: Some(AssignmentStatus::Published),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(published_default.code, "VALIDATION_ERROR");
}
