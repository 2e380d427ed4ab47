// Bulk assignment resolution and scoped assignment reads.

mod common;

use appraisal_engine::models::assignment::AssignmentStatus;
use appraisal_engine::models::principal::Principal;
use appraisal_engine::models::settings::AppraisalSettingsUpdate;
use appraisal_engine::models::template::TemplateCreateInput;
use common::{assignment_input, cycle_input, day, harness, hr, template_input};

#[test]
fn resolvable_manager_creates_not_started_assignment() {
    let h = harness();
    let (template, cycle) = h.active_cycle();

    let created = h
        .state
        .assignments()
        .bulk_assign(vec![assignment_input(&cycle, &template, "e1", Some("m1"), "d1")])
        .expect("bulk assign");
    assert_eq!(created.len(), 1);
    let assignment = &created[0];
    assert_eq!(assignment.manager_profile_id.as_deref(), Some("m1"));
    assert_eq!(assignment.status, AssignmentStatus::NotStarted);
    assert_eq!(assignment.due_date, cycle.manager_due_date);
}

#[test]
fn missing_manager_without_department_head_is_rejected() {
    let h = harness();
    let (template, cycle) = h.active_cycle();

    // d2 has no head, so nothing can stand in for the manager.
    let err = h
        .state
        .assignments()
        .bulk_assign(vec![assignment_input(&cycle, &template, "e3", None, "d2")])
        .unwrap_err();
    assert!(err.is_validation());

    let created = h
        .state
        .assignments()
        .bulk_assign(vec![assignment_input(&cycle, &template, "e3", Some("m1"), "d2")])
        .expect("explicit manager");
    assert_eq!(created[0].manager_profile_id.as_deref(), Some("m1"));
}

#[test]
fn department_head_stands_in_for_missing_manager() {
    let h = harness();
    let (template, cycle) = h.active_cycle();

    let created = h
        .state
        .assignments()
        .bulk_assign(vec![assignment_input(&cycle, &template, "e1", None, "d1")])
        .expect("fallback to head");
    assert_eq!(created[0].manager_profile_id.as_deref(), Some("head1"));

    h.state
        .settings()
        .update(AppraisalSettingsUpdate {
            manager_fallback_to_department_head: Some(false),
            ..Default::default()
        })
        .expect("disable fallback");
    let err = h
        .state
        .assignments()
        .bulk_assign(vec![assignment_input(&cycle, &template, "e2", None, "d1")])
        .unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn unresolved_references_fail_with_validation() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    let assignments = h.state.assignments();

    let unknown_employee = assignment_input(&cycle, &template, "ghost", Some("m1"), "d1");
    assert!(assignments.bulk_assign(vec![unknown_employee]).unwrap_err().is_validation());

    let unknown_manager = assignment_input(&cycle, &template, "e1", Some("ghost"), "d1");
    assert!(assignments.bulk_assign(vec![unknown_manager]).unwrap_err().is_validation());

    let mut unknown_position = assignment_input(&cycle, &template, "e1", Some("m1"), "d1");
    unknown_position.position_id = Some("p9".into());
    assert!(assignments.bulk_assign(vec![unknown_position]).unwrap_err().is_validation());

    let mut unknown_cycle = assignment_input(&cycle, &template, "e1", Some("m1"), "d1");
    unknown_cycle.cycle_id = "missing".into();
    assert!(assignments.bulk_assign(vec![unknown_cycle]).unwrap_err().is_validation());

    assert!(assignments.bulk_assign(Vec::new()).unwrap_err().is_validation());
}

#[test]
fn eligibility_mismatches_are_conflicts() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    let assignments = h.state.assignments();

    // e3 belongs to d2.
    let wrong_department = assignment_input(&cycle, &template, "e3", Some("m1"), "d1");
    assert!(assignments.bulk_assign(vec![wrong_department]).unwrap_err().is_conflict());

    let narrow = h
        .state
        .templates()
        .create_template(TemplateCreateInput {
            applicable_department_ids: vec!["d2".into()],
            applicable_position_ids: vec!["p2".into()],
            ..template_input("Sales only")
        })
        .expect("narrow template");
    let not_applicable = assignment_input(&cycle, &narrow, "e1", Some("m1"), "d1");
    assert!(assignments.bulk_assign(vec![not_applicable]).unwrap_err().is_conflict());

    let mut wrong_position = assignment_input(&cycle, &narrow, "e3", Some("m1"), "d2");
    wrong_position.position_id = Some("p1".into());
    assert!(assignments.bulk_assign(vec![wrong_position]).unwrap_err().is_conflict());
}

#[test]
fn duplicate_triple_is_a_conflict_and_batches_are_atomic() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    let assignments = h.state.assignments();

    assignments
        .bulk_assign(vec![assignment_input(&cycle, &template, "e1", Some("m1"), "d1")])
        .expect("first");

    let batch = vec![
        assignment_input(&cycle, &template, "e2", Some("m1"), "d1"),
        assignment_input(&cycle, &template, "e1", Some("m1"), "d1"),
    ];
    assert!(assignments.bulk_assign(batch).unwrap_err().is_conflict());

    let within_batch = vec![
        assignment_input(&cycle, &template, "e2", Some("m1"), "d1"),
        assignment_input(&cycle, &template, "e2", Some("m1"), "d1"),
    ];
    assert!(assignments.bulk_assign(within_batch).unwrap_err().is_conflict());

    let listed = assignments
        .list_assignments_for_cycle(&cycle.id)
        .expect("list");
    assert_eq!(listed.len(), 1, "rejected batches must not leave partial rows");
    assert_eq!(listed[0].employee_profile_id, "e1");
}

#[test]
fn closed_cycle_accepts_no_new_assignments() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    h.state.cycles().close_cycle(&cycle.id).expect("close");

    let err = h
        .state
        .assignments()
        .bulk_assign(vec![assignment_input(&cycle, &template, "e1", Some("m1"), "d1")])
        .unwrap_err();
    assert!(err.is_conflict());
}

#[test]
fn caller_status_and_due_date_are_honoured() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    let mut input = assignment_input(&cycle, &template, "e1", Some("m1"), "d1");
    input.status = Some(AssignmentStatus::InProgress);
    input.due_date = Some(day(30));

    let created = h.state.assignments().bulk_assign(vec![input]).expect("assign");
    assert_eq!(created[0].status, AssignmentStatus::InProgress);
    assert_eq!(created[0].due_date, Some(day(30)));

    let mut published = assignment_input(&cycle, &template, "e2", Some("m1"), "d1");
    published.status = Some(AssignmentStatus::Published);
    assert!(h
        .state
        .assignments()
        .bulk_assign(vec![published])
        .unwrap_err()
        .is_validation());
}

#[test]
fn assignment_reads_are_scoped_to_self_or_elevated() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    let assignment = h.assign(&cycle, &template, "e1");
    let assignments = h.state.assignments();

    let own = assignments
        .get_assignments_for_manager("m1", &Principal::manager("m1"))
        .expect("own list");
    assert_eq!(own.len(), 1);

    let err = assignments
        .get_assignments_for_manager("m1", &Principal::manager("head1"))
        .unwrap_err();
    assert!(err.is_forbidden());

    let err = assignments
        .get_assignments_for_employee("e1", &Principal::employee("e2"))
        .unwrap_err();
    assert!(err.is_forbidden());

    let via_hr = assignments
        .get_assignments_for_employee("e1", &hr())
        .expect("hr list");
    assert_eq!(via_hr.len(), 1);

    assignments
        .get_assignment_by_id(&assignment.id, &Principal::employee("e1"))
        .expect("employee sees own assignment");
    assignments
        .get_assignment_by_id(&assignment.id, &Principal::manager("m1"))
        .expect("manager sees assignment");
    assert!(assignments
        .get_assignment_by_id(&assignment.id, &Principal::employee("e2"))
        .unwrap_err()
        .is_forbidden());
}

#[test]
fn start_moves_not_started_to_in_progress() {
    let h = harness();
    let (template, cycle) = h.active_cycle();
    let assignment = h.assign(&cycle, &template, "e1");
    let assignments = h.state.assignments();

    assert!(assignments
        .start_assignment(&assignment.id, &Principal::manager("head1"))
        .unwrap_err()
        .is_forbidden());

    let started = assignments
        .start_assignment(&assignment.id, &Principal::manager("m1"))
        .expect("start");
    assert_eq!(started.status, AssignmentStatus::InProgress);
    assert!(assignments
        .start_assignment(&assignment.id, &Principal::manager("m1"))
        .unwrap_err()
        .is_conflict());
}

#[test]
fn planned_cycle_accepts_assignments() {
    let h = harness();
    let template = h.create_template("Annual");
    let cycle = h
        .state
        .cycles()
        .create_cycle(cycle_input("Planned", &template.id, &["d1"], day(0), day(60)))
        .expect("planned cycle");

    let created = h
        .state
        .assignments()
        .bulk_assign(vec![assignment_input(&cycle, &template, "e1", Some("m1"), "d1")])
        .expect("assign in planned cycle");
    assert_eq!(created[0].cycle_id, cycle.id);
}
