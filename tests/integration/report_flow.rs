// Rollups, trends and exports over a small populated cycle.

mod common;

use appraisal_engine::models::appraisal::AppraisalRecord;
use appraisal_engine::models::cycle::AppraisalCycle;
use appraisal_engine::models::dispute::DisputeCreateInput;
use appraisal_engine::models::principal::Principal;
use appraisal_engine::models::report::ExportFormat;
use appraisal_engine::models::template::AppraisalTemplate;
use common::{assignment_input, cycle_input, day, harness, hr, Harness};

struct Populated {
    template: AppraisalTemplate,
    cycle: AppraisalCycle,
    published: AppraisalRecord,
}

/// e1 published with 9, e2 submitted with 3, e3 (d2) not started, one open dispute on e1.
fn populate(h: &Harness) -> Populated {
    let (template, cycle) = h.active_cycle();
    let first = h.assign(&cycle, &template, "e1");
    let second = h.assign(&cycle, &template, "e2");
    h.state
        .assignments()
        .bulk_assign(vec![assignment_input(&cycle, &template, "e3", Some("m1"), "d2")])
        .expect("assign e3");

    let record = h.submit(&first, &[4.0, 5.0]);
    let published = h
        .state
        .appraisals()
        .publish_record(&record.id, Some("hr1"))
        .expect("publish");
    h.submit(&second, &[3.0]);

    h.state
        .disputes()
        .raise_dispute(
            DisputeCreateInput {
                appraisal_id: published.id.clone(),
                raised_by_employee_id: "e1".into(),
                reason: "Missing context on delivery".into(),
                details: None,
            },
            &Principal::employee("e1"),
        )
        .expect("dispute");

    Populated {
        template,
        cycle,
        published,
    }
}

#[test]
fn cycle_report_counts_statuses_scores_and_disputes() {
    let h = harness();
    let data = populate(&h);

    let report = h
        .state
        .reports()
        .generate_cycle_report(&data.cycle.id)
        .expect("cycle report");
    assert_eq!(report.cycle_name, "FY2025");
    assert_eq!(report.total_assignments, 3);
    assert_eq!(report.assignments.not_started, 1);
    assert_eq!(report.assignments.submitted, 1);
    assert_eq!(report.assignments.published, 1);
    assert_eq!(report.submitted_records, 1);
    assert_eq!(report.published_records, 1);
    assert_eq!(report.acknowledged_records, 0);
    assert_eq!(report.average_score, Some(9.0));
    assert_eq!(report.disputes.total, 1);
    assert_eq!(report.disputes.open, 1);

    assert!(h
        .state
        .reports()
        .generate_cycle_report("missing")
        .unwrap_err()
        .is_not_found());
}

#[test]
fn department_report_completion_rate() {
    let h = harness();
    let data = populate(&h);
    let reports = h.state.reports();

    let engineering = reports
        .generate_department_report("d1", Some(&data.cycle.id))
        .expect("d1 report");
    assert_eq!(engineering.total_assignments, 2);
    assert_eq!(engineering.completed_assignments, 1);
    assert_eq!(engineering.completion_rate, 50.0);
    assert_eq!(engineering.average_score, Some(9.0));

    let sales = reports
        .generate_department_report("d2", None)
        .expect("d2 report");
    assert_eq!(sales.total_assignments, 1);
    assert_eq!(sales.completion_rate, 0.0);
    assert_eq!(sales.average_score, None);

    assert!(reports
        .generate_department_report("d9", None)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn department_without_assignments_reports_zero() {
    let h = harness();
    let report = h
        .state
        .reports()
        .generate_department_report("d2", None)
        .expect("empty report");
    assert_eq!(report.total_assignments, 0);
    assert_eq!(report.completion_rate, 0.0);
    assert_eq!(report.average_score, None);
}

#[test]
fn department_progress_breaks_down_statuses() {
    let h = harness();
    let data = populate(&h);

    let progress = h
        .state
        .reports()
        .get_department_progress("d1", Some(&data.cycle.id))
        .expect("progress");
    assert_eq!(progress.total, 2);
    assert_eq!(progress.breakdown.submitted, 1);
    assert_eq!(progress.breakdown.published, 1);
    assert_eq!(progress.breakdown.not_started, 0);
}

#[test]
fn employee_trend_is_newest_first_and_limited() {
    let h = harness();
    let data = populate(&h);
    h.state.cycles().close_cycle(&data.cycle.id).expect("close first cycle");

    h.clock.set(day(130));
    let next = h
        .state
        .cycles()
        .create_cycle(cycle_input("FY2026", &data.template.id, &["d1"], day(130), day(250)))
        .expect("second cycle");
    h.state.cycles().activate_cycle(&next.id).expect("activate");
    let assignment = h.assign(&next, &data.template, "e1");
    let record = h.submit(&assignment, &[2.0, 3.0]);
    h.state
        .appraisals()
        .publish_record(&record.id, Some("hr1"))
        .expect("publish second");

    let reports = h.state.reports();
    let trend = reports
        .get_employee_trend("e1", None, &Principal::employee("e1"))
        .expect("trend");
    assert_eq!(trend.len(), 2);
    assert_eq!(trend[0].cycle_name, "FY2026");
    assert_eq!(trend[0].total_score, 5.0);
    assert_eq!(trend[1].appraisal_id, data.published.id);
    assert_eq!(trend[1].total_score, 9.0);

    let latest = reports
        .get_employee_trend("e1", Some(1), &hr())
        .expect("limited trend");
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].cycle_id, next.id);

    assert!(reports
        .get_employee_trend("e1", Some(0), &hr())
        .unwrap_err()
        .is_validation());
    assert!(reports
        .get_employee_trend("e1", None, &Principal::employee("e2"))
        .unwrap_err()
        .is_forbidden());

    // Submitted but unpublished records never show up.
    let unpublished = reports
        .get_employee_trend("e2", None, &hr())
        .expect("e2 trend");
    assert!(unpublished.is_empty());
}

#[test]
fn exports_cover_every_record() {
    let h = harness();
    populate(&h);
    let reports = h.state.reports();

    let csv = reports.export_all_records(ExportFormat::Csv).expect("csv");
    assert_eq!(csv.content_type, "text/csv");
    assert_eq!(csv.record_count, 2);
    let lines: Vec<&str> = csv
        .content
        .split("\r\n")
        .filter(|line| !line.is_empty())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "recordId,assignmentId,cycleId,templateId,employeeProfileId,managerProfileId,status,totalScore,managerSubmittedAt,hrPublishedAt,employeeAcknowledgedAt"
    );
    assert!(csv.content.contains(",HR_PUBLISHED,9,"));
    assert!(csv.content.contains(",MANAGER_SUBMITTED,3,"));

    let json = reports.export_all_records(ExportFormat::Json).expect("json");
    assert_eq!(json.content_type, "application/json");
    let parsed: Vec<serde_json::Value> = serde_json::from_str(&json.content).expect("valid json");
    assert_eq!(parsed.len(), 2);
    assert!(parsed.iter().all(|record| record.get("totalScore").is_some()));
}

#[test]
fn dashboard_stats_summarise_the_store() {
    let h = harness();
    populate(&h);

    let stats = h.state.reports().dashboard_stats().expect("stats");
    assert_eq!(stats.active_templates, 1);
    assert_eq!(stats.active_cycles, 1);
    assert_eq!(stats.planned_cycles, 0);
    assert_eq!(stats.assignments.total(), 3);
    assert_eq!(stats.submitted_records, 1);
    assert_eq!(stats.published_records, 1);
    assert_eq!(stats.active_disputes, 1);
    assert_eq!(stats.average_published_score, Some(9.0));
}
