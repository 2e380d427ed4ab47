#![allow(dead_code)]

use std::sync::Arc;

use appraisal_engine::commands::AppState;
use appraisal_engine::db::DbPool;
use appraisal_engine::models::appraisal::{AppraisalRecord, AppraisalSubmitInput, RatingEntry};
use appraisal_engine::models::assignment::{AppraisalAssignment, AssignmentCreateInput};
use appraisal_engine::models::cycle::{AppraisalCycle, CycleCreateInput, CycleTemplateAssignment};
use appraisal_engine::models::directory::{Department, EmployeeProfile, Position};
use appraisal_engine::models::principal::Principal;
use appraisal_engine::models::template::{
    AppraisalTemplate, AppraisalType, RatingScale, RatingScaleType, TemplateCreateInput,
};
use appraisal_engine::services::directory::{Directories, SqliteDirectory};
use appraisal_engine::utils::clock::FixedClock;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

pub struct Harness {
    pub state: AppState,
    pub clock: Arc<FixedClock>,
    pub db: DbPool,
    _dir: TempDir,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

pub fn day(offset: i64) -> DateTime<Utc> {
    start_time() + Duration::days(offset)
}

pub fn hr() -> Principal {
    Principal::hr("hr1")
}

/// Seeded store: departments d1 (head `head1`) and d2 (no head), positions p1
/// and p2, employees e1/e2 in d1, e3 in d2, manager m1, head1 and hr1.
pub fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("temp dir");
    let db = DbPool::new(dir.path().join("appraisal.sqlite")).expect("db pool");
    let clock = Arc::new(FixedClock::new(start_time()));
    let state = AppState::with_dependencies(db.clone(), Directories::sqlite(), clock.clone());

    let directory = SqliteDirectory;
    directory
        .upsert_department(
            &db,
            &Department {
                id: "d1".into(),
                name: "Engineering".into(),
                head_employee_id: Some("head1".into()),
            },
        )
        .expect("seed d1");
    directory
        .upsert_department(
            &db,
            &Department {
                id: "d2".into(),
                name: "Sales".into(),
                head_employee_id: None,
            },
        )
        .expect("seed d2");
    for (id, title, department) in [("p1", "Engineer", "d1"), ("p2", "Account Executive", "d2")] {
        directory
            .upsert_position(
                &db,
                &Position {
                    id: id.into(),
                    title: title.into(),
                    department_id: Some(department.into()),
                },
            )
            .expect("seed position");
    }
    for (id, department, position) in [
        ("e1", Some("d1"), Some("p1")),
        ("e2", Some("d1"), Some("p1")),
        ("e3", Some("d2"), Some("p2")),
        ("m1", Some("d1"), None),
        ("head1", Some("d1"), None),
        ("hr1", None, None),
    ] {
        directory
            .upsert_employee(
                &db,
                &EmployeeProfile {
                    id: id.into(),
                    full_name: format!("Employee {id}"),
                    email: Some(format!("{id}@example.com")),
                    department_id: department.map(str::to_string),
                    position_id: position.map(str::to_string),
                },
            )
            .expect("seed employee");
    }

    Harness {
        state,
        clock,
        db,
        _dir: dir,
    }
}

pub fn five_point_scale() -> RatingScale {
    RatingScale {
        scale_type: RatingScaleType::Numeric,
        min: 1.0,
        max: 5.0,
        step: Some(1.0),
        labels: Vec::new(),
    }
}

pub fn template_input(name: &str) -> TemplateCreateInput {
    TemplateCreateInput {
        name: name.into(),
        description: None,
        template_type: AppraisalType::Annual,
        rating_scale: five_point_scale(),
        criteria: Vec::new(),
        applicable_department_ids: vec!["d1".into(), "d2".into()],
        applicable_position_ids: vec!["p1".into(), "p2".into()],
    }
}

pub fn cycle_input(
    name: &str,
    template_id: &str,
    departments: &[&str],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> CycleCreateInput {
    CycleCreateInput {
        name: name.into(),
        description: None,
        cycle_type: AppraisalType::Annual,
        start_date: start,
        end_date: end,
        template_assignments: vec![CycleTemplateAssignment {
            template_id: template_id.into(),
            department_ids: departments.iter().map(|id| id.to_string()).collect(),
        }],
        manager_due_date: Some(end - Duration::days(14)),
        employee_acknowledgement_due_date: Some(end),
    }
}

pub fn assignment_input(
    cycle: &AppraisalCycle,
    template: &AppraisalTemplate,
    employee_id: &str,
    manager_id: Option<&str>,
    department_id: &str,
) -> AssignmentCreateInput {
    AssignmentCreateInput {
        cycle_id: cycle.id.clone(),
        template_id: template.id.clone(),
        employee_profile_id: employee_id.into(),
        manager_profile_id: manager_id.map(str::to_string),
        department_id: department_id.into(),
        position_id: None,
        status: None,
        due_date: None,
    }
}

pub fn rating(key: &str, value: f64) -> RatingEntry {
    RatingEntry {
        key: key.into(),
        title: key.to_uppercase(),
        rating_value: Some(value),
        rating_label: None,
        weighted_score: None,
        comments: None,
    }
}

impl Harness {
    pub fn create_template(&self, name: &str) -> AppraisalTemplate {
        self.state
            .templates()
            .create_template(template_input(name))
            .expect("create template")
    }

    /// A template plus an ACTIVE cycle binding it to d1 and d2.
    pub fn active_cycle(&self) -> (AppraisalTemplate, AppraisalCycle) {
        let template = self.create_template("Annual Review 2025");
        let cycle = self
            .state
            .cycles()
            .create_cycle(cycle_input(
                "FY2025",
                &template.id,
                &["d1", "d2"],
                day(0),
                day(120),
            ))
            .expect("create cycle");
        let cycle = self
            .state
            .cycles()
            .activate_cycle(&cycle.id)
            .expect("activate cycle");
        (template, cycle)
    }

    pub fn assign(
        &self,
        cycle: &AppraisalCycle,
        template: &AppraisalTemplate,
        employee_id: &str,
    ) -> AppraisalAssignment {
        let mut created = self
            .state
            .assignments()
            .bulk_assign(vec![assignment_input(
                cycle,
                template,
                employee_id,
                Some("m1"),
                "d1",
            )])
            .expect("bulk assign");
        created.remove(0)
    }

    pub fn submit(&self, assignment: &AppraisalAssignment, values: &[f64]) -> AppraisalRecord {
        let ratings = values
            .iter()
            .enumerate()
            .map(|(index, value)| rating(&format!("c{index}"), *value))
            .collect();
        self.state
            .appraisals()
            .submit_record(
                AppraisalSubmitInput {
                    assignment_id: assignment.id.clone(),
                    ratings,
                },
                &Principal::manager("m1"),
            )
            .expect("submit record")
    }

    /// Runs an e1 evaluation through submission and publication.
    pub fn published_record(&self) -> (AppraisalCycle, AppraisalRecord) {
        let (template, cycle) = self.active_cycle();
        let assignment = self.assign(&cycle, &template, "e1");
        let record = self.submit(&assignment, &[4.0, 5.0]);
        let published = self
            .state
            .appraisals()
            .publish_record(&record.id, Some("hr1"))
            .expect("publish record");
        (cycle, published)
    }
}
