use crate::models::assignment::{AppraisalAssignment, AssignmentCreateInput};
use crate::models::principal::Principal;

use super::{run_blocking, AppState, CommandResult};

pub async fn assignments_bulk_assign(
    state: &AppState,
    items: Vec<AssignmentCreateInput>,
) -> CommandResult<Vec<AppraisalAssignment>> {
    let service = state.assignments();
    run_blocking("assignments_bulk_assign", move || service.bulk_assign(items)).await
}

pub async fn assignments_for_manager(
    state: &AppState,
    manager_id: String,
    actor: Principal,
) -> CommandResult<Vec<AppraisalAssignment>> {
    let service = state.assignments();
    run_blocking("assignments_for_manager", move || {
        service.get_assignments_for_manager(&manager_id, &actor)
    })
    .await
}

pub async fn assignments_for_employee(
    state: &AppState,
    employee_id: String,
    actor: Principal,
) -> CommandResult<Vec<AppraisalAssignment>> {
    let service = state.assignments();
    run_blocking("assignments_for_employee", move || {
        service.get_assignments_for_employee(&employee_id, &actor)
    })
    .await
}

pub async fn assignments_for_cycle(
    state: &AppState,
    cycle_id: String,
) -> CommandResult<Vec<AppraisalAssignment>> {
    let service = state.assignments();
    run_blocking("assignments_for_cycle", move || {
        service.list_assignments_for_cycle(&cycle_id)
    })
    .await
}

pub async fn assignments_get(
    state: &AppState,
    id: String,
    actor: Principal,
) -> CommandResult<AppraisalAssignment> {
    let service = state.assignments();
    run_blocking("assignments_get", move || {
        service.get_assignment_by_id(&id, &actor)
    })
    .await
}

pub async fn assignments_start(
    state: &AppState,
    id: String,
    actor: Principal,
) -> CommandResult<AppraisalAssignment> {
    let service = state.assignments();
    run_blocking("assignments_start", move || {
        service.start_assignment(&id, &actor)
    })
    .await
}
