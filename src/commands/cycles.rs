use crate::models::cycle::{AppraisalCycle, CycleCreateInput, CycleListFilters};

use super::{run_blocking, AppState, CommandResult};

pub async fn cycles_create(
    state: &AppState,
    payload: CycleCreateInput,
) -> CommandResult<AppraisalCycle> {
    let service = state.cycles();
    run_blocking("cycles_create", move || service.create_cycle(payload)).await
}

pub async fn cycles_activate(state: &AppState, id: String) -> CommandResult<AppraisalCycle> {
    let service = state.cycles();
    run_blocking("cycles_activate", move || service.activate_cycle(&id)).await
}

pub async fn cycles_close(state: &AppState, id: String) -> CommandResult<AppraisalCycle> {
    let service = state.cycles();
    run_blocking("cycles_close", move || service.close_cycle(&id)).await
}

pub async fn cycles_get(state: &AppState, id: String) -> CommandResult<AppraisalCycle> {
    let service = state.cycles();
    run_blocking("cycles_get", move || service.get_cycle(&id)).await
}

pub async fn cycles_list(
    state: &AppState,
    filters: Option<CycleListFilters>,
) -> CommandResult<Vec<AppraisalCycle>> {
    let service = state.cycles();
    run_blocking("cycles_list", move || {
        service.list_cycles(filters.unwrap_or_default())
    })
    .await
}
