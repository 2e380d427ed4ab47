use crate::models::dispute::{
    AppraisalDispute, DisputeCreateInput, DisputeListFilters, DisputeResolutionInput,
};
use crate::models::principal::Principal;

use super::{run_blocking, AppState, CommandResult};

pub async fn disputes_raise(
    state: &AppState,
    payload: DisputeCreateInput,
    actor: Principal,
) -> CommandResult<AppraisalDispute> {
    let service = state.disputes();
    run_blocking("disputes_raise", move || service.raise_dispute(payload, &actor)).await
}

pub async fn disputes_review(state: &AppState, id: String) -> CommandResult<AppraisalDispute> {
    let service = state.disputes();
    run_blocking("disputes_review", move || service.review_dispute(&id)).await
}

pub async fn disputes_resolve(
    state: &AppState,
    id: String,
    payload: DisputeResolutionInput,
) -> CommandResult<AppraisalDispute> {
    let service = state.disputes();
    run_blocking("disputes_resolve", move || {
        service.resolve_dispute(&id, payload)
    })
    .await
}

pub async fn disputes_get(
    state: &AppState,
    id: String,
    actor: Principal,
) -> CommandResult<AppraisalDispute> {
    let service = state.disputes();
    run_blocking("disputes_get", move || service.get_dispute_by_id(&id, &actor)).await
}

pub async fn disputes_list(
    state: &AppState,
    filters: Option<DisputeListFilters>,
) -> CommandResult<Vec<AppraisalDispute>> {
    let service = state.disputes();
    run_blocking("disputes_list", move || {
        service.list_disputes(filters.unwrap_or_default())
    })
    .await
}
