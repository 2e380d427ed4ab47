use serde::Deserialize;

use crate::models::appraisal::{AppraisalListFilters, AppraisalRecord, AppraisalSubmitInput};
use crate::models::principal::Principal;

use super::{run_blocking, AppState, CommandResult};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishPayload {
    #[serde(default)]
    pub hr_published_by_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgePayload {
    pub employee_id: String,
    #[serde(default)]
    pub comment: Option<String>,
}

pub async fn appraisals_submit(
    state: &AppState,
    payload: AppraisalSubmitInput,
    actor: Principal,
) -> CommandResult<AppraisalRecord> {
    let service = state.appraisals();
    run_blocking("appraisals_submit", move || {
        service.submit_record(payload, &actor)
    })
    .await
}

pub async fn appraisals_publish(
    state: &AppState,
    id: String,
    payload: PublishPayload,
) -> CommandResult<AppraisalRecord> {
    let service = state.appraisals();
    run_blocking("appraisals_publish", move || {
        service.publish_record(&id, payload.hr_published_by_id.as_deref())
    })
    .await
}

pub async fn appraisals_acknowledge(
    state: &AppState,
    id: String,
    payload: AcknowledgePayload,
    actor: Principal,
) -> CommandResult<AppraisalRecord> {
    let service = state.appraisals();
    run_blocking("appraisals_acknowledge", move || {
        service.acknowledge_record(&id, &payload.employee_id, payload.comment, &actor)
    })
    .await
}

pub async fn appraisals_get(
    state: &AppState,
    id: String,
    actor: Principal,
) -> CommandResult<AppraisalRecord> {
    let service = state.appraisals();
    run_blocking("appraisals_get", move || service.get_record_by_id(&id, &actor)).await
}

pub async fn appraisals_list(
    state: &AppState,
    filters: Option<AppraisalListFilters>,
) -> CommandResult<Vec<AppraisalRecord>> {
    let service = state.appraisals();
    run_blocking("appraisals_list", move || {
        service.list_records(filters.unwrap_or_default())
    })
    .await
}
