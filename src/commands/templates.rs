use crate::models::template::{
    AppraisalTemplate, TemplateCreateInput, TemplateListFilters, TemplateUpdateInput,
};

use super::{run_blocking, AppState, CommandResult};

pub async fn templates_create(
    state: &AppState,
    payload: TemplateCreateInput,
) -> CommandResult<AppraisalTemplate> {
    let service = state.templates();
    run_blocking("templates_create", move || service.create_template(payload)).await
}

pub async fn templates_update(
    state: &AppState,
    id: String,
    payload: TemplateUpdateInput,
) -> CommandResult<AppraisalTemplate> {
    let service = state.templates();
    run_blocking("templates_update", move || {
        service.update_template(&id, payload)
    })
    .await
}

pub async fn templates_deactivate(
    state: &AppState,
    id: String,
) -> CommandResult<AppraisalTemplate> {
    let service = state.templates();
    run_blocking("templates_deactivate", move || {
        service.deactivate_template(&id)
    })
    .await
}

pub async fn templates_get(state: &AppState, id: String) -> CommandResult<AppraisalTemplate> {
    let service = state.templates();
    run_blocking("templates_get", move || service.get_template(&id)).await
}

pub async fn templates_list(
    state: &AppState,
    filters: Option<TemplateListFilters>,
) -> CommandResult<Vec<AppraisalTemplate>> {
    let service = state.templates();
    run_blocking("templates_list", move || {
        service.list_templates(filters.unwrap_or_default())
    })
    .await
}
