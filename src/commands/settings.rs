use crate::models::settings::{AppraisalSettings, AppraisalSettingsUpdate};

use super::{run_blocking, AppState, CommandResult};

pub async fn settings_get(state: &AppState) -> CommandResult<AppraisalSettings> {
    let service = state.settings();
    run_blocking("settings_get", move || service.get()).await
}

pub async fn settings_update(
    state: &AppState,
    payload: AppraisalSettingsUpdate,
) -> CommandResult<AppraisalSettings> {
    let service = state.settings();
    run_blocking("settings_update", move || service.update(payload)).await
}
