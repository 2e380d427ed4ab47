use crate::error::{AppError, AppResult};
use crate::models::principal::Principal;

/// True when `principal` may act on data owned by `target_employee_id`:
/// elevated roles act on anyone, everyone else only on themselves.
pub fn can_act_on(principal: &Principal, target_employee_id: &str) -> bool {
    if principal.is_elevated() {
        return true;
    }
    principal
        .employee_id
        .as_deref()
        .map(|own| own == target_employee_id)
        .unwrap_or(false)
}

pub fn ensure_can_act_on(principal: &Principal, target_employee_id: &str) -> AppResult<()> {
    if can_act_on(principal, target_employee_id) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "Not allowed to act on behalf of employee {target_employee_id}"
        )))
    }
}
