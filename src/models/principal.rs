use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Employee,
    Manager,
    HrManager,
    HrAdmin,
    SystemAdmin,
}

impl Role {
    /// Roles that may act on any employee's appraisal data.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::HrManager | Role::HrAdmin | Role::SystemAdmin)
    }
}

/// The acting user, as resolved by the identity layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub employee_id: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub elevated_roles: Vec<Role>,
}

impl Principal {
    pub fn employee(employee_id: impl Into<String>) -> Self {
        Self {
            employee_id: Some(employee_id.into()),
            role: Role::Employee,
            elevated_roles: Vec::new(),
        }
    }

    pub fn manager(employee_id: impl Into<String>) -> Self {
        Self {
            employee_id: Some(employee_id.into()),
            role: Role::Manager,
            elevated_roles: Vec::new(),
        }
    }

    pub fn hr(employee_id: impl Into<String>) -> Self {
        Self {
            employee_id: Some(employee_id.into()),
            role: Role::HrManager,
            elevated_roles: Vec::new(),
        }
    }

    pub fn is_elevated(&self) -> bool {
        self.role.is_elevated() || self.elevated_roles.iter().any(Role::is_elevated)
    }
}
