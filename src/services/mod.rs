pub mod access;
pub mod appraisal_service;
pub mod assignment_service;
pub mod cycle_service;
pub mod directory;
pub mod dispute_service;
pub mod report_service;
pub mod settings_service;
pub mod template_service;
