pub mod appraisal_repository;
pub mod assignment_repository;
pub mod codec;
pub mod cycle_repository;
pub mod directory_repository;
pub mod dispute_repository;
pub mod settings_repository;
pub mod template_repository;
