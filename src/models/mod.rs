pub mod appraisal;
pub mod assignment;
pub mod cycle;
pub mod directory;
pub mod dispute;
pub mod principal;
pub mod report;
pub mod settings;
pub mod template;
