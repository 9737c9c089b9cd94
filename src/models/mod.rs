pub mod project;
pub mod vacancy;
