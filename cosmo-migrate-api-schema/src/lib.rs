pub mod organization;
pub mod workspace;
