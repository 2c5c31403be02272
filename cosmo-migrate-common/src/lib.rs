pub mod logger;
pub mod workspace_ref;
