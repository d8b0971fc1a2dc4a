pub mod env;
pub mod tasks;
