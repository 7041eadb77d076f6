pub mod add;
pub mod auth_cmd;
pub mod common;
pub mod config;
pub mod edit;
pub mod list;
pub mod status;
pub mod sync;
