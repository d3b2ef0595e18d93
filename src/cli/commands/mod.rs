//! One module per subcommand, each exposing `execute`.

pub mod audit_cmd;
pub mod completions;
pub mod config;
pub mod delete;
pub mod get;
pub mod getall;
pub mod list;
pub mod put;
pub mod setup;
pub mod versions;
