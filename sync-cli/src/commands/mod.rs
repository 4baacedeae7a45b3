//! CLI command implementations.

pub mod create;
pub mod get;
pub mod info;
pub mod update;
