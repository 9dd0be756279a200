//! CLI command implementations.

pub(crate) mod config;
pub(crate) mod run;
pub(crate) mod send;
