//! triagectl library - exposes modules for integration tests

pub mod cli;
pub mod commands;
pub mod elevation;
pub mod logging;
pub mod output;
pub mod prompt;
