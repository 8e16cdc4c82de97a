//! CLI Adapter
//!
//! Command-line interface for the hive.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    BeeCmd, CliApp, Command, HealthCmd, LlmCmd, LocksAction, LocksCmd, PipelineAction, PipelineCmd, SessionsAction,
    SessionsCmd, StartCmd, StatusCmd,
};
