//! CLI Commands
//!
//! Argument definitions for every `hive` subcommand.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// OMK Hive - bee task dispatch with multi-provider LLM routing
#[derive(Parser, Debug)]
#[command(
    name = "hive",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Bee task dispatch, LLM routing and coordination for OMK liquidity operations",
    long_about = "The hive runs blockchain, liquidity sentinel and data pipeline bees on \
                  Ethereum and Solana, routes LLM requests across Gemini, OpenAI and \
                  Anthropic, and coordinates instances through Redis locks and sessions."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE", default_value = "config/hive.toml")]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the hive scheduler loop
    Start(StartCmd),

    /// Show store, LLM, bee and lock status
    Status(StatusCmd),

    /// Health check; exits with code 1 when unhealthy
    Health(HealthCmd),

    /// Run one task on a bee
    Bee(BeeCmd),

    /// Generate text through the LLM abstraction
    Llm(LlmCmd),

    /// Inspect or release distributed locks
    Locks(LocksCmd),

    /// Inspect sessions
    Sessions(SessionsCmd),

    /// Run the data pipeline
    Pipeline(PipelineCmd),
}

/// Start the scheduler loop
#[derive(Parser, Debug)]
pub struct StartCmd {
    /// Run one scheduler tick and exit
    #[arg(long)]
    pub once: bool,
}

/// Show hive status
#[derive(Parser, Debug)]
pub struct StatusCmd {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Health check
#[derive(Parser, Debug)]
pub struct HealthCmd {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Run a bee task
#[derive(Parser, Debug)]
pub struct BeeCmd {
    /// Bee name (blockchain, liquidity_sentinel, data_pipeline)
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Task as JSON, e.g. '{"type": "check_balance", "chain": "solana", "address": "..."}'
    #[arg(value_name = "TASK_JSON")]
    pub task: String,
}

/// Generate text
#[derive(Parser, Debug)]
pub struct LlmCmd {
    /// Prompt text
    #[arg(value_name = "PROMPT")]
    pub prompt: String,

    /// Pin the first attempt to this provider (gemini, openai, anthropic)
    #[arg(short, long, value_name = "PROVIDER")]
    pub provider: Option<String>,
}

#[derive(Parser, Debug)]
pub struct LocksCmd {
    #[command(subcommand)]
    pub action: LocksAction,
}

#[derive(Subcommand, Debug)]
pub enum LocksAction {
    /// List locks in the store with their TTL
    List,
    /// Force-release a lock held by any instance
    Release {
        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[derive(Parser, Debug)]
pub struct SessionsCmd {
    #[command(subcommand)]
    pub action: SessionsAction,
}

#[derive(Subcommand, Debug)]
pub enum SessionsAction {
    /// Count live sessions
    Count,
}

#[derive(Parser, Debug)]
pub struct PipelineCmd {
    #[command(subcommand)]
    pub action: PipelineAction,
}

#[derive(Subcommand, Debug)]
pub enum PipelineAction {
    /// Collect, convert and upload once
    Run,
}
