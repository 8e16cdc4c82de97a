//! OMK Hive - bee task dispatch and coordination
//!
//! Command-line entry point: loads configuration, builds the hive and runs
//! the requested command.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use omk_hive::adapters::cli::{
    BeeCmd, CliApp, Command, HealthCmd, LlmCmd, LocksAction, LocksCmd, PipelineAction, SessionsAction, StartCmd,
    StatusCmd,
};
use omk_hive::application::Hive;
use omk_hive::bees::TaskOutcome;
use omk_hive::config::{load_config, LoggingSection};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (secrets go here, not in hive.toml)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    let config = load_config(&app.config)
        .with_context(|| format!("Failed to load configuration from {}", app.config.display()))?;
    init_logging(app.verbose, app.debug, &config.logging)?;

    let hive = Arc::new(Hive::build(config).await.context("Failed to build hive")?);

    match app.command {
        Command::Start(cmd) => start_command(hive, cmd).await,
        Command::Status(cmd) => status_command(&hive, cmd).await,
        Command::Health(cmd) => health_command(&hive, cmd).await,
        Command::Bee(cmd) => bee_command(&hive, cmd).await,
        Command::Llm(cmd) => llm_command(&hive, cmd).await,
        Command::Locks(cmd) => locks_command(&hive, cmd).await,
        Command::Sessions(cmd) => match cmd.action {
            SessionsAction::Count => {
                let count = hive.session_count().await.context("Failed to count sessions")?;
                println!("Active sessions: {}", count);
                Ok(())
            }
        },
        Command::Pipeline(cmd) => match cmd.action {
            PipelineAction::Run => {
                let outcome = hive.run_pipeline().await.context("Pipeline run failed")?;
                print_outcome(&outcome)
            }
        },
    }
}

/// `--debug` and `--verbose` win, then RUST_LOG, then `[logging].level`
fn init_logging(verbose: bool, debug: bool, logging: &LoggingSection) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    // Logs go to stderr so JSON command output on stdout stays parseable
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let result = if logging.is_json() {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

async fn start_command(hive: Arc<Hive>, cmd: StartCmd) -> Result<()> {
    if cmd.once {
        let report = hive.tick().await;
        hive.shutdown().await;
        println!(
            "Tick complete: health_checked={} pipeline_ran={} pools_monitored={}",
            report.health_checked, report.pipeline_ran, report.pools_monitored
        );
        return Ok(());
    }

    // Setup Ctrl+C handler
    let stopper = Arc::clone(&hive);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        stopper.stop().await;
    });

    hive.run().await?;
    Ok(())
}

async fn status_command(hive: &Hive, cmd: StatusCmd) -> Result<()> {
    let status = hive.status().await;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Hive: {} ({})", status.name, status.environment);
    println!("Healthy: {}", status.healthy);
    println!(
        "Store: {} (shared: {}, reachable: {})",
        status.store.backend, status.store.shared, status.store.reachable
    );
    match status.llm.current {
        Some(current) => println!(
            "LLM: {} via {} strategy (providers: {}), total cost ${:.6}",
            current,
            status.llm.strategy,
            status.llm.providers.join(", "),
            status.llm.costs.total
        ),
        None => println!("LLM: not configured"),
    }
    println!("Bees:");
    for (name, bee) in &status.bees.bees {
        println!(
            "  {:<20} {:?} tasks={} success_rate={:.1}%",
            name,
            bee.status,
            bee.task_count,
            bee.success_rate * 100.0
        );
    }
    if !status.monitored_pools.is_empty() {
        println!("Monitored pools: {}", status.monitored_pools.join(", "));
    }
    if let Some(next) = status.next_pipeline_run {
        println!("Next pipeline run: {}", next.to_rfc3339());
    }
    match status.sessions {
        Some(count) => println!("Sessions: {}", count),
        None => println!("Sessions: unavailable"),
    }
    Ok(())
}

async fn health_command(hive: &Hive, cmd: HealthCmd) -> Result<()> {
    let report = hive.health().await;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Store reachable: {}", report.store.reachable);
        println!("LLM healthy: {}", report.llm_healthy);
        if let Some(reachable) = report.chains.ethereum {
            println!("Ethereum RPC reachable: {}", reachable);
        }
        if let Some(reachable) = report.chains.solana {
            println!("Solana RPC reachable: {}", reachable);
        }
        println!("Critical bees: {}", report.bees.any_critical);
        println!("{}", if report.healthy { "HEALTHY" } else { "UNHEALTHY" });
    }

    if !report.healthy {
        hive.shutdown().await;
        std::process::exit(1);
    }
    Ok(())
}

async fn bee_command(hive: &Hive, cmd: BeeCmd) -> Result<()> {
    let task: serde_json::Value = serde_json::from_str(&cmd.task)
        .with_context(|| format!("Task is not valid JSON: {}", cmd.task))?;
    let outcome = hive.execute_bee(&cmd.name, task).await;
    print_outcome(&outcome)?;
    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn llm_command(hive: &Hive, cmd: LlmCmd) -> Result<()> {
    let response = hive
        .generate(&cmd.prompt, cmd.provider.as_deref())
        .await
        .context("LLM generation failed")?;
    println!("{}", response);
    Ok(())
}

async fn locks_command(hive: &Hive, cmd: LocksCmd) -> Result<()> {
    match cmd.action {
        LocksAction::List => {
            let locks = hive.list_locks().await.context("Failed to list locks")?;
            if locks.is_empty() {
                println!("No locks held");
            }
            for lock in locks {
                println!("{:<30} ttl={}s", lock.name, lock.ttl_seconds);
            }
        }
        LocksAction::Release { name } => {
            let released = hive.release_lock(&name).await.context("Failed to release lock")?;
            if released {
                println!("Released lock '{}'", name);
            } else {
                println!("Lock '{}' was not held", name);
            }
        }
    }
    Ok(())
}

fn print_outcome(outcome: &TaskOutcome) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}
