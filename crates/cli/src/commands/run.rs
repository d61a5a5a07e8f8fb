//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{run_plan, RunOptions};

/// Execute the `run` command
pub async fn run_dispatch(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading plan");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let plan = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load plan from {}", args.config.display()))?;

    info!(
        client_id = %plan.broker.client_id,
        servers = plan.broker.bootstrap_servers.len(),
        tasks = plan.tasks.len(),
        transactional = plan.broker.transactional_id.is_some(),
        "Plan loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - plan is valid, exiting");
        print_plan_summary(&plan);
        return Ok(());
    }

    let options = RunOptions {
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    info!("Starting dispatch...");
    let stats = run_plan(plan, options).await?;

    info!(
        records = stats.records_forwarded,
        duration_secs = stats.duration.as_secs_f64(),
        "Dispatch completed successfully"
    );
    stats.print_summary();

    info!("Topic Relay finished");
    Ok(())
}

/// Print plan summary for dry-run mode
fn print_plan_summary(plan: &contracts::DispatchPlan) {
    println!("\n=== Plan Summary ===\n");
    println!("Broker:");
    println!("  Endpoints: {}", plan.broker.bootstrap_servers.join(", "));
    println!("  Client: {}", plan.broker.client_id);
    println!(
        "  Serializers: key={:?} value={:?}",
        plan.broker.key_serializer, plan.broker.value_serializer
    );
    match plan.broker.transactional_id {
        Some(ref id) => println!("  Mode: transactional ({id})"),
        None => println!("  Mode: shared, one worker per task"),
    }

    if !plan.tasks.is_empty() {
        println!("\nTasks ({}):", plan.tasks.len());
        for task in &plan.tasks {
            println!("  - {} : {} -> {}", task.id, task.file.display(), task.topic);
        }
    }

    println!();
}
