//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Plan information for display
#[derive(Serialize)]
struct PlanInfo {
    config_path: String,
    version: String,
    client_id: String,
    bootstrap_servers: Vec<String>,
    key_serializer: String,
    value_serializer: String,
    transactional_id: Option<String>,
    queue_capacity: usize,
    send_timeout_ms: u64,
    task_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    tasks: Option<Vec<TaskInfo>>,
}

#[derive(Serialize)]
struct TaskInfo {
    id: String,
    file: String,
    topic: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading plan info");

    let plan = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load plan from {}", args.config.display()))?;

    let plan_info = PlanInfo {
        config_path: args.config.display().to_string(),
        version: format!("{:?}", plan.version),
        client_id: plan.broker.client_id.clone(),
        bootstrap_servers: plan.broker.bootstrap_servers.clone(),
        key_serializer: format!("{:?}", plan.broker.key_serializer),
        value_serializer: format!("{:?}", plan.broker.value_serializer),
        transactional_id: plan.broker.transactional_id.clone(),
        queue_capacity: plan.broker.queue_capacity,
        send_timeout_ms: plan.broker.send_timeout_ms,
        task_count: plan.tasks.len(),
        tasks: args.tasks.then(|| {
            plan.tasks
                .iter()
                .map(|t| TaskInfo {
                    id: t.id.clone(),
                    file: t.file.display().to_string(),
                    topic: t.topic.clone(),
                })
                .collect()
        }),
    };

    if args.json {
        let json =
            serde_json::to_string_pretty(&plan_info).context("Failed to serialize plan info")?;
        println!("{}", json);
    } else {
        print_plan_info(&plan_info);
    }

    Ok(())
}

fn print_plan_info(plan_info: &PlanInfo) {
    println!("\n=== Plan: {} ===\n", plan_info.config_path);
    println!("Version: {}", plan_info.version);
    println!("Client: {}", plan_info.client_id);
    println!("Endpoints: {}", plan_info.bootstrap_servers.join(", "));
    println!(
        "Serializers: key={} value={}",
        plan_info.key_serializer, plan_info.value_serializer
    );
    match plan_info.transactional_id {
        Some(ref id) => println!("Mode: transactional ({id})"),
        None => println!("Mode: shared"),
    }
    println!("Queue capacity: {}", plan_info.queue_capacity);
    println!("Send timeout: {}ms", plan_info.send_timeout_ms);
    println!("Tasks: {}", plan_info.task_count);

    if let Some(ref tasks) = plan_info.tasks {
        for task in tasks {
            println!("  - {} : {} -> {}", task.id, task.file, task.topic);
        }
    }

    println!();
}
