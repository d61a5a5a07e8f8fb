//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<PlanSummary>,
}

#[derive(Serialize)]
struct PlanSummary {
    version: String,
    client_id: String,
    endpoint_count: usize,
    task_count: usize,
    transactional: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating plan");

    let result = validate_plan(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Plan validation failed")
    }
}

fn validate_plan(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(plan) => {
            let warnings = collect_warnings(&plan);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(PlanSummary {
                    version: format!("{:?}", plan.version),
                    client_id: plan.broker.client_id.clone(),
                    endpoint_count: plan.broker.bootstrap_servers.len(),
                    task_count: plan.tasks.len(),
                    transactional: plan.broker.transactional_id.is_some(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect plan warnings (non-fatal issues)
fn collect_warnings(plan: &contracts::DispatchPlan) -> Vec<String> {
    let mut warnings = Vec::new();

    if plan.tasks.is_empty() {
        warnings.push("No tasks configured - nothing will be dispatched".to_string());
    }

    for task in &plan.tasks {
        if !task.file.exists() {
            warnings.push(format!(
                "Task '{}' source file does not exist yet: {}",
                task.id,
                task.file.display()
            ));
        }
    }

    if plan.broker.transactional_id.is_some() && plan.tasks.len() > 1 {
        warnings.push(
            "Transactional mode dispatches tasks sequentially inside one transaction".to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("OK  Plan is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Client: {}", summary.client_id);
            println!("  Endpoints: {}", summary.endpoint_count);
            println!("  Tasks: {}", summary.task_count);
            println!("  Transactional: {}", summary.transactional);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\nWarnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("ERR Plan is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
