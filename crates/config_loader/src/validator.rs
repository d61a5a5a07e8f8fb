//! Config validation
//!
//! Rules:
//! - bootstrap_servers non-empty, no blank endpoints
//! - client_id non-empty
//! - transactional_id, when set, non-empty
//! - queue_capacity > 0, send_timeout_ms > 0
//! - task ids unique, file and topic non-empty

use std::collections::HashSet;

use contracts::{DispatchError, DispatchPlan};

/// Validate a DispatchPlan
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(plan: &DispatchPlan) -> Result<(), DispatchError> {
    validate_endpoints(plan)?;
    validate_identity(plan)?;
    validate_queue(plan)?;
    validate_tasks(plan)?;
    Ok(())
}

fn validate_endpoints(plan: &DispatchPlan) -> Result<(), DispatchError> {
    if plan.broker.bootstrap_servers.is_empty() {
        return Err(DispatchError::config(
            "broker.bootstrap_servers",
            "at least one endpoint is required",
        ));
    }
    for (idx, endpoint) in plan.broker.bootstrap_servers.iter().enumerate() {
        if endpoint.trim().is_empty() {
            return Err(DispatchError::config(
                format!("broker.bootstrap_servers[{idx}]"),
                "endpoint cannot be blank",
            ));
        }
    }
    Ok(())
}

fn validate_identity(plan: &DispatchPlan) -> Result<(), DispatchError> {
    if plan.broker.client_id.trim().is_empty() {
        return Err(DispatchError::config(
            "broker.client_id",
            "client_id cannot be empty",
        ));
    }
    if let Some(ref txn_id) = plan.broker.transactional_id {
        if txn_id.trim().is_empty() {
            return Err(DispatchError::config(
                "broker.transactional_id",
                "transactional_id cannot be blank when set",
            ));
        }
    }
    Ok(())
}

fn validate_queue(plan: &DispatchPlan) -> Result<(), DispatchError> {
    if plan.broker.queue_capacity == 0 {
        return Err(DispatchError::config(
            "broker.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }
    if plan.broker.send_timeout_ms == 0 {
        return Err(DispatchError::config(
            "broker.send_timeout_ms",
            "send_timeout_ms must be > 0",
        ));
    }
    Ok(())
}

fn validate_tasks(plan: &DispatchPlan) -> Result<(), DispatchError> {
    let mut seen = HashSet::new();
    for (idx, task) in plan.tasks.iter().enumerate() {
        if task.id.trim().is_empty() {
            return Err(DispatchError::config(
                format!("tasks[{idx}].id"),
                "task id cannot be empty",
            ));
        }
        if !seen.insert(&task.id) {
            return Err(DispatchError::config(
                format!("tasks[id={}]", task.id),
                "duplicate task id",
            ));
        }
        if task.topic.trim().is_empty() {
            return Err(DispatchError::config(
                format!("tasks[{}].topic", task.id),
                "topic cannot be empty",
            ));
        }
        if task.file.as_os_str().is_empty() {
            return Err(DispatchError::config(
                format!("tasks[{}].file", task.id),
                "file path cannot be empty",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BrokerConfig, ConfigVersion, SerializerKind, TaskConfig};

    fn minimal_plan() -> DispatchPlan {
        DispatchPlan {
            version: ConfigVersion::V1,
            broker: BrokerConfig {
                bootstrap_servers: vec!["localhost:9092".into()],
                client_id: "relay".into(),
                key_serializer: SerializerKind::Integer,
                value_serializer: SerializerKind::Text,
                transactional_id: None,
                queue_capacity: 100,
                send_timeout_ms: 1000,
            },
            tasks: vec![TaskConfig {
                id: "t1".into(),
                file: "data/part_01.csv".into(),
                topic: "records".into(),
            }],
        }
    }

    #[test]
    fn test_valid_plan() {
        assert!(validate(&minimal_plan()).is_ok());
    }

    #[test]
    fn test_empty_endpoints() {
        let mut plan = minimal_plan();
        plan.broker.bootstrap_servers.clear();
        let err = validate(&plan).unwrap_err().to_string();
        assert!(err.contains("at least one endpoint"), "got: {err}");
    }

    #[test]
    fn test_blank_endpoint() {
        let mut plan = minimal_plan();
        plan.broker.bootstrap_servers.push("  ".into());
        let err = validate(&plan).unwrap_err().to_string();
        assert!(err.contains("cannot be blank"), "got: {err}");
    }

    #[test]
    fn test_empty_client_id() {
        let mut plan = minimal_plan();
        plan.broker.client_id = String::new();
        let err = validate(&plan).unwrap_err().to_string();
        assert!(err.contains("client_id"), "got: {err}");
    }

    #[test]
    fn test_blank_transactional_id() {
        let mut plan = minimal_plan();
        plan.broker.transactional_id = Some("".into());
        let err = validate(&plan).unwrap_err().to_string();
        assert!(err.contains("transactional_id"), "got: {err}");
    }

    #[test]
    fn test_zero_queue_capacity() {
        let mut plan = minimal_plan();
        plan.broker.queue_capacity = 0;
        let err = validate(&plan).unwrap_err().to_string();
        assert!(err.contains("queue_capacity"), "got: {err}");
    }

    #[test]
    fn test_duplicate_task_id() {
        let mut plan = minimal_plan();
        plan.tasks.push(plan.tasks[0].clone());
        let err = validate(&plan).unwrap_err().to_string();
        assert!(err.contains("duplicate task id"), "got: {err}");
    }

    #[test]
    fn test_empty_topic() {
        let mut plan = minimal_plan();
        plan.tasks[0].topic = String::new();
        let err = validate(&plan).unwrap_err().to_string();
        assert!(err.contains("topic cannot be empty"), "got: {err}");
    }
}
