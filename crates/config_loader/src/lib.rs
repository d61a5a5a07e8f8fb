//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON dispatch plans
//! - Validate plan legality
//! - Produce `DispatchPlan`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let plan = ConfigLoader::load_from_path(Path::new("relay.toml")).unwrap();
//! println!("Client: {}", plan.broker.client_id);
//! ```

mod parser;
mod validator;

pub use contracts::DispatchPlan;
pub use parser::ConfigFormat;

use contracts::DispatchError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load a dispatch plan from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a plan from a file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<DispatchPlan, DispatchError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load a plan from a string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<DispatchPlan, DispatchError> {
        let plan = parser::parse(content, format)?;
        validator::validate(&plan)?;
        Ok(plan)
    }

    /// Serialize a DispatchPlan to a TOML string
    pub fn to_toml(plan: &DispatchPlan) -> Result<String, DispatchError> {
        toml::to_string_pretty(plan)
            .map_err(|e| DispatchError::config("plan", format!("TOML serialize error: {e}")))
    }

    /// Serialize a DispatchPlan to a JSON string
    pub fn to_json(plan: &DispatchPlan) -> Result<String, DispatchError> {
        serde_json::to_string_pretty(plan)
            .map_err(|e| DispatchError::config("plan", format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, DispatchError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            DispatchError::config("plan", "cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            DispatchError::config("plan", format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, DispatchError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_TOML: &str = r#"
[broker]
bootstrap_servers = ["localhost:9092", "localhost:9093", "localhost:9094"]
client_id = "multi-threaded-dispatch"
key_serializer = "text"
value_serializer = "text"

[[tasks]]
id = "eod_01"
file = "data/nse_eod_01.csv"
topic = "nse-eod-topic"

[[tasks]]
id = "eod_02"
file = "data/nse_eod_02.csv"
topic = "nse-eod-topic"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let plan = result.unwrap();
        assert_eq!(plan.broker.client_id, "multi-threaded-dispatch");
        assert_eq!(plan.tasks.len(), 2);
    }

    #[test]
    fn test_round_trip_toml() {
        let plan = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&plan).unwrap();
        let plan2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(plan.broker.client_id, plan2.broker.client_id);
        assert_eq!(plan.tasks.len(), plan2.tasks.len());
        assert_eq!(plan.tasks[0].id, plan2.tasks[0].id);
    }

    #[test]
    fn test_round_trip_json() {
        let plan = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&plan).unwrap();
        let plan2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(plan.broker.client_id, plan2.broker.client_id);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        // Duplicate task id should fail validation
        let content = r#"
[broker]
bootstrap_servers = ["localhost:9092"]
client_id = "relay"

[[tasks]]
id = "t1"
file = "a.csv"
topic = "records"

[[tasks]]
id = "t1"
file = "b.csv"
topic = "records"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_transactional_plan() {
        let content = r#"
[broker]
bootstrap_servers = ["localhost:9092", "localhost:9096", "localhost:9097"]
client_id = "hello-dispatch"
key_serializer = "integer"
value_serializer = "text"
transactional_id = "hello-dispatch-transactional-id"
"#;
        let plan = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        assert_eq!(
            plan.broker.transactional_id.as_deref(),
            Some("hello-dispatch-transactional-id")
        );
    }
}
