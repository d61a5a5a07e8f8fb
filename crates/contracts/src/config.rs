//! DispatchPlan - Config Loader output
//!
//! Describes a full dispatch run: broker connection, serializer selection,
//! optional transactional identity, and the task list mapping source files
//! to destination topics.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete dispatch run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchPlan {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Broker connection settings
    pub broker: BrokerConfig,

    /// Dispatch task list
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

/// Broker connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker endpoints, e.g. ["localhost:9092", "localhost:9093"]
    pub bootstrap_servers: Vec<String>,

    /// Client identity reported to the broker
    pub client_id: String,

    /// Key serializer selection
    #[serde(default = "default_key_serializer")]
    pub key_serializer: SerializerKind,

    /// Value serializer selection
    #[serde(default = "default_value_serializer")]
    pub value_serializer: SerializerKind,

    /// Transactional identity; set puts the session in transactional mode
    #[serde(default)]
    pub transactional_id: Option<String>,

    /// Publish queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Bounded wait applied when the publish queue is full, in milliseconds
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

impl BrokerConfig {
    /// Send timeout as a `Duration`
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

fn default_key_serializer() -> SerializerKind {
    SerializerKind::Integer
}

fn default_value_serializer() -> SerializerKind {
    SerializerKind::Text
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_send_timeout_ms() -> u64 {
    5000
}

/// Serializer selection for keys and values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializerKind {
    /// 32-bit big-endian integer
    Integer,
    /// UTF-8 text
    #[serde(alias = "string")]
    Text,
}

/// One dispatch task: a source file drained into one destination topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Unique task identifier
    pub id: String,

    /// Source file path
    pub file: PathBuf,

    /// Destination topic name
    pub topic: String,
}
