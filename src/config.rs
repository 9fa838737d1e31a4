//! Runtime configuration for a machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Default depth of the notification channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// What `send_event` does when the notification channel is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPolicy {
    /// Wait for a consumer to make room. The transition lock stays held
    /// while waiting, so every other mutator waits too.
    #[default]
    Block,

    /// Discard the record and count it.
    DropWhenFull,
}

/// Errors loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid machine configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Machine settings that do not depend on the state, event or key types.
///
/// # Example
///
/// ```rust
/// use latch::config::{MachineConfig, NotifyPolicy};
///
/// let config = MachineConfig::from_json(r#"{"id": "door", "channel_capacity": 8}"#).unwrap();
/// assert_eq!(config.id, "door");
/// assert_eq!(config.channel_capacity, 8);
/// assert_eq!(config.notify_policy, NotifyPolicy::Block);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Identifier used in logs and error messages.
    pub id: String,
    pub channel_capacity: usize,
    pub notify_policy: NotifyPolicy,
    /// Route guard rejections and unmatched events to the error hook.
    pub report_rejections: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            id: format!("machine-{}", Uuid::new_v4()),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            notify_policy: NotifyPolicy::default(),
            report_rejections: false,
        }
    }
}

impl MachineConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_generates_unique_ids() {
        let a = MachineConfig::default();
        let b = MachineConfig::default();
        assert!(a.id.starts_with("machine-"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(!a.report_rejections);
    }

    #[test]
    fn parses_all_fields() {
        let config = MachineConfig::from_json(
            r#"{
                "id": "counter",
                "channel_capacity": 2,
                "notify_policy": "drop_when_full",
                "report_rejections": true
            }"#,
        )
        .unwrap();

        assert_eq!(config.id, "counter");
        assert_eq!(config.channel_capacity, 2);
        assert_eq!(config.notify_policy, NotifyPolicy::DropWhenFull);
        assert!(config.report_rejections);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config = MachineConfig::from_json("{}").unwrap();
        assert!(config.id.starts_with("machine-"));
        assert_eq!(config.notify_policy, NotifyPolicy::Block);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = MachineConfig::from_json(r#"{"channel_capacity": "many"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
