use serde::{Deserialize, Serialize};
use tabsense_clustering::AssignConfig;

/// Configuration for the cluster lifecycle engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Quiet window for coalescing tab events into one recompute.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Tuning of the greedy assignment pass.
    #[serde(default)]
    pub assign: AssignConfig,

    /// Upper bound handed to the semantic clustering collaborator.
    #[serde(default = "default_max_semantic_groups")]
    pub max_semantic_groups: usize,
}

fn default_debounce_ms() -> u64 {
    700
}

fn default_max_semantic_groups() -> usize {
    8
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            assign: AssignConfig::default(),
            max_semantic_groups: default_max_semantic_groups(),
        }
    }
}

impl EngineConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_semantic_groups == 0 {
            return Err("max semantic groups must be > 0".to_string());
        }
        self.assign.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.debounce_ms, 700);
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.debounce_ms, 700);
        assert_eq!(config.max_semantic_groups, 8);
        assert!((config.assign.similarity_threshold - 0.6).abs() < 1e-6);
    }

    #[test]
    fn zero_semantic_groups_is_rejected() {
        let config = EngineConfig {
            max_semantic_groups: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
