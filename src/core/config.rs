//! Toolkit-wide settings, loadable from RON.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::grammar::GrammarOptions;
use crate::core::lexicon::SearchOptions;
use crate::core::markov::GenerateOptions;
use crate::core::script::ScriptOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Defaults for every generator. Missing sections and fields keep their
/// built-in values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    pub grammar: GrammarOptions,
    pub markov: GenerateOptions,
    pub script: ScriptOptions,
    pub lexicon: SearchOptions,
}

impl ToolkitConfig {
    pub fn from_ron(contents: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(contents)?)
    }

    /// Load a config from a RON file.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = ToolkitConfig::from_ron("()").unwrap();
        assert_eq!(config.grammar.start_rule, "<start>");
        assert_eq!(config.markov.min_length, 5);
        assert_eq!(config.script.max_passes, 20);
        assert_eq!(config.lexicon.min_distance, 1);
    }

    #[test]
    fn partial_sections() {
        let config = ToolkitConfig::from_ron("(markov: (max_length: 12), script: (silent: true))").unwrap();
        assert_eq!(config.markov.max_length, 12);
        assert_eq!(config.markov.min_length, 5);
        assert!(config.script.silent);
        assert_eq!(config.script.max_passes, 20);
    }

    #[test]
    fn malformed_config() {
        assert!(matches!(ToolkitConfig::from_ron("(markov: 3"), Err(ConfigError::Ron(_))));
    }
}
