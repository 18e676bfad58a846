//! Configuration types for the validator.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Backend optimization level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptLevel {
    None,
    #[default]
    Speed,
    SpeedAndSize,
}

/// Target the toolchain generates native code for
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Target triple, `None` for the host
    pub triple: Option<String>,
    /// Backend optimization level
    pub opt_level: OptLevel,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            triple: None,
            opt_level: OptLevel::Speed,
        }
    }
}

/// IR to WebAssembly lowering parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Upper bound on linear memory pages
    pub max_memory_pages: u32,
    /// Export every function under its IR name
    pub export_functions: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_memory_pages: 1, // 64 KiB
            export_functions: true,
        }
    }
}

/// Exclusions applied while searching for mutation points
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Functions whose instructions are never mutated
    pub exclude_functions: Vec<String>,
    /// Mutator ids whose matches are dropped
    pub exclude_mutators: Vec<String>,
}

impl FilterConfig {
    pub fn is_empty(&self) -> bool {
        self.exclude_functions.is_empty() && self.exclude_mutators.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Top-level validator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub target: TargetConfig,
    pub compiler: CompilerConfig,
    pub filter: FilterConfig,
    pub logging: LoggingConfig,
}

impl ValidatorConfig {
    /// Read a JSON configuration file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ValidatorConfig = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.compiler.max_memory_pages == 0 {
            return Err(Error::Config(
                "compiler.max_memory_pages must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let config = ValidatorConfig::default();
        assert_eq!(config.target.opt_level, OptLevel::Speed);
        assert!(config.target.triple.is_none());
        assert_eq!(config.compiler.max_memory_pages, 1);
        assert!(config.filter.is_empty());
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "filter": { "exclude_mutators": ["cxx_add_to_sub"] } }"#;
        let config: ValidatorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.filter.exclude_mutators, vec!["cxx_add_to_sub"]);
        assert!(config.filter.exclude_functions.is_empty());
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_zero_memory_pages_rejected() {
        let mut config = ValidatorConfig::default();
        config.compiler.max_memory_pages = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_missing_file() {
        let result = ValidatorConfig::from_file(Path::new("/nonexistent/mutval.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
