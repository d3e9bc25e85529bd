// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML run configuration with strict schema validation.
//!
//! Every key is optional; command-line flags take precedence over the file,
//! and the file takes precedence over the built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HardValidationError, LoadlineError, LoadlineResult};
use crate::naming::NamingScheme;
use crate::sink::HeaderPolicy;
use crate::sweep::AbortPolicy;
use crate::types::SweepParameters;

pub const DEFAULT_SIZE_SCALE: u64 = 10;
pub const DEFAULT_LAYER_SCALE: u64 = 2;
pub const DEFAULT_REPEAT_FACTOR: u64 = 1;
pub const DEFAULT_OUTPUT: &str = "output";

/// Raw configuration as parsed from YAML (before validation).
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub size_scale: Option<u64>,
    #[serde(default)]
    pub layer_scale: Option<u64>,
    #[serde(default)]
    pub repeat_factor: Option<u64>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub header: Option<HeaderPolicy>,
    #[serde(default)]
    pub on_error: Option<AbortPolicy>,
    #[serde(default)]
    pub naming: Option<NamingScheme>,
    #[serde(default)]
    pub insecure: Option<bool>,
    #[serde(default)]
    pub verify: Option<bool>,
}

impl RunConfig {
    /// Overlay `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merge(self, overrides: RunConfig) -> RunConfig {
        RunConfig {
            size_scale: overrides.size_scale.or(self.size_scale),
            layer_scale: overrides.layer_scale.or(self.layer_scale),
            repeat_factor: overrides.repeat_factor.or(self.repeat_factor),
            output: overrides.output.or(self.output),
            header: overrides.header.or(self.header),
            on_error: overrides.on_error.or(self.on_error),
            naming: overrides.naming.or(self.naming),
            insecure: overrides.insecure.or(self.insecure),
            verify: overrides.verify.or(self.verify),
        }
    }

    /// Fill in defaults and validate against the registry target.
    pub fn resolve(self, registry_target: &str) -> Result<ResolvedConfig, HardValidationError> {
        let params = SweepParameters::new(
            registry_target,
            self.size_scale.unwrap_or(DEFAULT_SIZE_SCALE),
            self.layer_scale.unwrap_or(DEFAULT_LAYER_SCALE),
            self.repeat_factor.unwrap_or(DEFAULT_REPEAT_FACTOR),
            self.output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
        )?;

        Ok(ResolvedConfig {
            params,
            header: self.header.unwrap_or_default(),
            on_error: self.on_error.unwrap_or_default(),
            naming: self.naming.unwrap_or_default(),
            insecure: self.insecure.unwrap_or(false),
            verify: self.verify.unwrap_or(true),
        })
    }
}

/// Complete validated configuration for one run.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub params: SweepParameters,
    pub header: HeaderPolicy,
    pub on_error: AbortPolicy,
    pub naming: NamingScheme,
    pub insecure: bool,
    /// Compare pulled layers and bytes with what was pushed.
    pub verify: bool,
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> LoadlineResult<RunConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LoadlineError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| LoadlineError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load configuration from a YAML string. An empty document is an empty config.
    pub fn load_string(content: &str) -> LoadlineResult<RunConfig> {
        if content.trim().is_empty() {
            return Ok(RunConfig::default());
        }

        serde_yaml::from_str(content).map_err(|e| LoadlineError::ConfigParse {
            message: format!("YAML parse error: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = r#"
size_scale: 4
layer_scale: 8
repeat_factor: 3
output: results.csv
header: if_new
on_error: continue
naming: run_scoped
insecure: true
verify: false
"#;

    #[test]
    fn test_full_config() {
        let config = ConfigLoader::load_string(FULL_CONFIG).unwrap();
        assert_eq!(config.size_scale, Some(4));
        assert_eq!(config.header, Some(HeaderPolicy::IfNew));
        assert_eq!(config.on_error, Some(AbortPolicy::Continue));
        assert_eq!(config.naming, Some(NamingScheme::RunScoped));

        let resolved = config.resolve("localhost:5000/bench").unwrap();
        assert_eq!(resolved.params.size_scale().value(), 4);
        assert_eq!(resolved.params.layer_scale().value(), 8);
        assert_eq!(resolved.params.repeat_count().value(), 3);
        assert_eq!(resolved.params.output_path(), Path::new("results.csv"));
        assert!(resolved.insecure);
        assert!(!resolved.verify);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let resolved = ConfigLoader::load_string("")
            .unwrap()
            .resolve("localhost:5000/bench")
            .unwrap();
        assert_eq!(resolved.params.size_scale().value(), DEFAULT_SIZE_SCALE);
        assert_eq!(resolved.params.layer_scale().value(), DEFAULT_LAYER_SCALE);
        assert_eq!(resolved.params.repeat_count().value(), DEFAULT_REPEAT_FACTOR);
        assert_eq!(resolved.params.output_path(), Path::new(DEFAULT_OUTPUT));
        assert_eq!(resolved.header, HeaderPolicy::Always);
        assert_eq!(resolved.on_error, AbortPolicy::Abort);
        assert_eq!(resolved.naming, NamingScheme::Clock);
        assert!(!resolved.insecure);
        assert!(resolved.verify);
    }

    #[test]
    fn test_flags_override_file() {
        let file = ConfigLoader::load_string("size_scale: 4\nrepeat_factor: 5\n").unwrap();
        let flags = RunConfig {
            size_scale: Some(100),
            ..RunConfig::default()
        };
        let merged = file.merge(flags);
        assert_eq!(merged.size_scale, Some(100));
        assert_eq!(merged.repeat_factor, Some(5));
    }

    #[test]
    fn test_flags_can_turn_off_file_booleans() {
        let file = ConfigLoader::load_string("insecure: true\nverify: false\n").unwrap();
        let flags = RunConfig {
            insecure: Some(false),
            verify: Some(true),
            ..RunConfig::default()
        };
        let resolved = file.merge(flags).resolve("localhost:5000/bench").unwrap();
        assert!(!resolved.insecure);
        assert!(resolved.verify);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = ConfigLoader::load_string("size_scael: 4\n");
        assert!(matches!(result, Err(LoadlineError::ConfigParse { .. })));
    }

    #[test]
    fn test_scale_of_one_rejected() {
        let config = ConfigLoader::load_string("layer_scale: 1\n").unwrap();
        assert!(config.resolve("localhost:5000/bench").is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::load_file("/nonexistent/loadline.yaml");
        assert!(matches!(result, Err(LoadlineError::ConfigNotFound { .. })));
    }
}
