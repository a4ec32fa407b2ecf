//! Configuration management for the Python generator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (pygen.toml)
//! - Environment variables (PYGEN__*)
//!
//! ## Example config file (pygen.toml):
//! ```toml
//! [input]
//! path = "build/schema.json"
//!
//! [output]
//! dir = "soiagen"
//!
//! [generator]
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CodegenError, Result};

/// Options of the Python generator itself.
///
/// There are no recognized options; any key is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {}

impl GeneratorConfig {
    /// Validate a raw configuration object
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone()).map_err(|e| CodegenError::InvalidConfig(e.to_string()))
    }
}

/// Main configuration for the `pygen` binary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PygenConfig {
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,
}

/// Where the resolved schema graph is read from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// JSON file produced by the schema frontend
    #[serde(default = "default_input_path")]
    pub path: PathBuf,
}

/// Where generated modules are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory of the generated package
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_input_path() -> PathBuf {
    PathBuf::from("schema.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(crate::codegen::names::GENERATED_PACKAGE)
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

impl PygenConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, with `config_path` (if any) taking precedence over
    /// the default locations and environment variables over everything
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = ["pygen.toml", ".pygen.toml", "config/pygen.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "soia", "pygen") {
            let xdg_config = config_dir.config_dir().join("pygen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("PYGEN")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config
            .try_deserialize()
            .map_err(|e| CodegenError::InvalidConfig(e.to_string()))
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = PygenConfig::default();
        assert_eq!(config.input.path, PathBuf::from("schema.json"));
        assert_eq!(config.output.dir, PathBuf::from("soiagen"));
        assert_eq!(config.generator, GeneratorConfig::default());
    }

    #[test]
    fn test_serialize_config() {
        let config = PygenConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[input]"));
        assert!(toml_str.contains("[output]"));
    }

    #[test]
    fn test_generator_rejects_any_option() {
        assert!(GeneratorConfig::from_json(&serde_json::json!({})).is_ok());
        assert!(GeneratorConfig::from_json(&serde_json::Value::Null).is_ok());
        let err = GeneratorConfig::from_json(&serde_json::json!({"indent": 2})).unwrap_err();
        assert!(matches!(err, CodegenError::InvalidConfig(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[input]\npath = \"graph.json\"\n\n[output]\ndir = \"out\"").unwrap();

        let config = PygenConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.input.path, PathBuf::from("graph.json"));
        assert_eq!(config.output.dir, PathBuf::from("out"));
    }

    #[test]
    fn test_unknown_generator_option_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[generator]\nflavor = \"fancy\"\n").unwrap();

        let err = PygenConfig::load_from(Some(path.to_str().unwrap())).unwrap_err();
        assert!(matches!(err, CodegenError::InvalidConfig(_)));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = PygenConfig::default();
        config.output.dir = PathBuf::from("gen");
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = PygenConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded.output.dir, PathBuf::from("gen"));
    }
}
