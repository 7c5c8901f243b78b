//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `BridgeBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("bridge.toml")).unwrap();
//! println!("Hub: {}", blueprint.hub.address);
//! ```

mod parser;
mod validator;

pub use contracts::BridgeBlueprint;
pub use parser::ConfigFormat;

use contracts::{ContractError, ReaderConfig};
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<BridgeBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<BridgeBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Parse without validating
    ///
    /// For callers that patch the blueprint (environment overrides) before
    /// calling `validate`.
    pub fn parse_from_path(path: &Path) -> Result<BridgeBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        parser::parse(&content, format)
    }

    /// Validate an already-built blueprint
    pub fn validate(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Validate only the `[reader]` section
    pub fn validate_reader(reader: &ReaderConfig) -> Result<(), ContractError> {
        validator::validate_reader(reader)
    }

    /// Serialize BridgeBlueprint to TOML string
    pub fn to_toml(blueprint: &BridgeBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize BridgeBlueprint to JSON string
    pub fn to_json(blueprint: &BridgeBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL_TOML: &str = r#"
[hub]
address = "192.168.1.20"
credential = "abc123"

[server]
bind = "127.0.0.1:5173"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.hub.address, "192.168.1.20");
        assert_eq!(bp.rotation.interval_secs, 3600);
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.hub.address, bp2.hub.address);
        assert_eq!(bp.server.bind, bp2.server.bind);
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp.hub.credential, bp2.hub.credential);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[hub]
address = "192.168.1.20"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("credential"));
    }

    #[test]
    fn test_parse_from_path_skips_validation() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"[hub]\naddress = \"hub.lan\"\n").unwrap();

        let bp = ConfigLoader::parse_from_path(file.path()).unwrap();
        assert!(bp.hub.credential.is_empty());
        assert!(ConfigLoader::load_from_path(file.path()).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }
}
