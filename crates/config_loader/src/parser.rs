//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{BridgeBlueprint, ContractError};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<BridgeBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<BridgeBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<BridgeBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[hub]
address = "192.168.1.20"
credential = "abc123"
accept_invalid_certs = false

[rotation]
interval_secs = 1800

[server]
bind = "127.0.0.1:8080"
path = "/events"
ping_interval_secs = 15
client_retry_ms = 2000

[reader]
url = "http://127.0.0.1:8080/events"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.hub.address, "192.168.1.20");
        assert!(!bp.hub.accept_invalid_certs);
        assert_eq!(bp.rotation.interval_secs, 1800);
        assert_eq!(bp.rotation.recovery_min_ms, 1000);
        assert_eq!(bp.server.path, "/events");
        assert_eq!(bp.server.channel_capacity, 256);
        assert_eq!(bp.reader.min_backoff_ms, 1000);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{ "hub": { "address": "hub.lan", "credential": "k" } }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().server.bind, "0.0.0.0:5173");
    }

    #[test]
    fn test_parse_toml_missing_hub() {
        let result = parse_toml("[server]\nbind = \"0.0.0.0:1\"\n");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
