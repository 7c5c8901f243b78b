//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::BridgeBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::config::load_blueprint;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    hub_address: String,
    bind: String,
    path: String,
    rotation_interval_secs: u64,
    ping_interval_secs: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match load_blueprint(&args.config, &args.overrides) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    hub_address: blueprint.hub.address.clone(),
                    bind: blueprint.server.bind.clone(),
                    path: blueprint.server.path.clone(),
                    rotation_interval_secs: blueprint.rotation.interval_secs,
                    ping_interval_secs: blueprint.server.ping_interval_secs,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &BridgeBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.hub.accept_invalid_certs {
        warnings.push("hub.accept_invalid_certs is on - hub certificate is not verified".to_string());
    }

    if blueprint.server.client_retry_ms < 1000 {
        warnings.push(format!(
            "server.client_retry_ms = {} - viewers will reconnect aggressively",
            blueprint.server.client_retry_ms
        ));
    }

    // Proxies commonly drop idle connections after a minute
    if blueprint.server.ping_interval_secs > 60 {
        warnings.push(format!(
            "server.ping_interval_secs = {} - idle viewers may be cut by proxies",
            blueprint.server.ping_interval_secs
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Hub: {}", summary.hub_address);
            println!("  Endpoint: {}{}", summary.bind, summary.path);
            println!("  Rotation: every {}s", summary.rotation_interval_secs);
            println!("  Ping: every {}s", summary.ping_interval_secs);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OverrideArgs;
    use std::io::Write;

    fn args_for(content: &str) -> (tempfile::NamedTempFile, ValidateArgs) {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            overrides: OverrideArgs::default(),
            json: true,
        };
        (file, args)
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let (_file, args) = args_for(
            "[hub]\naddress = \"192.168.1.20\"\ncredential = \"k\"\n\n[server]\nclient_retry_ms = 200\n",
        );
        let result = validate_config(&args);
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("accept_invalid_certs")));
        assert!(warnings.iter().any(|w| w.contains("client_retry_ms")));
        assert_eq!(result.summary.unwrap().hub_address, "192.168.1.20");
    }

    #[test]
    fn test_invalid_config() {
        let (_file, args) = args_for("[hub]\naddress = \"\"\ncredential = \"k\"\n");
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.is_some());
        assert!(result.summary.is_none());
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            config: "/nonexistent/bridge.toml".into(),
            overrides: OverrideArgs::default(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("not found"));
    }
}
