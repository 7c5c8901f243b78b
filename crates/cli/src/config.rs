//! Configuration loading with command-line and environment overrides.

use std::path::Path;

use config_loader::{BridgeBlueprint, ConfigLoader};
use tracing::info;

use crate::cli::OverrideArgs;
use crate::error::{CliError, Result};

/// Load, apply overrides, then validate
///
/// Validation runs after overrides so a credential supplied only through the
/// environment still counts.
pub fn load_blueprint(path: &Path, overrides: &OverrideArgs) -> Result<BridgeBlueprint> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }

    let mut blueprint = ConfigLoader::parse_from_path(path)?;
    apply_overrides(&mut blueprint, overrides);
    ConfigLoader::validate(&blueprint)?;
    Ok(blueprint)
}

pub fn apply_overrides(blueprint: &mut BridgeBlueprint, overrides: &OverrideArgs) {
    if let Some(ref address) = overrides.hub_address {
        info!(address = %address, "Overriding hub address");
        blueprint.hub.address = address.clone();
    }
    if let Some(ref credential) = overrides.credential {
        info!("Overriding hub credential");
        blueprint.hub.credential = credential.clone();
    }
    if let Some(ref bind) = overrides.bind {
        info!(bind = %bind, "Overriding listen address");
        blueprint.server.bind = bind.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_credential_from_override() {
        let file = config_file("[hub]\naddress = \"192.168.1.20\"\n");
        assert!(load_blueprint(file.path(), &OverrideArgs::default()).is_err());

        let overrides = OverrideArgs {
            credential: Some("from-env".into()),
            bind: Some("127.0.0.1:9999".into()),
            ..Default::default()
        };
        let bp = load_blueprint(file.path(), &overrides).unwrap();
        assert_eq!(bp.hub.credential, "from-env");
        assert_eq!(bp.server.bind, "127.0.0.1:9999");
    }

    #[test]
    fn test_missing_file() {
        let err = load_blueprint(Path::new("/nonexistent/bridge.toml"), &OverrideArgs::default())
            .unwrap_err();
        assert!(matches!(err, CliError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let file = config_file("[hub]\naddress = \"hub\"\ncredential = \"k\"\n");
        let overrides = OverrideArgs {
            bind: Some("not-an-address".into()),
            ..Default::default()
        };
        assert!(matches!(
            load_blueprint(file.path(), &overrides),
            Err(CliError::Config(_))
        ));
    }
}
