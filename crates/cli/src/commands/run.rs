//! `run` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use contracts::{BridgeBlueprint, ConnectError, HubClient};
use dispatcher::Broadcaster;
use endpoint::EndpointState;
use ingestion::{HttpHubClient, IngestionError, RotationScheduler, UpstreamSubscriber};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::shutdown_signal;
use crate::cli::RunArgs;
use crate::config::load_blueprint;
use crate::error::CliError;

/// Execute the `run` command
pub async fn run_bridge(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let blueprint = load_blueprint(&args.config, &args.overrides)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        hub = %blueprint.hub.address,
        bind = %blueprint.server.bind,
        path = %blueprint.server.path,
        rotation_secs = blueprint.rotation.interval_secs,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let client = Arc::new(
        HttpHubClient::new(&blueprint.hub).map_err(|e| CliError::startup(e.to_string()))?,
    );
    check_credential(client.as_ref(), &blueprint, args.skip_auth_check).await?;

    let shutdown = CancellationToken::new();
    let broadcaster = Broadcaster::new();
    let subscriber = Arc::new(UpstreamSubscriber::new(
        client,
        broadcaster.clone(),
        blueprint.hub.clone(),
    ));
    let scheduler = RotationScheduler::new(subscriber.clone(), blueprint.rotation.clone());
    let scheduler_task = scheduler.spawn(shutdown.child_token());

    let listener = endpoint::bind(&blueprint.server.bind)
        .await
        .context("Failed to start viewer endpoint")?;
    let state = EndpointState::new(broadcaster.clone(), blueprint.server.clone())
        .with_upstream(subscriber.clone())
        .with_shutdown(shutdown.clone());
    let mut server = tokio::spawn(endpoint::serve(listener, state));

    info!("Bridge running");

    let server_result = tokio::select! {
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping bridge...");
            shutdown.cancel();
            server.await
        }
        result = &mut server => {
            warn!("Endpoint stopped unexpectedly, shutting down");
            shutdown.cancel();
            result
        }
    };

    match scheduler_task.await {
        Ok(Ok(())) | Ok(Err(IngestionError::Cancelled)) => {}
        Ok(Err(e)) => warn!(error = %e, "Rotation scheduler ended with error"),
        Err(e) => warn!(error = %e, "Rotation scheduler task failed"),
    }

    let stats = broadcaster.metrics();
    info!(
        broadcasts = stats.broadcast_count,
        writes = stats.write_count,
        failures = stats.failure_count,
        viewers_served = stats.registered_count,
        "Hue bridge finished"
    );

    server_result
        .context("Endpoint task failed")?
        .context("Endpoint failed")?;
    Ok(())
}

/// Check the hub credential once before starting
///
/// A rejected credential will not fix itself, so it aborts startup unless
/// `--skip-auth-check` is given. An unreachable hub only warns; the
/// scheduler keeps retrying.
async fn check_credential<C: HubClient>(
    client: &C,
    blueprint: &BridgeBlueprint,
    skip_auth_check: bool,
) -> Result<(), CliError> {
    match client
        .authenticate(&blueprint.hub.address, &blueprint.hub.credential)
        .await
    {
        Ok(session) => {
            info!(
                address = %session.address,
                bridge_id = session.bridge_id.as_deref().unwrap_or("unknown"),
                "Hub accepted credential"
            );
            Ok(())
        }
        Err(e @ ConnectError::Rejected { .. }) if !skip_auth_check => Err(CliError::HubRejected(e)),
        Err(e) => {
            warn!(error = %e, "Hub check failed, continuing; subscription will retry");
            Ok(())
        }
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &BridgeBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Hub:");
    println!("  Address: {}", blueprint.hub.address);
    println!(
        "  Certificate check: {}",
        if blueprint.hub.accept_invalid_certs {
            "disabled"
        } else {
            "enabled"
        }
    );
    println!("\nRotation:");
    println!("  Interval: {}s", blueprint.rotation.interval_secs);
    println!(
        "  Recovery backoff: {}ms .. {}ms",
        blueprint.rotation.recovery_min_ms, blueprint.rotation.recovery_max_ms
    );
    println!("\nEndpoint:");
    println!(
        "  Listen: {}{}",
        blueprint.server.bind, blueprint.server.path
    );
    println!("  Ping every: {}s", blueprint.server.ping_interval_secs);
    println!("  Client retry hint: {}ms", blueprint.server.client_retry_ms);
    println!("  Per-viewer queue: {}", blueprint.server.channel_capacity);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{HubConfig, ReaderConfig, RotationConfig, ServerConfig};
    use ingestion::MockHubClient;

    fn blueprint() -> BridgeBlueprint {
        BridgeBlueprint {
            version: Default::default(),
            hub: HubConfig {
                address: "hub.local".into(),
                credential: "key".into(),
                accept_invalid_certs: true,
                connect_timeout_secs: 1,
            },
            rotation: RotationConfig::default(),
            server: ServerConfig::default(),
            reader: ReaderConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_rejected_credential_aborts() {
        let client = MockHubClient::new();
        client.reject_credential();
        let err = check_credential(&client, &blueprint(), false).await.unwrap_err();
        assert!(matches!(err, CliError::HubRejected(_)));
        assert!(check_credential(&client, &blueprint(), true).await.is_ok());
    }

    #[tokio::test]
    async fn test_accepted_credential() {
        let client = MockHubClient::new();
        assert!(check_credential(&client, &blueprint(), false).await.is_ok());
    }
}
