//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use adapter_group::AdminCommand;
use contracts::ConcentratorConfig;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        data_source = %config.data_source.name,
        tables = config.data_source.table_count(),
        groups = config.groups.len(),
        "Configuration loaded"
    );

    let admin_commands = parse_admin_commands(&args.admin_commands)?;

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        config,
        max_frames: if args.max_frames == 0 {
            None
        } else {
            Some(args.max_frames)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        frame_rate: args.frame_rate,
        admin_commands,
        echo: args.echo,
        print_status: args.status,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    info!("Starting concentrator...");

    let stats = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        stop_reason = %stats.stop_reason,
        frames_parsed = stats.parser.frames_parsed,
        malformed = stats.parser.malformed_frames,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Concentrator finished"
    );
    stats.print_summary();

    Ok(())
}

fn parse_admin_commands(commands: &[String]) -> Result<Vec<AdminCommand>, CliError> {
    commands
        .iter()
        .map(|text| {
            text.parse::<AdminCommand>()
                .map_err(|e| CliError::admin_command(text, e.to_string()))
        })
        .collect()
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &ConcentratorConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Data source: {}", config.data_source.name);
    for (table, rows) in &config.data_source.tables {
        println!("  - {} ({} rows)", table, rows.len());
    }

    println!("\nGroups ({}):", config.groups.len());
    for group in &config.groups {
        println!(
            "  - {} ({:?}) <- {}{}",
            group.name,
            group.role,
            group.table(),
            if group.temporal { " [temporal]" } else { "" }
        );
    }

    println!("\nParser:");
    println!("  Max frame length: {}", config.parser.max_frame_length);
    println!("  Verify checksum: {}", config.parser.verify_checksum);
    if !config.parser.channels.is_empty() {
        println!("  Channels: {:?}", config.parser.channels);
    }

    println!();
}
