//! `validate` command implementation.

use std::collections::BTreeSet;

use adapter_group::RegistryFactory;
use anyhow::{Context, Result};
use contracts::{ComponentRole, ConcentratorConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

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
    data_source: String,
    table_count: usize,
    descriptor_count: usize,
    group_count: usize,
    channel_count: usize,
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

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);

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
                    data_source: config.data_source.name.clone(),
                    table_count: config.data_source.table_count(),
                    descriptor_count: config.data_source.tables.values().map(Vec::len).sum(),
                    group_count: config.groups.len(),
                    channel_count: config.parser.channels.len(),
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
fn collect_warnings(config: &ConcentratorConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.groups.is_empty() {
        warnings.push("No groups configured - descriptor tables will not be loaded".to_string());
    } else if !config.groups.iter().any(|g| g.role == ComponentRole::Source) {
        warnings.push("No source group configured - data frames will not be credited".to_string());
    }

    for group in &config.groups {
        let rows = config
            .data_source
            .select(group.table(), group.temporal)
            .map_or(0, |rows| rows.len());
        if rows == 0 {
            warnings.push(format!(
                "Group '{}' selects no rows from table '{}'{}",
                group.name,
                group.table(),
                if group.temporal { " (temporal rows only)" } else { "" }
            ));
        }
    }

    let referenced: BTreeSet<&str> = config.groups.iter().map(|g| g.table()).collect();
    for table in config.data_source.tables.keys() {
        if !referenced.contains(table.as_str()) {
            warnings.push(format!("Table '{}' is not loaded by any group", table));
        }
    }

    // The CLI only knows the built-in kinds
    let factory = RegistryFactory::new().with_mock();
    for (table, rows) in &config.data_source.tables {
        for row in rows {
            if !factory.contains(&row.component_kind) {
                warnings.push(format!(
                    "{}[{}] '{}' uses kind '{}', which the concentrator binary cannot construct",
                    table,
                    row.id,
                    row.display_name(),
                    row.component_kind
                ));
            }
        }
    }

    if !config.parser.verify_checksum {
        warnings.push(
            "parser.verify_checksum is disabled - corrupted frames will be dispatched".to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Data source: {}", summary.data_source);
            println!("  Tables: {}", summary.table_count);
            println!("  Descriptors: {}", summary.descriptor_count);
            println!("  Groups: {}", summary.group_count);
            println!("  Channels: {}", summary.channel_count);
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
