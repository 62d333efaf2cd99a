//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::ConcentratorConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    data_source: DataSourceInfo,
    groups: Vec<GroupInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parser: Option<ParserInfo>,
}

#[derive(Serialize)]
struct DataSourceInfo {
    name: String,
    tables: Vec<TableInfo>,
}

#[derive(Serialize)]
struct TableInfo {
    name: String,
    row_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rows: Vec<RowInfo>,
}

#[derive(Serialize)]
struct RowInfo {
    id: u32,
    name: String,
    component_kind: String,
    temporal_session: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    connection_string: String,
}

#[derive(Serialize)]
struct GroupInfo {
    name: String,
    role: String,
    table: String,
    temporal: bool,
    selected_rows: usize,
    monitor_enabled: bool,
    monitor_interval_secs: u64,
    initialization_timeout_ms: u64,
    delay_auto_start: bool,
}

#[derive(Serialize)]
struct ParserInfo {
    max_frame_length: usize,
    verify_checksum: bool,
    channels: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn build_config_info(config: &ConcentratorConfig, args: &InfoArgs) -> ConfigInfo {
    let tables = config
        .data_source
        .tables
        .iter()
        .map(|(name, rows)| TableInfo {
            name: name.clone(),
            row_count: rows.len(),
            rows: if args.tables {
                rows.iter()
                    .map(|row| RowInfo {
                        id: row.id,
                        name: row.display_name().to_string(),
                        component_kind: row.component_kind.clone(),
                        temporal_session: row.temporal_session,
                        connection_string: row.connection_string.clone(),
                    })
                    .collect()
            } else {
                Vec::new()
            },
        })
        .collect();

    let groups = config
        .groups
        .iter()
        .map(|group| GroupInfo {
            name: group.name.clone(),
            role: format!("{:?}", group.role),
            table: group.table().to_string(),
            temporal: group.temporal,
            selected_rows: config
                .data_source
                .select(group.table(), group.temporal)
                .map_or(0, |rows| rows.len()),
            monitor_enabled: group.monitor_enabled,
            monitor_interval_secs: group.monitor_interval_secs,
            initialization_timeout_ms: group.initialization_timeout_ms,
            delay_auto_start: group.delay_auto_start,
        })
        .collect();

    let parser = args.parser.then(|| ParserInfo {
        max_frame_length: config.parser.max_frame_length,
        verify_checksum: config.parser.verify_checksum,
        channels: config.parser.channels.clone(),
    });

    ConfigInfo {
        data_source: DataSourceInfo {
            name: config.data_source.name.clone(),
            tables,
        },
        groups,
        parser,
    }
}

fn print_config_info(config: &ConcentratorConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Concentrator Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Data source
    let data_source = &config.data_source;
    println!("🗄  Data Source: {}", data_source.name);
    let table_count = data_source.tables.len();
    for (i, (table, rows)) in data_source.tables.iter().enumerate() {
        let is_last = i + 1 == table_count;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} ({} rows)", prefix, table, rows.len());

        if args.tables {
            for (j, row) in rows.iter().enumerate() {
                let row_prefix = if j + 1 == rows.len() { "└─" } else { "├─" };
                println!(
                    "   {}  {} [{}] {} ({}){}",
                    child_prefix,
                    row_prefix,
                    row.id,
                    row.display_name(),
                    row.component_kind,
                    if row.temporal_session { " temporal" } else { "" }
                );
            }
        }
    }

    // Groups
    println!("\n🧩 Groups ({})", config.groups.len());
    for (i, group) in config.groups.iter().enumerate() {
        let is_last = i + 1 == config.groups.len();
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };
        let selected = data_source
            .select(group.table(), group.temporal)
            .map_or(0, |rows| rows.len());

        println!(
            "   {} {} ({:?}) <- {}, {} rows",
            prefix,
            group.name,
            group.role,
            group.table(),
            selected
        );
        println!(
            "   {}  └─ monitor: {}, init timeout: {} ms{}{}",
            child_prefix,
            if group.monitor_enabled {
                format!("every {}s", group.monitor_interval_secs)
            } else {
                "off".to_string()
            },
            group.initialization_timeout_ms,
            if group.temporal { ", temporal" } else { "" },
            if group.delay_auto_start { ", delayed auto-start" } else { "" }
        );
    }

    // Parser
    if args.parser {
        let parser = &config.parser;
        println!("\n⚙️  Frame Parser");
        println!("   ├─ Max frame length: {}", parser.max_frame_length);
        println!("   ├─ Verify checksum: {}", parser.verify_checksum);
        if parser.channels.is_empty() {
            println!("   └─ Channels: (one per source member)");
        } else {
            println!("   └─ Channels: {}", parser.channels.join(", "));
        }
    }

    println!();
}
