use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use migcheck::compare::{
    ColumnOutcome, ColumnQuality, ColumnStats, StatRow, StatsComparator, Verdict,
};
use migcheck::compiler::{build_hash_debug_sql, build_hash_sql, build_stats_sql, TableRef};
use migcheck::hash::{reconcile_hashes, HashOutcome, HashRow};
use migcheck::schema::{ColumnPair, ColumnSpec, DateStorage, Granularity, PartitionColumn, Platform};
use migcheck::vintage::{describe, Vintage, VintageBuilder};
use migcheck::{MigCheckError, ReconConfig, Result};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "migcheck")]
#[command(about = "Statistics and row-hash reconciliation between legacy and cloud tables")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, env = "MIGCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the statistics query for one column
    StatsSql {
        #[arg(long)]
        platform: Platform,

        /// Table as QUALIFIER.TABLE
        #[arg(long)]
        table: String,

        #[arg(long)]
        column: String,

        /// Column type as declared on the platform
        #[arg(long = "type")]
        data_type: String,

        #[arg(long)]
        filter: Option<String>,

        /// Override stats.top_n
        #[arg(long)]
        top_n: Option<usize>,
    },

    /// Print the row-hash query for both platforms
    HashSql {
        #[arg(long)]
        legacy_table: String,

        #[arg(long)]
        cloud_table: String,

        /// Hashed column as NAME:LEGACY_TYPE:CLOUD_TYPE (repeatable)
        #[arg(long = "column", required = true)]
        columns: Vec<String>,

        /// Key column as NAME:LEGACY_TYPE:CLOUD_TYPE (repeatable)
        #[arg(long = "key", required = true)]
        keys: Vec<String>,

        #[arg(long)]
        legacy_filter: Option<String>,

        #[arg(long)]
        cloud_filter: Option<String>,

        /// Project each normalized column next to the digest
        #[arg(long)]
        debug: bool,
    },

    /// List vintage windows and their predicates for a date range
    Vintages {
        #[arg(long, default_value = "month")]
        granularity: Granularity,

        #[arg(long)]
        from: NaiveDate,

        #[arg(long)]
        to: NaiveDate,

        /// Date-typed partition column, same name on both platforms
        #[arg(long)]
        partition_column: Option<String>,

        /// Table as QUALIFIER.TABLE, used for labelling only
        #[arg(long)]
        table: Option<String>,
    },

    /// Compare exported statistics (JSON object of column -> stats) from both platforms
    Compare {
        #[arg(long)]
        legacy: PathBuf,

        #[arg(long)]
        cloud: PathBuf,
    },

    /// Reconcile exported row hashes (JSON array of {key, hash}) from both platforms
    HashCompare {
        #[arg(long)]
        legacy: PathBuf,

        #[arg(long)]
        cloud: PathBuf,

        /// Override hash.sample_limit
        #[arg(long)]
        sample_limit: Option<usize>,
    },
}

#[derive(Tabled)]
struct WindowRow {
    label: String,
    start: String,
    end: String,
    #[tabled(rename = "legacy predicate")]
    legacy: String,
    #[tabled(rename = "cloud predicate")]
    cloud: String,
}

#[derive(Tabled)]
struct VerdictRow {
    column: String,
    verdict: String,
    #[tabled(rename = "legacy type")]
    legacy_type: String,
    #[tabled(rename = "cloud type")]
    cloud_type: String,
    mismatches: String,
}

#[derive(Tabled)]
struct CountRow {
    metric: String,
    value: String,
}

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns whether everything reconciled.
fn run() -> Result<bool> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ReconConfig::from_file(path)?,
        None => ReconConfig::default().with_env_overrides(|k| std::env::var(k).ok())?,
    };

    match cli.command {
        Commands::StatsSql {
            platform,
            table,
            column,
            data_type,
            filter,
            top_n,
        } => {
            let table = TableRef::parse(&table)?;
            let spec = ColumnSpec::new(platform, platform.identifier(&column), data_type);
            let sql = build_stats_sql(
                platform,
                &table,
                &spec,
                filter.as_deref(),
                top_n.unwrap_or(config.stats.top_n),
            )?;
            println!("{}", sql);
            Ok(true)
        }
        Commands::HashSql {
            legacy_table,
            cloud_table,
            columns,
            keys,
            legacy_filter,
            cloud_filter,
            debug,
        } => {
            let tables = [TableRef::parse(&legacy_table)?, TableRef::parse(&cloud_table)?];
            let columns = columns.iter().map(|c| parse_column_arg(c)).collect::<Result<Vec<_>>>()?;
            let keys = keys.iter().map(|k| parse_column_arg(k)).collect::<Result<Vec<_>>>()?;
            let filters = [legacy_filter.as_deref(), cloud_filter.as_deref()];
            let build = if debug { build_hash_debug_sql } else { build_hash_sql };

            for (i, platform) in Platform::ALL.into_iter().enumerate() {
                let opts = &config.hash.options;
                let sql = build(platform, &tables[i], &columns, &keys, filters[i], opts)?;
                println!("{}", format!("-- {}", platform).dimmed());
                println!("{};\n", sql);
            }
            Ok(true)
        }
        Commands::Vintages {
            granularity,
            from,
            to,
            partition_column,
            table,
        } => {
            if from > to {
                return Err(MigCheckError::InvalidDate(format!("{} is after {}", from, to)));
            }
            let partition = partition_column.map(|c| PartitionColumn::new(c, DateStorage::Date));
            let table = table.as_deref().map(TableRef::parse).transpose()?;
            let vintages: Vec<Vintage> = VintageBuilder::new(granularity)
                .build(from, to)?
                .iter()
                .map(|w| Vintage::from_window(w, partition.as_ref(), partition.as_ref()))
                .collect();

            if let Some(table) = &table {
                for v in &vintages {
                    debug!(scope = %describe(table, v), "Vintage");
                }
            }

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&vintages)?);
            } else {
                let rows: Vec<WindowRow> = vintages
                    .into_iter()
                    .map(|v| WindowRow {
                        start: v.start_date.map(|d| d.to_string()).unwrap_or_default(),
                        end: v.end_date.map(|d| d.to_string()).unwrap_or_default(),
                        label: v.label,
                        legacy: v.legacy_predicate,
                        cloud: v.cloud_predicate,
                    })
                    .collect();
                print_table(rows);
            }
            Ok(true)
        }
        Commands::Compare { legacy, cloud } => compare_stats(&config, &legacy, &cloud, cli.json),
        Commands::HashCompare {
            legacy,
            cloud,
            sample_limit,
        } => {
            let left: Vec<HashRow> = read_json(&legacy)?;
            let right: Vec<HashRow> = read_json(&cloud)?;
            let limit = sample_limit.unwrap_or(config.hash.sample_limit);
            let outcome =
                reconcile_hashes("cli", Some(left.as_slice()), Some(right.as_slice()), limit);

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
            let HashOutcome::Compared(cmp) = outcome else {
                return Ok(false);
            };
            if !cli.json {
                let counts = [
                    ("legacy rows", cmp.left_rows),
                    ("cloud rows", cmp.right_rows),
                    ("matched", cmp.matched),
                    ("hash mismatch", cmp.hash_mismatch),
                    ("legacy only", cmp.left_only),
                    ("cloud only", cmp.right_only),
                    ("duplicate keys", cmp.duplicate_keys),
                ];
                print_table(counts.iter().map(|(m, v)| CountRow {
                    metric: m.to_string(),
                    value: v.to_string(),
                }));
                for m in &cmp.sample_mismatches {
                    println!(
                        "{} key={:?} legacy={} cloud={}",
                        "mismatch".red(),
                        m.key,
                        m.left_hash,
                        m.right_hash
                    );
                }
                let status = if cmp.is_match() { "MATCH".green() } else { "DIFFERENT".red() };
                println!("{}", status.bold());
            }
            Ok(cmp.is_match())
        }
    }
}

fn compare_stats(config: &ReconConfig, legacy: &Path, cloud: &Path, json: bool) -> Result<bool> {
    let upper = |m: BTreeMap<String, StatRow>| -> BTreeMap<String, StatRow> {
        m.into_iter()
            .map(|(k, v)| (Platform::Legacy.identifier(&k), v))
            .collect()
    };
    let mut left = upper(read_json(legacy)?);
    let mut right = upper(read_json(cloud)?);
    let names: BTreeSet<String> = left.keys().chain(right.keys()).cloned().collect();

    let stats: Vec<ColumnStats> = names
        .iter()
        .map(|name| ColumnStats {
            column: name.clone(),
            legacy: left.remove(name),
            cloud: right.remove(name),
        })
        .collect();
    let comparator = StatsComparator::new(config.stats.schema.clone());
    let outcomes = comparator.compare_all(&stats);

    let columns: Vec<String> = names.into_iter().collect();
    let mut by_vintage = BTreeMap::new();
    by_vintage.insert("input".to_string(), outcomes.clone());
    let quality = ColumnQuality::analyze(&columns, &by_vintage, config.keys.count);
    info!(
        clean = quality.clean_columns.len(),
        mismatched = quality.mismatched_columns.len(),
        "Statistics compared"
    );

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "outcomes": outcomes,
                "quality": quality,
            }))?
        );
    } else {
        let rows = outcomes.iter().map(|o| match o {
            ColumnOutcome::Compared(r) => VerdictRow {
                column: r.column.clone(),
                verdict: colored_verdict(r.verdict),
                legacy_type: r.left_type.clone().unwrap_or_default(),
                cloud_type: r.right_type.clone().unwrap_or_default(),
                mismatches: r
                    .mismatches
                    .iter()
                    .map(|m| m.statistic.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            },
            ColumnOutcome::NotComparable { column, missing_on } => VerdictRow {
                column: column.clone(),
                verdict: "N/A".yellow().to_string(),
                legacy_type: String::new(),
                cloud_type: String::new(),
                mismatches: format!(
                    "missing on {}",
                    missing_on.iter().map(|p| p.name()).collect::<Vec<_>>().join(", ")
                ),
            },
        });
        print_table(rows);
        if !quality.key_columns.is_empty() {
            println!("{} {}", "key columns:".bold(), quality.key_columns.join(", "));
        }
    }

    Ok(outcomes.iter().all(|o| o.verdict() == Some(Verdict::Pass)))
}

fn colored_verdict(verdict: Verdict) -> String {
    match verdict {
        Verdict::Pass => verdict.as_str().green().to_string(),
        Verdict::Partial => verdict.as_str().yellow().to_string(),
        Verdict::Fail => verdict.as_str().red().to_string(),
    }
}

fn print_table<T: Tabled>(rows: impl IntoIterator<Item = T>) {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Parses `NAME:LEGACY_TYPE:CLOUD_TYPE`.
fn parse_column_arg(arg: &str) -> Result<ColumnPair> {
    let parts: Vec<&str> = arg.splitn(3, ':').map(str::trim).collect();
    match parts.as_slice() {
        [name, legacy_type, cloud_type]
            if !name.is_empty() && !legacy_type.is_empty() && !cloud_type.is_empty() =>
        {
            let spec = |platform: Platform, data_type: &str| {
                ColumnSpec::new(platform, platform.identifier(name), data_type)
            };
            Ok(ColumnPair {
                legacy: spec(Platform::Legacy, legacy_type),
                cloud: spec(Platform::Cloud, cloud_type),
            })
        }
        _ => Err(MigCheckError::Config(format!(
            "Expected NAME:LEGACY_TYPE:CLOUD_TYPE, got '{}'",
            arg
        ))),
    }
}
