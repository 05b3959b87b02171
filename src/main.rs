//! pg-schema-diff CLI
//!
//! Entry point for the command-line tool. Loads a current-schema snapshot
//! and a target-schema specification (both JSON model files), reconciles
//! them, and prints the resulting statement list.
//!
//! Exit codes:
//! - 0: Schemas are in sync (no statements emitted)
//! - 1: One or more statements were emitted
//! - 2: Tool error (config error, model error, diff error, I/O error)

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

use pg_schema_diff::model::DatabaseModel;
use pg_schema_diff::{Config, ReconcileOptions, Reconciler};

/// Default config file name used when --config is not explicitly provided.
const DEFAULT_CONFIG_FILE: &str = "pg-schema-diff.toml";

#[derive(Parser, Debug)]
#[command(name = "pg-schema-diff")]
#[command(about = "Declarative schema reconciliation for PostgreSQL", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the live-schema snapshot (JSON model file)
    #[arg(long)]
    current: Option<PathBuf>,

    /// Path to the declared target schema (JSON model file)
    #[arg(long)]
    target: Option<PathBuf>,

    /// Explain a named extension template (e.g., --explain default)
    #[arg(long)]
    explain: Option<String>,

    /// Also write the statement list to <output.dir>/schema-sync.sql
    #[arg(long)]
    script: bool,
}

fn main() {
    let args = Args::parse();

    match run(args) {
        Ok(has_statements) => {
            if has_statements {
                std::process::exit(1);
            }
            // exit 0 is implicit
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(2);
        }
    }
}

/// Run the reconciliation pipeline.
///
/// Returns `Ok(true)` if statements were emitted (the schemas differ),
/// `Ok(false)` if the schemas are already in sync, or `Err` on tool errors.
fn run(args: Args) -> Result<bool> {
    // Load configuration.
    // If --config is explicitly provided and the file doesn't exist, that's a tool error.
    // If using the default path and it doesn't exist, warn and use defaults.
    let config = load_config(&args.config)?;

    // Handle --explain early exit
    if let Some(name) = args.explain {
        explain_extension(&config, &name)?;
        return Ok(false);
    }

    let current_path = args
        .current
        .context("--current <snapshot.json> is required")?;
    let target_path = args.target.context("--target <schema.json> is required")?;

    let current = DatabaseModel::from_json_file(&current_path)
        .with_context(|| format!("Failed to load current model {}", current_path.display()))?;
    let target = DatabaseModel::from_json_file(&target_path)
        .with_context(|| format!("Failed to load target model {}", target_path.display()))?;

    let reconciler = Reconciler::new(
        config.extension_catalog(),
        ReconcileOptions {
            default_schema: config.schema.default.clone(),
        },
    );
    let statements = reconciler
        .reconcile(&current, target)
        .context("Reconciliation failed")?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    for statement in &statements {
        writeln!(handle, "{statement};")?;
    }
    handle.flush()?;

    if args.script || config.output.script {
        write_script(&config, &statements)?;
    }

    eprintln!("pg-schema-diff: {} statement(s)", statements.len());
    Ok(!statements.is_empty())
}

/// Write the statement list as an executable script. The whole list is
/// wrapped in one transaction so a mid-script failure leaves the database
/// unchanged.
fn write_script(config: &Config, statements: &[String]) -> Result<()> {
    std::fs::create_dir_all(&config.output.dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output.dir.display()
        )
    })?;
    let path = config.output.dir.join("schema-sync.sql");
    let mut script = String::from("BEGIN;\n");
    for statement in statements {
        script.push_str(statement);
        script.push_str(";\n");
    }
    script.push_str("COMMIT;\n");
    std::fs::write(&path, script)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Load configuration from file.
///
/// If `config_path` is `Some`, the user explicitly passed `--config` and the file
/// must exist (error if not found). If `None`, the default config path is used;
/// a missing default config file is not an error (falls back to defaults with a warning).
fn load_config(config_path: &Option<PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => {
            // User explicitly provided --config; file must exist.
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::from_file(path).context("Failed to load configuration")
        }
        None => {
            // Using default config path; missing file is OK.
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                Config::from_file(&default_path).context("Failed to load configuration")
            } else {
                eprintln!(
                    "Warning: Config file {} not found, using defaults",
                    default_path.display()
                );
                Ok(Config::default())
            }
        }
    }
}

fn explain_extension(config: &Config, name: &str) -> Result<()> {
    let catalog = config.extension_catalog();
    let Some(ext) = catalog.get(name) else {
        anyhow::bail!("Unknown extension: {}", name);
    };

    println!("Extension: {}", name);
    println!("Columns:");
    for col_name in &ext.columns {
        if let Some(col) = catalog.columns.get(col_name) {
            let not_null = if col.not_null { " NOT NULL" } else { "" };
            let default = col
                .default
                .as_deref()
                .map(|d| format!(" DEFAULT {d}"))
                .unwrap_or_default();
            println!("  {} {}{}{}", col_name, col.type_name, not_null, default);
        }
    }
    if !ext.triggers.is_empty() {
        println!("Triggers:");
        for trg_name in &ext.triggers {
            if let Some(trg) = catalog.triggers.get(trg_name) {
                println!("  {} -> {}", trg_name, trg.procedure);
            }
        }
    }

    Ok(())
}
