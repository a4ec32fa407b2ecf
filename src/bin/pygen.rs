//! Python Generator CLI
//!
//! Reads a resolved schema graph and writes one Python module per schema
//! module under the generated package.
//!
//! Usage:
//!   pygen generate --input build/schema.json --output soiagen
//!   pygen check
//!   pygen spec --module geometry/shapes.soia

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use schema_pygen::{CodegenContext, PygenConfig, SchemaGraph};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pygen")]
#[command(about = "Generate typed Python modules from a resolved schema graph")]
struct Cli {
    /// Configuration file (overrides pygen.toml in the default locations)
    #[arg(short, long)]
    config: Option<String>,

    /// Resolved schema graph (JSON)
    #[arg(short, long)]
    input: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate every module and write it under the output directory
    Generate {
        /// Root of the generated package
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print what would be written without touching the filesystem
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate every module without writing anything
    Check,

    /// Print the reflection descriptor of each module
    Spec {
        /// Only this schema module (e.g. `geometry/shapes.soia`)
        #[arg(short, long)]
        module: Option<String>,
    },

    /// Write the effective configuration to a file
    InitConfig {
        #[arg(default_value = "pygen.toml")]
        path: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns `false` when some module failed
fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = PygenConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(input) = cli.input {
        config.input.path = input;
    }

    if let Commands::InitConfig { path } = &cli.command {
        config
            .save(path)
            .with_context(|| format!("Failed to write {}", path))?;
        println!("Wrote {}", path);
        return Ok(true);
    }

    let graph = SchemaGraph::from_path(&config.input.path)
        .with_context(|| format!("Failed to read schema graph {}", config.input.path.display()))?;
    let ctx = CodegenContext::build(&graph, config.generator.clone());
    info!(
        modules = graph.modules.len(),
        records = ctx.record_count(),
        "Loaded schema graph"
    );

    match cli.command {
        Commands::Generate { output, dry_run } => {
            let output = output.unwrap_or(config.output.dir);
            let report = ctx.generate_all();

            if dry_run {
                for module in &report.modules {
                    println!("{} -> {}", module.source_path, output.join(&module.output_path).display());
                }
            } else {
                let written = report
                    .write_to(&output)
                    .with_context(|| format!("Failed to write under {}", output.display()))?;
                println!(
                    "Generated {} module(s), {} class(es) under {}",
                    written.len(),
                    report.record_count(),
                    output.display()
                );
            }

            for failure in &report.failures {
                eprintln!("  {} - {}", failure.source_path, failure.error);
            }
            Ok(report.is_success())
        }

        Commands::Check => {
            let mut ok = true;
            for module in &graph.modules {
                match ctx.generate_module(module) {
                    Ok(generated) => println!("ok    {} ({} classes)", module.path, generated.record_count),
                    Err(e) => {
                        println!("FAIL  {} - {}", module.path, e);
                        ok = false;
                    }
                }
            }
            Ok(ok)
        }

        Commands::Spec { module } => {
            let selected: Vec<_> = match &module {
                Some(path) => match graph.module(path) {
                    Some(m) => vec![m],
                    None => bail!("No module named {}", path),
                },
                None => graph.modules.iter().collect(),
            };
            for m in selected {
                let spec = ctx
                    .module_spec(m)
                    .with_context(|| format!("Failed to describe {}", m.path))?;
                println!("{}", spec.to_json_pretty()?);
            }
            Ok(true)
        }

        Commands::InitConfig { .. } => Ok(true),
    }
}
