//! # dftxml converter
//!
//! A command-line tool for converting VASP `vasprun.xml` output into JSON.
//!
//! ## Usage
//!
//! ```bash
//! # Convert a run to JSON
//! dftxml convert vasprun.xml run.json
//!
//! # Only the subtrees you care about
//! dftxml convert vasprun.xml --only calculation --only atominfo
//!
//! # Structural summary
//! dftxml info vasprun.xml
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use dftxml::value::Value;
use dftxml::vasp::VaspParser;

/// dftxml - VASP XML Output Converter
#[derive(Parser)]
#[command(name = "dftxml")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a vasprun.xml file to JSON
    Convert {
        /// Input vasprun.xml file path
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output JSON file path (defaults to the input with a .json extension)
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Parse only the named subtrees (repeatable)
        #[arg(long, value_name = "NAME")]
        only: Vec<String>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Display a structural summary of a vasprun.xml file
    Info {
        /// Input vasprun.xml file path
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Convert {
            input,
            output,
            only,
            pretty,
        } => run_convert(input, output, only, pretty),
        Commands::Info { file } => run_info(file),
    }
}

/// Convert a vasprun.xml file to JSON
fn run_convert(
    input: PathBuf,
    output: Option<PathBuf>,
    only: Vec<String>,
    pretty: bool,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let output = output.unwrap_or_else(|| input.with_extension("json"));

    info!("Input:  {}", input.display());
    info!("Output: {}", output.display());
    if !only.is_empty() {
        info!("Subtrees: {}", only.join(", "));
    }

    let mut parser = VaspParser::new();
    if !only.is_empty() {
        parser = parser.with_selection(only);
    }

    let started = Instant::now();
    let doc = parser
        .parse_file(&input)
        .with_context(|| format!("Failed to parse {}", input.display()))?;
    info!("Parsed in {:.3}s", started.elapsed().as_secs_f64());

    let file = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, &doc)?;
    } else {
        serde_json::to_writer(&mut writer, &doc)?;
    }
    writer.flush()?;

    let size = std::fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
    info!("Wrote {} bytes", size);

    Ok(())
}

/// Display a structural summary of a vasprun.xml file
fn run_info(file: PathBuf) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let started = Instant::now();
    let doc = dftxml::vasp::parse_file(&file)
        .with_context(|| format!("Failed to parse {}", file.display()))?;
    info!("Parsed in {:.3}s", started.elapsed().as_secs_f64());

    println!("vasprun.xml Summary");
    println!("===================");
    println!("File: {}", file.display());
    println!();

    match doc.as_mapping() {
        Some(entries) => {
            println!("Top-level entries:");
            for (name, value) in entries {
                println!(
                    "  {:24} {}",
                    name.as_deref().unwrap_or("(anonymous)"),
                    describe(value)
                );
            }
        }
        None => println!("Document root: {}", describe(&doc)),
    }

    Ok(())
}

/// One-line description of a value for the summary listing.
fn describe(value: &Value) -> String {
    match value {
        Value::Scalar(_) => value.kind().to_string(),
        Value::Vector(items) => format!("vector[{}]", items.len()),
        Value::Table(table) => format!(
            "table ({} dimensions, {} fields)",
            table.dimensions.len(),
            table.fields.len()
        ),
        Value::Mapping(entries) => format!("mapping ({} entries)", entries.len()),
        Value::List(items) => format!("list[{}]", items.len()),
    }
}
