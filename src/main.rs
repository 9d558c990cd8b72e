use clap::Parser;
use color_eyre::Result;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ifc_metrics::export::{export_csv, export_json, ExportOptions};
use ifc_metrics::extract::extract;
use ifc_metrics::geometry::GeometrySettings;
use ifc_metrics::parser::open_ifc_file;

#[derive(Parser, Debug)]
#[command(name = "ifc-metrics")]
#[command(about = "IFC Metrics - export element metadata, volumes, areas and elevations to CSV")]
#[command(version)]
struct Args {
    /// Path to IFC file
    #[arg(required = true)]
    file: PathBuf,

    /// CSV output path
    #[arg(short, long, value_name = "FILE", default_value = "output.csv")]
    output: PathBuf,

    /// CSV field delimiter (single ASCII character)
    #[arg(long, value_name = "CHAR", default_value = ",", value_parser = parse_delimiter)]
    delimiter: u8,

    /// Also export rows to JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Measure shapes in each element's local coordinate system
    #[arg(long)]
    local_coords: bool,
}

fn parse_delimiter(value: &str) -> Result<u8, String> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        _ => Err(format!("expected a single ASCII character, got '{value}'")),
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let args = Args::parse();

    let model = open_ifc_file(&args.file)?;
    let settings = GeometrySettings {
        use_world_coords: !args.local_coords,
    };
    let extraction = extract(&model, settings);

    for skipped in &extraction.skipped {
        println!(
            "Error processing element {} ({}): {}",
            skipped.object_id, skipped.global_id, skipped.reason
        );
    }

    let options = ExportOptions {
        delimiter: args.delimiter,
    };
    export_csv(&extraction.rows, &args.output, &options)?;

    if let Some(json_path) = &args.json {
        export_json(&extraction.rows, json_path)?;
        println!("Exported to JSON: {}", json_path.display());
    }

    println!("Export complete! File saved to {}", args.output.display());
    Ok(())
}
