use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use airtrend::{AirQualityPipeline, AirQualityReport, AirTrendConfig, AirTrendError, logging, web};

/// Air pollutant time series for Swiss municipalities
#[derive(Parser, Debug)]
#[command(name = "airtrend", version)]
#[command(about = "Air pollutant time series for a place, compared against the legal limit")]
struct Cli {
    /// Configuration file (defaults to the user config dir, then ./config.toml)
    #[arg(long, global = true, env = "AIRTREND_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API
    Serve {
        /// Listen port, overrides the configured one
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the series for one place
    Query {
        /// Place name, e.g. "Luzern"
        place: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = AirTrendConfig::load_from_path(cli.config)?;
    logging::init(&config.logging)?;

    let pipeline = AirQualityPipeline::from_config(&config)?;

    match cli.command {
        Command::Serve { port } => {
            web::run(Arc::new(pipeline), port.unwrap_or(config.server.port)).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Query { place } => match pipeline.run(&place).await {
            Ok(Some(report)) => {
                print_report(&report);
                Ok(ExitCode::SUCCESS)
            }
            Ok(None) => {
                println!("Enter a place name to see its air quality history.");
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                eprintln!("{}", AirTrendError::from(e).user_message());
                Ok(ExitCode::FAILURE)
            }
        },
    }
}

fn print_report(report: &AirQualityReport) {
    println!(
        "{} at {} ({})",
        report.dataset,
        report.place,
        report.position.format_coordinates()
    );
    println!("Limit: {} {}", report.threshold, report.units);
    println!();
    println!("{:<6} {:>10}", "Year", report.units);

    for sample in &report.series {
        match sample.value() {
            Some(value) if value > report.threshold => {
                println!("{:<6} {:>10.1}  above limit", sample.year(), value);
            }
            Some(value) => println!("{:<6} {:>10.1}", sample.year(), value),
            None => println!("{:<6} {:>10}", sample.year(), "no data"),
        }
    }
}
