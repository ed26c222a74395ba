//! PM10 / PM2.5 chart generator
//!
//! One run:
//! 1. Lists monitoring stations from the configured upstream API
//! 2. Fetches PM10 and PM2.5 readings for the date range in parallel
//! 3. Groups readings per pollutant (optionally per station)
//! 4. Writes one PNG line chart per group
//!
//! Usage:
//!   cargo run --release -- 2023-05-01 2023-05-07
//!   cargo run --release -- --config other.toml 2023-05-01 2023-05-07
//!
//! Environment:
//!   RUST_LOG             - log filter (default: info)
//!   PM_CHARTS_BASE_URL   - overrides the configured API base URL
//!   PM_CHARTS_OUTPUT_DIR - overrides the configured output directory

use pm_charts::config::load_config;
use pm_charts::model::DateRange;
use pm_charts::pipeline::Pipeline;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Parsed command line.
#[derive(Debug, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    start: String,
    end: String,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut config = None;
    let mut dates = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                let path = args.get(i + 1).ok_or("--config requires a file path")?;
                config = Some(PathBuf::from(path));
                i += 2;
            }
            flag if flag.starts_with("--") => {
                return Err(format!("unknown argument: {}", flag));
            }
            date => {
                dates.push(date.to_string());
                i += 1;
            }
        }
    }

    match <[String; 2]>::try_from(dates) {
        Ok([start, end]) => Ok(Args { config, start, end }),
        Err(dates) => Err(format!("expected START_DATE and END_DATE, got {} date argument(s)", dates.len())),
    }
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let argv: Vec<String> = env::args().collect();
    let program = argv.first().map(String::as_str).unwrap_or("pm_charts");
    let args = match parse_args(argv.get(1..).unwrap_or_default()) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: {} [--config PATH] START_DATE END_DATE", program);
            return ExitCode::FAILURE;
        }
    };

    println!("🌫️  PM10 / PM2.5 Chart Generator");
    println!("================================\n");

    let range = match DateRange::parse(&args.start, &args.end) {
        Ok(range) => range,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match Pipeline::from_config(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("❌ Initialization failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("📊 Charting {} to {}", range.start(), range.end());
    println!("   Output: {}\n", config.output_dir.display());

    let report = pipeline.run(&range);

    println!("\n📋 Run summary");
    println!("{}", report);

    ExitCode::SUCCESS
}
