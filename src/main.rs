mod config;
mod loader;
mod output;

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use config::AppConfig;
use cycle_scanner::{analyze, PriceSeries};
use loader::load_prices_from_csv;
use output::print_report;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::parse();
    run(&config)
}

fn run(config: &AppConfig) -> Result<()> {
    let input_path = &config.input_path;
    if !Path::new(input_path).exists() {
        bail!("input file {:?} does not exist", input_path);
    }

    let options = config.engine_options()?;

    let points = load_prices_from_csv(input_path)
        .with_context(|| format!("failed to load input data from {:?}", input_path))?;
    let series = PriceSeries::new(points).context("input is not a valid price series")?;
    info!(bars = series.len(), "loaded price history");

    let report = analyze(&series, &options).with_context(|| {
        format!(
            "cycle analysis failed (window {} bars, wavelengths {}..={})",
            options.window_size, options.min_wavelength, options.max_wavelength
        )
    })?;

    print_report(&report, &series, config.persistence_threshold);

    Ok(())
}
