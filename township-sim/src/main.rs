//! `township [CONFIG] [YEARS] [SNAPSHOT_DIR]`
//!
//! Founds a town, runs it for `YEARS` (default 10) and prints the run
//! summary as JSON. With a snapshot directory the full exports are written
//! there as well.

use std::path::PathBuf;

use anyhow::Context;
use township_sim::{Driver, DriverConfig, export, telemetry};

const DEFAULT_YEARS: u32 = 10;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => DriverConfig::from_file(&PathBuf::from(&path))
            .with_context(|| format!("loading configuration from {path}"))?,
        None => DriverConfig::default(),
    };
    let years = match args.next() {
        Some(raw) => raw.parse::<u32>().with_context(|| format!("invalid year count {raw:?}"))?,
        None => DEFAULT_YEARS,
    };
    let snapshot = args.next().map(PathBuf::from);

    telemetry::init_tracing(&config.town.general.log_level, config.logging.json)
        .context("initialising tracing")?;

    let mut driver = Driver::new(config).context("founding the town")?;
    let summary = driver.run_years(years).context("running the simulation")?;
    if let Some(dir) = snapshot {
        export::write_snapshot(driver.simulation(), &dir)
            .with_context(|| format!("writing snapshot to {}", dir.display()))?;
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
