//! Code for reading feed-in profiles and renewable statistics.
use super::{input_err_msg, read_csv};
use crate::weather::WeatherTable;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Annual statistics of one renewable fuel
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenewableStatistics {
    /// Reported annual generation in GWh
    pub energy_gwh: f64,
    /// Installed capacity in MW
    pub capacity_mw: f64,
}

#[derive(Deserialize)]
struct RenewablesRaw {
    year: u32,
    fuel: String,
    energy_gwh: f64,
    capacity_mw: f64,
}

/// Read the normalised per-cell feed-in profiles of one parameter set.
///
/// The file layout is the same wide per-cell table as the weather parameter tables.
pub fn read_feedin_profiles(file_path: &Path, year: u32) -> Result<WeatherTable> {
    super::weather::read_weather_table(file_path, year)
}

/// Look up the national statistics of one renewable fuel for one year
pub fn read_renewable_statistics(
    file_path: &Path,
    fuel: &str,
    year: u32,
) -> Result<RenewableStatistics> {
    let row = read_csv::<RenewablesRaw>(file_path)?
        .find(|raw| raw.year == year && raw.fuel == fuel)
        .with_context(|| format!("No {fuel} statistics for {year}"))
        .with_context(|| input_err_msg(file_path))?;

    Ok(RenewableStatistics {
        energy_gwh: row.energy_gwh,
        capacity_mw: row.capacity_mw,
    })
}
