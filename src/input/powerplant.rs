//! Code for reading the power plant registry from CSV files.
use super::{input_err_msg, read_csv, read_csv_optional};
use crate::powerplant::{Category, Fuel, PowerPlant};
use crate::region::{point_from_lon_lat, StateID};
use anyhow::{ensure, Context, Result};
use geo::Point;
use indexmap::IndexMap;
use log::{info, warn};
use serde::Deserialize;
use std::path::Path;

/// Decommissioning year assumed for plants still in operation
const DEFAULT_DECOM_YEAR: u32 = 9999;
/// Month assumed when the source reports a year without a month
const DEFAULT_MONTH: u32 = 6;

/// One row of the registry file, before normalisation
#[derive(Debug, Deserialize)]
struct PowerPlantRaw {
    category: Category,
    #[serde(default)]
    fuel_level_1: Option<String>,
    #[serde(default)]
    fuel_level_2: Option<String>,
    #[serde(default)]
    technology: Option<String>,
    capacity: f64,
    #[serde(default)]
    efficiency: Option<f64>,
    com_year: u32,
    #[serde(default)]
    com_month: Option<u32>,
    #[serde(default)]
    decom_year: Option<u32>,
    #[serde(default)]
    decom_month: Option<u32>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

/// Read and normalise the power plant registry.
///
/// `state_centroids` provides fallback coordinates for rows without lat/lon.
pub fn read_power_plants(
    file_path: &Path,
    state_centroids: &IndexMap<StateID, Point>,
) -> Result<Vec<PowerPlant>> {
    let plants_csv = read_csv(file_path)?;
    read_power_plants_from_iter(plants_csv, state_centroids)
        .with_context(|| input_err_msg(file_path))
}

/// Read the curated offshore wind patch table, which may be absent
pub fn read_offshore_patch(
    file_path: &Path,
    state_centroids: &IndexMap<StateID, Point>,
) -> Result<Vec<PowerPlant>> {
    let plants_csv = read_csv_optional(file_path)?;
    read_power_plants_from_iter(plants_csv, state_centroids)
        .with_context(|| input_err_msg(file_path))
}

/// Normalise registry rows from an iterator.
///
/// Rows with a non-empty comment are considered suspicious and dropped. Rows without
/// coordinates are placed at their state's centre. Missing fuel classifications fall back
/// level by level and end up as [`Fuel::Unknown`].
fn read_power_plants_from_iter<I>(
    iter: I,
    state_centroids: &IndexMap<StateID, Point>,
) -> Result<Vec<PowerPlant>>
where
    I: Iterator<Item = PowerPlantRaw>,
{
    let mut plants = Vec::new();
    let mut dropped = 0;
    let mut relocated = 0;
    for raw in iter {
        if raw.comment.as_deref().is_some_and(|c| !c.trim().is_empty()) {
            dropped += 1;
            continue;
        }

        let location = match (raw.lon, raw.lat) {
            (Some(lon), Some(lat)) => point_from_lon_lat(lon, lat),
            _ => {
                let state = raw
                    .state
                    .as_deref()
                    .context("Row has neither coordinates nor a state")?;
                relocated += 1;
                *state_centroids
                    .get(state)
                    .with_context(|| format!("No centre coordinate for state {state}"))?
            }
        };

        let fuel_name = raw
            .fuel_level_2
            .or(raw.fuel_level_1)
            .unwrap_or_else(|| format!("unknown from {}", raw.category));
        let fuel = parse_fuel(&fuel_name);

        let com_month = month_or_default(raw.com_month)?;
        let decom_month = month_or_default(raw.decom_month)?;
        ensure!(
            raw.capacity >= 0.0,
            "Negative capacity {} in registry",
            raw.capacity
        );

        plants.push(PowerPlant {
            category: raw.category,
            fuel,
            technology: raw.technology,
            capacity: raw.capacity,
            efficiency: raw.efficiency,
            capacity_in: None,
            com_year: raw.com_year,
            com_month,
            decom_year: raw.decom_year.unwrap_or(DEFAULT_DECOM_YEAR),
            decom_month,
            location,
            region: None,
            cell: None,
        });
    }

    if dropped > 0 {
        info!("{dropped} suspicious rows dropped from the registry.");
    }
    if relocated > 0 {
        warn!("{relocated} rows without coordinates placed at their state's centre.");
    }

    Ok(plants)
}

/// Validate a month column, substituting mid-year when the source gives none
fn month_or_default(month: Option<u32>) -> Result<u32> {
    match month {
        None | Some(0) => Ok(DEFAULT_MONTH),
        Some(month) => {
            ensure!((1..=12).contains(&month), "Invalid month {month} in registry");
            Ok(month)
        }
    }
}

/// Map the source fuel classification onto the main fuel groups
fn parse_fuel(name: &str) -> Fuel {
    match name.to_lowercase().as_str() {
        "wind" | "wind energy" => Fuel::Wind,
        "solar" | "photovoltaics" => Fuel::Solar,
        "hydro" | "run-of-river" | "reservoir" => Fuel::Hydro,
        "bioenergy" | "biomass" | "biogas" | "sewage and landfill gas" => Fuel::Bioenergy,
        "geothermal" => Fuel::Geothermal,
        "natural gas" | "gas" => Fuel::NaturalGas,
        "hard coal" => Fuel::HardCoal,
        "lignite" => Fuel::Lignite,
        "nuclear" => Fuel::Nuclear,
        "oil" | "mineral oil products" => Fuel::Oil,
        "storage" | "pumped storage" => Fuel::Storage,
        name if name.starts_with("unknown") => Fuel::Unknown,
        _ => Fuel::Other,
    }
}
