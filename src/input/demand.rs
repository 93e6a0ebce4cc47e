//! Code for reading demand-related tables from CSV files.
use super::{input_err_msg, read_csv};
use crate::demand::LoadArea;
use crate::region::point_from_lon_lat;
use crate::series::HourlySeries;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
struct LoadRaw {
    load: f64,
}

#[derive(Deserialize)]
struct LoadAreaRaw {
    lon: f64,
    lat: f64,
    annual_demand: f64,
}

#[derive(Deserialize)]
struct AnnualDemandRaw {
    year: u32,
    demand_gwh: f64,
}

/// Read the national hourly load profile for one year.
///
/// The file has a single `load` column with one row per hour.
pub fn read_load_profile(file_path: &Path, year: u32) -> Result<HourlySeries> {
    let values: Vec<f64> = read_csv::<LoadRaw>(file_path)?.map(|raw| raw.load).collect();
    HourlySeries::from_values(year, values).with_context(|| input_err_msg(file_path))
}

/// Read the load-area table: one consumption point per row
pub fn read_load_areas(file_path: &Path) -> Result<Vec<LoadArea>> {
    let areas = read_csv::<LoadAreaRaw>(file_path)?
        .map(|raw| LoadArea {
            location: point_from_lon_lat(raw.lon, raw.lat),
            annual_demand: raw.annual_demand,
        })
        .collect();

    Ok(areas)
}

/// Look up the national annual electricity demand for one year, in GWh
pub fn read_annual_demand(file_path: &Path, year: u32) -> Result<f64> {
    let demand = read_csv::<AnnualDemandRaw>(file_path)?
        .find(|raw| raw.year == year)
        .map(|raw| raw.demand_gwh)
        .with_context(|| format!("No annual demand for {year}"))
        .with_context(|| input_err_msg(file_path))?;

    Ok(demand)
}
