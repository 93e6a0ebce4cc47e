//! Code for reading municipal population figures from CSV files.
use super::read_csv;
use crate::population::Municipality;
use crate::region::point_from_lon_lat;
use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
struct MunicipalityRaw {
    key: String,
    state: String,
    population: u64,
    lon: f64,
    lat: f64,
}

/// Read the municipality table with population counts and representative coordinates
pub fn read_municipalities(file_path: &Path) -> Result<Vec<Municipality>> {
    let municipalities = read_csv::<MunicipalityRaw>(file_path)?
        .map(|raw| Municipality {
            key: raw.key,
            state: raw.state.into(),
            population: raw.population,
            location: point_from_lon_lat(raw.lon, raw.lat),
        })
        .collect();

    Ok(municipalities)
}
