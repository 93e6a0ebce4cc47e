//! Code for reading the weather grid and per-cell parameter tables.
use super::{input_err_msg, read_csv};
use crate::series::HourlySeries;
use crate::weather::{CellID, WeatherGrid, WeatherTable};
use anyhow::{ensure, Context, Result};
use geo::{MultiPolygon, Polygon};
use serde::Deserialize;
use std::path::Path;
use wkt::TryFromWkt;

#[derive(Deserialize)]
struct GridCellRaw {
    cell: CellID,
    wkt: String,
}

/// Read the weather grid from a WKT CSV file with columns `cell` and `wkt`
pub fn read_weather_grid(file_path: &Path) -> Result<WeatherGrid> {
    let cells = read_csv::<GridCellRaw>(file_path)?
        .map(|raw| -> Result<_> {
            let geometry = parse_polygon(&raw.wkt)
                .with_context(|| format!("Invalid geometry for grid cell {}", raw.cell))?;
            Ok((raw.cell, geometry))
        })
        .collect::<Result<Vec<_>>>()
        .with_context(|| input_err_msg(file_path))?;

    WeatherGrid::new(cells).with_context(|| input_err_msg(file_path))
}

/// Parse a WKT polygon column, wrapping single polygons
fn parse_polygon(wkt_str: &str) -> Result<MultiPolygon> {
    if let Ok(multi) = MultiPolygon::try_from_wkt_str(wkt_str) {
        return Ok(multi);
    }
    let polygon = Polygon::<f64>::try_from_wkt_str(wkt_str)
        .map_err(|err| anyhow::anyhow!("Not a polygon geometry: {err}"))?;

    Ok(MultiPolygon::new(vec![polygon]))
}

/// Read an hourly parameter table: one column per grid cell, one row per hour.
///
/// The header holds the cell IDs. Every column must cover the full year; leap years are
/// truncated by [`HourlySeries::from_values`].
pub fn read_weather_table(file_path: &Path, year: u32) -> Result<WeatherTable> {
    read_weather_table_internal(file_path, year).with_context(|| input_err_msg(file_path))
}

/// Parse the wide per-cell table
fn read_weather_table_internal(file_path: &Path, year: u32) -> Result<WeatherTable> {
    let mut reader = csv::Reader::from_path(file_path)?;
    let cell_ids = reader
        .headers()?
        .iter()
        .map(|header| {
            header
                .parse::<CellID>()
                .with_context(|| format!("Invalid cell ID column '{header}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    ensure!(!cell_ids.is_empty(), "Parameter table has no columns");

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); cell_ids.len()];
    for record in reader.records() {
        let record = record?;
        ensure!(
            record.len() == cell_ids.len(),
            "Row with {} values in a table of {} columns",
            record.len(),
            cell_ids.len()
        );
        for (column, value) in columns.iter_mut().zip(record.iter()) {
            column.push(value.trim().parse::<f64>()?);
        }
    }

    cell_ids
        .into_iter()
        .zip(columns)
        .map(|(cell_id, values)| {
            let series = HourlySeries::from_values(year, values)
                .with_context(|| format!("Cell {cell_id}"))?;
            Ok((cell_id, series))
        })
        .collect()
}
