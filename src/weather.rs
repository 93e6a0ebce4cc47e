//! The weather grid and region averages of weather parameters.
//!
//! The upstream weather source delivers one hourly series per grid cell. Cells are polygons;
//! for aggregation each cell is represented by its centroid, so a cell belongs to exactly
//! one region even when its polygon straddles a border.
use crate::region::{centroid, RegionID, RegionSet};
use crate::series::HourlySeries;
use anyhow::{Context, Result};
use geo::{Contains, Intersects, MultiPolygon, Point};
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a weather grid cell
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellID(pub u32);

impl fmt::Display for CellID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::str::FromStr for CellID {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// One cell of the weather grid
#[derive(Clone, Debug, PartialEq)]
pub struct GridCell {
    /// The cell polygon in WGS84 coordinates
    pub geometry: MultiPolygon,
    /// Centroid of the polygon, precomputed for the containment checks
    pub centroid: Point,
}

/// The weather grid, keyed by cell ID
#[derive(Clone, Debug, PartialEq)]
pub struct WeatherGrid {
    /// The grid cells
    cells: IndexMap<CellID, GridCell>,
}

/// An hourly weather parameter table: one series per grid cell
pub type WeatherTable = IndexMap<CellID, HourlySeries>;

impl WeatherGrid {
    /// Build a grid from cell polygons
    pub fn new(polygons: impl IntoIterator<Item = (CellID, MultiPolygon)>) -> Result<Self> {
        let cells = polygons
            .into_iter()
            .map(|(id, geometry)| -> Result<_> {
                let centroid = centroid(&geometry)
                    .with_context(|| format!("Grid cell {id} has an empty geometry"))?;
                Ok((id, GridCell { geometry, centroid }))
            })
            .try_collect()?;

        Ok(Self { cells })
    }

    /// The cells, keyed by ID
    pub fn cells(&self) -> &IndexMap<CellID, GridCell> {
        &self.cells
    }

    /// Find the cell containing the given point, if any
    pub fn find_cell(&self, point: &Point) -> Option<CellID> {
        self.cells
            .iter()
            .find(|(_, cell)| cell.geometry.contains(point))
            .map(|(id, _)| *id)
    }

    /// Find the cell for a latitude/longitude pair.
    ///
    /// Returns `None` (with a log message) if the coordinates are outside the grid.
    pub fn find_cell_by_coordinates(&self, latitude: f64, longitude: f64) -> Option<CellID> {
        let cell = self.find_cell(&Point::new(longitude, latitude));
        if cell.is_none() {
            log::warn!("No cell found for latitude {latitude} and longitude {longitude}.");
        }

        cell
    }

    /// The cells belonging to each region of the set, by centroid containment.
    ///
    /// A region too small to contain any centroid is fixed by assigning the cell which
    /// intersects the region's representative point, so every region gets at least one cell.
    pub fn cells_by_region(
        &self,
        region_set: &RegionSet,
    ) -> Result<IndexMap<RegionID, Vec<CellID>>> {
        let mut mapping: IndexMap<RegionID, Vec<CellID>> = region_set
            .iter_ids()
            .map(|id| (id.clone(), Vec::new()))
            .collect();

        for (cell_id, cell) in &self.cells {
            if let Some(region_id) = region_set.find_containing(&cell.centroid) {
                mapping[region_id].push(*cell_id);
            }
        }

        // Regions with no centroid match get the cell under their representative point
        for (region_id, cell_ids) in mapping.iter_mut() {
            if !cell_ids.is_empty() {
                continue;
            }
            let region = region_set.get(&region_id.0).unwrap();
            let point = region.representative_point()?;
            let cell_id = self
                .cells
                .iter()
                .find(|(_, cell)| cell.geometry.intersects(&point))
                .map(|(id, _)| *id)
                .with_context(|| {
                    format!("Region {region_id} does not intersect the weather grid")
                })?;
            debug!("Region {region_id} is smaller than a grid cell; using cell {cell_id}.");
            cell_ids.push(cell_id);
        }

        Ok(mapping)
    }
}

/// The mean of a weather parameter over all grid cells within each region.
///
/// # Arguments
///
/// * `table` - The per-cell parameter series for one year
/// * `grid` - The weather grid the table belongs to
/// * `region_set` - Polygons to calculate the average parameter for
///
/// Cells missing from the table are an error: incomplete yearly datasets must not silently
/// skew the average.
pub fn spatial_average(
    table: &WeatherTable,
    grid: &WeatherGrid,
    region_set: &RegionSet,
) -> Result<IndexMap<RegionID, HourlySeries>> {
    let year = table
        .values()
        .next()
        .context("Weather table contains no cells")?
        .year;
    info!(
        "Getting average parameter for {} in {year}.",
        region_set.name()
    );

    let mapping = grid.cells_by_region(region_set)?;
    let mut averages = IndexMap::new();
    for (region_id, cell_ids) in mapping {
        debug!("{region_id}: {} cells", cell_ids.len());
        let mut total = HourlySeries::zeros(year);
        for cell_id in &cell_ids {
            let series = table
                .get(cell_id)
                .with_context(|| format!("Cell {cell_id} missing from weather table"))?;
            total.add_scaled(series, 1.0);
        }
        total.divide(cell_ids.len() as f64);
        averages.insert(region_id, total);
    }

    Ok(averages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{federal_states, weather_grid};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_find_cell_by_coordinates(weather_grid: WeatherGrid) {
        // Cell 1 covers [0, 1] x [0, 1]
        assert_eq!(
            weather_grid.find_cell_by_coordinates(0.5, 0.5),
            Some(CellID(1))
        );
        assert_eq!(weather_grid.find_cell_by_coordinates(50.0, 50.0), None);
    }

    #[rstest]
    fn test_cells_by_region(weather_grid: WeatherGrid, federal_states: RegionSet) {
        let mapping = weather_grid.cells_by_region(&federal_states).unwrap();
        assert_eq!(mapping[&RegionID::from("SH")], vec![CellID(1)]);
        assert_eq!(
            mapping[&RegionID::from("NI")],
            vec![CellID(3), CellID(4)]
        );
    }

    #[rstest]
    fn test_spatial_average(weather_grid: WeatherGrid, federal_states: RegionSet) {
        let table: WeatherTable = weather_grid
            .cells()
            .keys()
            .map(|id| (*id, HourlySeries::constant(2014, id.0 as f64)))
            .collect();

        let averages = spatial_average(&table, &weather_grid, &federal_states).unwrap();
        // NI holds cells 3 and 4
        assert_approx_eq!(f64, averages[&RegionID::from("NI")].mean(), 3.5);
        // SH holds cell 1 only
        assert_approx_eq!(f64, averages[&RegionID::from("SH")].mean(), 1.0);
    }

    #[rstest]
    fn test_missing_cell_is_an_error(weather_grid: WeatherGrid, federal_states: RegionSet) {
        let table: WeatherTable =
            std::iter::once((CellID(1), HourlySeries::constant(2014, 1.0))).collect();
        assert!(spatial_average(&table, &weather_grid, &federal_states).is_err());
    }
}
