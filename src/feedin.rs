//! Regional aggregation of normalised feed-in time series.
//!
//! The physical feed-in models run upstream and deliver one normalised hourly profile per
//! weather grid cell and parameter set. This module turns those per-cell profiles into one
//! normalised profile per region by weighting each cell with the installed capacity of the
//! plants inside it.
use crate::powerplant::{capacity_by_region_cell, Fuel, PowerPlant};
use crate::region::{RegionID, RegionSet};
use crate::series::HourlySeries;
use crate::weather::{CellID, WeatherTable};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::{debug, info};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// Feed-in categories with weather-driven profiles
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, DeserializeLabeledStringEnum, SerializeLabeledStringEnum)]
pub enum FeedinCategory {
    /// Wind feed-in
    #[string = "wind"]
    Wind,
    /// Solar (photovoltaic) feed-in
    #[string = "solar"]
    Solar,
}

impl FeedinCategory {
    /// The fuel group whose plants carry this category's capacity weights
    pub fn fuel(&self) -> Fuel {
        match self {
            Self::Wind => Fuel::Wind,
            Self::Solar => Fuel::Solar,
        }
    }
}

/// Normalised regional feed-in profiles, keyed by region ID
pub type RegionalProfiles = IndexMap<RegionID, HourlySeries>;

/// Aggregate per-cell feed-in profiles to one normalised profile per region.
///
/// For every region, the cell profiles are summed weighted by the installed capacity of the
/// region's plants in each cell and divided by the region's total capacity. The result is
/// again a normalised profile: a capacity-weighted mean of the cell profiles.
///
/// Regions without any capacity of the category's fuel produce no profile; they are logged
/// and skipped rather than filled with zeros.
///
/// # Arguments
///
/// * `profiles` - Normalised per-cell profiles for one year and parameter set
/// * `plants` - The harmonised plant table, with regions and grid cells assigned
/// * `region_set` - The region set to aggregate for
/// * `category` - The feed-in category
/// * `year` - Year of the capacity weights
pub fn aggregate_by_region(
    profiles: &WeatherTable,
    plants: &[PowerPlant],
    region_set: &RegionSet,
    category: FeedinCategory,
    year: u32,
) -> Result<RegionalProfiles> {
    info!("Aggregating {category:?} feed-in for {year}...");

    let weights = capacity_by_region_cell(plants, category.fuel(), year);

    let mut regional = RegionalProfiles::new();
    for region_id in region_set.iter_ids() {
        let Some(cell_weights) = weights.get(region_id) else {
            info!("{year} - {region_id} (0 cells)");
            continue;
        };
        info!("{year} - {region_id} ({} cells)", cell_weights.len());
        debug!("{:?}", cell_weights.keys().collect::<Vec<_>>());

        let series = weighted_profile(profiles, cell_weights, year)
            .with_context(|| format!("Cannot aggregate feed-in for region {region_id}"))?;
        regional.insert(region_id.clone(), series);
    }

    Ok(regional)
}

/// The capacity-weighted mean of the profiles named by `weights`.
///
/// The series carries the year of the profiles, which may be a weather year differing from
/// the capacity year.
fn weighted_profile(
    profiles: &WeatherTable,
    weights: &IndexMap<CellID, f64>,
    year: u32,
) -> Result<HourlySeries> {
    let total_capacity: f64 = weights.values().sum();
    let series_year = profiles.values().next().map_or(year, |series| series.year);
    let mut series = HourlySeries::zeros(series_year);
    for (cell_id, capacity) in weights {
        let profile = profiles
            .get(cell_id)
            .with_context(|| format!("Cell {cell_id} missing from feed-in profiles"))?;
        series.add_scaled(profile, *capacity);
    }
    series.divide(total_capacity);

    Ok(series)
}

/// A flat hydro profile from the annual energy statistics.
///
/// Hydro generation is spread uniformly over the year: full-load hours are the reported
/// annual energy divided by the installed capacity.
///
/// # Arguments
///
/// * `annual_energy_gwh` - Reported national hydro generation for the year, in GWh
/// * `capacity_mw` - Installed hydro capacity in the year, in MW
/// * `region_set` - Regions to produce columns for
/// * `year` - The year
pub fn flat_hydro_profile(
    annual_energy_gwh: f64,
    capacity_mw: f64,
    region_set: &RegionSet,
    year: u32,
) -> Result<RegionalProfiles> {
    anyhow::ensure!(capacity_mw > 0.0, "No hydro capacity in {year}");
    let full_load_hours = annual_energy_gwh / capacity_mw * 1000.0;

    Ok(flat_profile(full_load_hours, region_set, year))
}

/// A flat geothermal profile from configured full-load hours
pub fn flat_geothermal_profile(
    full_load_hours: f64,
    region_set: &RegionSet,
    year: u32,
) -> RegionalProfiles {
    flat_profile(full_load_hours, region_set, year)
}

/// A profile holding `full_load_hours / hours` in every hour, for every region
fn flat_profile(full_load_hours: f64, region_set: &RegionSet, year: u32) -> RegionalProfiles {
    let hourly = full_load_hours / crate::series::HOURS_PER_YEAR as f64;
    region_set
        .iter_ids()
        .map(|id| (id.clone(), HourlySeries::constant(year, hourly)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpatialConfig;
    use crate::fixture::{federal_states, plant, weather_grid};
    use crate::powerplant::{assign_grid_cells, assign_regions};
    use crate::weather::WeatherGrid;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    /// Plants in NI: 30 MW in cell 3, 10 MW in cell 4
    fn prepared_plants(
        region_set: &RegionSet,
        grid: &WeatherGrid,
    ) -> Vec<crate::powerplant::PowerPlant> {
        let mut plants = vec![
            plant(Fuel::Wind, 30.0, 2.5, 0.5),
            plant(Fuel::Wind, 10.0, 3.5, 0.5),
        ];
        assign_regions(&mut plants, region_set, &SpatialConfig::default());
        assign_grid_cells(&mut plants, grid);
        plants
    }

    #[rstest]
    fn test_aggregate_by_region(federal_states: RegionSet, weather_grid: WeatherGrid) {
        let plants = prepared_plants(&federal_states, &weather_grid);
        let profiles: WeatherTable = [
            (CellID(3), HourlySeries::constant(2014, 0.8)),
            (CellID(4), HourlySeries::constant(2014, 0.4)),
        ]
        .into_iter()
        .collect();

        let regional = aggregate_by_region(
            &profiles,
            &plants,
            &federal_states,
            FeedinCategory::Wind,
            2014,
        )
        .unwrap();

        // Weighted mean: (30 * 0.8 + 10 * 0.4) / 40 = 0.7
        assert_approx_eq!(f64, regional[&RegionID::from("NI")].mean(), 0.7, epsilon = 1e-9);
        // SH has no wind capacity, so no column
        assert!(!regional.contains_key("SH"));
    }

    /// The weighted mean stays within the bounds of the contributing profiles
    #[rstest]
    fn test_aggregate_stays_within_bounds(federal_states: RegionSet, weather_grid: WeatherGrid) {
        let plants = prepared_plants(&federal_states, &weather_grid);
        let profiles: WeatherTable = [
            (CellID(3), HourlySeries::constant(2014, 1.0)),
            (CellID(4), HourlySeries::constant(2014, 0.0)),
        ]
        .into_iter()
        .collect();

        let regional = aggregate_by_region(
            &profiles,
            &plants,
            &federal_states,
            FeedinCategory::Wind,
            2014,
        )
        .unwrap();
        for value in regional[&RegionID::from("NI")].values() {
            assert!((0.0..=1.0).contains(value));
        }
    }

    #[rstest]
    fn test_missing_cell_profile_is_an_error(
        federal_states: RegionSet,
        weather_grid: WeatherGrid,
    ) {
        let plants = prepared_plants(&federal_states, &weather_grid);
        let profiles: WeatherTable =
            std::iter::once((CellID(3), HourlySeries::constant(2014, 0.8))).collect();

        assert!(aggregate_by_region(
            &profiles,
            &plants,
            &federal_states,
            FeedinCategory::Wind,
            2014,
        )
        .is_err());
    }

    #[rstest]
    fn test_flat_hydro_profile(federal_states: RegionSet) {
        // 4380 GWh over 1000 MW -> 4380 full-load hours, spread uniformly
        let regional = flat_hydro_profile(4380.0, 1000.0, &federal_states, 2014).unwrap();
        assert_eq!(regional.len(), federal_states.len());
        let series = &regional[&RegionID::from("SH")];
        assert_approx_eq!(f64, series.sum(), 4380.0, epsilon = 1e-6);
        assert_approx_eq!(f64, series.values()[0], 4380.0 / 8760.0);
    }

    #[rstest]
    fn test_flat_hydro_profile_no_capacity(federal_states: RegionSet) {
        assert!(flat_hydro_profile(4380.0, 0.0, &federal_states, 2014).is_err());
    }
}
