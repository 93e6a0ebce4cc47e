//! The harmonised power plant registry.
//!
//! Plants from the renewable and conventional registry tables are normalised into a single
//! structure with a reduced set of columns, patched where the upstream source is known to be
//! wrong, assigned to regions and weather grid cells, and filtered by year with monthly
//! weighting of the (de)commissioning years.
use crate::config::SpatialConfig;
use crate::region::{RegionID, RegionSet};
use crate::spatial::assign_points;
use crate::weather::{CellID, WeatherGrid};
use geo::Point;
use indexmap::IndexMap;
use itertools::Itertools;
use log::{info, warn};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// The registry category a plant was read from
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, DeserializeLabeledStringEnum, SerializeLabeledStringEnum)]
pub enum Category {
    /// Renewable plants
    #[string = "renewable"]
    Renewable,
    /// Conventional plants
    #[string = "conventional"]
    Conventional,
}

/// Main fuel groups of the harmonised registry.
///
/// Corresponds to the second source classification level of the upstream registry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, DeserializeLabeledStringEnum, SerializeLabeledStringEnum)]
pub enum Fuel {
    /// Onshore and offshore wind
    #[string = "wind"]
    Wind,
    /// Photovoltaics
    #[string = "solar"]
    Solar,
    /// Run-of-river and reservoir hydro
    #[string = "hydro"]
    Hydro,
    /// Solid, liquid and gaseous biomass
    #[string = "bioenergy"]
    Bioenergy,
    /// Geothermal plants
    #[string = "geothermal"]
    Geothermal,
    /// Natural gas
    #[string = "natural gas"]
    NaturalGas,
    /// Hard coal
    #[string = "hard coal"]
    HardCoal,
    /// Lignite
    #[string = "lignite"]
    Lignite,
    /// Nuclear plants
    #[string = "nuclear"]
    Nuclear,
    /// Mineral oil products
    #[string = "oil"]
    Oil,
    /// Pumped and other storage
    #[string = "storage"]
    Storage,
    /// Other or mixed fuels
    #[string = "other"]
    Other,
    /// Fuel missing from the source
    #[string = "unknown"]
    Unknown,
}

/// A single harmonised power plant
#[derive(Clone, Debug, PartialEq)]
pub struct PowerPlant {
    /// The registry category the plant was read from
    pub category: Category,
    /// Main fuel group
    pub fuel: Fuel,
    /// Technology within the fuel group (e.g. "Offshore"), free text from the source
    pub technology: Option<String>,
    /// Net capacity in MW
    pub capacity: f64,
    /// Electrical efficiency, if reported
    pub efficiency: Option<f64>,
    /// Inflow capacity in MW, `capacity / efficiency`. Filled by [`add_capacity_in`].
    pub capacity_in: Option<f64>,
    /// Year the plant was commissioned
    pub com_year: u32,
    /// Month the plant was commissioned (1-12)
    pub com_month: u32,
    /// Year the plant was decommissioned
    pub decom_year: u32,
    /// Month the plant was decommissioned (1-12)
    pub decom_month: u32,
    /// Location in WGS84 coordinates
    pub location: Point,
    /// Region of the active region set. Filled by [`assign_regions`].
    pub region: Option<RegionID>,
    /// Weather grid cell containing the plant. Filled by [`assign_grid_cells`].
    pub cell: Option<CellID>,
}

impl PowerPlant {
    /// The capacity of the plant available in the given year, weighted month-wise.
    ///
    /// Both partial years are weighted by the commissioning month: `(12 - com_month) / 12`
    /// in the commissioning year and `com_month / 12` in the decommissioning year. Plants
    /// not active in the year contribute zero.
    pub fn capacity_for_year(&self, year: u32) -> f64 {
        if self.com_year < year && self.decom_year > year {
            self.capacity
        } else if self.com_year == year {
            self.capacity * (12 - self.com_month) as f64 / 12.0
        } else if self.decom_year == year {
            self.capacity * self.com_month as f64 / 12.0
        } else {
            0.0
        }
    }

    /// The inflow capacity available in the given year, weighted like `capacity_for_year`
    pub fn capacity_in_for_year(&self, year: u32) -> f64 {
        let capacity_in = self.capacity_in.unwrap_or(0.0);
        if self.capacity == 0.0 {
            return 0.0;
        }

        capacity_in * self.capacity_for_year(year) / self.capacity
    }
}

/// Fill the `capacity_in` column so an average efficiency can be calculated for grouped
/// plants.
///
/// Plants without an efficiency value get the capacity-weighted average efficiency of the
/// plants which have one.
pub fn add_capacity_in(plants: &mut [PowerPlant]) {
    let (cap_valid, cap_in): (f64, f64) = plants
        .iter()
        .filter_map(|plant| {
            let efficiency = plant.efficiency?;
            Some((plant.capacity, plant.capacity / efficiency))
        })
        .fold((0.0, 0.0), |(cap, cap_in), (c, ci)| (cap + c, cap_in + ci));

    let average_efficiency = if cap_in > 0.0 { cap_valid / cap_in } else { 1.0 };

    for plant in plants.iter_mut() {
        let efficiency = plant.efficiency.unwrap_or(average_efficiency);
        plant.capacity_in = Some(plant.capacity / efficiency);
    }

    info!("'capacity_in' column added to power plant table.");
}

/// Replace the offshore wind plants with a curated patch table.
///
/// The upstream registry is known to be incomplete for offshore parks. The replaced and new
/// capacities are logged.
pub fn patch_offshore_wind(plants: &mut Vec<PowerPlant>, patch: Vec<PowerPlant>) {
    let is_offshore =
        |plant: &PowerPlant| plant.technology.as_deref() == Some("Offshore");

    let old_cap: f64 = plants
        .iter()
        .filter(|plant| is_offshore(plant))
        .map(|plant| plant.capacity)
        .sum();
    let new_cap: f64 = patch.iter().map(|plant| plant.capacity).sum();

    plants.retain(|plant| !is_offshore(plant));
    plants.extend(patch);

    warn!("Offshore wind is patched. {old_cap} MW were replaced by {new_cap} MW");
}

/// Reclassify pumped storage, which the source files under `Hydro`, as `Storage`
pub fn fix_pumped_storage(plants: &mut [PowerPlant]) {
    for plant in plants.iter_mut() {
        if plant.technology.as_deref() == Some("Pumped storage") {
            plant.fuel = Fuel::Storage;
        }
    }
}

/// Assign every plant to a region of the given set.
///
/// Returns the capacity belonging to plants which could not be matched.
pub fn assign_regions(
    plants: &mut [PowerPlant],
    region_set: &RegionSet,
    options: &SpatialConfig,
) -> f64 {
    let points: Vec<_> = plants.iter().map(|plant| plant.location).collect();
    let assignments = assign_points(&points, region_set, options);

    let mut unmatched_capacity = 0.0;
    for (plant, assignment) in plants.iter_mut().zip(assignments) {
        match assignment.region() {
            Some(id) => plant.region = Some(id.clone()),
            None => {
                plant.region = None;
                unmatched_capacity += plant.capacity;
            }
        }
    }
    if unmatched_capacity > 0.0 {
        warn!("Capacity without a region after spatial join: {unmatched_capacity} MW");
    }
    info!(
        "Region column '{}' added to power plant table.",
        region_set.name()
    );

    unmatched_capacity
}

/// Assign every plant to the weather grid cell containing it.
///
/// Plants outside the grid keep `cell = None`; their capacity is logged.
pub fn assign_grid_cells(plants: &mut [PowerPlant], grid: &WeatherGrid) {
    let mut unmatched_capacity = 0.0;
    for plant in plants.iter_mut() {
        plant.cell = grid.find_cell(&plant.location);
        if plant.cell.is_none() {
            unmatched_capacity += plant.capacity;
        }
    }
    if unmatched_capacity > 0.0 {
        warn!("Capacity outside the weather grid: {unmatched_capacity} MW");
    }
}

/// Capacity and inflow capacity in the given year, grouped by region and fuel.
///
/// Values are `(capacity, capacity_in)` tuples. Plants without a region are skipped (they
/// are logged by [`assign_regions`]).
pub fn capacity_by_region_fuel(
    plants: &[PowerPlant],
    year: u32,
) -> IndexMap<(RegionID, Fuel), (f64, f64)> {
    let mut groups: IndexMap<(RegionID, Fuel), (f64, f64)> = IndexMap::new();
    for plant in plants {
        let Some(region) = &plant.region else {
            continue;
        };
        let capacity = plant.capacity_for_year(year);
        if capacity == 0.0 {
            continue;
        }
        let entry = groups
            .entry((region.clone(), plant.fuel))
            .or_insert((0.0, 0.0));
        entry.0 += capacity;
        entry.1 += plant.capacity_in_for_year(year);
    }

    groups
}

/// Capacity of one fuel in the given year, grouped by region and weather grid cell.
///
/// This is the weighting table for the regional feed-in aggregation.
pub fn capacity_by_region_cell(
    plants: &[PowerPlant],
    fuel: Fuel,
    year: u32,
) -> IndexMap<RegionID, IndexMap<CellID, f64>> {
    let mut groups: IndexMap<RegionID, IndexMap<CellID, f64>> = IndexMap::new();
    for plant in plants {
        if plant.fuel != fuel {
            continue;
        }
        let (Some(region), Some(cell)) = (&plant.region, plant.cell) else {
            continue;
        };
        let capacity = plant.capacity_for_year(year);
        if capacity == 0.0 {
            continue;
        }
        *groups
            .entry(region.clone())
            .or_default()
            .entry(cell)
            .or_insert(0.0) += capacity;
    }

    groups
}

/// Summarise the plants of each fuel for logging
pub fn log_fuel_summary(plants: &[PowerPlant], year: u32) {
    let totals = plants
        .iter()
        .map(|plant| (plant.fuel, plant.capacity_for_year(year)))
        .into_grouping_map()
        .sum();
    for (fuel, capacity) in totals.iter().sorted_by_key(|(fuel, _)| **fuel) {
        info!("{fuel:?}: {capacity:.1} MW in {year}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{federal_states, plant};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(2013, 100.0)] // fully active
    #[case(2010, 50.0)] // commissioned in July: (12 - 6) / 12
    #[case(2020, 50.0)] // decommissioned in 2020, weighted by com month: 6 / 12
    #[case(2009, 0.0)] // before commissioning
    #[case(2021, 0.0)] // after decommissioning
    fn test_capacity_for_year(#[case] year: u32, #[case] expected: f64) {
        let plant = plant(Fuel::Wind, 100.0, 0.0, 0.0);
        assert_approx_eq!(f64, plant.capacity_for_year(year), expected);
    }

    #[test]
    fn test_add_capacity_in() {
        let mut plants = vec![
            plant(Fuel::HardCoal, 100.0, 0.0, 0.0),
            plant(Fuel::HardCoal, 100.0, 0.0, 0.0),
        ];
        plants[0].efficiency = Some(0.4);

        add_capacity_in(&mut plants);

        // Valid row: 100 / 0.4 = 250; average efficiency = 100 / 250 = 0.4
        assert_approx_eq!(f64, plants[0].capacity_in.unwrap(), 250.0);
        assert_approx_eq!(f64, plants[1].capacity_in.unwrap(), 250.0);
    }

    #[test]
    fn test_capacity_in_for_year() {
        let mut plants = vec![plant(Fuel::HardCoal, 100.0, 0.0, 0.0)];
        plants[0].efficiency = Some(0.4);
        add_capacity_in(&mut plants);

        // Inflow capacity carries the same monthly weights as the capacity
        assert_approx_eq!(f64, plants[0].capacity_in_for_year(2013), 250.0);
        assert_approx_eq!(f64, plants[0].capacity_in_for_year(2010), 125.0);
        assert_approx_eq!(f64, plants[0].capacity_in_for_year(2009), 0.0);
    }

    #[test]
    fn test_patch_offshore_wind() {
        let mut plants = vec![plant(Fuel::Wind, 50.0, 0.0, 0.0)];
        plants[0].technology = Some("Offshore".into());
        let mut replacement = plant(Fuel::Wind, 80.0, 0.0, 0.0);
        replacement.technology = Some("Offshore".into());

        patch_offshore_wind(&mut plants, vec![replacement]);

        assert_eq!(plants.len(), 1);
        assert_approx_eq!(f64, plants[0].capacity, 80.0);
    }

    #[test]
    fn test_fix_pumped_storage() {
        let mut plants = vec![plant(Fuel::Hydro, 50.0, 0.0, 0.0)];
        plants[0].technology = Some("Pumped storage".into());
        fix_pumped_storage(&mut plants);
        assert_eq!(plants[0].fuel, Fuel::Storage);
    }

    #[rstest]
    fn test_capacity_by_region_fuel(federal_states: RegionSet) {
        let mut plants = vec![
            plant(Fuel::Wind, 100.0, 0.5, 0.5), // SH
            plant(Fuel::Wind, 50.0, 0.6, 0.4),  // SH
            plant(Fuel::Solar, 30.0, 2.5, 0.5), // NI
        ];
        let unmatched = assign_regions(&mut plants, &federal_states, &SpatialConfig::default());
        assert_approx_eq!(f64, unmatched, 0.0);
        add_capacity_in(&mut plants);

        let groups = capacity_by_region_fuel(&plants, 2013);
        assert_approx_eq!(f64, groups[&("SH".into(), Fuel::Wind)].0, 150.0);
        assert_approx_eq!(f64, groups[&("NI".into(), Fuel::Solar)].0, 30.0);
        // No plant reports an efficiency, so capacity_in falls back to capacity
        assert_approx_eq!(f64, groups[&("SH".into(), Fuel::Wind)].1, 150.0);
        assert_eq!(groups.len(), 2);
    }

    /// Aggregating a region's plants yields a sum equal to the region total
    #[rstest]
    fn test_group_sum_conserves_capacity(federal_states: RegionSet) {
        let mut plants: Vec<_> = (0..10)
            .map(|i| plant(Fuel::Wind, 10.0 + i as f64, 0.1 + 0.08 * i as f64, 0.5))
            .collect();
        assign_regions(&mut plants, &federal_states, &SpatialConfig::default());

        let groups = capacity_by_region_fuel(&plants, 2013);
        let grouped_total: f64 = groups.values().map(|(capacity, _)| capacity).sum();
        let plant_total: f64 = plants.iter().map(|p| p.capacity_for_year(2013)).sum();
        assert_approx_eq!(f64, grouped_total, plant_total);
    }
}
