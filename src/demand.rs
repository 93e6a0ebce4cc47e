//! Regional electricity demand profiles.
//!
//! A national hourly load profile is normalised and scaled to an annual demand figure per
//! region. The annual figures can come from a fixed value, from the national statistics
//! table or from a load-area table joined spatially onto the region set.
use crate::config::SpatialConfig;
use crate::feedin::RegionalProfiles;
use crate::region::{RegionID, RegionSet};
use crate::series::HourlySeries;
use crate::spatial::assign_points;
use anyhow::{bail, ensure, Context, Result};
use geo::Point;
use indexmap::IndexMap;
use log::{info, warn};
use std::str::FromStr;

/// How the annual demand per region is determined
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AnnualDemandMethod {
    /// A fixed national value in GWh, distributed by population share
    Fixed,
    /// The per-year national statistics table, distributed by population share
    Statistics,
    /// Consumption-weighted shares from a load-area table
    LoadAreas,
}

/// The valid method names, for error messages
pub const DEMAND_METHOD_NAMES: &str = "fixed, statistics, load-areas";

impl FromStr for AnnualDemandMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "statistics" => Ok(Self::Statistics),
            "load-areas" => Ok(Self::LoadAreas),
            _ => bail!(
                "Unknown annual demand method '{s}'. Valid methods are: {DEMAND_METHOD_NAMES}"
            ),
        }
    }
}

/// One load area: a point with annual electricity consumption
#[derive(Clone, Debug, PartialEq)]
pub struct LoadArea {
    /// Representative coordinate (longitude, latitude)
    pub location: Point,
    /// Annual consumption in GWh
    pub annual_demand: f64,
}

/// Normalise the hourly national load profile so its values sum to one
pub fn normalised_profile(profile: &HourlySeries) -> Result<HourlySeries> {
    let mut normalised = profile.clone();
    normalised
        .normalise()
        .context("Could not normalise the national load profile")?;

    Ok(normalised)
}

/// Distribute a national annual demand onto regions by population share.
///
/// `population` comes from [`crate::population::population_by_region`]. Regions without
/// population receive zero demand.
pub fn annual_demand_by_population(
    national_demand_gwh: f64,
    population: &IndexMap<RegionID, u64>,
) -> Result<IndexMap<RegionID, f64>> {
    ensure!(
        national_demand_gwh > 0.0,
        "National annual demand must be positive, got {national_demand_gwh}"
    );
    let total: u64 = population.values().sum();
    ensure!(total > 0, "Total population is zero");

    Ok(population
        .iter()
        .map(|(region, &pop)| {
            let demand = national_demand_gwh * pop as f64 / total as f64;
            (region.clone(), demand)
        })
        .collect())
}

/// Sum the annual demand of load areas within each region.
///
/// Every region appears in the result, with zero demand if no load area falls into it.
pub fn annual_demand_by_load_areas(
    load_areas: &[LoadArea],
    region_set: &RegionSet,
    spatial: &SpatialConfig,
) -> Result<IndexMap<RegionID, f64>> {
    ensure!(!load_areas.is_empty(), "No load areas provided");
    info!(
        "Aggregating {} load areas onto {} regions.",
        load_areas.len(),
        region_set.len()
    );

    let points: Vec<Point> = load_areas.iter().map(|a| a.location).collect();
    let assignments = assign_points(&points, region_set, spatial);

    let mut totals: IndexMap<RegionID, f64> = region_set
        .iter_ids()
        .map(|id| (id.clone(), 0.0))
        .collect();
    let mut unassigned = 0.0;
    for (area, assignment) in load_areas.iter().zip(&assignments) {
        match assignment.region() {
            Some(region) => totals[region] += area.annual_demand,
            None => unassigned += area.annual_demand,
        }
    }
    if unassigned > 0.0 {
        warn!("{unassigned:.1} GWh of load-area demand could not be assigned to any region.");
    }

    Ok(totals)
}

/// Scale the normalised national profile to the annual demand of each region.
///
/// The column sum of each regional series equals the region's annual demand.
pub fn demand_by_region(
    profile: &HourlySeries,
    annual_demand: &IndexMap<RegionID, f64>,
) -> Result<RegionalProfiles> {
    let normalised = normalised_profile(profile)?;
    info!(
        "Scaling the national load profile to {} regions for {}.",
        annual_demand.len(),
        profile.year
    );

    Ok(annual_demand
        .iter()
        .map(|(region, &demand)| {
            let mut series = normalised.clone();
            series.scale(demand);
            (region.clone(), series)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::federal_states;
    use crate::region::point_from_lon_lat;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[test]
    fn test_method_from_str() {
        assert_eq!(
            "load-areas".parse::<AnnualDemandMethod>().unwrap(),
            AnnualDemandMethod::LoadAreas
        );
        let error = "bogus".parse::<AnnualDemandMethod>().unwrap_err();
        assert!(error.to_string().contains("fixed, statistics, load-areas"));
    }

    #[test]
    fn test_annual_demand_by_population() {
        let population: IndexMap<RegionID, u64> =
            [("SH".into(), 3000), ("NI".into(), 1000)].into_iter().collect();
        let demand = annual_demand_by_population(500.0, &population).unwrap();
        assert_approx_eq!(f64, demand["SH"], 375.0);
        assert_approx_eq!(f64, demand["NI"], 125.0);
    }

    #[test]
    fn test_annual_demand_by_population_zero_total() {
        let population: IndexMap<RegionID, u64> = [("SH".into(), 0)].into_iter().collect();
        assert!(annual_demand_by_population(500.0, &population).is_err());
    }

    #[rstest]
    fn test_annual_demand_by_load_areas(federal_states: RegionSet) {
        let load_areas = vec![
            LoadArea {
                location: point_from_lon_lat(0.5, 0.5),
                annual_demand: 10.0,
            },
            LoadArea {
                location: point_from_lon_lat(0.2, 0.8),
                annual_demand: 5.0,
            },
            LoadArea {
                location: point_from_lon_lat(3.0, 0.5),
                annual_demand: 20.0,
            },
        ];
        let totals =
            annual_demand_by_load_areas(&load_areas, &federal_states, &SpatialConfig::default())
                .unwrap();
        assert_approx_eq!(f64, totals["SH"], 15.0);
        assert_approx_eq!(f64, totals["NI"], 20.0);
    }

    /// Column sums of the scaled profiles equal the annual demands
    #[test]
    fn test_demand_by_region_conserves_annual_demand() {
        let profile = HourlySeries::constant(2014, 0.5);
        let annual_demand: IndexMap<RegionID, f64> =
            [("SH".into(), 120.0), ("NI".into(), 80.0)].into_iter().collect();

        let regional = demand_by_region(&profile, &annual_demand).unwrap();
        assert_approx_eq!(f64, regional["SH"].sum(), 120.0, epsilon = 1e-9);
        assert_approx_eq!(f64, regional["NI"].sum(), 80.0, epsilon = 1e-9);
    }

    #[test]
    fn test_demand_by_region_zero_profile() {
        let profile = HourlySeries::zeros(2014);
        let annual_demand: IndexMap<RegionID, f64> = [("SH".into(), 1.0)].into_iter().collect();
        assert!(demand_by_region(&profile, &annual_demand).is_err());
    }
}
