//! Population figures aggregated onto region sets.
//!
//! Population is published per municipality together with a representative coordinate.
//! Summing the municipal figures within each region gives the weights used to reallocate
//! state-level tables (energy balances, annual demand) onto arbitrary region sets.
use crate::config::SpatialConfig;
use crate::region::{RegionID, RegionSet, StateID};
use crate::spatial::assign_points;
use anyhow::{ensure, Result};
use geo::Point;
use indexmap::IndexMap;
use log::{info, warn};

/// One municipality: a population figure with a representative coordinate
#[derive(Clone, Debug, PartialEq)]
pub struct Municipality {
    /// Official municipality key
    pub key: String,
    /// The federal state the municipality belongs to
    pub state: StateID,
    /// Number of inhabitants
    pub population: u64,
    /// Representative coordinate (longitude, latitude)
    pub location: Point,
}

/// Sum the municipal population within each region of `region_set`.
///
/// Every region appears in the result, with zero population if no municipality falls into
/// it. Municipalities that cannot be assigned are reported with their total population.
pub fn population_by_region(
    municipalities: &[Municipality],
    region_set: &RegionSet,
    spatial: &SpatialConfig,
) -> Result<IndexMap<RegionID, u64>> {
    ensure!(!municipalities.is_empty(), "No municipalities provided");
    info!(
        "Aggregating the population of {} municipalities onto {} regions.",
        municipalities.len(),
        region_set.len()
    );

    let points: Vec<Point> = municipalities.iter().map(|m| m.location).collect();
    let assignments = assign_points(&points, region_set, spatial);

    let mut totals: IndexMap<RegionID, u64> = region_set
        .iter_ids()
        .map(|id| (id.clone(), 0))
        .collect();
    let mut unassigned = 0;
    for (municipality, assignment) in municipalities.iter().zip(&assignments) {
        match assignment.region() {
            Some(region) => totals[region] += municipality.population,
            None => unassigned += municipality.population,
        }
    }
    if unassigned > 0 {
        warn!("{unassigned} inhabitants could not be assigned to any region.");
    }

    Ok(totals)
}

/// The share of each federal state's population that falls into each region.
///
/// Returns a map from `(region, state)` to the share, covering only non-zero entries.
/// The shares of every state sum to one over the regions, which is what makes the
/// reallocation in [`crate::balance::EnergyBalance::by_region`] conservative.
pub fn state_shares_by_region(
    municipalities: &[Municipality],
    region_set: &RegionSet,
    spatial: &SpatialConfig,
) -> Result<IndexMap<(RegionID, StateID), f64>> {
    ensure!(!municipalities.is_empty(), "No municipalities provided");

    let points: Vec<Point> = municipalities.iter().map(|m| m.location).collect();
    let assignments = assign_points(&points, region_set, spatial);

    // Population per (region, state) and per state
    let mut by_region_state: IndexMap<(RegionID, StateID), u64> = IndexMap::new();
    let mut by_state: IndexMap<StateID, u64> = IndexMap::new();
    for (municipality, assignment) in municipalities.iter().zip(&assignments) {
        let Some(region) = assignment.region() else {
            continue;
        };
        *by_region_state
            .entry((region.clone(), municipality.state.clone()))
            .or_insert(0) += municipality.population;
        *by_state.entry(municipality.state.clone()).or_insert(0) += municipality.population;
    }
    ensure!(
        !by_state.is_empty(),
        "No municipality could be assigned to any region"
    );

    let shares = by_region_state
        .into_iter()
        .map(|((region, state), population)| {
            let share = population as f64 / by_state[&state] as f64;
            ((region, state), share)
        })
        .collect();

    Ok(shares)
}
