//! Assignment of source data points to regions.
//!
//! The first pass assigns every point to the region containing it. Points which fall outside
//! all polygons (coastal plants, offshore parks, border artefacts) are assigned to the
//! nearest region within a growing distance tolerance, stepped up from zero until a
//! configured limit. Points which still cannot be matched are labelled rather than dropped.
use crate::config::SpatialConfig;
use crate::region::{RegionID, RegionSet};
use geo::{EuclideanDistance, Point};
use log::{debug, info, warn};

/// The outcome of assigning one point to a region set
#[derive(Clone, Debug, PartialEq)]
pub enum Assignment {
    /// The point lies within the region
    Contained(RegionID),
    /// The point was matched to the nearest region within the given distance (degrees)
    Nearest(RegionID, f64),
    /// No region within the distance limit
    Unmatched,
}

impl Assignment {
    /// The matched region ID, if any
    pub fn region(&self) -> Option<&RegionID> {
        match self {
            Self::Contained(id) | Self::Nearest(id, _) => Some(id),
            Self::Unmatched => None,
        }
    }
}

/// Share of unmatched points above which a warning is logged after the first pass
const UNMATCHED_SHARE_WARN: f64 = 0.2;

/// Assign every point to a region of the given set.
///
/// Returns one [`Assignment`] per input point, in order.
pub fn assign_points(
    points: &[Point],
    region_set: &RegionSet,
    options: &SpatialConfig,
) -> Vec<Assignment> {
    info!("Doing spatial join...");
    let mut assignments: Vec<_> = points
        .iter()
        .map(|point| match region_set.find_containing(point) {
            Some(id) => Assignment::Contained(id.clone()),
            None => Assignment::Unmatched,
        })
        .collect();

    let unmatched = count_unmatched(&assignments);
    if unmatched == 0 {
        info!("No distance fallback necessary.");
        return assignments;
    }
    if options.buffer_limit == 0.0 {
        info!("No distance fallback. Limit is 0.");
        return assignments;
    }

    let share = unmatched as f64 / points.len() as f64;
    info!(
        "Matching {unmatched} remaining points ({:.1}%) by distance...",
        share * 100.0
    );
    if share > UNMATCHED_SHARE_WARN {
        warn!(
            "{:.0}% non-matching points seems to be too high.",
            share * 100.0
        );
    }

    // Step the tolerance up so that a point near one region is not handed to a farther one
    // just because the limit allows it. The final step is clamped to the limit.
    let mut tolerance = 0.0;
    while count_unmatched(&assignments) > 0 && tolerance < options.buffer_limit {
        tolerance = (tolerance + options.buffer_step).min(options.buffer_limit);
        for (point, assignment) in points.iter().zip(&mut assignments) {
            if *assignment != Assignment::Unmatched {
                continue;
            }
            if let Some((id, distance)) = nearest_within(point, region_set, tolerance) {
                *assignment = Assignment::Nearest(id, distance);
            }
        }
        debug!(
            "Tolerance: {tolerance}, remaining: {}",
            count_unmatched(&assignments)
        );
    }

    let unmatched = count_unmatched(&assignments);
    if unmatched == 0 {
        info!("All points matched within the distance limit.");
    } else {
        warn!(
            "{unmatched} points could not be matched within the distance limit of {}.",
            options.buffer_limit
        );
    }

    assignments
}

/// Count the unmatched entries
fn count_unmatched(assignments: &[Assignment]) -> usize {
    assignments
        .iter()
        .filter(|assignment| **assignment == Assignment::Unmatched)
        .count()
}

/// The nearest region whose boundary is within `tolerance` of the point.
///
/// Distances are in coordinate degrees, like the original buffer radii. Ties are broken by
/// region order so the result is deterministic.
fn nearest_within(
    point: &Point,
    region_set: &RegionSet,
    tolerance: f64,
) -> Option<(RegionID, f64)> {
    let mut best: Option<(RegionID, f64)> = None;
    for (id, region) in region_set.regions() {
        let distance = point.euclidean_distance(&region.geometry);
        if distance <= tolerance && best.as_ref().is_none_or(|(_, d)| distance < *d) {
            best = Some((id.clone(), distance));
        }
    }

    best
}
