//! Regions are named polygons onto which fine-grained source data is aggregated.
//!
//! A [`RegionSet`] is an ordered collection of non-overlapping regions (e.g. the federal
//! states, or a custom model zoning). Its deterministic identity string ties cached artifacts
//! to the exact geometry they were computed for.
use crate::id::define_id_type;
use anyhow::{bail, ensure, Result};
use geo::{Centroid, Contains, InteriorPoint, MultiPolygon, Point};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use wkt::ToWkt;

define_id_type! {RegionID}
define_id_type! {StateID}

/// A map of [`Region`]s, keyed by region ID
pub type RegionMap = IndexMap<RegionID, Region>;

/// A single region of a [`RegionSet`]
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    /// Unique identifier of the region within its set (e.g. "DE01")
    pub id: RegionID,
    /// Human-readable name (e.g. "Schleswig-Holstein")
    pub name: String,
    /// The region's polygon(s) in WGS84 coordinates
    pub geometry: MultiPolygon,
}

impl Region {
    /// Whether the region contains the given point
    pub fn contains(&self, point: &Point) -> bool {
        self.geometry.contains(point)
    }

    /// A point guaranteed to lie inside the region.
    ///
    /// Used to fix up regions which are too small to contain any source data point.
    pub fn representative_point(&self) -> Result<Point> {
        self.geometry
            .interior_point()
            .ok_or_else(|| anyhow::anyhow!("Region {} has an empty geometry", self.id))
    }
}

/// A named, ordered collection of non-overlapping regions
#[derive(Clone, Debug, PartialEq)]
pub struct RegionSet {
    /// Name of the region set (e.g. "federal_states")
    name: String,
    /// The regions, keyed by ID
    regions: RegionMap,
    /// Deterministic identity of the set, derived from name, IDs and geometry
    identity: String,
}

impl RegionSet {
    /// Create a region set from regions.
    ///
    /// The identity string is a SHA-256 digest over the set name and every region's ID and
    /// WKT geometry, in order. Any change to the zoning therefore changes the identity and
    /// invalidates cached artifacts.
    pub fn new(name: &str, regions: impl IntoIterator<Item = Region>) -> Result<Self> {
        let mut map = RegionMap::new();
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        for region in regions {
            hasher.update(region.id.0.as_bytes());
            hasher.update(region.geometry.wkt_string().as_bytes());
            if map.insert(region.id.clone(), region).is_some() {
                bail!("Duplicate region ID in region set {name}");
            }
        }
        ensure!(!map.is_empty(), "Region set {name} contains no regions");

        Ok(Self {
            name: name.to_string(),
            regions: map,
            identity: format!("{:x}", hasher.finalize()),
        })
    }

    /// Name of the region set
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full identity digest of the set (hex-encoded SHA-256)
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// A short prefix of the identity digest, used in file names
    pub fn short_identity(&self) -> &str {
        &self.identity[..8]
    }

    /// The regions, keyed by ID
    pub fn regions(&self) -> &RegionMap {
        &self.regions
    }

    /// Iterate over the region IDs
    pub fn iter_ids(&self) -> impl Iterator<Item = &RegionID> {
        self.regions.keys()
    }

    /// Look up a region by ID
    pub fn get(&self, id: &str) -> Option<&Region> {
        self.regions.get(id)
    }

    /// Number of regions in the set
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the set is empty (never true for a constructed set)
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Find the region containing the given point, if any
    pub fn find_containing(&self, point: &Point) -> Option<&RegionID> {
        self.regions
            .iter()
            .find(|(_, region)| region.contains(point))
            .map(|(id, _)| id)
    }
}

/// Build a point from longitude and latitude columns
pub fn point_from_lon_lat(lon: f64, lat: f64) -> Point {
    Point::new(lon, lat)
}

/// The centroid of a multi-polygon.
///
/// Errors for empty geometries.
pub fn centroid(geometry: &MultiPolygon) -> Result<Point> {
    geometry
        .centroid()
        .ok_or_else(|| anyhow::anyhow!("Cannot compute centroid of an empty geometry"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{federal_states, square_region};
    use rstest::rstest;

    #[rstest]
    fn test_identity_is_deterministic(federal_states: RegionSet) {
        let rebuilt = RegionSet::new(
            federal_states.name(),
            federal_states.regions().values().cloned(),
        )
        .unwrap();
        assert_eq!(federal_states.identity(), rebuilt.identity());
        assert_eq!(federal_states.short_identity().len(), 8);
    }

    #[rstest]
    fn test_identity_depends_on_geometry(federal_states: RegionSet) {
        let mut regions: Vec<_> = federal_states.regions().values().cloned().collect();
        regions[0].geometry = square_region("other", 5.0, 5.0, 1.0).geometry;
        let changed = RegionSet::new(federal_states.name(), regions).unwrap();
        assert_ne!(federal_states.identity(), changed.identity());
    }

    #[test]
    fn test_duplicate_region_ids() {
        let regions = vec![
            square_region("A", 0.0, 0.0, 1.0),
            square_region("A", 2.0, 0.0, 1.0),
        ];
        assert!(RegionSet::new("dupes", regions).is_err());
    }

    #[test]
    fn test_empty_region_set() {
        assert!(RegionSet::new("empty", std::iter::empty()).is_err());
    }

    #[rstest]
    fn test_find_containing(federal_states: RegionSet) {
        let inside = Point::new(0.5, 0.5);
        let outside = Point::new(100.0, 100.0);
        assert_eq!(
            federal_states.find_containing(&inside).unwrap().to_string(),
            "SH"
        );
        assert!(federal_states.find_containing(&outside).is_none());
    }
}
