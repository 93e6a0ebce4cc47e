//! Code for reading region geometries from WKT CSV files.
use super::{input_err_msg, read_csv};
use crate::region::{point_from_lon_lat, Region, RegionSet, StateID};
use anyhow::{Context, Result};
use geo::{MultiPolygon, Point, Polygon};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use wkt::TryFromWkt;

#[derive(Deserialize)]
struct RegionRaw {
    region: String,
    #[serde(default)]
    name: Option<String>,
    wkt: String,
}

#[derive(Deserialize)]
struct CentroidRaw {
    state: String,
    lon: f64,
    lat: f64,
}

/// Read a region set from a WKT CSV file.
///
/// The file has one row per region with columns `region`, `name` (optional) and `wkt`.
/// Geometries may be POLYGON or MULTIPOLYGON; single polygons are wrapped.
pub fn read_region_set(file_path: &Path, set_name: &str) -> Result<RegionSet> {
    let regions_csv = read_csv::<RegionRaw>(file_path)?;
    read_region_set_from_iter(regions_csv, set_name).with_context(|| input_err_msg(file_path))
}

/// Process regions from an iterator
fn read_region_set_from_iter<I>(iter: I, set_name: &str) -> Result<RegionSet>
where
    I: Iterator<Item = RegionRaw>,
{
    let regions = iter
        .map(|raw| -> Result<_> {
            let geometry = parse_geometry(&raw.wkt)
                .with_context(|| format!("Invalid geometry for region {}", raw.region))?;
            Ok(Region {
                name: raw.name.unwrap_or_else(|| raw.region.clone()),
                id: raw.region.into(),
                geometry,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    RegionSet::new(set_name, regions)
}

/// Parse a WKT geometry column into a multi-polygon
fn parse_geometry(wkt_str: &str) -> Result<MultiPolygon> {
    if let Ok(multi) = MultiPolygon::try_from_wkt_str(wkt_str) {
        return Ok(multi);
    }
    let polygon = Polygon::<f64>::try_from_wkt_str(wkt_str)
        .map_err(|err| anyhow::anyhow!("Not a polygon geometry: {err}"))?;

    Ok(MultiPolygon::new(vec![polygon]))
}

/// Read the fallback coordinates of the federal states.
///
/// Registry rows without coordinates are placed at their state's centroid.
pub fn read_state_centroids(file_path: &Path) -> Result<IndexMap<StateID, Point>> {
    let centroids = read_csv::<CentroidRaw>(file_path)?
        .map(|raw| (raw.state.into(), point_from_lon_lat(raw.lon, raw.lat)))
        .collect();

    Ok(centroids)
}
