//! Code for serialising prepared artifacts as CSV.
//!
//! All writers return the artifact as a `String` so the cache can digest and store it. The
//! row order is made deterministic before writing: re-running a preparation with unchanged
//! inputs must reproduce the artifact byte for byte.
use crate::balance::Balance;
use crate::feedin::RegionalProfiles;
use crate::id::IDLike;
use crate::powerplant::Fuel;
use crate::region::RegionID;
use anyhow::{ensure, Result};
use csv::Writer;
use indexmap::IndexMap;
use itertools::Itertools;

/// Finish a CSV writer and return its buffer as a string
fn into_string(writer: Writer<Vec<u8>>) -> Result<String> {
    let inner = writer.into_inner()?;
    Ok(String::from_utf8(inner)?)
}

/// Serialise capacity and inflow capacity grouped by region and fuel.
///
/// Columns: `region,fuel,capacity_mw,capacity_in_mw`, sorted by region and fuel.
pub fn capacity_csv(groups: &IndexMap<(RegionID, Fuel), (f64, f64)>) -> Result<String> {
    let mut writer = Writer::from_writer(vec![]);
    writer.write_record(["region", "fuel", "capacity_mw", "capacity_in_mw"])?;
    for ((region, fuel), (capacity, capacity_in)) in groups.iter().sorted_by(|a, b| a.0.cmp(b.0))
    {
        writer.write_record([
            region.to_string(),
            fuel.to_string(),
            capacity.to_string(),
            capacity_in.to_string(),
        ])?;
    }
    writer.flush()?;

    into_string(writer)
}

/// Serialise regional hourly profiles.
///
/// One `timestamp` column plus one column per region, in region order.
pub fn profiles_csv(profiles: &RegionalProfiles) -> Result<String> {
    ensure!(!profiles.is_empty(), "No regional profiles to write");
    let regions: Vec<&RegionID> = profiles.keys().collect();
    let first = &profiles[regions[0]];

    let mut writer = Writer::from_writer(vec![]);
    let mut header = vec!["timestamp".to_string()];
    header.extend(regions.iter().map(|region| region.to_string()));
    writer.write_record(&header)?;

    for (hour, timestamp) in first.timestamps().enumerate() {
        let mut record = vec![timestamp.to_string()];
        for region in &regions {
            record.push(profiles[*region].values()[hour].to_string());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;

    into_string(writer)
}

/// Serialise the population per region. Columns: `region,population`.
pub fn population_csv(totals: &IndexMap<RegionID, u64>) -> Result<String> {
    let mut writer = Writer::from_writer(vec![]);
    writer.write_record(["region", "population"])?;
    for (region, population) in totals {
        writer.write_record([region.to_string(), population.to_string()])?;
    }
    writer.flush()?;

    into_string(writer)
}

/// Serialise a balance table in the same wide layout it is read from
pub fn balance_csv<K: IDLike>(balance: &Balance<K>) -> Result<String> {
    let mut writer = Writer::from_writer(vec![]);
    let mut header = vec!["state".to_string(), "part".into(), "row".into()];
    header.extend(balance.fuels.iter().cloned());
    header.push("total".into());
    writer.write_record(&header)?;

    for row in &balance.rows {
        let mut record = vec![row.key.to_string(), row.part.to_string(), row.row.clone()];
        record.extend(balance.fuels.iter().map(|fuel| row.values[fuel].to_string()));
        record.push(row.total.to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;

    into_string(writer)
}
