//! A batch pipeline that aggregates and harmonises public energy-sector datasets into
//! normalised tabular artifacts keyed by region and year.
//!
//! Heterogeneous sources (power plant registries, weather-driven feed-in profiles, demand
//! profiles, population data and energy balances) are mapped onto arbitrary region sets via
//! spatial joins and the expensive derived tables are memoised on disk, keyed by region-set
//! identity, year and source version.
use std::path::PathBuf;

pub mod balance;
pub mod cache;
pub mod cli;
pub mod config;
pub mod demand;
pub mod feedin;
#[cfg(test)]
pub mod fixture;
pub mod id;
pub mod input;
pub mod log;
pub mod output;
pub mod population;
pub mod powerplant;
pub mod region;
pub mod series;
pub mod settings;
pub mod spatial;
pub mod weather;

/// The URL for this program's issue tracker
pub const ISSUES_URL: &str = "https://github.com/redap-project/redap/issues";

/// The directory in which program settings are stored
pub fn get_redap_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().expect("Could not get config directory for platform");
    path.push("redap");

    path
}
