//! Helpers shared by the CLI integration tests.
use assert_cmd::cargo_bin_cmd;
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};

/// The name of the region set used by the test dataset
pub const REGION_SET: &str = "de2";
/// The data year of the test dataset
pub const YEAR: &str = "2014";

/// A command for the redap binary, running in `dir` with default settings.
///
/// The cache root defaults to a relative path, so all artifacts land inside `dir`.
pub fn redap_cmd(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("redap");
    cmd.env("REDAP_USE_DEFAULT_SETTINGS", "1").current_dir(dir);

    cmd
}

/// Run redap in `dir`, assert success and return its stdout
pub fn get_redap_stdout(dir: &Path, args: &[&str]) -> String {
    let output = redap_cmd(dir).args(args).assert().success().get_output().clone();
    String::from_utf8(output.stdout).unwrap()
}

/// Run redap in `dir`, assert failure and return its stderr
pub fn get_redap_stderr(dir: &Path, args: &[&str]) -> String {
    let output = redap_cmd(dir).args(args).assert().failure().get_output().clone();
    String::from_utf8(output.stderr).unwrap()
}

/// Find the single cached artifact whose file name starts with `prefix`
pub fn find_artifact(cache_root: &Path, prefix: &str) -> PathBuf {
    let mut matches = Vec::new();
    for dir_entry in fs::read_dir(cache_root).unwrap() {
        let dir_path = dir_entry.unwrap().path();
        if !dir_path.is_dir() {
            continue;
        }
        for entry in fs::read_dir(&dir_path).unwrap() {
            let path = entry.unwrap().path();
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            if name.starts_with(prefix) && name.ends_with(".csv") {
                matches.push(path);
            }
        }
    }
    assert_eq!(matches.len(), 1, "Expected one artifact for {prefix}");

    matches.pop().unwrap()
}

const SOURCES_TOML: &str = r#"
[sources]
registry = "2024.1"
balance = "2024.1"
weather = "v1"
census = "2024"

[files]
powerplants = "powerplants_{category}_{version}.csv"
offshore_patch = "offshore_patch.csv"
state_centroids = "state_centroids.csv"
region_set = "regions_{region_set}.csv"
weather_grid = "weather_grid.csv"
weather = "weather_{parameter}_{year}.csv"
feedin = "feedin_{category}_{set_name}_{year}.csv"
load_profile = "load_{year}.csv"
load_areas = "load_areas.csv"
balance = "balance_{year}.csv"
balance_fixes = "balance_fixes_{year}.csv"
municipalities = "municipalities_{year}.csv"
annual_demand = "annual_demand.csv"
renewables = "renewables.csv"

[feedin]
geothermal_full_load_hours = 4380.0
wind_sets = ["env1"]
solar_sets = []
"#;

const REGIONS_CSV: &str = r#"region,name,wkt
SH,Schleswig-Holstein,"POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))"
NI,Niedersachsen,"POLYGON ((2 0, 4 0, 4 1, 2 1, 2 0))"
"#;

const WEATHER_GRID_CSV: &str = r#"cell,wkt
1,"POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))"
2,"POLYGON ((1 0, 2 0, 2 1, 1 1, 1 0))"
3,"POLYGON ((2 0, 3 0, 3 1, 2 1, 2 0))"
4,"POLYGON ((3 0, 4 0, 4 1, 3 1, 3 0))"
"#;

const RENEWABLE_PLANTS_CSV: &str = "\
category,fuel_level_1,fuel_level_2,technology,capacity,efficiency,\
com_year,com_month,decom_year,decom_month,lon,lat,state,comment
renewable,Wind,Wind,Onshore,30,,2000,1,,,2.5,0.5,NI,
renewable,Wind,Wind,Onshore,10,,2000,1,,,3.5,0.5,NI,
renewable,Solar,Solar,,5,,2005,1,,,0.5,0.5,SH,
";

const CONVENTIONAL_PLANTS_CSV: &str = "\
category,fuel_level_1,fuel_level_2,technology,capacity,efficiency,\
com_year,com_month,decom_year,decom_month,lon,lat,state,comment
conventional,Fossil fuels,Hard coal,Steam turbine,500,0.4,1995,1,,,0.5,0.5,SH,
";

const STATE_CENTROIDS_CSV: &str = "state,lon,lat\nSH,0.5,0.5\nNI,3,0.5\n";

const MUNICIPALITIES_CSV: &str = "\
key,state,population,lon,lat
01001,SH,1000,0.5,0.5
03001,NI,2000,2.5,0.5
";

const BALANCE_CSV: &str = "\
state,part,row,hard coal,natural gas,total
SH,usage,industrial,10,20,30
SH,usage,households,0,40,40
NI,usage,industrial,8,25,33
NI,usage,households,0,50,50
";

const LOAD_AREAS_CSV: &str = "lon,lat,annual_demand\n0.5,0.5,10\n2.5,0.5,20\n";

const ANNUAL_DEMAND_CSV: &str = "year,demand_gwh\n2013,530000\n2014,524000\n";

const RENEWABLES_CSV: &str = "year,fuel,energy_gwh,capacity_mw\n2014,hydro,19600,5600\n";

/// Write a small but complete dataset into `dir`
pub fn write_dataset(dir: &Path) {
    let write = |name: &str, contents: &str| fs::write(dir.join(name), contents).unwrap();

    write("sources.toml", SOURCES_TOML);
    write(&format!("regions_{REGION_SET}.csv"), REGIONS_CSV);
    write("weather_grid.csv", WEATHER_GRID_CSV);
    write("powerplants_renewable_2024.1.csv", RENEWABLE_PLANTS_CSV);
    write(
        "powerplants_conventional_2024.1.csv",
        CONVENTIONAL_PLANTS_CSV,
    );
    write("state_centroids.csv", STATE_CENTROIDS_CSV);
    write(&format!("municipalities_{YEAR}.csv"), MUNICIPALITIES_CSV);
    write(&format!("balance_{YEAR}.csv"), BALANCE_CSV);
    write("load_areas.csv", LOAD_AREAS_CSV);
    write("annual_demand.csv", ANNUAL_DEMAND_CSV);
    write("renewables.csv", RENEWABLES_CSV);

    // Hourly tables: a national load profile, per-cell wind feed-in profiles and one
    // per-cell weather parameter
    let mut load = String::from("load\n");
    let mut feedin = String::from("1,2,3,4\n");
    let mut weather = String::from("1,2,3,4\n");
    for _ in 0..8760 {
        load.push_str("1.0\n");
        feedin.push_str("0.1,0.1,0.5,0.25\n");
        weather.push_str("1,2,3,4\n");
    }
    write(&format!("load_{YEAR}.csv"), &load);
    write(&format!("feedin_wind_env1_{YEAR}.csv"), &feedin);
    write(&format!("weather_temperature_{YEAR}.csv"), &weather);
}
