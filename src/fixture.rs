//! Fixtures for tests
use crate::balance::{BalancePart, BalanceRow, EnergyBalance};
use crate::powerplant::{Category, Fuel, PowerPlant};
use crate::region::{point_from_lon_lat, Region, RegionID, RegionSet, StateID};
use crate::weather::{CellID, WeatherGrid};
use geo::{polygon, MultiPolygon};
use indexmap::IndexMap;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A square region with its lower-left corner at (x, y)
pub fn square_region(id: &str, x: f64, y: f64, size: f64) -> Region {
    Region {
        id: id.into(),
        name: id.to_string(),
        geometry: rectangle(x, y, x + size, y + size),
    }
}

/// An axis-aligned rectangle as a multi-polygon
fn rectangle(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> MultiPolygon {
    MultiPolygon::new(vec![polygon![
        (x: x_min, y: y_min),
        (x: x_max, y: y_min),
        (x: x_max, y: y_max),
        (x: x_min, y: y_max),
        (x: x_min, y: y_min),
    ]])
}

/// A two-state region set: SH covers [0, 1] x [0, 1], NI covers [2, 4] x [0, 1]
#[fixture]
pub fn federal_states() -> RegionSet {
    let ni = Region {
        id: "NI".into(),
        name: "Niedersachsen".to_string(),
        geometry: rectangle(2.0, 0.0, 4.0, 1.0),
    };
    RegionSet::new("federal_states", [square_region("SH", 0.0, 0.0, 1.0), ni]).unwrap()
}

/// Four unit-square grid cells in a row along the x axis, covering [0, 4] x [0, 1]
#[fixture]
pub fn weather_grid() -> WeatherGrid {
    let cells = (1..=4).map(|id| {
        let x = (id - 1) as f64;
        (CellID(id), rectangle(x, 0.0, x + 1.0, 1.0))
    });
    WeatherGrid::new(cells).unwrap()
}

/// A plant commissioned in June 2010 and decommissioned in March 2020
pub fn plant(fuel: Fuel, capacity: f64, lon: f64, lat: f64) -> PowerPlant {
    PowerPlant {
        category: match fuel {
            Fuel::Wind | Fuel::Solar | Fuel::Hydro | Fuel::Bioenergy | Fuel::Geothermal => {
                Category::Renewable
            }
            _ => Category::Conventional,
        },
        fuel,
        technology: None,
        capacity,
        efficiency: None,
        capacity_in: None,
        com_year: 2010,
        com_month: 6,
        decom_year: 2020,
        decom_month: 3,
        location: point_from_lon_lat(lon, lat),
        region: None,
        cell: None,
    }
}

/// One row of a balance table with a consistent total
fn balance_row(state: &str, part: BalancePart, row: &str, values: [f64; 3]) -> BalanceRow<StateID> {
    let fuels = ["hard coal (raw)", "hard coal (coke)", "natural gas"];
    BalanceRow {
        key: state.into(),
        part,
        row: row.to_string(),
        values: fuels
            .into_iter()
            .map(str::to_string)
            .zip(values)
            .collect(),
        total: values.iter().sum(),
    }
}

/// A small consistent two-state energy balance for 2014
#[fixture]
pub fn small_balance() -> EnergyBalance {
    EnergyBalance {
        year: 2014,
        fuels: ["hard coal (raw)", "hard coal (coke)", "natural gas"]
            .into_iter()
            .map(str::to_string)
            .collect(),
        rows: vec![
            balance_row("SH", BalancePart::Usage, "industrial", [10.0, 5.0, 20.0]),
            balance_row("SH", BalancePart::Usage, "households", [0.0, 0.0, 40.0]),
            balance_row("SH", BalancePart::Input, "power plants", [30.0, 0.0, 10.0]),
            balance_row("BY", BalancePart::Usage, "industrial", [8.0, 2.0, 25.0]),
            balance_row("BY", BalancePart::Usage, "households", [0.0, 0.0, 50.0]),
            balance_row("BY", BalancePart::Input, "power plants", [60.0, 0.0, 5.0]),
        ],
    }
}

/// Population shares splitting BY across two regions; sums per state are one
pub fn state_shares() -> IndexMap<(RegionID, StateID), f64> {
    [
        (("R1".into(), "SH".into()), 1.0),
        (("R1".into(), "BY".into()), 0.3),
        (("R2".into(), "BY".into()), 0.7),
    ]
    .into_iter()
    .collect()
}
