//! Code for reading energy balance tables from CSV files.
use super::{input_err_msg, read_csv_optional};
use crate::balance::{BalanceFix, BalancePart, BalanceRow, EnergyBalance};
use anyhow::{ensure, Context, Result};
use indexmap::IndexMap;
use std::path::Path;

/// Number of leading key columns (`state`, `part`, `row`)
const KEY_COLUMNS: usize = 3;

/// Read the energy balance of one year.
///
/// The file is wide: `state,part,row,<one column per fuel>,total`. The fuel columns are
/// taken from the header in table order.
pub fn read_energy_balance(file_path: &Path, year: u32) -> Result<EnergyBalance> {
    read_energy_balance_internal(file_path, year).with_context(|| input_err_msg(file_path))
}

/// Parse the wide balance table
fn read_energy_balance_internal(file_path: &Path, year: u32) -> Result<EnergyBalance> {
    let mut reader = csv::Reader::from_path(file_path)?;
    let headers = reader.headers()?.clone();
    ensure!(
        headers.len() > KEY_COLUMNS + 1,
        "Balance table must have key columns, fuel columns and a total column"
    );
    ensure!(
        &headers[0] == "state" && &headers[1] == "part" && &headers[2] == "row",
        "Balance table must start with columns state, part, row"
    );
    ensure!(
        &headers[headers.len() - 1] == "total",
        "Balance table must end with a total column"
    );
    let fuels: Vec<String> = headers
        .iter()
        .skip(KEY_COLUMNS)
        .take(headers.len() - KEY_COLUMNS - 1)
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        ensure!(
            record.len() == headers.len(),
            "Row with {} values in a table of {} columns",
            record.len(),
            headers.len()
        );
        let part: BalancePart = record[1].parse().map_err(anyhow::Error::msg)?;
        let values: IndexMap<String, f64> = fuels
            .iter()
            .zip(record.iter().skip(KEY_COLUMNS))
            .map(|(fuel, value)| Ok((fuel.clone(), parse_value(value)?)))
            .collect::<Result<_>>()?;
        rows.push(BalanceRow {
            key: record[0].into(),
            part,
            row: record[2].to_string(),
            values,
            total: parse_value(&record[record.len() - 1])?,
        });
    }
    ensure!(!rows.is_empty(), "Balance table contains no rows");

    Ok(EnergyBalance { year, fuels, rows })
}

/// Parse a balance cell; empty cells count as zero
fn parse_value(value: &str) -> Result<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }

    trimmed
        .parse()
        .with_context(|| format!("Invalid balance value '{value}'"))
}

/// Read the manual corrections for one year, if a fix file exists
pub fn read_balance_fixes(file_path: &Path) -> Result<Vec<BalanceFix>> {
    Ok(read_csv_optional(file_path)?.collect())
}
