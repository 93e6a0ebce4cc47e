//! Energy balances of the federal states and their reallocation to custom region sets.
//!
//! An energy balance is a table of annual energy flows: one row per state, balance part and
//! row name (usage sector or transformation process), one column per fuel plus a reported
//! total. The tables are published per state, so aggregating onto arbitrary regions requires
//! reallocating each state's values by population share.
use crate::id::IDLike;
use crate::region::{RegionID, StateID};
use anyhow::{ensure, Context, Result};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::{info, warn};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::borrow::Borrow;

/// The part of the balance a row belongs to
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, DeserializeLabeledStringEnum, SerializeLabeledStringEnum)]
pub enum BalancePart {
    /// Final energy use by sector
    #[string = "usage"]
    Usage,
    /// Fuel input of transformation processes
    #[string = "input"]
    Input,
    /// Energy output of transformation processes
    #[string = "output"]
    Output,
    /// Primary energy rows
    #[string = "primary"]
    Primary,
    /// Energy supply rows
    #[string = "tender"]
    Tender,
}

/// One row of a balance table
#[derive(Clone, Debug, PartialEq)]
pub struct BalanceRow<K> {
    /// The state (or region, after reallocation) the row belongs to
    pub key: K,
    /// The balance part
    pub part: BalancePart,
    /// Row name: a usage sector or a transformation process
    pub row: String,
    /// Value per fuel, in TJ
    pub values: IndexMap<String, f64>,
    /// The reported row total, in TJ
    pub total: f64,
}

impl<K> BalanceRow<K> {
    /// The sum of the fuel columns (excluding the reported total)
    pub fn fuel_sum(&self) -> f64 {
        self.values.values().sum()
    }
}

/// A balance table keyed by state or, after reallocation, by region
#[derive(Clone, Debug, PartialEq)]
pub struct Balance<K> {
    /// The year the balance covers
    pub year: u32,
    /// Fuel column names, in table order (without the total column)
    pub fuels: Vec<String>,
    /// The rows
    pub rows: Vec<BalanceRow<K>>,
}

/// The energy balance of the federal states
pub type EnergyBalance = Balance<StateID>;
/// A balance reallocated onto a custom region set
pub type RegionalBalance = Balance<RegionID>;

/// An inconsistency found by [`Balance::check`]
#[derive(Clone, Debug, PartialEq)]
pub struct BalanceIssue<K> {
    /// The state or region with the inconsistency
    pub key: K,
    /// Accumulated difference between fuel sums and reported totals, in TJ
    pub difference: f64,
}

/// A single manual correction to a balance table.
///
/// The published tables contain documented gaps; corrections are shipped as data and only
/// applied on request.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct BalanceFix {
    /// State the correction applies to
    pub state: StateID,
    /// Balance part of the corrected row
    pub part: BalancePart,
    /// Row name of the corrected row
    pub row: String,
    /// Fuel column to correct ("total" for the total column)
    pub fuel: String,
    /// Value to add (may be negative)
    pub delta: f64,
}

impl<K: IDLike> Balance<K> {
    /// The distinct row keys, in table order
    pub fn keys(&self) -> IndexSet<K> {
        self.rows.iter().map(|row| row.key.clone()).collect()
    }

    /// Keep only the rows of the given part
    pub fn filter_part(&self, part: BalancePart) -> Self {
        Self {
            year: self.year,
            fuels: self.fuels.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| row.part == part)
                .cloned()
                .collect(),
        }
    }

    /// Look up a single value
    pub fn get(&self, key: &str, part: BalancePart, row: &str, fuel: &str) -> Option<f64> {
        let found = self.rows.iter().find(|r| {
            let row_key: &str = r.key.borrow();
            row_key == key && r.part == part && r.row == row
        })?;
        if fuel == "total" {
            return Some(found.total);
        }

        found.values.get(fuel).copied()
    }

    /// Group the fuel columns into main fuel groups.
    ///
    /// Every fuel must appear in `groups`; the total column is carried over unchanged.
    pub fn group_fuels(&self, groups: &IndexMap<String, String>) -> Result<Self> {
        let grouped_fuels: Vec<String> = self
            .fuels
            .iter()
            .map(|fuel| -> Result<_> {
                Ok(groups
                    .get(fuel)
                    .with_context(|| format!("Fuel '{fuel}' missing from fuel groups"))?
                    .clone())
            })
            .process_results(|iter| iter.unique().collect())?;

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut values: IndexMap<String, f64> =
                    grouped_fuels.iter().map(|g| (g.clone(), 0.0)).collect();
                for (fuel, value) in &row.values {
                    values[&groups[fuel]] += value;
                }
                BalanceRow {
                    key: row.key.clone(),
                    part: row.part,
                    row: row.row.clone(),
                    values,
                    total: row.total,
                }
            })
            .collect();

        Ok(Self {
            year: self.year,
            fuels: grouped_fuels,
            rows,
        })
    }

    /// Check the fuel sums against the reported totals.
    ///
    /// The accumulated difference per state/region is compared against `tolerance` (in TJ)
    /// and every exceeding key is reported and logged, matching the manual-verification
    /// workflow the source documentation asks for.
    pub fn check(&self, tolerance: f64) -> Vec<BalanceIssue<K>> {
        let mut differences: IndexMap<K, f64> = IndexMap::new();
        for row in &self.rows {
            *differences.entry(row.key.clone()).or_insert(0.0) += row.fuel_sum() - row.total;
        }

        let issues: Vec<_> = differences
            .into_iter()
            .filter(|(_, difference)| difference.abs() > tolerance)
            .map(|(key, difference)| BalanceIssue { key, difference })
            .collect();
        for issue in &issues {
            warn!(
                "{} - {}: {:.0}",
                self.year,
                issue.key,
                issue.difference.abs()
            );
        }

        issues
    }

    /// Apply manual corrections in place.
    ///
    /// Every fix must name an existing row and fuel; a fix targeting a missing row is an
    /// error rather than a silent no-op.
    pub fn apply_fixes(&mut self, fixes: &[BalanceFix]) -> Result<()> {
        let fix_count = fixes.len();
        for fix in fixes {
            let state: &str = fix.state.borrow();
            let row = self
                .rows
                .iter_mut()
                .find(|r| {
                    let row_key: &str = r.key.borrow();
                    row_key == state && r.part == fix.part && r.row == fix.row
                })
                .with_context(|| {
                    format!(
                        "Balance fix targets missing row: {} / {:?} / {}",
                        fix.state, fix.part, fix.row
                    )
                })?;
            if fix.fuel == "total" {
                row.total += fix.delta;
            } else {
                let value = row.values.get_mut(&fix.fuel).with_context(|| {
                    format!("Balance fix targets missing fuel column '{}'", fix.fuel)
                })?;
                *value += fix.delta;
            }
        }
        info!("Applied {fix_count} balance fixes for {}.", self.year);

        Ok(())
    }
}

impl EnergyBalance {
    /// Reallocate the state-level balance onto a region set using population shares.
    ///
    /// `shares` maps `(region, state)` to the share of the state's population within the
    /// region (see [`crate::population::state_shares_by_region`]). For every state the
    /// shares must sum to one, so the reallocation conserves column sums.
    pub fn by_region(
        &self,
        shares: &IndexMap<(RegionID, StateID), f64>,
    ) -> Result<RegionalBalance> {
        info!(
            "Reshaping the {} balance by population shares.",
            self.year
        );
        // Validate the shares before touching the table
        let mut share_sums: IndexMap<&StateID, f64> = IndexMap::new();
        for ((_, state), share) in shares {
            *share_sums.entry(state).or_insert(0.0) += share;
        }
        for state in self.keys() {
            let sum = share_sums.get(&state).copied().unwrap_or(0.0);
            ensure!(
                (sum - 1.0).abs() < 1e-6,
                "Population shares for state {state} sum to {sum}, not 1"
            );
        }

        let regions: IndexSet<RegionID> =
            shares.keys().map(|(region, _)| region.clone()).collect();

        let mut rows = Vec::new();
        for region in &regions {
            // Preserve the row structure of the first state; all states share it
            let row_index: IndexSet<(BalancePart, &String)> = self
                .rows
                .iter()
                .map(|row| (row.part, &row.row))
                .collect();
            for (part, row_name) in row_index {
                let mut values: IndexMap<String, f64> =
                    self.fuels.iter().map(|f| (f.clone(), 0.0)).collect();
                let mut total = 0.0;
                for row in self
                    .rows
                    .iter()
                    .filter(|r| r.part == part && &r.row == row_name)
                {
                    let share = shares
                        .get(&(region.clone(), row.key.clone()))
                        .copied()
                        .unwrap_or(0.0);
                    if share == 0.0 {
                        continue;
                    }
                    for (fuel, value) in &row.values {
                        values[fuel] += value * share;
                    }
                    total += row.total * share;
                }
                rows.push(BalanceRow {
                    key: region.clone(),
                    part,
                    row: row_name.clone(),
                    values,
                    total,
                });
            }
        }

        Ok(RegionalBalance {
            year: self.year,
            fuels: self.fuels.clone(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{small_balance, state_shares};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_check_reports_inconsistent_states(small_balance: EnergyBalance) {
        let mut balance = small_balance;
        // Break the total of one BY row by more than the tolerance
        let row = balance
            .rows
            .iter_mut()
            .find(|r| r.key == "BY".into())
            .unwrap();
        row.total += 100.0;

        let issues = balance.check(5.0);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].key.to_string(), "BY");
        assert_approx_eq!(f64, issues[0].difference, -100.0);
    }

    #[rstest]
    fn test_check_passes_consistent_balance(small_balance: EnergyBalance) {
        assert!(small_balance.check(5.0).is_empty());
    }

    /// The usage balance keeps only the sector rows
    #[rstest]
    fn test_filter_part(small_balance: EnergyBalance) {
        let usage = small_balance.filter_part(BalancePart::Usage);
        assert_eq!(usage.rows.len(), 4);
        assert!(usage.rows.iter().all(|row| row.part == BalancePart::Usage));
        assert_eq!(usage.fuels, small_balance.fuels);

        let input = small_balance.filter_part(BalancePart::Input);
        assert_eq!(input.rows.len(), 2);
    }

    #[rstest]
    fn test_group_fuels(small_balance: EnergyBalance) {
        let groups: IndexMap<String, String> = [
            ("hard coal (raw)", "hard coal"),
            ("hard coal (coke)", "hard coal"),
            ("natural gas", "gas"),
        ]
        .into_iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();

        let grouped = small_balance.group_fuels(&groups).unwrap();
        assert_eq!(grouped.fuels, vec!["hard coal", "gas"]);
        // The two hard coal columns of the SH usage row are 10 + 5
        assert_approx_eq!(
            f64,
            grouped
                .get("SH", BalancePart::Usage, "industrial", "hard coal")
                .unwrap(),
            15.0
        );
    }

    #[rstest]
    fn test_group_fuels_missing_mapping(small_balance: EnergyBalance) {
        let groups = IndexMap::new();
        assert!(small_balance.group_fuels(&groups).is_err());
    }

    #[rstest]
    fn test_apply_fixes(small_balance: EnergyBalance) {
        let mut balance = small_balance;
        let fixes = vec![BalanceFix {
            state: "BY".into(),
            part: BalancePart::Usage,
            row: "industrial".into(),
            fuel: "natural gas".into(),
            delta: 42.0,
        }];
        let before = balance
            .get("BY", BalancePart::Usage, "industrial", "natural gas")
            .unwrap();
        balance.apply_fixes(&fixes).unwrap();
        let after = balance
            .get("BY", BalancePart::Usage, "industrial", "natural gas")
            .unwrap();
        assert_approx_eq!(f64, after - before, 42.0);
    }

    #[rstest]
    fn test_apply_fixes_missing_row(small_balance: EnergyBalance) {
        let mut balance = small_balance;
        let fixes = vec![BalanceFix {
            state: "XX".into(),
            part: BalancePart::Usage,
            row: "industrial".into(),
            fuel: "natural gas".into(),
            delta: 1.0,
        }];
        assert!(balance.apply_fixes(&fixes).is_err());
    }

    /// Reallocating conserves the column sums
    #[rstest]
    fn test_by_region_conserves_sums(small_balance: EnergyBalance) {
        let shares = state_shares();
        let regional = small_balance.by_region(&shares).unwrap();

        for fuel in &small_balance.fuels {
            let original: f64 = small_balance
                .rows
                .iter()
                .map(|row| row.values[fuel])
                .sum();
            let reallocated: f64 = regional.rows.iter().map(|row| row.values[fuel]).sum();
            assert_approx_eq!(f64, original, reallocated, epsilon = 1e-9);
        }
    }

    #[rstest]
    fn test_by_region_rejects_bad_shares(small_balance: EnergyBalance) {
        let mut shares = state_shares();
        // Break the SH shares
        let key = ("R1".into(), "SH".into());
        *shares.get_mut(&key).unwrap() += 0.5;
        assert!(small_balance.by_region(&shares).is_err());
    }
}
