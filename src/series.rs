//! Hourly time series for a single calendar year.
use anyhow::{ensure, Result};
use chrono::NaiveDateTime;

/// Number of hourly values kept per year.
///
/// Leap years are truncated so that every series has the same length, matching the upstream
/// feed-in tables.
pub const HOURS_PER_YEAR: usize = 8760;

/// An hourly time series covering one calendar year
#[derive(Clone, Debug, PartialEq)]
pub struct HourlySeries {
    /// The calendar year the series covers
    pub year: u32,
    /// The hourly values, always of length [`HOURS_PER_YEAR`]
    values: Vec<f64>,
}

impl HourlySeries {
    /// Create a series from raw values.
    ///
    /// Input longer than [`HOURS_PER_YEAR`] (leap years) is truncated; shorter input is an
    /// error.
    pub fn from_values(year: u32, mut values: Vec<f64>) -> Result<Self> {
        ensure!(
            values.len() >= HOURS_PER_YEAR,
            "Incomplete series for {year}: {} of {HOURS_PER_YEAR} hourly values",
            values.len()
        );
        values.truncate(HOURS_PER_YEAR);

        Ok(Self { year, values })
    }

    /// A series of zeros for the given year
    pub fn zeros(year: u32) -> Self {
        Self {
            year,
            values: vec![0.0; HOURS_PER_YEAR],
        }
    }

    /// A series holding the same value in every hour
    pub fn constant(year: u32, value: f64) -> Self {
        Self {
            year,
            values: vec![value; HOURS_PER_YEAR],
        }
    }

    /// The hourly values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Sum of all hourly values
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Mean of all hourly values
    pub fn mean(&self) -> f64 {
        self.sum() / HOURS_PER_YEAR as f64
    }

    /// Multiply every value by a factor, in place
    pub fn scale(&mut self, factor: f64) {
        for value in &mut self.values {
            *value *= factor;
        }
    }

    /// Add `other * factor` to this series, element-wise.
    ///
    /// # Panics
    ///
    /// If the series cover different years.
    pub fn add_scaled(&mut self, other: &HourlySeries, factor: f64) {
        assert_eq!(
            self.year, other.year,
            "Cannot combine series for different years"
        );
        for (value, other_value) in self.values.iter_mut().zip(&other.values) {
            *value += other_value * factor;
        }
    }

    /// Divide every value by a divisor, in place
    pub fn divide(&mut self, divisor: f64) {
        for value in &mut self.values {
            *value /= divisor;
        }
    }

    /// Normalise the series so its values sum to one.
    ///
    /// Errors if the sum is zero.
    pub fn normalise(&mut self) -> Result<()> {
        let sum = self.sum();
        ensure!(sum != 0.0, "Cannot normalise a series which sums to zero");
        self.divide(sum);

        Ok(())
    }

    /// Iterate over the hourly timestamps of the series (local time, no zone attached)
    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        let start = chrono::NaiveDate::from_ymd_opt(self.year as i32, 1, 1)
            .expect("Invalid year")
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..HOURS_PER_YEAR as i64).map(move |hour| start + chrono::Duration::hours(hour))
    }
}
