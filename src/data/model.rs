use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Fill value for missing country / month labels.
pub const UNKNOWN: &str = "Unknown";

// ---------------------------------------------------------------------------
// Record – one row of the crash table
// ---------------------------------------------------------------------------

/// A single crash event (one row of the source table), already normalised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// `Country/Region`; missing values become [`UNKNOWN`].
    pub country_region: String,
    /// `Aircraft Manufacturer`; kept as null when missing.
    pub aircraft_manufacturer: Option<String>,
    /// `Month`; missing values become [`UNKNOWN`].
    pub month: String,
    pub year: i32,
    /// People aboard; missing values become 0.
    pub aboard: f64,
    /// `Fatalities (air)`; missing values become 0.
    pub fatalities: f64,
    // Display-only attributes.
    pub aircraft: Option<String>,
    pub operator: Option<String>,
    pub location: Option<String>,
}

impl Record {
    /// `floor(year / 10) * 10`.
    pub fn decade(&self) -> i32 {
        self.year.div_euclid(10) * 10
    }

    /// Survival rate in percent.
    ///
    /// A record with nobody aboard is divided by 1 instead of 0, so
    /// `aboard = 0, fatalities = 5` yields `-500.0`.
    pub fn survival_rate(&self) -> f64 {
        let divisor = if self.aboard == 0.0 { 1.0 } else { self.aboard };
        (self.aboard - self.fatalities) / divisor * 100.0
    }
}

// ---------------------------------------------------------------------------
// YearRange – inclusive year bounds
// ---------------------------------------------------------------------------

/// Inclusive `[min, max]` year range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    /// A range that accepts every year.
    pub const ALL: YearRange = YearRange {
        min: i32::MIN,
        max: i32::MAX,
    };

    /// Build a range; reversed bounds are swapped.
    pub fn new(a: i32, b: i32) -> Self {
        YearRange {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.min <= year && year <= self.max
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{}", self.min, self.max)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full normalised dataset with pre-computed filter options.
///
/// Immutable once built; sessions share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Record>,
    countries: BTreeSet<String>,
    manufacturers: BTreeSet<Option<String>>,
    months: BTreeSet<String>,
    year_bounds: Option<YearRange>,
}

impl Dataset {
    /// Build the option indices from the loaded records.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut countries = BTreeSet::new();
        let mut manufacturers = BTreeSet::new();
        let mut months = BTreeSet::new();
        let mut year_bounds: Option<YearRange> = None;

        for rec in &records {
            countries.insert(rec.country_region.clone());
            manufacturers.insert(rec.aircraft_manufacturer.clone());
            months.insert(rec.month.clone());
            year_bounds = Some(match year_bounds {
                Some(r) => YearRange::new(r.min.min(rec.year), r.max.max(rec.year)),
                None => YearRange::new(rec.year, rec.year),
            });
        }

        Dataset {
            records,
            countries,
            manufacturers,
            months,
            year_bounds,
        }
    }

    /// All records in source order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Distinct `Country/Region` values.
    pub fn countries(&self) -> &BTreeSet<String> {
        &self.countries
    }

    /// Distinct manufacturers; `None` stands for records with no manufacturer.
    pub fn manufacturers(&self) -> &BTreeSet<Option<String>> {
        &self.manufacturers
    }

    /// Distinct `Month` values.
    pub fn months(&self) -> &BTreeSet<String> {
        &self.months
    }

    /// Observed min/max year, `None` when the dataset is empty.
    pub fn year_bounds(&self) -> Option<YearRange> {
        self.year_bounds
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
