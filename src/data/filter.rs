use std::collections::BTreeSet;

use serde::Serialize;

use super::model::{Dataset, Record, YearRange};

// ---------------------------------------------------------------------------
// FilterSelection – the active user constraints
// ---------------------------------------------------------------------------

/// Selected values per filter dimension plus the inclusive year range.
///
/// An empty set means "no constraint" for that dimension.  Dimensions are
/// combined with AND; values within one dimension with OR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSelection {
    pub countries: BTreeSet<String>,
    /// `None` selects records without a manufacturer.
    pub manufacturers: BTreeSet<Option<String>>,
    pub months: BTreeSet<String>,
    pub years: YearRange,
}

impl Default for FilterSelection {
    fn default() -> Self {
        Self {
            countries: BTreeSet::new(),
            manufacturers: BTreeSet::new(),
            months: BTreeSet::new(),
            years: YearRange::ALL,
        }
    }
}

impl FilterSelection {
    /// No value constraints, year range spanning the whole dataset.
    pub fn unconstrained(dataset: &Dataset) -> Self {
        Self {
            years: dataset.year_bounds().unwrap_or(YearRange::ALL),
            ..Self::default()
        }
    }

    pub fn with_years(mut self, years: YearRange) -> Self {
        self.years = years;
        self
    }

    pub fn toggle_country(&mut self, country: &str) {
        toggle(&mut self.countries, country.to_string());
    }

    pub fn toggle_manufacturer(&mut self, manufacturer: Option<&str>) {
        toggle(&mut self.manufacturers, manufacturer.map(str::to_string));
    }

    pub fn toggle_month(&mut self, month: &str) {
        toggle(&mut self.months, month.to_string());
    }

    /// Drop every value constraint; the year range is left untouched.
    pub fn clear(&mut self) {
        self.countries.clear();
        self.manufacturers.clear();
        self.months.clear();
    }

    /// Whether `record` satisfies every active predicate.
    pub fn matches(&self, record: &Record) -> bool {
        (self.countries.is_empty() || self.countries.contains(&record.country_region))
            && (self.manufacturers.is_empty()
                || self.manufacturers.contains(&record.aircraft_manufacturer))
            && (self.months.is_empty() || self.months.contains(&record.month))
            && self.years.contains(record.year)
    }
}

fn toggle<T: Ord>(set: &mut BTreeSet<T>, value: T) {
    if !set.remove(&value) {
        set.insert(value);
    }
}

// ---------------------------------------------------------------------------
// FilteredView – records passing the current selection
// ---------------------------------------------------------------------------

/// A borrowed, order-preserving subset of a [`Dataset`].
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// Rebuild a view from indices previously produced by [`apply_filters`].
    ///
    /// Out-of-range indices are dropped.
    pub fn from_indices(dataset: &'a Dataset, indices: &[usize]) -> Self {
        let indices = indices
            .iter()
            .copied()
            .filter(|&i| i < dataset.len())
            .collect();
        Self { dataset, indices }
    }

    /// Positions of the visible records in the source dataset.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Visible records in source order.
    pub fn records(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let records = self.dataset.records();
        self.indices.iter().map(move |&i| &records[i])
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Stable filter: keep records matching `selection`, in dataset order.
pub fn apply_filters<'a>(dataset: &'a Dataset, selection: &FilterSelection) -> FilteredView<'a> {
    let indices = dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, rec)| selection.matches(rec))
        .map(|(i, _)| i)
        .collect();
    FilteredView { dataset, indices }
}
