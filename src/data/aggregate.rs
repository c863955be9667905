use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use serde::Serialize;

use super::filter::FilteredView;
use super::model::Record;

/// Length of every ranked list (countries, manufacturers, deadliest crashes).
pub const TOP_N: usize = 10;

/// Default bin count for the survival-rate histogram.
pub const SURVIVAL_BINS: usize = 30;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Crashes and summed fatalities for one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub crashes: usize,
    pub fatalities: f64,
}

/// A category label with its crash count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCount {
    pub label: String,
    pub crashes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecadeCount {
    pub decade: i32,
    pub crashes: usize,
}

/// One point of the fatalities-vs-aboard scatter, with hover attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactPoint {
    pub aboard: f64,
    pub fatalities: f64,
    pub aircraft: Option<String>,
    pub operator: Option<String>,
    pub location: Option<String>,
    pub year: i32,
}

/// A row of the deadliest-crashes table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeadliestCrash {
    pub year: i32,
    pub aircraft: Option<String>,
    pub operator: Option<String>,
    pub location: Option<String>,
    pub fatalities: f64,
}

/// Every metric shown for one filtered view.
///
/// `avg_fatalities` and `most_dangerous_country` are `None` for an empty
/// view; every collection is simply empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub total_crashes: usize,
    pub total_fatalities: f64,
    pub avg_fatalities: Option<f64>,
    pub most_dangerous_country: Option<String>,
    /// Ascending by year.
    pub crashes_per_year: Vec<YearCount>,
    pub top_countries: Vec<RankedCount>,
    pub top_manufacturers: Vec<RankedCount>,
    pub fatalities_vs_aboard: Vec<ImpactPoint>,
    /// One entry per visible record, in view order.
    pub survival_rates: Vec<f64>,
    /// Descending by count, ties in first-seen order.
    pub crashes_per_month: Vec<RankedCount>,
    /// Ascending by decade.
    pub crashes_per_decade: Vec<DecadeCount>,
    pub deadliest: Vec<DeadliestCrash>,
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Compute the full metric catalogue for `view`.
pub fn compute_aggregates(view: &FilteredView<'_>) -> AggregateResult {
    let records: Vec<&Record> = view.records().collect();

    let total_crashes = records.len();
    let total_fatalities: f64 = records.iter().map(|r| r.fatalities).sum();
    let avg_fatalities = if total_crashes == 0 {
        None
    } else {
        Some(total_fatalities / total_crashes as f64)
    };

    AggregateResult {
        total_crashes,
        total_fatalities,
        avg_fatalities,
        most_dangerous_country: most_dangerous_country(&records),
        crashes_per_year: crashes_per_year(&records),
        top_countries: top_n(
            ranked_counts(records.iter().map(|r| Some(&r.country_region))),
            TOP_N,
        ),
        top_manufacturers: top_n(
            ranked_counts(records.iter().map(|r| r.aircraft_manufacturer.as_ref())),
            TOP_N,
        ),
        fatalities_vs_aboard: records
            .iter()
            .map(|r| ImpactPoint {
                aboard: r.aboard,
                fatalities: r.fatalities,
                aircraft: r.aircraft.clone(),
                operator: r.operator.clone(),
                location: r.location.clone(),
                year: r.year,
            })
            .collect(),
        survival_rates: records.iter().map(|r| r.survival_rate()).collect(),
        crashes_per_month: ranked_counts(records.iter().map(|r| Some(&r.month))),
        crashes_per_decade: crashes_per_decade(&records),
        deadliest: deadliest(&records, TOP_N),
    }
}

/// Country with the highest summed fatalities.  Groups are scanned in
/// sorted key order and the first maximum wins.
fn most_dangerous_country(records: &[&Record]) -> Option<String> {
    let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
    for r in records {
        *sums.entry(r.country_region.as_str()).or_default() += r.fatalities;
    }

    let mut best: Option<(&str, f64)> = None;
    for (country, sum) in sums {
        match best {
            Some((_, best_sum)) if sum <= best_sum => {}
            _ => best = Some((country, sum)),
        }
    }
    best.map(|(country, _)| country.to_string())
}

fn crashes_per_year(records: &[&Record]) -> Vec<YearCount> {
    let mut years: BTreeMap<i32, (usize, f64)> = BTreeMap::new();
    for r in records {
        let entry = years.entry(r.year).or_default();
        entry.0 += 1;
        entry.1 += r.fatalities;
    }
    years
        .into_iter()
        .map(|(year, (crashes, fatalities))| YearCount {
            year,
            crashes,
            fatalities,
        })
        .collect()
}

fn crashes_per_decade(records: &[&Record]) -> Vec<DecadeCount> {
    let mut decades: BTreeMap<i32, usize> = BTreeMap::new();
    for r in records {
        *decades.entry(r.decade()).or_default() += 1;
    }
    decades
        .into_iter()
        .map(|(decade, crashes)| DecadeCount { decade, crashes })
        .collect()
}

/// Count labels, skipping `None`, then order by count descending.  Equal
/// counts keep the order in which their label was first seen.
fn ranked_counts<'r, K>(labels: impl Iterator<Item = Option<&'r K>>) -> Vec<RankedCount>
where
    K: Eq + Hash + ToString + ?Sized + 'r,
{
    let mut position: HashMap<&K, usize> = HashMap::new();
    let mut counts: Vec<(&K, usize)> = Vec::new();
    for label in labels.flatten() {
        match position.get(label) {
            Some(&i) => counts[i].1 += 1,
            None => {
                position.insert(label, counts.len());
                counts.push((label, 1));
            }
        }
    }

    // `sort_by` is stable, so first-seen order survives among ties.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .map(|(label, crashes)| RankedCount {
            label: label.to_string(),
            crashes,
        })
        .collect()
}

fn top_n(mut ranked: Vec<RankedCount>, n: usize) -> Vec<RankedCount> {
    ranked.truncate(n);
    ranked
}

/// The `n` records with the most fatalities; ties keep view order.
fn deadliest(records: &[&Record], n: usize) -> Vec<DeadliestCrash> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.fatalities.total_cmp(&a.fatalities));
    sorted
        .into_iter()
        .take(n)
        .map(|r| DeadliestCrash {
            year: r.year,
            aircraft: r.aircraft.clone(),
            operator: r.operator.clone(),
            location: r.location.clone(),
            fatalities: r.fatalities,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Survival-rate histogram
// ---------------------------------------------------------------------------

/// A half-open `[start, end)` bin; the last bin of a histogram is closed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Split `[min, max]` of `values` into `bins` equal-width bins.
///
/// Identical values collapse into a single bin; empty input gives no bins.
pub fn survival_histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max - min < f64::EPSILON {
        return vec![HistogramBin {
            start: min,
            end: max,
            count: finite.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            start: min + i as f64 * width,
            end: min + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();
    for v in finite {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{FilterSelection, apply_filters};
    use crate::data::model::Dataset;
    use crate::data::model::tests::record;

    fn aggregates_of(ds: &Dataset, sel: &FilterSelection) -> AggregateResult {
        compute_aggregates(&apply_filters(ds, sel))
    }

    fn ranked(pairs: &[(&str, usize)]) -> Vec<RankedCount> {
        pairs
            .iter()
            .map(|&(label, crashes)| RankedCount {
                label: label.to_string(),
                crashes,
            })
            .collect()
    }

    fn three_crashes() -> Dataset {
        Dataset::from_records(vec![
            record("A", "Jan", 2000, 10.0, 2.0),
            record("A", "Feb", 2001, 5.0, 5.0),
            record("B", "Jan", 2000, 20.0, 0.0),
        ])
    }

    #[test]
    fn end_to_end_example() {
        let ds = three_crashes();
        let agg = aggregates_of(&ds, &FilterSelection::unconstrained(&ds));

        assert_eq!(agg.total_crashes, 3);
        assert_eq!(agg.total_fatalities, 7.0);
        let avg = agg.avg_fatalities.unwrap();
        assert!((avg - 7.0 / 3.0).abs() < 1e-9);
        assert_eq!(format!("{avg:.2}"), "2.33");
        assert_eq!(agg.most_dangerous_country.as_deref(), Some("A"));
        assert_eq!(
            agg.crashes_per_year
                .iter()
                .map(|y| (y.year, y.crashes))
                .collect::<Vec<_>>(),
            vec![(2000, 2), (2001, 1)]
        );
        assert_eq!(agg.top_countries, ranked(&[("A", 2), ("B", 1)]));
        assert_eq!(agg.crashes_per_month, ranked(&[("Jan", 2), ("Feb", 1)]));
        assert_eq!(
            agg.crashes_per_decade,
            vec![DecadeCount {
                decade: 2000,
                crashes: 3
            }]
        );
        assert_eq!(agg.survival_rates, vec![80.0, 0.0, 100.0]);
        assert_eq!(agg.fatalities_vs_aboard.len(), 3);
        assert_eq!(agg.fatalities_vs_aboard[2].aboard, 20.0);
    }

    #[test]
    fn empty_view_yields_undefined_kpis_and_empty_groups() {
        let ds = three_crashes();
        let mut sel = FilterSelection::unconstrained(&ds);
        sel.toggle_country("Nowhere");
        let agg = aggregates_of(&ds, &sel);

        assert_eq!(agg.total_crashes, 0);
        assert_eq!(agg.total_fatalities, 0.0);
        assert_eq!(agg.avg_fatalities, None);
        assert_eq!(agg.most_dangerous_country, None);
        assert!(agg.crashes_per_year.is_empty());
        assert!(agg.top_countries.is_empty());
        assert!(agg.top_manufacturers.is_empty());
        assert!(agg.fatalities_vs_aboard.is_empty());
        assert!(agg.survival_rates.is_empty());
        assert!(agg.crashes_per_month.is_empty());
        assert!(agg.crashes_per_decade.is_empty());
        assert!(agg.deadliest.is_empty());
        assert!(survival_histogram(&agg.survival_rates, SURVIVAL_BINS).is_empty());
    }

    #[test]
    fn empty_dataset_is_a_valid_input() {
        let ds = Dataset::from_records(Vec::new());
        let agg = aggregates_of(&ds, &FilterSelection::unconstrained(&ds));
        assert_eq!(agg.total_crashes, 0);
        assert_eq!(agg.avg_fatalities, None);
    }

    #[test]
    fn total_fatalities_decompose_over_years() {
        let ds = Dataset::from_records(vec![
            record("A", "Jan", 1990, 3.0, 1.5),
            record("B", "Feb", 1990, 9.0, 9.0),
            record("C", "Mar", 2004, 4.0, 0.0),
            record("A", "Apr", 2011, 120.0, 37.0),
        ]);
        let agg = aggregates_of(&ds, &FilterSelection::unconstrained(&ds));
        let per_year: f64 = agg.crashes_per_year.iter().map(|y| y.fatalities).sum();
        let per_year_crashes: usize = agg.crashes_per_year.iter().map(|y| y.crashes).sum();
        assert_eq!(per_year, agg.total_fatalities);
        assert_eq!(per_year_crashes, agg.total_crashes);
    }

    #[test]
    fn most_dangerous_country_tie_goes_to_first_sorted_key() {
        let ds = Dataset::from_records(vec![
            record("Zambia", "Jan", 2000, 5.0, 4.0),
            record("Brazil", "Jan", 2000, 5.0, 4.0),
            record("Canada", "Jan", 2000, 5.0, 1.0),
        ]);
        let agg = aggregates_of(&ds, &FilterSelection::unconstrained(&ds));
        assert_eq!(agg.most_dangerous_country.as_deref(), Some("Brazil"));
    }

    #[test]
    fn all_zero_fatalities_still_name_a_country() {
        let ds = Dataset::from_records(vec![
            record("Peru", "Jan", 2000, 5.0, 0.0),
            record("Chile", "Jan", 2000, 5.0, 0.0),
        ]);
        let agg = aggregates_of(&ds, &FilterSelection::unconstrained(&ds));
        assert_eq!(agg.most_dangerous_country.as_deref(), Some("Chile"));
    }

    #[test]
    fn top_countries_break_ties_by_first_occurrence_and_cap_at_ten() {
        let mut recs = Vec::new();
        // Twelve countries with one crash each, then a second crash for "L".
        for c in ["K", "J", "I", "H", "G", "F", "E", "D", "C", "B", "A", "L", "L"] {
            recs.push(record(c, "Jan", 2000, 1.0, 0.0));
        }
        let ds = Dataset::from_records(recs);
        let agg = aggregates_of(&ds, &FilterSelection::unconstrained(&ds));

        assert_eq!(agg.top_countries.len(), TOP_N);
        assert_eq!(agg.top_countries[0], ranked(&[("L", 2)])[0]);
        let labels: Vec<&str> = agg.top_countries[1..]
            .iter()
            .map(|c| c.label.as_str())
            .collect();
        assert_eq!(labels, ["K", "J", "I", "H", "G", "F", "E", "D", "C"]);
    }

    #[test]
    fn top_manufacturers_skip_missing_manufacturers() {
        let mut recs = vec![
            record("A", "Jan", 2000, 1.0, 0.0),
            record("A", "Jan", 2000, 1.0, 0.0),
            record("A", "Jan", 2000, 1.0, 0.0),
            record("A", "Jan", 2000, 1.0, 0.0),
        ];
        recs[1].aircraft_manufacturer = Some("Douglas".into());
        recs[2].aircraft_manufacturer = Some("Boeing".into());
        recs[3].aircraft_manufacturer = Some("Boeing".into());
        let ds = Dataset::from_records(recs);
        let agg = aggregates_of(&ds, &FilterSelection::unconstrained(&ds));
        assert_eq!(agg.top_manufacturers, ranked(&[("Boeing", 2), ("Douglas", 1)]));
    }

    #[test]
    fn deadliest_keeps_input_order_among_ties() {
        let mut recs = Vec::new();
        for (i, fatalities) in [5.0, 80.0, 5.0, 12.0, 80.0].into_iter().enumerate() {
            let mut r = record("A", "Jan", 1970 + i as i32, 100.0, fatalities);
            r.operator = Some(format!("op{i}"));
            recs.push(r);
        }
        let ds = Dataset::from_records(recs);
        let agg = aggregates_of(&ds, &FilterSelection::unconstrained(&ds));

        let ops: Vec<&str> = agg
            .deadliest
            .iter()
            .map(|d| d.operator.as_deref().unwrap())
            .collect();
        assert_eq!(ops, ["op1", "op4", "op3", "op0", "op2"]);
        assert_eq!(agg.deadliest[0].year, 1971);
        assert_eq!(agg.deadliest[0].fatalities, 80.0);
    }

    #[test]
    fn deadliest_is_capped_at_ten() {
        let recs = (0..25)
            .map(|i| record("A", "Jan", 2000, 50.0, i as f64))
            .collect();
        let ds = Dataset::from_records(recs);
        let agg = aggregates_of(&ds, &FilterSelection::unconstrained(&ds));
        assert_eq!(agg.deadliest.len(), TOP_N);
        assert_eq!(agg.deadliest[0].fatalities, 24.0);
        assert_eq!(agg.deadliest[9].fatalities, 15.0);
    }

    #[test]
    fn survival_rate_edge_cases_flow_through() {
        let ds = Dataset::from_records(vec![
            record("A", "Jan", 2000, 0.0, 0.0),
            record("A", "Jan", 2000, 0.0, 5.0),
        ]);
        let agg = aggregates_of(&ds, &FilterSelection::unconstrained(&ds));
        assert_eq!(agg.survival_rates, vec![0.0, -500.0]);
    }

    #[test]
    fn decades_are_sorted_ascending() {
        let ds = Dataset::from_records(vec![
            record("A", "Jan", 2003, 1.0, 0.0),
            record("A", "Jan", 1931, 1.0, 0.0),
            record("A", "Jan", 2009, 1.0, 0.0),
            record("A", "Jan", 1939, 1.0, 0.0),
            record("A", "Jan", 1940, 1.0, 0.0),
        ]);
        let agg = aggregates_of(&ds, &FilterSelection::unconstrained(&ds));
        let decades: Vec<(i32, usize)> = agg
            .crashes_per_decade
            .iter()
            .map(|d| (d.decade, d.crashes))
            .collect();
        assert_eq!(decades, vec![(1930, 2), (1940, 1), (2000, 2)]);
    }

    #[test]
    fn aggregates_follow_the_filter() {
        let ds = three_crashes();
        let mut sel = FilterSelection::unconstrained(&ds);
        sel.toggle_month("Jan");
        let agg = aggregates_of(&ds, &sel);
        assert_eq!(agg.total_crashes, 2);
        assert_eq!(agg.total_fatalities, 2.0);
        assert_eq!(agg.avg_fatalities, Some(1.0));
        assert_eq!(agg.top_countries, ranked(&[("A", 1), ("B", 1)]));
    }

    #[test]
    fn undefined_kpis_serialize_as_null() {
        let ds = Dataset::from_records(Vec::new());
        let agg = aggregates_of(&ds, &FilterSelection::unconstrained(&ds));
        let json = serde_json::to_value(&agg).unwrap();
        assert!(json["avg_fatalities"].is_null());
        assert!(json["most_dangerous_country"].is_null());
        assert_eq!(json["total_crashes"], 0);
    }

    #[test]
    fn histogram_bins_cover_the_range() {
        let values = [-500.0, -10.0, 50.0, 100.0, 100.0];
        let bins = survival_histogram(&values, 6);
        assert_eq!(bins.len(), 6);
        assert_eq!(bins[0].start, -500.0);
        assert_eq!(bins[5].end, 100.0);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), values.len());
        // Max value lands in the closed last bin.
        assert_eq!(bins[5].count, 3);
    }

    #[test]
    fn histogram_of_identical_values_is_one_bin() {
        let bins = survival_histogram(&[100.0, 100.0, 100.0], SURVIVAL_BINS);
        assert_eq!(
            bins,
            vec![HistogramBin {
                start: 100.0,
                end: 100.0,
                count: 3
            }]
        );
    }
}
