use std::ops::RangeInclusive;

use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, GridMark, Line, Plot, PlotPoint, PlotPoints, Points};

use crate::color::ColorMap;
use crate::data::aggregate::{
    AggregateResult, DecadeCount, HistogramBin, ImpactPoint, RankedCount, SURVIVAL_BINS,
    YearCount, survival_histogram,
};
use crate::state::AppState;

const CHART_HEIGHT: f32 = 260.0;
const ACCENT: Color32 = Color32::LIGHT_BLUE;

// ---------------------------------------------------------------------------
// Chart grid (central panel)
// ---------------------------------------------------------------------------

/// Render every chart for the current aggregates, two per row.
pub fn dashboard(ui: &mut Ui, state: &AppState, agg: &AggregateResult) {
    ui.columns(2, |cols: &mut [Ui]| {
        cols[0].heading("Crashes per Year");
        crashes_per_year(&mut cols[0], &agg.crashes_per_year);
        cols[1].heading("Crashes per Decade");
        crashes_per_decade(&mut cols[1], &agg.crashes_per_decade);
    });
    ui.add_space(8.0);

    ui.columns(2, |cols: &mut [Ui]| {
        cols[0].heading("Top 10 Countries by Crashes");
        ranked_bars(&mut cols[0], "top_countries", &agg.top_countries, &state.country_colors);
        cols[1].heading("Top 10 Manufacturers");
        ranked_bars(
            &mut cols[1],
            "top_manufacturers",
            &agg.top_manufacturers,
            &state.manufacturer_colors,
        );
    });
    ui.add_space(8.0);

    ui.columns(2, |cols: &mut [Ui]| {
        cols[0].heading("Fatalities vs People Aboard");
        fatalities_vs_aboard(&mut cols[0], &agg.fatalities_vs_aboard);
        cols[1].heading("Survival Rate Distribution");
        survival_distribution(&mut cols[1], &agg.survival_rates);
    });
    ui.add_space(8.0);

    ui.heading("Crashes by Month");
    crashes_by_month(ui, &agg.crashes_per_month);
}

fn crashes_per_year(ui: &mut Ui, years: &[YearCount]) {
    let points: PlotPoints = years
        .iter()
        .map(|y| [y.year as f64, y.crashes as f64])
        .collect();
    let markers: PlotPoints = years
        .iter()
        .map(|y| [y.year as f64, y.crashes as f64])
        .collect();

    Plot::new("crashes_per_year")
        .height(CHART_HEIGHT)
        .x_axis_label("Year")
        .y_axis_label("Crashes")
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(points).name("Crashes").color(ACCENT).width(1.5));
            plot_ui.points(Points::new(markers).radius(2.5).color(ACCENT));
        });
}

fn crashes_per_decade(ui: &mut Ui, decades: &[DecadeCount]) {
    let bars = decades
        .iter()
        .map(|d| {
            Bar::new(d.decade as f64, d.crashes as f64)
                .width(8.0)
                .name(format!("{}s", d.decade))
        })
        .collect();

    Plot::new("crashes_per_decade")
        .height(CHART_HEIGHT)
        .x_axis_label("Decade")
        .y_axis_label("Crashes")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(ACCENT));
        });
}

/// Horizontal bars, highest count on top, one colour per label.
fn ranked_bars(ui: &mut Ui, id: &str, ranked: &[RankedCount], colors: &ColorMap) {
    let n = ranked.len();
    let bars = ranked
        .iter()
        .enumerate()
        .map(|(rank, r)| {
            Bar::new((n - rank) as f64, r.crashes as f64)
                .name(&r.label)
                .fill(colors.color_for(&r.label))
        })
        .collect();

    // Bar positions run 1..=n from the bottom.
    let labels: Vec<String> = ranked.iter().rev().map(|r| r.label.clone()).collect();

    Plot::new(id)
        .height(CHART_HEIGHT)
        .x_axis_label("Crashes")
        .y_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
            category_label(&labels, mark.value - 1.0)
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal());
        });
}

/// Scatter with aircraft / operator / location / year on hover.
fn fatalities_vs_aboard(ui: &mut Ui, points: &[ImpactPoint]) {
    let series: PlotPoints = points.iter().map(|p| [p.aboard, p.fatalities]).collect();
    let hover = points.to_vec();

    Plot::new("fatalities_vs_aboard")
        .height(CHART_HEIGHT)
        .x_axis_label("Aboard")
        .y_axis_label("Fatalities (air)")
        .label_formatter(move |_name: &str, value: &PlotPoint| {
            match nearest(&hover, value) {
                Some(p) => format!(
                    "Aboard: {}\nFatalities: {}\nAircraft: {}\nOperator: {}\nLocation: {}\nYear: {}",
                    p.aboard,
                    p.fatalities,
                    p.aircraft.as_deref().unwrap_or(""),
                    p.operator.as_deref().unwrap_or(""),
                    p.location.as_deref().unwrap_or(""),
                    p.year
                ),
                None => format!("Aboard: {:.0}\nFatalities: {:.0}", value.x, value.y),
            }
        })
        .show(ui, |plot_ui| {
            plot_ui.points(Points::new(series).radius(3.0).color(ACCENT).name("Crash"));
        });
}

fn nearest<'a>(points: &'a [ImpactPoint], at: &PlotPoint) -> Option<&'a ImpactPoint> {
    points.iter().min_by(|a, b| {
        let da = (a.aboard - at.x).powi(2) + (a.fatalities - at.y).powi(2);
        let db = (b.aboard - at.x).powi(2) + (b.fatalities - at.y).powi(2);
        da.total_cmp(&db)
    })
}

fn survival_distribution(ui: &mut Ui, rates: &[f64]) {
    let bars = survival_histogram(rates, SURVIVAL_BINS)
        .into_iter()
        .map(|bin| {
            Bar::new((bin.start + bin.end) / 2.0, bin.count as f64)
                .width(bar_width(&bin))
                .name(format!("{:.1} – {:.1}", bin.start, bin.end))
        })
        .collect();

    Plot::new("survival_rate")
        .height(CHART_HEIGHT)
        .x_axis_label("Survival Rate (%)")
        .y_axis_label("Crashes")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(ACCENT));
        });
}

fn crashes_by_month(ui: &mut Ui, months: &[RankedCount]) {
    let bars = months
        .iter()
        .enumerate()
        .map(|(i, m)| Bar::new(i as f64, m.crashes as f64).name(&m.label))
        .collect();
    let labels: Vec<String> = months.iter().map(|m| m.label.clone()).collect();

    Plot::new("crashes_by_month")
        .height(CHART_HEIGHT)
        .y_axis_label("Crashes")
        .x_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
            category_label(&labels, mark.value)
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(ACCENT));
        });
}

/// Bars span their bin exactly; a single collapsed bin gets unit width.
fn bar_width(bin: &HistogramBin) -> f64 {
    if bin.end > bin.start {
        bin.end - bin.start
    } else {
        1.0
    }
}

/// Axis label for integer category positions, blank elsewhere.
fn category_label(labels: &[String], position: f64) -> String {
    if position < 0.0 || position.fract() != 0.0 {
        return String::new();
    }
    labels.get(position as usize).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_only_on_integer_positions() {
        let labels = vec!["Jan".to_string(), "Feb".to_string()];
        assert_eq!(category_label(&labels, 1.0), "Feb");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, -1.0), "");
        assert_eq!(category_label(&labels, 7.0), "");
    }

    #[test]
    fn hover_picks_the_closest_crash() {
        let point = |aboard: f64, fatalities: f64, year: i32| ImpactPoint {
            aboard,
            fatalities,
            aircraft: None,
            operator: None,
            location: None,
            year,
        };
        let points = vec![point(10.0, 2.0, 1990), point(200.0, 150.0, 2001)];
        let hit = nearest(&points, &PlotPoint::new(190.0, 140.0)).unwrap();
        assert_eq!(hit.year, 2001);
        assert!(nearest(&[], &PlotPoint::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn narrow_histogram_bars_do_not_overlap() {
        let rates = [97.0, 97.5, 98.2, 99.0, 100.0];
        let bins = survival_histogram(&rates, SURVIVAL_BINS);
        for pair in bins.windows(2) {
            let left_edge = (pair[0].start + pair[0].end) / 2.0 + bar_width(&pair[0]) / 2.0;
            let right_edge = (pair[1].start + pair[1].end) / 2.0 - bar_width(&pair[1]) / 2.0;
            assert!(left_edge <= right_edge + 1e-9);
        }
        assert!((bar_width(&bins[0]) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn collapsed_bin_gets_unit_width() {
        let bins = survival_histogram(&[100.0, 100.0], SURVIVAL_BINS);
        assert_eq!(bar_width(&bins[0]), 1.0);
    }
}
