use std::collections::BTreeSet;

use eframe::egui::{self, Color32, DragValue, RichText, ScrollArea, Ui};

use crate::data::aggregate::AggregateResult;
use crate::data::model::{UNKNOWN, YearRange};
use crate::state::AppState;

/// Placeholder for metrics that are undefined on an empty view.
const UNDEFINED: &str = "—";

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.  Widgets edit a copy of the selection;
/// the state recomputes once if anything changed.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(dataset) = state.dataset.clone() else {
        ui.label("No dataset loaded.");
        return;
    };
    if dataset.is_empty() {
        ui.label("The dataset has no records.");
        return;
    }

    let mut selection = state.selection.clone();
    let mut reset = false;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Year range ----
            if let Some(bounds) = dataset.year_bounds() {
                ui.strong("Year range");
                let mut min = selection.years.min.clamp(bounds.min, bounds.max);
                let mut max = selection.years.max.clamp(bounds.min, bounds.max);
                ui.horizontal(|ui: &mut Ui| {
                    ui.add(DragValue::new(&mut min).range(bounds.min..=bounds.max));
                    ui.label("to");
                    ui.add(DragValue::new(&mut max).range(bounds.min..=bounds.max));
                });
                selection.years = YearRange::new(min, max);
                ui.separator();
            }

            multi_select(
                ui,
                "Country",
                dataset.countries(),
                &mut selection.countries,
                |c| c.clone(),
                |c| Some(state.country_colors.color_for(c)),
            );
            multi_select(
                ui,
                "Manufacturer",
                dataset.manufacturers(),
                &mut selection.manufacturers,
                |m| m.clone().unwrap_or_else(|| UNKNOWN.to_string()),
                |m| m.as_deref().map(|m| state.manufacturer_colors.color_for(m)),
            );
            multi_select(
                ui,
                "Month",
                dataset.months(),
                &mut selection.months,
                |m| m.clone(),
                |_| None,
            );

            ui.separator();
            ui.horizontal(|ui: &mut Ui| {
                if ui.button("Clear selections").clicked() {
                    selection.clear();
                }
                if ui.button("Reset filters").clicked() {
                    reset = true;
                }
            });
        });

    if reset {
        state.reset_filters();
    } else {
        state.set_selection(selection);
    }
}

/// Collapsible checkbox list for one filter dimension.  Nothing checked
/// means the dimension is unconstrained.
fn multi_select<T: Ord + Clone>(
    ui: &mut Ui,
    title: &str,
    options: &BTreeSet<T>,
    selected: &mut BTreeSet<T>,
    label: impl Fn(&T) -> String,
    color: impl Fn(&T) -> Option<Color32>,
) {
    let header_text = if selected.is_empty() {
        format!("{title}  (all {})", options.len())
    } else {
        format!("{title}  ({}/{})", selected.len(), options.len())
    };

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt(title)
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            if ui.small_button("Clear").clicked() {
                selected.clear();
            }
            for value in options {
                let mut text = RichText::new(label(value));
                if let Some(c) = color(value) {
                    text = text.color(c);
                }
                let mut checked = selected.contains(value);
                if ui.checkbox(&mut checked, text).changed() {
                    if checked {
                        selected.insert(value.clone());
                    } else {
                        selected.remove(value);
                    }
                }
            }
        });
}

// ---------------------------------------------------------------------------
// KPI row
// ---------------------------------------------------------------------------

/// Four headline metrics across the top of the central panel.
pub fn kpi_row(ui: &mut Ui, agg: &AggregateResult) {
    let avg = agg
        .avg_fatalities
        .map(|v| format!("{v:.1}"))
        .unwrap_or_else(|| UNDEFINED.to_string());
    let country = agg
        .most_dangerous_country
        .clone()
        .unwrap_or_else(|| UNDEFINED.to_string());

    ui.columns(4, |cols: &mut [Ui]| {
        metric(&mut cols[0], "Total Crashes", &agg.total_crashes.to_string());
        metric(&mut cols[1], "Total Fatalities", &format!("{}", agg.total_fatalities));
        metric(&mut cols[2], "Average Fatalities per Crash", &avg);
        metric(&mut cols[3], "Most Dangerous Country", &country);
    });
}

fn metric(ui: &mut Ui, title: &str, value: &str) {
    ui.vertical(|ui: &mut Ui| {
        ui.label(RichText::new(title).weak());
        ui.label(RichText::new(value).size(28.0).strong());
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(ds), Some(view)) = (&state.dataset, state.view()) {
            ui.label(format!("{} crashes loaded, {} visible", ds.len(), view.len()));
        }
        if let Some(source) = &state.source {
            ui.label(RichText::new(source.display().to_string()).weak());
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open crash data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        // Failures are logged and shown in the status bar by `load_path`.
        let _ = state.load_path(&path);
    }
}
