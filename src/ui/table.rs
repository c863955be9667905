use eframe::egui::Ui;
use egui_extras::{Column, TableBuilder};

use crate::data::aggregate::DeadliestCrash;

const ROW_HEIGHT: f32 = 20.0;

/// Top-10 deadliest crashes: year, aircraft, operator, location, fatalities.
pub fn deadliest_table(ui: &mut Ui, rows: &[DeadliestCrash]) {
    ui.heading("Top 10 Deadliest Crashes");
    if rows.is_empty() {
        ui.label("No crashes match the current filters.");
        return;
    }

    TableBuilder::new(ui)
        .id_salt("deadliest")
        .striped(true)
        .vscroll(false)
        .column(Column::auto().at_least(50.0))
        .column(Column::auto().at_least(140.0))
        .column(Column::auto().at_least(140.0))
        .column(Column::remainder())
        .column(Column::auto().at_least(80.0))
        .header(ROW_HEIGHT, |mut header| {
            for title in ["Year", "Aircraft", "Operator", "Location", "Fatalities (air)"] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for crash in rows {
                body.row(ROW_HEIGHT, |mut row| {
                    row.col(|ui| {
                        ui.label(crash.year.to_string());
                    });
                    for text in [&crash.aircraft, &crash.operator, &crash.location] {
                        row.col(|ui| {
                            ui.label(text.as_deref().unwrap_or(""));
                        });
                    }
                    row.col(|ui| {
                        ui.label(format!("{}", crash.fatalities));
                    });
                });
            }
        });
}
