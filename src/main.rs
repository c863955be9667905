mod app;
mod color;
mod config;
mod data;
mod state;
mod summary;
mod ui;

use anyhow::anyhow;
use app::CrashDashApp;
use clap::Parser;
use config::Cli;
use eframe::egui;
use state::AppState;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("crash_dash=info"))
        .init();

    let cli = Cli::parse();
    if cli.summary {
        return summary::run(&cli, &mut std::io::stdout().lock());
    }

    let mut state = AppState::default();
    if let Some(path) = cli.data_path() {
        // Errors stay visible in the status bar; the window still opens.
        if state.load_path(&path).is_ok() {
            if let Some(ds) = state.dataset.clone() {
                state.set_selection(cli.selection(&ds));
            }
        }
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Crash Dash – Aircraft Crashes Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(CrashDashApp::new(state)))),
    )
    .map_err(|e| anyhow!("{e}"))
}
