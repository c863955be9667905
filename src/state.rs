use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::color::ColorMap;
use crate::data::aggregate::{AggregateResult, compute_aggregates};
use crate::data::error::DataLoadError;
use crate::data::filter::{FilterSelection, FilteredView, apply_filters};
use crate::data::loader;
use crate::data::model::Dataset;

// ---------------------------------------------------------------------------
// Recompute entry point
// ---------------------------------------------------------------------------

/// Output of one full filter + aggregate pass.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Dataset positions of the visible records.
    pub visible_indices: Vec<usize>,
    pub aggregates: AggregateResult,
}

/// Run the whole pipeline for one selection.  Pure: the dataset is only read.
pub fn recompute(dataset: &Dataset, selection: &FilterSelection) -> Snapshot {
    let view = apply_filters(dataset, selection);
    let aggregates = compute_aggregates(&view);
    Snapshot {
        visible_indices: view.indices().to_vec(),
        aggregates,
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Loaded dataset (None until a file is loaded); shared read-only.
    pub dataset: Option<Arc<Dataset>>,

    /// Where the dataset came from.
    pub source: Option<PathBuf>,

    /// Active filter selection.
    pub selection: FilterSelection,

    /// Result of the last recompute for `selection`.
    pub snapshot: Option<Snapshot>,

    /// Stable colours per country / manufacturer.
    pub country_colors: ColorMap,
    pub manufacturer_colors: ColorMap,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Ingest a newly loaded dataset, reset filters and recompute.
    pub fn set_dataset(&mut self, dataset: Dataset, source: Option<PathBuf>) {
        self.country_colors = ColorMap::new(dataset.countries().iter().map(String::as_str));
        self.manufacturer_colors =
            ColorMap::new(dataset.manufacturers().iter().flatten().map(String::as_str));
        self.selection = FilterSelection::unconstrained(&dataset);
        self.dataset = Some(Arc::new(dataset));
        self.source = source;
        self.status_message = None;
        self.recompute();
    }

    /// Load `path`; on failure the previous dataset stays and the error is
    /// reported in `status_message`.
    pub fn load_path(&mut self, path: &Path) -> Result<(), DataLoadError> {
        match loader::load(path) {
            Ok(dataset) => {
                self.set_dataset(dataset, Some(path.to_path_buf()));
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                self.status_message = Some(format!("Error: {e}"));
                Err(e)
            }
        }
    }

    /// Replace the selection; recomputes only when it actually changed.
    pub fn set_selection(&mut self, selection: FilterSelection) {
        if selection != self.selection || self.snapshot.is_none() {
            self.selection = selection;
            self.recompute();
        }
    }

    /// Drop every value constraint and restore the full year range.
    pub fn reset_filters(&mut self) {
        let selection = match &self.dataset {
            Some(ds) => FilterSelection::unconstrained(ds),
            None => FilterSelection::default(),
        };
        self.set_selection(selection);
    }

    /// Full filter + aggregate pass for the current selection.
    pub fn recompute(&mut self) {
        self.snapshot = self.dataset.as_ref().map(|ds| {
            let snapshot = recompute(ds, &self.selection);
            log::debug!(
                "Recomputed: {} of {} records visible",
                snapshot.visible_indices.len(),
                ds.len()
            );
            snapshot
        });
    }

    /// The visible records as a view over the shared dataset.
    pub fn view(&self) -> Option<FilteredView<'_>> {
        let ds = self.dataset.as_deref()?;
        let snapshot = self.snapshot.as_ref()?;
        Some(FilteredView::from_indices(ds, &snapshot.visible_indices))
    }

    pub fn aggregates(&self) -> Option<&AggregateResult> {
        self.snapshot.as_ref().map(|s| &s.aggregates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::record;
    use crate::data::model::YearRange;

    fn state() -> AppState {
        let mut state = AppState::default();
        state.set_dataset(
            Dataset::from_records(vec![
                record("A", "Jan", 2000, 10.0, 2.0),
                record("A", "Feb", 2001, 5.0, 5.0),
                record("B", "Jan", 2000, 20.0, 0.0),
            ]),
            None,
        );
        state
    }

    #[test]
    fn set_dataset_computes_unfiltered_snapshot() {
        let state = state();
        let agg = state.aggregates().unwrap();
        assert_eq!(agg.total_crashes, 3);
        assert_eq!(state.selection.years, YearRange::new(2000, 2001));
        assert_eq!(state.view().unwrap().len(), 3);
    }

    #[test]
    fn new_selection_replaces_results() {
        let mut state = state();
        let mut sel = state.selection.clone();
        sel.toggle_country("B");
        state.set_selection(sel);

        let agg = state.aggregates().unwrap();
        assert_eq!(agg.total_crashes, 1);
        assert_eq!(agg.most_dangerous_country.as_deref(), Some("B"));
        assert_eq!(state.snapshot.as_ref().unwrap().visible_indices, vec![2]);

        state.reset_filters();
        assert_eq!(state.aggregates().unwrap().total_crashes, 3);
    }

    #[test]
    fn sessions_share_the_dataset_but_not_results() {
        let a = state();
        let mut b = AppState {
            dataset: a.dataset.clone(),
            selection: a.selection.clone(),
            ..AppState::default()
        };
        let mut sel = b.selection.clone();
        sel.toggle_month("Feb");
        b.set_selection(sel);

        assert!(Arc::ptr_eq(a.dataset.as_ref().unwrap(), b.dataset.as_ref().unwrap()));
        assert_eq!(a.aggregates().unwrap().total_crashes, 3);
        assert_eq!(b.aggregates().unwrap().total_crashes, 1);
    }

    #[test]
    fn failed_load_keeps_previous_dataset() {
        let mut state = state();
        let dir = tempfile::tempdir().unwrap();
        let err = state.load_path(&dir.path().join("missing.csv"));

        assert!(err.is_err());
        assert!(state.status_message.is_some());
        assert_eq!(state.dataset.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn recompute_without_dataset_is_empty() {
        let mut state = AppState::default();
        state.recompute();
        assert!(state.snapshot.is_none());
        assert!(state.view().is_none());
    }
}
