use std::path::PathBuf;

use clap::Parser;

use crate::data::filter::FilterSelection;
use crate::data::model::{Dataset, UNKNOWN, YearRange};

/// Data file picked up from the working directory when none is given.
pub const DEFAULT_DATA_FILE: &str = "aircrahesFullDataUpdated_2024.csv";

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "crash-dash")]
#[command(about = "Aircraft crash records dashboard")]
#[command(version)]
pub struct Cli {
    /// Crash data file (.csv, .json, .parquet)
    #[arg(env = "CRASH_DASH_DATA")]
    pub data: Option<PathBuf>,

    /// Print the metrics as JSON instead of opening the window
    #[arg(long)]
    pub summary: bool,

    /// Keep only these countries (repeatable)
    #[arg(long = "country", value_name = "NAME")]
    pub countries: Vec<String>,

    /// Keep only these manufacturers (repeatable; "Unknown" selects missing ones)
    #[arg(long = "manufacturer", value_name = "NAME")]
    pub manufacturers: Vec<String>,

    /// Keep only these months (repeatable)
    #[arg(long = "month", value_name = "NAME")]
    pub months: Vec<String>,

    /// First year to include
    #[arg(long)]
    pub year_min: Option<i32>,

    /// Last year to include
    #[arg(long)]
    pub year_max: Option<i32>,
}

impl Cli {
    /// Explicit path, or the default export if it sits in the working directory.
    pub fn data_path(&self) -> Option<PathBuf> {
        self.data.clone().or_else(|| {
            let fallback = PathBuf::from(DEFAULT_DATA_FILE);
            fallback.is_file().then_some(fallback)
        })
    }

    /// Initial filter selection from the command-line flags.
    pub fn selection(&self, dataset: &Dataset) -> FilterSelection {
        let base = FilterSelection::unconstrained(dataset);
        let years = YearRange::new(
            self.year_min.unwrap_or(base.years.min),
            self.year_max.unwrap_or(base.years.max),
        );

        // A literal "Unknown" manufacturer wins over the missing-value alias.
        let literal_unknown = dataset.manufacturers().contains(&Some(UNKNOWN.to_string()));
        let manufacturers = self
            .manufacturers
            .iter()
            .map(|m| {
                if m == UNKNOWN && !literal_unknown {
                    None
                } else {
                    Some(m.clone())
                }
            })
            .collect();

        FilterSelection {
            countries: self.countries.iter().cloned().collect(),
            manufacturers,
            months: self.months.iter().cloned().collect(),
            ..base.with_years(years)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::record;

    fn dataset() -> Dataset {
        let mut boeing = record("USA", "May", 1990, 10.0, 1.0);
        boeing.aircraft_manufacturer = Some("Boeing".into());
        Dataset::from_records(vec![boeing, record("Peru", "June", 1960, 3.0, 3.0)])
    }

    #[test]
    fn parses_repeated_filters() {
        let cli = Cli::try_parse_from([
            "crash-dash",
            "crashes.csv",
            "--summary",
            "--country",
            "USA",
            "--country",
            "Peru",
            "--month",
            "May",
            "--year-min",
            "1970",
        ])
        .unwrap();

        assert_eq!(cli.data, Some(PathBuf::from("crashes.csv")));
        assert!(cli.summary);
        assert_eq!(cli.countries, ["USA", "Peru"]);
        assert_eq!(cli.year_min, Some(1970));
        assert_eq!(cli.year_max, None);
    }

    #[test]
    fn selection_defaults_to_dataset_year_bounds() {
        let ds = dataset();
        let cli = Cli {
            year_min: Some(1975),
            ..Cli::default()
        };
        let sel = cli.selection(&ds);
        assert_eq!(sel.years, YearRange::new(1975, 1990));
        assert!(sel.countries.is_empty());
    }

    #[test]
    fn unknown_manufacturer_selects_missing_values() {
        let ds = dataset();
        let cli = Cli {
            manufacturers: vec!["Unknown".into(), "Boeing".into()],
            ..Cli::default()
        };
        let sel = cli.selection(&ds);
        assert!(sel.manufacturers.contains(&None));
        assert!(sel.manufacturers.contains(&Some("Boeing".to_string())));
    }
}
