use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::{can_cast_types, cast};
use arrow::datatypes::{DataType, Float64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::DataLoadError;
use super::model::{Dataset, Record, UNKNOWN};

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

pub const COL_COUNTRY: &str = "Country/Region";
pub const COL_MANUFACTURER: &str = "Aircraft Manufacturer";
pub const COL_MONTH: &str = "Month";
pub const COL_YEAR: &str = "Year";
pub const COL_ABOARD: &str = "Aboard";
pub const COL_FATALITIES: &str = "Fatalities (air)";
/// Accepted when [`COL_FATALITIES`] is absent.
pub const COL_FATALITIES_ALT: &str = "Fatalities";
pub const COL_AIRCRAFT: &str = "Aircraft";
pub const COL_OPERATOR: &str = "Operator";
pub const COL_LOCATION: &str = "Location";

/// Every column the loader reads.
const KNOWN_COLUMNS: [&str; 10] = [
    COL_COUNTRY,
    COL_MANUFACTURER,
    COL_MONTH,
    COL_YEAR,
    COL_ABOARD,
    COL_FATALITIES,
    COL_FATALITIES_ALT,
    COL_AIRCRAFT,
    COL_OPERATOR,
    COL_LOCATION,
];

/// Cell text read as missing, matching the pandas `read_csv` defaults.
const NA_VALUES: [&str; 19] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null", "",
];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load and normalise a crash dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row plus one crash per line (the native export)
/// * `.json`    – `[{ "Country/Region": "...", "Year": 1998, ... }, ...]`
/// * `.parquet` – flat schema with the same column names
pub fn load(path: &Path) -> Result<Dataset, DataLoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => read_csv(path)?,
        "json" => read_json(path)?,
        "parquet" | "pq" => read_parquet(path)?,
        other => return Err(DataLoadError::UnsupportedFormat(other.to_string())),
    };

    let dataset = normalize(table)?;
    log::info!(
        "Loaded {} crash records from {} ({} countries, {} manufacturers, {} months)",
        dataset.len(),
        path.display(),
        dataset.countries().len(),
        dataset.manufacturers().len(),
        dataset.months().len()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Raw table – format-independent intermediate form
// ---------------------------------------------------------------------------

/// A single untyped cell as read from the source.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Null,
    Text(String),
    Number(f64),
}

impl Cell {
    fn text(s: &str) -> Cell {
        let s = s.trim();
        if NA_VALUES.contains(&s) {
            Cell::Null
        } else {
            Cell::Text(s.to_string())
        }
    }

    fn number(n: f64) -> Cell {
        if n.is_nan() {
            Cell::Null
        } else {
            Cell::Number(n)
        }
    }

    fn as_label(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
        }
    }

    fn as_number(&self, row: usize, column: &str) -> Result<Option<f64>, DataLoadError> {
        match self {
            Cell::Null => Ok(None),
            Cell::Number(n) => Ok(Some(*n)),
            Cell::Text(s) => s
                .parse::<f64>()
                .map(Some)
                .map_err(|_| DataLoadError::invalid(row, column, s.as_str())),
        }
    }
}

static NULL_CELL: Cell = Cell::Null;

/// Column names (already trimmed) plus rows of cells in source order.
#[derive(Debug, Default)]
struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

// ---------------------------------------------------------------------------
// Normalisation
// ---------------------------------------------------------------------------

/// Resolved column positions for one table.
struct ColumnMap {
    country: usize,
    manufacturer: usize,
    month: usize,
    year: usize,
    aboard: usize,
    fatalities: usize,
    fatalities_name: &'static str,
    aircraft: Option<usize>,
    operator: Option<usize>,
    location: Option<usize>,
}

impl ColumnMap {
    fn resolve(table: &RawTable) -> Result<Self, DataLoadError> {
        let mut missing = Vec::new();
        let mut required = |name: &str| {
            let pos = table.position(name);
            if pos.is_none() {
                missing.push(name.to_string());
            }
            pos.unwrap_or_default()
        };

        let country = required(COL_COUNTRY);
        let manufacturer = required(COL_MANUFACTURER);
        let month = required(COL_MONTH);
        let year = required(COL_YEAR);
        let aboard = required(COL_ABOARD);

        let (fatalities, fatalities_name) = match table.position(COL_FATALITIES) {
            Some(pos) => (pos, COL_FATALITIES),
            None => match table.position(COL_FATALITIES_ALT) {
                Some(pos) => (pos, COL_FATALITIES_ALT),
                None => {
                    missing.push(COL_FATALITIES.to_string());
                    (0, COL_FATALITIES)
                }
            },
        };

        if !missing.is_empty() {
            return Err(DataLoadError::MissingColumns(missing));
        }

        Ok(ColumnMap {
            country,
            manufacturer,
            month,
            year,
            aboard,
            fatalities,
            fatalities_name,
            aircraft: table.position(COL_AIRCRAFT),
            operator: table.position(COL_OPERATOR),
            location: table.position(COL_LOCATION),
        })
    }
}

/// Apply the fill rules and type every row.
fn normalize(table: RawTable) -> Result<Dataset, DataLoadError> {
    let cols = ColumnMap::resolve(&table)?;
    log::debug!(
        "Column mapping: fatalities from '{}', display columns aircraft={:?} operator={:?} location={:?}",
        cols.fatalities_name,
        cols.aircraft,
        cols.operator,
        cols.location
    );

    let mut records = Vec::with_capacity(table.rows.len());
    for (row_no, row) in table.rows.iter().enumerate() {
        let cell = |idx: usize| row.get(idx).unwrap_or(&NULL_CELL);
        let optional = |idx: Option<usize>| idx.and_then(|i| cell(i).as_label());

        records.push(Record {
            country_region: cell(cols.country)
                .as_label()
                .unwrap_or_else(|| UNKNOWN.to_string()),
            aircraft_manufacturer: cell(cols.manufacturer).as_label(),
            month: cell(cols.month)
                .as_label()
                .unwrap_or_else(|| UNKNOWN.to_string()),
            year: parse_year(cell(cols.year), row_no)?,
            aboard: parse_count(cell(cols.aboard), row_no, COL_ABOARD)?,
            fatalities: parse_count(cell(cols.fatalities), row_no, cols.fatalities_name)?,
            aircraft: optional(cols.aircraft),
            operator: optional(cols.operator),
            location: optional(cols.location),
        });
    }

    Ok(Dataset::from_records(records))
}

fn parse_year(cell: &Cell, row: usize) -> Result<i32, DataLoadError> {
    let invalid = || DataLoadError::invalid(row, COL_YEAR, cell.as_label().unwrap_or_default());
    let value = cell.as_number(row, COL_YEAR)?.ok_or_else(invalid)?;
    if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
        return Err(invalid());
    }
    Ok(value as i32)
}

/// Non-negative count; null → 0.
fn parse_count(cell: &Cell, row: usize, column: &str) -> Result<f64, DataLoadError> {
    match cell.as_number(row, column)? {
        None => Ok(0.0),
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
        Some(v) => Err(DataLoadError::invalid(row, column, v.to_string())),
    }
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<File, DataLoadError> {
    File::open(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Header row with column names; short rows are padded with nulls.
fn read_csv(path: &Path) -> Result<RawTable, DataLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(open(path)?);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| DataLoadError::malformed("CSV", e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| DataLoadError::malformed("CSV", format!("row {row_no}: {e}")))?;
        rows.push(record.iter().map(Cell::text).collect());
    }

    Ok(RawTable { columns, rows })
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Records-oriented array (`df.to_json(orient='records')`).  The column set
/// is the union of keys in first-seen order; absent keys are null.
fn read_json(path: &Path) -> Result<RawTable, DataLoadError> {
    let root: JsonValue = serde_json::from_reader(std::io::BufReader::new(open(path)?))
        .map_err(|e| DataLoadError::malformed("JSON", e))?;

    let items = root
        .as_array()
        .ok_or_else(|| DataLoadError::malformed("JSON", "expected top-level array"))?;

    let mut table = RawTable::default();
    let mut objects = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let obj = item
            .as_object()
            .ok_or_else(|| DataLoadError::malformed("JSON", format!("row {i} is not an object")))?;
        let mut trimmed = Vec::with_capacity(obj.len());
        for (key, val) in obj {
            let key = key.trim().to_string();
            if table.position(&key).is_none() {
                table.columns.push(key.clone());
            }
            trimmed.push((key, val));
        }
        objects.push(trimmed);
    }

    for obj in objects {
        let mut row = vec![Cell::Null; table.columns.len()];
        for (key, val) in obj {
            if let Some(pos) = table.position(&key) {
                row[pos] = json_to_cell(val);
            }
        }
        table.rows.push(row);
    }

    Ok(table)
}

fn json_to_cell(val: &JsonValue) -> Cell {
    match val {
        JsonValue::Null => Cell::Null,
        JsonValue::String(s) => Cell::text(s),
        JsonValue::Number(n) => n
            .as_f64()
            .map(Cell::number)
            .unwrap_or_else(|| Cell::Text(n.to_string())),
        JsonValue::Bool(b) => Cell::Text(b.to_string()),
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Flat Parquet file as written by Pandas (`df.to_parquet()`) or Polars.
///
/// Numeric columns of any width are read as Float64, everything else that
/// Arrow can render as text (dictionaries, views, dates) as Utf8.
fn read_parquet(path: &Path) -> Result<RawTable, DataLoadError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)
        .map_err(|e| DataLoadError::malformed("Parquet", e))?;

    // (batch column index, trimmed name, type cells are extracted from)
    let mut plan: Vec<(usize, String, DataType)> = Vec::new();
    for (idx, field) in builder.schema().fields().iter().enumerate() {
        let name = field.name().trim().to_string();
        match readable_type(field.data_type()) {
            Some(target) => plan.push((idx, name, target)),
            None if KNOWN_COLUMNS.contains(&name.as_str()) => {
                return Err(DataLoadError::malformed(
                    "Parquet",
                    format!("column '{name}' has unsupported type {}", field.data_type()),
                ));
            }
            None => log::warn!(
                "Skipping Parquet column '{name}' of unsupported type {}",
                field.data_type()
            ),
        }
    }

    let reader = builder
        .build()
        .map_err(|e| DataLoadError::malformed("Parquet", e))?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.map_err(|e| DataLoadError::malformed("Parquet", e))?;
        let arrays = plan
            .iter()
            .map(|(idx, name, target)| {
                let col = batch.column(*idx);
                if col.data_type() == target {
                    Ok(col.clone())
                } else {
                    cast(col, target).map_err(|e| {
                        DataLoadError::malformed("Parquet", format!("column '{name}': {e}"))
                    })
                }
            })
            .collect::<Result<Vec<ArrayRef>, _>>()?;

        for row in 0..batch.num_rows() {
            rows.push(
                arrays
                    .iter()
                    .map(|col| arrow_to_cell(col, row))
                    .collect::<Result<Vec<_>, _>>()?,
            );
        }
    }

    let columns = plan.into_iter().map(|(_, name, _)| name).collect();
    Ok(RawTable { columns, rows })
}

/// The type a column is converted to before reading cells, `None` when it
/// has no scalar rendering.
fn readable_type(data_type: &DataType) -> Option<DataType> {
    match data_type {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Float64 | DataType::Boolean => {
            Some(data_type.clone())
        }
        dt if dt.is_nested() => None,
        dt if dt.is_numeric() && can_cast_types(dt, &DataType::Float64) => Some(DataType::Float64),
        dt if can_cast_types(dt, &DataType::Utf8) => Some(DataType::Utf8),
        _ => None,
    }
}

/// Extract a single cell from a column already converted by [`readable_type`].
fn arrow_to_cell(col: &ArrayRef, row: usize) -> Result<Cell, DataLoadError> {
    if col.is_null(row) {
        return Ok(Cell::Null);
    }
    match col.data_type() {
        DataType::Utf8 => Ok(Cell::text(col.as_string::<i32>().value(row))),
        DataType::LargeUtf8 => Ok(Cell::text(col.as_string::<i64>().value(row))),
        DataType::Float64 => Ok(Cell::number(col.as_primitive::<Float64Type>().value(row))),
        DataType::Boolean => Ok(Cell::Text(col.as_boolean().value(row).to_string())),
        other => Err(DataLoadError::malformed(
            "Parquet",
            format!("cannot read values of type {other}"),
        )),
    }
}
