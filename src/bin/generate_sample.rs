use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }

    /// True with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// One output row, column names as in the public crash export.
#[derive(Serialize)]
struct Row {
    #[serde(rename = "Year")]
    year: i64,
    #[serde(rename = "Month")]
    month: Option<String>,
    #[serde(rename = "Country/Region")]
    country: Option<String>,
    #[serde(rename = "Location")]
    location: String,
    #[serde(rename = "Aircraft Manufacturer")]
    manufacturer: Option<String>,
    #[serde(rename = "Aircraft")]
    aircraft: String,
    #[serde(rename = "Operator")]
    operator: String,
    #[serde(rename = "Aboard")]
    aboard: Option<f64>,
    // Padded like the public export; the loader trims header names.
    #[serde(rename = " Fatalities (air)")]
    fatalities: Option<f64>,
}

const ROWS: usize = 500;

fn generate(rng: &mut SimpleRng) -> Vec<Row> {
    let months = [
        "January", "February", "March", "April", "May", "June", "July", "August",
        "September", "October", "November", "December",
    ];
    let countries = [
        "USA", "Russia", "Brazil", "Colombia", "Canada", "France", "India", "China",
        "Indonesia", "UK", "Mexico", "Peru",
    ];
    let manufacturers = [
        ("Boeing", ["707", "727", "737", "747"]),
        ("Douglas", ["DC-3", "DC-4", "DC-6", "C-47"]),
        ("Airbus", ["A300", "A320", "A330", "A340"]),
        ("Antonov", ["An-2", "An-12", "An-24", "An-26"]),
        ("de Havilland", ["DHC-2", "DHC-6", "Comet", "Dove"]),
    ];
    let operators = ["Aeroflot", "Air France", "US Air Force", "Private", "Military", "Pan Am"];
    let cities = ["Springfield", "Riverside", "Franklin", "Greenville", "Bristol", "Salem"];

    (0..ROWS)
        .map(|_| {
            let year = 1910 + rng.below(115) as i64;
            let (maker, models) = manufacturers[rng.below(manufacturers.len())];
            let model = models[rng.below(models.len())];
            let aboard = rng.below(300) as f64;
            let fatalities = (aboard * rng.next_f64()).round();
            let country = rng.pick(&countries);

            // Sprinkle in gaps so the fill rules have something to do.
            Row {
                year,
                month: (!rng.chance(0.03)).then(|| rng.pick(&months).to_string()),
                country: (!rng.chance(0.05)).then(|| country.to_string()),
                location: format!("{}, {country}", rng.pick(&cities)),
                manufacturer: (!rng.chance(0.04)).then(|| maker.to_string()),
                aircraft: format!("{maker} {model}"),
                operator: rng.pick(&operators).to_string(),
                aboard: (!rng.chance(0.02)).then_some(aboard),
                fatalities: (!rng.chance(0.02)).then_some(fatalities),
            }
        })
        .collect()
}

fn write_csv(rows: &[Row], path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    for row in rows {
        writer.serialize(row).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn to_batch(rows: &[Row]) -> Result<RecordBatch> {
    let strings = |f: fn(&Row) -> Option<&str>| -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
    };
    let floats = |f: fn(&Row) -> Option<f64>| -> ArrayRef {
        Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("Year", DataType::Int64, false),
        Field::new("Month", DataType::Utf8, true),
        Field::new("Country/Region", DataType::Utf8, true),
        Field::new("Location", DataType::Utf8, true),
        Field::new("Aircraft Manufacturer", DataType::Utf8, true),
        Field::new("Aircraft", DataType::Utf8, true),
        Field::new("Operator", DataType::Utf8, true),
        Field::new("Aboard", DataType::Float64, true),
        Field::new("Fatalities (air)", DataType::Float64, true),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(rows.iter().map(|r| r.year).collect::<Vec<_>>())),
        strings(|r| r.month.as_deref()),
        strings(|r| r.country.as_deref()),
        strings(|r| Some(r.location.as_str())),
        strings(|r| r.manufacturer.as_deref()),
        strings(|r| Some(r.aircraft.as_str())),
        strings(|r| Some(r.operator.as_str())),
        floats(|r| r.aboard),
        floats(|r| r.fatalities),
    ];

    RecordBatch::try_new(schema, columns).context("building record batch")
}

fn write_parquet(batch: &RecordBatch, path: &str) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("creating Parquet writer")?;
    writer.write(batch).context("writing Parquet batch")?;
    writer.close().context("closing Parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate(&mut rng);

    let csv_path = "sample_crashes.csv";
    let parquet_path = "sample_crashes.parquet";
    write_csv(&rows, csv_path)?;

    let batch = to_batch(&rows)?;
    write_parquet(&batch, parquet_path)?;

    println!("{}", pretty_format_batches(&[batch.slice(0, 5)])?);
    println!("Wrote {} crash records to {csv_path} and {parquet_path}", rows.len());
    Ok(())
}
