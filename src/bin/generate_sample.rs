use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use parquet::arrow::ArrowWriter;

const WEEKS: i64 = 6;
const ROWS_PER_WEEK: usize = 120;

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

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// One raw row, spelled the way the source exports spell things.
struct Row {
    fecha: String,
    entidad: String,
    sexo: String,
    puesto: String,
    minutos_app: i64,
    total_asist: i64,
    total_encuestas: i64,
}

fn generate(rng: &mut SimpleRng, start: NaiveDate, weeks: i64, per_week: usize) -> Vec<Row> {
    // Includes spelling variants and regions outside the default allow-list.
    let regions = [
        "Sonora",
        "Oaxaca",
        "Querétaro",
        "Queretaro",
        "Nuevo León",
        "Campeche",
        "Coahuila",
        "Ciudad De México",
        "Jalisco",
    ];
    let sexes = ["Mujer", "femenino", "Hombre", "Masculino", "Otro", "Prefiero No Contestar"];
    let puestos = ["Docente", "Directivo", "Administrativo"];

    let mut rows = Vec::new();
    for week in 0..weeks {
        let fecha = (start + Duration::weeks(week)).format("%Y-%m-%d").to_string();
        for _ in 0..per_week {
            // Engagement grows over the weeks.
            let engaged = rng.next_f64() < 0.3 + 0.1 * week as f64;
            let minutos_app = if engaged {
                (rng.next_f64() * 180.0) as i64
            } else {
                (rng.next_f64() * 15.0) as i64
            };
            let total_asist = if engaged {
                1 + (rng.next_u64() % 6) as i64
            } else {
                (rng.next_u64() % 2) as i64
            };
            rows.push(Row {
                fecha: fecha.clone(),
                entidad: rng.pick(&regions).to_string(),
                sexo: rng.pick(&sexes).to_string(),
                puesto: rng.pick(&puestos).to_string(),
                minutos_app,
                total_asist,
                total_encuestas: (rng.next_u64() % 4) as i64,
            });
        }
    }
    rows
}

fn write_csv(path: &str, rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    writer.write_record([
        "Fecha",
        "Entidad",
        "Sexo",
        "Puesto",
        "minutos_app",
        "total_asist",
        "total_encuestas",
    ])?;
    for r in rows {
        writer.write_record([
            r.fecha.clone(),
            r.entidad.clone(),
            r.sexo.clone(),
            r.puesto.clone(),
            r.minutos_app.to_string(),
            r.total_asist.to_string(),
            r.total_encuestas.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &str, rows: &[Row]) -> Result<()> {
    let fecha: Vec<&str> = rows.iter().map(|r| r.fecha.as_str()).collect();
    let entidad: Vec<&str> = rows.iter().map(|r| r.entidad.as_str()).collect();
    let sexo: Vec<&str> = rows.iter().map(|r| r.sexo.as_str()).collect();
    let puesto: Vec<&str> = rows.iter().map(|r| r.puesto.as_str()).collect();
    let minutos: Vec<i64> = rows.iter().map(|r| r.minutos_app).collect();
    let asist: Vec<i64> = rows.iter().map(|r| r.total_asist).collect();
    let encuestas: Vec<i64> = rows.iter().map(|r| r.total_encuestas).collect();

    let schema = Arc::new(Schema::new(vec![
        Field::new("Fecha", DataType::Utf8, false),
        Field::new("Entidad", DataType::Utf8, false),
        Field::new("Sexo", DataType::Utf8, false),
        Field::new("Puesto", DataType::Utf8, false),
        Field::new("minutos_app", DataType::Int64, false),
        Field::new("total_asist", DataType::Int64, false),
        Field::new("total_encuestas", DataType::Int64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(fecha)),
            Arc::new(StringArray::from(entidad)),
            Arc::new(StringArray::from(sexo)),
            Arc::new(StringArray::from(puesto)),
            Arc::new(Int64Array::from(minutos)),
            Arc::new(Int64Array::from(asist)),
            Arc::new(Int64Array::from(encuestas)),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let start = NaiveDate::from_ymd_opt(2024, 1, 8).context("invalid start date")?;
    let mut rng = SimpleRng::new(42);
    let rows = generate(&mut rng, start, WEEKS, ROWS_PER_WEEK);

    write_csv("sample_participation.csv", &rows)?;
    write_parquet("sample_participation.parquet", &rows)?;

    println!(
        "Wrote {} participation rows ({} weeks) to sample_participation.csv and .parquet",
        rows.len(),
        WEEKS
    );
    Ok(())
}
