use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::Table;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a numeric table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – numeric (Float64/Float32/Int64/Int32) columns
/// * `.json`    – `[{ "u": 19.2, "g": 18.1, ... }, ...]` or `{ "u": [...], ... }`
/// * `.csv`     – header row; numeric columns, blank cells become NaN
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::debug!("Loaded {} from {}", table, path.display());
    Ok(table)
}

/// Parse CSV text already in memory (used for the embedded datasets).
pub fn parse_csv_str(text: &str) -> Result<Table> {
    read_csv(csv::Reader::from_reader(text.as_bytes()))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Two layouts are accepted: records (the default
/// `df.to_json(orient='records')`)
///
/// ```json
/// [ { "x": -301.2, "y": 12.5 }, { "x": -299.0, "y": 14.1 } ]
/// ```
///
/// or columns (`orient='list'`)
///
/// ```json
/// { "x": [-301.2, -299.0], "y": [12.5, 14.1] }
/// ```
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let mut table = Table::new();
    match &root {
        JsonValue::Array(records) => {
            let Some(first) = records.first() else {
                return Ok(table);
            };
            let names: Vec<String> = first
                .as_object()
                .context("Row 0 is not a JSON object")?
                .iter()
                .filter(|(_, v)| v.is_number())
                .map(|(k, _)| k.clone())
                .collect();

            for name in names {
                let column = records
                    .iter()
                    .enumerate()
                    .map(|(i, rec)| {
                        let obj = rec
                            .as_object()
                            .with_context(|| format!("Row {i} is not a JSON object"))?;
                        Ok(json_number(obj.get(&name)))
                    })
                    .collect::<Result<Vec<f64>>>()?;
                table.push_column(name, column)?;
            }
        }
        JsonValue::Object(columns) => {
            for (name, values) in columns {
                let Some(values) = values.as_array() else {
                    continue;
                };
                if !values.iter().all(|v| v.is_number() || v.is_null()) {
                    log::debug!("Skipping non-numeric JSON column '{name}'");
                    continue;
                }
                let column = values.iter().map(|v| json_number(Some(v))).collect();
                table.push_column(name.clone(), column)?;
            }
        }
        _ => bail!("Expected a top-level JSON array or object"),
    }
    Ok(table)
}

fn json_number(val: Option<&JsonValue>) -> f64 {
    val.and_then(|v| v.as_f64()).unwrap_or(f64::NAN)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one observation per row.
/// A column is kept if every non-blank cell parses as a number.
fn load_csv(path: &Path) -> Result<Table> {
    let reader = csv::Reader::from_path(path).context("opening CSV")?;
    read_csv(reader)
}

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Table> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut cells: Vec<Vec<Option<f64>>> = vec![Vec::new(); headers.len()];
    let mut numeric = vec![true; headers.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for (col_idx, column) in cells.iter_mut().enumerate() {
            let raw = record.get(col_idx).unwrap_or("").trim();
            if raw.is_empty() {
                column.push(None);
                continue;
            }
            match raw.parse::<f64>() {
                Ok(v) => column.push(Some(v)),
                Err(_) => {
                    numeric[col_idx] = false;
                    column.push(None);
                }
            }
        }
    }

    let mut table = Table::new();
    for ((name, column), is_numeric) in headers.into_iter().zip(cells).zip(numeric) {
        if !is_numeric {
            log::debug!("Skipping non-numeric CSV column '{name}'");
            continue;
        }
        table.push_column(name, column.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())?;
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of flat numeric columns.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Non-numeric columns are skipped.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut names: Vec<String> = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        if names.is_empty() {
            for field in schema.fields() {
                if is_numeric(field.data_type()) {
                    names.push(field.name().clone());
                    columns.push(Vec::new());
                }
            }
        }

        for (name, column) in names.iter().zip(columns.iter_mut()) {
            let idx = schema
                .index_of(name)
                .map_err(|_| anyhow::anyhow!("Parquet batch missing '{name}' column"))?;
            extend_f64(column, batch.column(idx))
                .with_context(|| format!("reading column '{name}'"))?;
        }
    }

    let mut table = Table::new();
    for (name, column) in names.into_iter().zip(columns) {
        table.push_column(name, column)?;
    }
    Ok(table)
}

// -- Parquet / Arrow helpers --

fn is_numeric(dt: &DataType) -> bool {
    matches!(
        dt,
        DataType::Float64 | DataType::Float32 | DataType::Int64 | DataType::Int32
    )
}

/// Append a primitive numeric Arrow column to `out`, nulls as NaN.
fn extend_f64(out: &mut Vec<f64>, col: &Arc<dyn Array>) -> Result<()> {
    let any = col.as_any();
    if let Some(arr) = any.downcast_ref::<Float64Array>() {
        out.extend(arr.iter().map(|v| v.unwrap_or(f64::NAN)));
    } else if let Some(arr) = any.downcast_ref::<Float32Array>() {
        out.extend(arr.iter().map(|v| v.map_or(f64::NAN, f64::from)));
    } else if let Some(arr) = any.downcast_ref::<Int64Array>() {
        out.extend(arr.iter().map(|v| v.map_or(f64::NAN, |i| i as f64)));
    } else if let Some(arr) = any.downcast_ref::<Int32Array>() {
        out.extend(arr.iter().map(|v| v.map_or(f64::NAN, f64::from)));
    } else {
        bail!("unsupported column type {:?}", col.data_type());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_skips_text_columns_and_keeps_blanks_as_nan() {
        let table = parse_csv_str("u,name,g\n19.5,a,18.0\n,b,17.5\n").unwrap();
        assert_eq!(table.column_names(), &["u".to_string(), "g".to_string()]);
        assert!(table.column("u").unwrap()[1].is_nan());
        assert_eq!(table.column("g").unwrap(), &[18.0, 17.5]);
    }

    #[test]
    fn json_records_and_columns() {
        let dir = tempfile::tempdir().unwrap();

        let records = dir.path().join("records.json");
        std::fs::File::create(&records)
            .unwrap()
            .write_all(br#"[{"x": 1.0, "y": 2}, {"x": 3.0, "y": 4}]"#)
            .unwrap();
        let t = load_file(&records).unwrap();
        assert_eq!(t.column("y").unwrap(), &[2.0, 4.0]);

        let columns = dir.path().join("columns.json");
        std::fs::write(&columns, r#"{"x": [1.0, null], "label": ["a", "b"]}"#).unwrap();
        let t = load_file(&columns).unwrap();
        assert_eq!(t.column_names(), &["x".to_string()]);
        assert!(t.column("x").unwrap()[1].is_nan());
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let err = load_file(Path::new("spectrum.fits")).unwrap_err();
        assert!(format!("{err:#}").contains(".fits"));
    }
}
