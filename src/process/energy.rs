// src/process/energy.rs

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::compute::filter_record_batch;
use arrow::compute::kernels::cmp::gt;
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

use super::convert::{fill_empty, float_to_u64, year_to_date};
use super::read::{column, missing_value_regex, read_csv, read_header};

/// Destination table for the world energy consumption dataset.
pub const TABLE: &str = "world_energy_consumption";

/// Only rows strictly after this year are kept.
pub const FIRST_YEAR_EXCLUSIVE: i64 = 1980;

const YEAR: &str = "year";
const POPULATION: &str = "population";
const ISO_CODE: &str = "iso_code";
const COUNTRY: &str = "country";
const REQUIRED: [&str; 4] = [YEAR, POPULATION, ISO_CODE, COUNTRY];

/// Schema the CSV is parsed with: the four known columns get their source
/// types, every other column is a numeric passthrough.
pub fn read_schema(headers: &[String]) -> Result<SchemaRef> {
    for req in REQUIRED {
        if !headers.iter().any(|h| h == req) {
            bail!("energy dataset is missing required column {:?}", req);
        }
    }
    let fields: Vec<Field> = headers
        .iter()
        .map(|name| {
            let dt = match name.as_str() {
                YEAR => DataType::Int64,
                ISO_CODE | COUNTRY => DataType::Utf8,
                _ => DataType::Float64,
            };
            Field::new(name, dt, true)
        })
        .collect();
    Ok(Arc::new(ArrowSchema::new(fields)))
}

/// Keep rows after 1980, then turn `year` into a date, cast `population`
/// to UInt64 and make `iso_code`/`country` non-null strings.
pub fn transform(raw: &RecordBatch) -> Result<RecordBatch> {
    let years = column::<Int64Array>(raw, YEAR)?;
    let keep = gt(years, &Int64Array::new_scalar(FIRST_YEAR_EXCLUSIVE))?;
    let kept = filter_record_batch(raw, &keep)?;

    let mut fields = Vec::with_capacity(kept.num_columns());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(kept.num_columns());
    for (field, col) in kept.schema().fields().iter().zip(kept.columns()) {
        let name = field.name().as_str();
        match name {
            YEAR => {
                let dates = year_to_date(column::<Int64Array>(&kept, YEAR)?)?;
                fields.push(Field::new(name, DataType::Date32, false));
                columns.push(Arc::new(dates));
            }
            POPULATION => {
                let pop = float_to_u64(column::<Float64Array>(&kept, POPULATION)?)
                    .context("casting population")?;
                fields.push(Field::new(name, DataType::UInt64, true));
                columns.push(Arc::new(pop));
            }
            ISO_CODE | COUNTRY => {
                let text = fill_empty(column::<StringArray>(&kept, name)?);
                fields.push(Field::new(name, DataType::Utf8, false));
                columns.push(Arc::new(text));
            }
            _ => {
                fields.push(field.as_ref().clone());
                columns.push(col.clone());
            }
        }
    }

    RecordBatch::try_new(Arc::new(ArrowSchema::new(fields)), columns)
        .context("building energy batch")
}

/// Read and transform the world energy CSV at `path`.
#[instrument(level = "info", skip(path), fields(path = %path.display()))]
pub fn load_world_energy(path: &Path) -> Result<RecordBatch> {
    let headers = read_header(path)?;
    let schema = read_schema(&headers)?;
    let raw = read_csv(path, schema, Some(missing_value_regex()?))?;
    let batch = transform(&raw).with_context(|| format!("transforming {}", path.display()))?;

    let columns: Vec<&str> = batch
        .schema_ref()
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect();
    info!(columns = ?columns, "columns");
    info!(
        rows = batch.num_rows(),
        cols = batch.num_columns(),
        dropped = raw.num_rows() - batch.num_rows(),
        "shape"
    );
    Ok(batch)
}
