// src/process/read.rs

use anyhow::{anyhow, Context, Result};
use arrow::array::Array;
use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use regex::Regex;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

const BATCH_SIZE: usize = 64 * 1024;

/// Tokens a pandas-style reader treats as missing by default.
const MISSING_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
    "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Whole-field match against the usual missing-value spellings.
pub fn missing_value_regex() -> Result<Regex> {
    let alternatives: Vec<String> = MISSING_TOKENS.iter().map(|t| regex::escape(t)).collect();
    Regex::new(&format!("^(?:{})$", alternatives.join("|")))
        .context("building missing-value regex")
}

/// Column names from the header line of the CSV at `path`.
pub fn read_header(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let (schema, _) = Format::default()
        .with_header(true)
        .infer_schema(BufReader::new(file), Some(0))
        .with_context(|| format!("reading header of {}", path.display()))?;
    Ok(schema.fields().iter().map(|f| f.name().to_string()).collect())
}

/// Read the whole CSV at `path` with an explicit `schema` into one batch.
///
/// Fields matching `nulls` become nulls (only empty fields when `None`); any
/// other value that does not parse as its declared type fails the read.
pub fn read_csv(path: &Path, schema: SchemaRef, nulls: Option<Regex>) -> Result<RecordBatch> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut builder = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(BATCH_SIZE);
    if let Some(re) = nulls {
        builder = builder.with_null_regex(re);
    }
    let reader = builder
        .build(BufReader::new(file))
        .with_context(|| format!("creating CSV reader for {}", path.display()))?;

    let batches = reader
        .collect::<std::result::Result<Vec<_>, ArrowError>>()
        .with_context(|| format!("parsing {}", path.display()))?;
    debug!(path = %path.display(), batches = batches.len(), "csv read");

    concat_batches(&schema, &batches).context("concatenating CSV batches")
}

/// Typed view of the column called `name`.
pub fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| anyhow!("missing column {:?}", name))?;
    col.as_any().downcast_ref::<T>().ok_or_else(|| {
        anyhow!(
            "column {:?} has unexpected type {:?}",
            name,
            col.data_type()
        )
    })
}
