// src/process/iso.rs

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema, SchemaRef};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

use super::convert::fill_empty;
use super::read::{column, read_csv, read_header};

/// Destination table for the ISO 3166 country codes.
pub const TABLE: &str = "iso_country";

/// (source column, output column), in output order.
pub const COLUMN_MAP: [(&str, &str); 3] =
    [("name", "name"), ("alpha-2", "iso_2"), ("alpha-3", "iso_3")];

const PREVIEW_ROWS: usize = 5;

/// Every source column is read as text; only empty fields come back null.
pub fn read_schema(headers: &[String]) -> Result<SchemaRef> {
    for (src, _) in COLUMN_MAP {
        if !headers.iter().any(|h| h == src) {
            bail!("ISO dataset is missing required column {:?}", src);
        }
    }
    let fields: Vec<Field> = headers
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    Ok(Arc::new(ArrowSchema::new(fields)))
}

/// Project to `name, alpha-2, alpha-3`, rename to `name, iso_2, iso_3` and
/// turn empty values into empty strings.
pub fn transform(raw: &RecordBatch) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(COLUMN_MAP.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(COLUMN_MAP.len());
    for (src, dst) in COLUMN_MAP {
        let values = fill_empty(column::<StringArray>(raw, src)?);
        fields.push(Field::new(dst, DataType::Utf8, false));
        columns.push(Arc::new(values));
    }
    RecordBatch::try_new(Arc::new(ArrowSchema::new(fields)), columns)
        .context("building ISO country batch")
}

/// Read and transform the ISO country CSV at `path`.
#[instrument(level = "info", skip(path), fields(path = %path.display()))]
pub fn load_iso_countries(path: &Path) -> Result<RecordBatch> {
    let headers = read_header(path)?;
    let schema = read_schema(&headers)?;
    let raw = read_csv(path, schema, None)?;
    let batch = transform(&raw).with_context(|| format!("transforming {}", path.display()))?;

    let head = batch.slice(0, batch.num_rows().min(PREVIEW_ROWS));
    info!("head:\n{}", pretty_format_batches(&[head])?);
    let types: Vec<String> = batch
        .schema_ref()
        .fields()
        .iter()
        .map(|f| format!("{}: {}", f.name(), f.data_type()))
        .collect();
    info!(types = ?types, rows = batch.num_rows(), "data types");
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,dataloader=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    const SAMPLE: &str = "\
name,alpha-2,alpha-3,country-code,iso_3166-2,region,sub-region
Afghanistan,AF,AFG,004,ISO 3166-2:AF,Asia,Southern Asia
\"Korea, Republic of\",KR,KOR,410,ISO 3166-2:KR,Asia,Eastern Asia
Namibia,NA,NAM,516,ISO 3166-2:NA,Africa,Sub-Saharan Africa
Antarctica,AQ,ATA,010,ISO 3166-2:AQ,,
Nowhere,,,999,,,
";

    fn sample_file() -> Result<NamedTempFile> {
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(SAMPLE.as_bytes())?;
        Ok(tmp)
    }

    #[test]
    fn projects_and_renames_three_columns() -> Result<()> {
        init_test_logging();
        let tmp = sample_file()?;
        let batch = load_iso_countries(tmp.path())?;

        let names: Vec<String> = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, vec!["name", "iso_2", "iso_3"]);
        assert_eq!(batch.num_rows(), 5);
        Ok(())
    }

    #[test]
    fn keeps_na_and_quoted_names() -> Result<()> {
        init_test_logging();
        let tmp = sample_file()?;
        let batch = load_iso_countries(tmp.path())?;

        let name = column::<StringArray>(&batch, "name")?;
        let iso2 = column::<StringArray>(&batch, "iso_2")?;
        assert_eq!(name.value(1), "Korea, Republic of");
        assert_eq!(name.value(2), "Namibia");
        assert_eq!(iso2.value(2), "NA");
        Ok(())
    }

    #[test]
    fn empty_values_become_empty_strings() -> Result<()> {
        init_test_logging();
        let tmp = sample_file()?;
        let batch = load_iso_countries(tmp.path())?;

        for col in batch.columns() {
            assert_eq!(col.null_count(), 0);
        }
        let iso3 = column::<StringArray>(&batch, "iso_3")?;
        assert_eq!(iso3.value(4), "");
        Ok(())
    }

    #[test]
    fn missing_source_column_fails() -> Result<()> {
        init_test_logging();
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(b"name,alpha-2\nAfghanistan,AF\n")?;
        let err = load_iso_countries(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("alpha-3"));
        Ok(())
    }
}
