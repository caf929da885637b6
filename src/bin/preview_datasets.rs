//! Load and transform both datasets exactly as the loader would, without
//! touching the database, and print what would be inserted.

use anyhow::Result;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use dataloader::{
    process::{energy, iso, qualified_table},
    LoaderSettings,
};
use tracing_subscriber::{fmt, EnvFilter};

const PREVIEW_ROWS: usize = 10;

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let settings = LoaderSettings::default();

    let energy = energy::load_world_energy(&settings.energy_csv)?;
    print_batch(&qualified_table(&settings.database, energy::TABLE), &energy)?;

    let iso = iso::load_iso_countries(&settings.iso_csv)?;
    print_batch(&qualified_table(&settings.database, iso::TABLE), &iso)?;

    Ok(())
}

fn print_batch(table: &str, batch: &RecordBatch) -> Result<()> {
    println!("=== {} ===", table);
    println!("Rows:    {}", batch.num_rows());
    println!("Columns: {}", batch.num_columns());
    for field in batch.schema().fields() {
        let null = if field.is_nullable() { "NULL" } else { "NOT NULL" };
        println!(
            "- {:<40} {:<10} {}",
            field.name(),
            field.data_type().to_string(),
            null
        );
    }
    let head = batch.slice(0, batch.num_rows().min(PREVIEW_ROWS));
    println!("{}", pretty_format_batches(&[head])?);
    println!();
    Ok(())
}
