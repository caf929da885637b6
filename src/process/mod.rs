// src/process/mod.rs

pub mod convert;
pub mod energy;
pub mod iso;
pub mod read;

use anyhow::Result;
use std::path::Path;
use tracing::{info, instrument};

use crate::clickhouse::ClickHouse;

/// `database.table`, the name inserts are addressed to.
pub fn qualified_table(database: &str, table: &str) -> String {
    format!("{}.{}", database, table)
}

/// Load the world energy CSV and insert it in one call. Returns the row count.
#[instrument(level = "info", skip(client, path), fields(path = %path.display()))]
pub async fn load_world_energy_data(
    client: &ClickHouse,
    database: &str,
    path: &Path,
) -> Result<usize> {
    info!("loading world energy consumption data");
    let batch = energy::load_world_energy(path)?;
    client
        .insert_batch(&qualified_table(database, energy::TABLE), &batch)
        .await?;
    info!(rows = batch.num_rows(), "world energy data inserted");
    Ok(batch.num_rows())
}

/// Load the ISO 3166 country CSV and insert it in one call. Returns the row count.
#[instrument(level = "info", skip(client, path), fields(path = %path.display()))]
pub async fn load_iso_country_data(
    client: &ClickHouse,
    database: &str,
    path: &Path,
) -> Result<usize> {
    info!("loading ISO country codes data");
    let batch = iso::load_iso_countries(path)?;
    client
        .insert_batch(&qualified_table(database, iso::TABLE), &batch)
        .await?;
    info!(rows = batch.num_rows(), "ISO country data inserted");
    Ok(batch.num_rows())
}
