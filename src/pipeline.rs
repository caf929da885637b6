// src/pipeline.rs

use anyhow::Result;
use std::time::Instant;
use tracing::info;

use crate::{
    clickhouse::ClickHouse,
    config::{self, LoaderSettings},
    process, schema,
};

/// Rows written by one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub energy_rows: usize,
    pub iso_rows: usize,
}

/// The whole load, top to bottom. The first failing step aborts the run;
/// nothing already written is rolled back.
pub async fn run(settings: &LoaderSettings) -> Result<LoadSummary> {
    let start = Instant::now();
    info!("starting data loading process");

    // ─── 1) credentials ──────────────────────────────────────────────
    let creds = config::load_credentials(&settings.compose_path)?;

    // ─── 2) connect ──────────────────────────────────────────────────
    let client = ClickHouse::connect(settings.clickhouse_url.clone(), creds).await?;

    // ─── 3) schema ───────────────────────────────────────────────────
    schema::create_database(&client, &settings.database).await?;
    schema::execute_sql_dir(&client, &settings.sql_dir).await?;

    // ─── 4) datasets ─────────────────────────────────────────────────
    let db = settings.database.as_str();
    let energy_rows = process::load_world_energy_data(&client, db, &settings.energy_csv).await?;
    let iso_rows = process::load_iso_country_data(&client, db, &settings.iso_csv).await?;

    info!(elapsed = ?start.elapsed(), energy_rows, iso_rows, "all done");
    Ok(LoadSummary {
        energy_rows,
        iso_rows,
    })
}
