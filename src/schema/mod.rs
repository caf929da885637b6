// src/schema/mod.rs

use anyhow::{bail, Context, Result};
use glob::{glob_with, MatchOptions, Pattern};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

use crate::clickhouse::ClickHouse;

/// `CREATE DATABASE IF NOT EXISTS <name>`; safe to run repeatedly.
pub async fn create_database(client: &ClickHouse, name: &str) -> Result<()> {
    info!(database = %name, "creating database if not exists");
    client
        .command(&format!("CREATE DATABASE IF NOT EXISTS {}", name))
        .await
        .with_context(|| format!("creating database {}", name))?;
    Ok(())
}

/// Regular, non-hidden files directly under `dir`, in lexical order.
pub fn sql_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("SQL directory {} does not exist", dir.display());
    }
    let pattern = format!("{}/*", Pattern::escape(&dir.to_string_lossy()));
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };

    let mut files = Vec::new();
    for entry in glob_with(&pattern, options)? {
        let path = entry.with_context(|| format!("listing {}", dir.display()))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Submit every file under `dir` verbatim, one statement per file.
///
/// Statements without `IF NOT EXISTS` guards fail on a second run; that is
/// left to whoever writes the SQL.
#[instrument(level = "info", skip(client, dir), fields(dir = %dir.display()))]
pub async fn execute_sql_dir(client: &ClickHouse, dir: &Path) -> Result<Vec<PathBuf>> {
    let files = sql_files(dir)?;
    info!(count = files.len(), "executing SQL files");

    for path in &files {
        info!(file = %path.display(), "executing");
        let sql =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        client
            .command(&sql)
            .await
            .with_context(|| format!("executing {}", path.display()))?;
    }
    Ok(files)
}
