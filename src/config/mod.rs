// src/config/mod.rs

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::{collections::BTreeMap, fmt, fs, path::Path, path::PathBuf};
use tracing::{debug, info};
use url::Url;

/// Name of the compose service whose environment carries the credentials.
const CLICKHOUSE_SERVICE: &str = "clickhouse";
const USER_KEY: &str = "CLICKHOUSE_USER";
const PASSWORD_KEY: &str = "CLICKHOUSE_PASSWORD";

/// Every fixed location the loader touches. There are no flags or
/// environment overrides; `Default` is what the binary runs with.
#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub compose_path: PathBuf,
    pub clickhouse_url: Url,
    pub database: String,
    pub sql_dir: PathBuf,
    pub energy_csv: PathBuf,
    pub iso_csv: PathBuf,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            compose_path: PathBuf::from("docker-compose.yml"),
            clickhouse_url: Url::parse("http://localhost:8123").expect("static URL is valid"),
            database: "datasets".to_string(),
            sql_dir: PathBuf::from("sql"),
            energy_csv: PathBuf::from("datasets/world_energy_consumption.csv"),
            iso_csv: PathBuf::from("datasets/ISO-3166-Countries-with-Regional-Codes.csv"),
        }
    }
}

/// ClickHouse login pulled out of the deployment descriptor.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ComposeFile {
    #[serde(default)]
    services: BTreeMap<String, ComposeService>,
}

#[derive(Debug, Deserialize)]
struct ComposeService {
    #[serde(default)]
    environment: Option<Environment>,
}

/// docker-compose accepts both `KEY: value` and `- KEY=value` forms.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Environment {
    Map(BTreeMap<String, serde_yaml::Value>),
    List(Vec<String>),
}

impl Environment {
    fn get(&self, key: &str) -> Option<String> {
        match self {
            Environment::Map(map) => match map.get(key)? {
                serde_yaml::Value::String(s) => Some(s.clone()),
                serde_yaml::Value::Number(n) => Some(n.to_string()),
                serde_yaml::Value::Bool(b) => Some(b.to_string()),
                _ => None,
            },
            Environment::List(entries) => entries.iter().find_map(|entry| {
                let (k, v) = entry.split_once('=')?;
                (k.trim() == key).then(|| v.to_string())
            }),
        }
    }
}

impl Credentials {
    /// Parse a compose document and pull
    /// `services.clickhouse.environment.{CLICKHOUSE_USER,CLICKHOUSE_PASSWORD}`.
    pub fn from_compose_str(text: &str) -> Result<Self> {
        let compose: ComposeFile =
            serde_yaml::from_str(text).context("parsing deployment descriptor")?;

        let service = compose
            .services
            .get(CLICKHOUSE_SERVICE)
            .ok_or_else(|| anyhow!("services.{} is not defined", CLICKHOUSE_SERVICE))?;
        let env = service.environment.as_ref().ok_or_else(|| {
            anyhow!("services.{}.environment is not defined", CLICKHOUSE_SERVICE)
        })?;

        let lookup = |key: &str| {
            env.get(key).ok_or_else(|| {
                anyhow!(
                    "services.{}.environment.{} is not set",
                    CLICKHOUSE_SERVICE,
                    key
                )
            })
        };

        Ok(Self {
            user: lookup(USER_KEY)?,
            password: lookup(PASSWORD_KEY)?,
        })
    }
}

/// Read the deployment descriptor at `path` and extract the ClickHouse login.
pub fn load_credentials<P: AsRef<Path>>(path: P) -> Result<Credentials> {
    let path = path.as_ref();
    info!(path = %path.display(), "loading configuration");
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let creds = Credentials::from_compose_str(&text)
        .with_context(|| format!("extracting credentials from {}", path.display()))?;
    debug!(user = %creds.user, "credentials loaded");
    Ok(creds)
}
