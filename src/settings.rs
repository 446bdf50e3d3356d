use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;
use config::{builder::DefaultState, ConfigBuilder, ConfigError, File};
use directories::ProjectDirs;
use serde::{Deserialize, Deserializer};

const DEFAULT_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_DB_DIR: &str = "directory-db";
const DEFAULT_SYNC_PERIOD_SECS: u64 = 300;
const DEFAULT_SYNC_RETRY_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// Path to the local configuration TOML file.
    #[arg(short, value_name = "CONFIG_PATH")]
    pub config: PathBuf,

    /// Path to the certificate file. Serves HTTPS together with `--key`.
    #[arg(long, value_name = "CERT_PATH", requires = "key")]
    pub cert: Option<PathBuf>,

    /// Path to the key file.
    #[arg(long, value_name = "KEY_PATH", requires = "cert")]
    pub key: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct Web {
    #[serde(deserialize_with = "deserialize_socket_addr")]
    pub address: SocketAddr,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

/// The backend whose `GET /businesses` listing is mirrored locally.
#[derive(Debug, Deserialize)]
pub struct Upstream {
    pub url: String,
    /// Seconds between two synchronizations.
    #[serde(default = "default_period", deserialize_with = "deserialize_secs")]
    pub period: Duration,
    /// Seconds to wait before retrying a failed synchronization.
    #[serde(default = "default_retry", deserialize_with = "deserialize_secs")]
    pub retry: Duration,
}

#[derive(Debug, Default, Deserialize)]
pub struct DirectorySettings {
    /// A file in the backend's listing format loaded at startup.
    pub seed: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub web: Web,
    pub database: DatabaseSettings,
    pub upstream: Option<Upstream>,
    #[serde(default)]
    pub directory: DirectorySettings,
}

impl Settings {
    /// Load settings from the given TOML file, with sane defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::<DefaultState>::default()
            .set_default("web.address", DEFAULT_ADDR)?
            .set_default("database.path", default_db_path())?;

        let cfg = builder.add_source(File::from(path)).build()?;

        cfg.try_deserialize()
    }
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", env!("CARGO_PKG_NAME")).map_or_else(
        || DEFAULT_DB_DIR.to_string(),
        |dirs| dirs.data_dir().join("db").to_string_lossy().into_owned(),
    )
}

fn default_period() -> Duration {
    Duration::from_secs(DEFAULT_SYNC_PERIOD_SECS)
}

fn default_retry() -> Duration {
    Duration::from_secs(DEFAULT_SYNC_RETRY_SECS)
}

fn deserialize_socket_addr<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

fn deserialize_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    if secs == 0 {
        return Err(serde::de::Error::custom("interval must be at least one second"));
    }
    Ok(Duration::from_secs(secs))
}
