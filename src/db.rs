// src/db.rs
//
// Connection settings, the bb8 pool shared by the directory and the
// assignment store, and the `.env` loader used by the CLI.

use anyhow::{Context, Result};
use bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use log::{debug, info, warn};
use std::fmt;
use std::time::Duration;
use tokio_postgres::{Config, NoTls};

use crate::config::parse_or;

pub type PgPool = Pool<PostgresConnectionManager<NoTls>>;

const APPLICATION_NAME: &str = "responder_dispatch";
const POOL_MAX_SIZE: u32 = 8;

/// Where the portal database lives, read from `POSTGRES_*` variables
#[derive(Clone, PartialEq)]
pub struct DbSettings {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl Default for DbSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            dbname: "disaster_portal".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
        }
    }
}

// Password stays out of logs
impl fmt::Display for DbSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}/{}",
            self.user, self.host, self.port, self.dbname
        )
    }
}

impl fmt::Debug for DbSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"[hidden]")
            .finish()
    }
}

impl DbSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            host: lookup("POSTGRES_HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "POSTGRES_PORT", defaults.port),
            dbname: lookup("POSTGRES_DB").unwrap_or(defaults.dbname),
            user: lookup("POSTGRES_USER").unwrap_or(defaults.user),
            password: lookup("POSTGRES_PASSWORD").unwrap_or(defaults.password),
        }
    }

    pub fn to_pg_config(&self) -> Config {
        let mut config = Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .user(&self.user)
            .password(&self.password)
            .application_name(APPLICATION_NAME)
            .connect_timeout(Duration::from_secs(10));
        config
    }
}

/// Builds the pool and checks one connection before handing it out
pub async fn connect(settings: &DbSettings) -> Result<PgPool> {
    info!("Connecting to {}", settings);
    let manager = PostgresConnectionManager::new(settings.to_pg_config(), NoTls);

    let pool = Pool::builder()
        .max_size(POOL_MAX_SIZE)
        .min_idle(Some(1))
        .idle_timeout(Some(Duration::from_secs(180)))
        .connection_timeout(Duration::from_secs(15))
        .build(manager)
        .await
        .with_context(|| format!("Failed to build connection pool for {}", settings))?;

    pool.get()
        .await
        .context("Failed to get a connection from the new pool")?
        .query_one("SELECT 1", &[])
        .await
        .context("Connection check 'SELECT 1' failed")?;
    info!("Pool ready (max {} connections)", POOL_MAX_SIZE);
    Ok(pool)
}

/// Applies `KEY=value` lines from an env file, leaving variables that are
/// already set untouched. Returns how many variables were set, or `None`
/// when the file cannot be opened.
///
/// Must run before any other thread exists, since it mutates the process
/// environment.
pub fn load_env_file(path: &str) -> Result<Option<usize>> {
    use std::fs::File;
    use std::io::{BufRead, BufReader};

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("Skipping env file '{}': {}", path, e);
            return Ok(None);
        }
    };

    let mut applied = 0;
    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("Failed to read line from {}", path))?;
        let Some((key, value)) = parse_env_line(&line) else {
            continue;
        };
        if std::env::var_os(key).is_some() {
            continue;
        }
        // SAFETY: called from `main` before the tokio runtime is built, so
        // no other thread reads or writes the environment concurrently.
        unsafe { std::env::set_var(key, value) };
        debug!("Set {} from {}", key, path);
        applied += 1;
    }
    Ok(Some(applied))
}

/// Loads the first env file that exists out of `paths`
pub fn load_first_env_file(paths: &[&str]) -> Option<String> {
    for path in paths {
        match load_env_file(path) {
            Ok(Some(applied)) => {
                info!("Loaded {} variable(s) from {}", applied, path);
                return Some(path.to_string());
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to load environment from {}: {:#}", path, e),
        }
    }
    None
}

fn parse_env_line(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim().trim_start_matches("export ").trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim().trim_matches('"')))
}
