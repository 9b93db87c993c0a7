use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr};

use crate::services::library::LibrarySettings;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub recent_limit: usize,
    pub max_description_len: usize,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Photo note capture and search service")]
pub struct Args {
    /// Host to bind to (overrides NOTE_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides NOTE_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides NOTE_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Notes shown in the recent list (overrides NOTE_STORE_RECENT_LIMIT)
    #[arg(long)]
    pub recent_limit: Option<usize>,

    /// Maximum description length in characters (overrides NOTE_STORE_MAX_DESCRIPTION_LEN)
    #[arg(long)]
    pub max_description_len: Option<usize>,

    /// Maximum upload body size in bytes (overrides NOTE_STORE_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Open the store, create the schema and exit
    #[arg(long)]
    pub init_only: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and init-only flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        Self::from_parts(Args::parse(), |key| env::var(key))
    }

    /// Merge parsed `args` over values looked up through `var`, then defaults.
    pub fn from_parts<F>(args: Args, var: F) -> Result<(Self, bool)>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let env_host = var("NOTE_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_var(&var, "NOTE_STORE_PORT", 3000)?;
        let env_db = var("NOTE_STORE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/notes.db".into());
        let env_recent = parse_var(&var, "NOTE_STORE_RECENT_LIMIT", 10)?;
        let env_desc_len = parse_var(&var, "NOTE_STORE_MAX_DESCRIPTION_LEN", 120)?;
        let env_upload = parse_var(&var, "NOTE_STORE_MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?;

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            recent_limit: args.recent_limit.unwrap_or(env_recent),
            max_description_len: args.max_description_len.unwrap_or(env_desc_len),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_upload),
        };

        Ok((cfg, args.init_only))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn library_settings(&self) -> LibrarySettings {
        LibrarySettings {
            recent_limit: self.recent_limit,
            max_description_len: self.max_description_len,
        }
    }
}

fn parse_var<F, T>(var: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Result<String, env::VarError>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}
