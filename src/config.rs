use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub public_url: String,
    pub url_secret: String,
    pub url_ttl_secs: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "File-management service API")]
pub struct Args {
    /// Host to bind to (overrides FILEHUB_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FILEHUB_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where blob payloads are stored (overrides FILEHUB_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides FILEHUB_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// External base URL stamped into upload and access URLs (overrides FILEHUB_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Secret mixed into signed access URLs (overrides FILEHUB_URL_SECRET)
    #[arg(long)]
    pub url_secret: Option<String>,

    /// Lifetime in seconds for upload tickets and access URLs (overrides FILEHUB_URL_TTL_SECS)
    #[arg(long)]
    pub url_ttl_secs: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("FILEHUB_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("FILEHUB_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing FILEHUB_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading FILEHUB_PORT"),
        };
        let env_storage =
            env::var("FILEHUB_STORAGE_DIR").unwrap_or_else(|_| "./data/blobs".into());
        let env_db = env::var("FILEHUB_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/filehub.db".into());
        let env_secret =
            env::var("FILEHUB_URL_SECRET").unwrap_or_else(|_| "filehub-dev-secret".into());
        let env_ttl = match env::var("FILEHUB_URL_TTL_SECS") {
            Ok(value) => value
                .parse::<u64>()
                .with_context(|| format!("parsing FILEHUB_URL_TTL_SECS value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3600,
            Err(err) => return Err(err).context("reading FILEHUB_URL_TTL_SECS"),
        };

        // --- Merge ---
        let port = args.port.unwrap_or(env_port);
        let public_url = args
            .public_url
            .or_else(|| env::var("FILEHUB_PUBLIC_URL").ok())
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port,
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            public_url,
            url_secret: args.url_secret.unwrap_or(env_secret),
            url_ttl_secs: args.url_ttl_secs.unwrap_or(env_ttl),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
