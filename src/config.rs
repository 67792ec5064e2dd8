use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr};

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub admin_password: String,
    pub max_upload_bytes: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("storage_dir", &self.storage_dir)
            .field("database_url", &self.database_url)
            .field("admin_password", &"<redacted>")
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Photo gallery API")]
pub struct Args {
    /// Host to bind to (overrides GALLERY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GALLERY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where image blobs are stored (overrides GALLERY_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides GALLERY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Largest accepted upload body in bytes (overrides GALLERY_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Apply the schema and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("GALLERY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("GALLERY_PORT", 3000u16)?;
        let env_storage =
            env::var("GALLERY_STORAGE_DIR").unwrap_or_else(|_| "./data/blobs".into());
        let env_db = env::var("GALLERY_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/gallery.db".into());
        let admin_password = env::var("GALLERY_ADMIN_PASSWORD")
            .unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.into());
        let env_max_upload = parse_env("GALLERY_MAX_UPLOAD_BYTES", 25 * 1024 * 1024usize)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            admin_password,
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
