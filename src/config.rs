use crate::errors::ConfigError;
use clap::Parser;
use std::{env, fmt, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments; built once at startup.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreConfig,
    /// Base for direct public links, without trailing slash.
    pub public_base_url: Option<String>,
    /// `None` disables presigned links in listings.
    pub presign_expiry: Option<Duration>,
    /// `max-age` applied to thumbnail and placeholder responses.
    pub thumb_max_age: Duration,
}

/// Connection parameters for the S3-compatible endpoint.
#[derive(Clone)]
pub struct StoreConfig {
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    pub region: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Read-only web browser for an S3-compatible bucket")]
pub struct Args {
    /// Host to bind to (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Store endpoint URL (overrides R2_ENDPOINT_URL)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Bucket to browse (overrides R2_BUCKET_NAME)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Signing region (overrides R2_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Public base URL for direct links (overrides R2_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,
}

const DEFAULT_PRESIGN_SECS: u64 = 3600;
const DEFAULT_THUMB_TTL_SECS: u64 = 3600;

impl AppConfig {
    /// Parse CLI args and the process environment.
    pub fn from_env_and_args() -> Result<Self, ConfigError> {
        Self::from_sources(Args::parse(), |name| env::var(name).ok())
    }

    /// Merge CLI overrides, then `lookup` (environment), then defaults.
    pub fn from_sources<F>(args: Args, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str, cli: Option<String>| {
            cli.or_else(|| var(name)).ok_or(ConfigError::Missing(name))
        };

        let store = StoreConfig {
            endpoint: required("R2_ENDPOINT_URL", args.endpoint)?,
            access_key_id: required("ACCESS_KEY_ID", None)?,
            secret_access_key: required("SECRET_ACCESS_KEY", None)?,
            bucket: required("R2_BUCKET_NAME", args.bucket)?,
            region: args
                .region
                .or_else(|| var("R2_REGION"))
                .unwrap_or_else(|| "auto".into()),
        };

        let port = match args.port {
            Some(port) => port,
            None => parse_or("PORT", var("PORT"), 5000)?,
        };

        let presign_enabled = parse_or("R2_PRESIGN_ENABLED", var("R2_PRESIGN_ENABLED"), true)?;
        let presign_secs = parse_or(
            "R2_PRESIGN_EXPIRES",
            var("R2_PRESIGN_EXPIRES"),
            DEFAULT_PRESIGN_SECS,
        )?;
        let thumb_secs = parse_or(
            "THUMB_TTL_SECONDS",
            var("THUMB_TTL_SECONDS"),
            DEFAULT_THUMB_TTL_SECS,
        )?;
        if thumb_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "THUMB_TTL_SECONDS",
                value: "0".into(),
                reason: "must be positive".into(),
            });
        }

        Ok(Self {
            host: args
                .host
                .or_else(|| var("HOST"))
                .unwrap_or_else(|| "0.0.0.0".into()),
            port,
            store,
            public_base_url: args
                .public_url
                .or_else(|| var("R2_PUBLIC_URL"))
                .map(|url| url.trim_end_matches('/').to_string()),
            presign_expiry: (presign_enabled && presign_secs > 0)
                .then(|| Duration::from_secs(presign_secs)),
            thumb_max_age: Duration::from_secs(thumb_secs),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Public link for `key`, when a public base URL is configured.
    pub fn public_url(&self, key: &str) -> Option<String> {
        self.public_base_url
            .as_ref()
            .map(|base| format!("{base}/{key}"))
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse::<T>().map_err(|err| ConfigError::Invalid {
            name,
            reason: err.to_string(),
            value,
        }),
    }
}

// Credentials stay out of the startup log.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("store", &self.store)
            .field("public_base_url", &self.public_base_url)
            .field("presign_expiry", &self.presign_expiry)
            .field("thumb_max_age", &self.thumb_max_age)
            .finish()
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_config(bucket: &str) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        store: StoreConfig {
            endpoint: "http://127.0.0.1:9000".into(),
            access_key_id: "test".into(),
            secret_access_key: "secret".into(),
            bucket: bucket.into(),
            region: "auto".into(),
        },
        public_base_url: None,
        presign_expiry: None,
        thumb_max_age: Duration::from_secs(3600),
    }
}
