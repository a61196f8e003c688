use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, path::PathBuf};
use tracing::warn;

/// Which object-store backend serves the bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    S3,
    Local,
}

/// Connection settings for an S3-compatible endpoint.
#[derive(Clone)]
pub struct S3Settings {
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl std::fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Settings")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id.as_ref().map(|_| "***"))
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments; built once in `main`
/// and handed to each component.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
    pub storage_dir: PathBuf,
    pub s3: S3Settings,
    pub bucket: String,
    /// Public URL prefix for object keys in listing responses.
    pub image_base_url: String,
    /// Directory (key prefix) holding the gallery's source images.
    pub image_dir: String,
    /// JPEG quality for thumbnails; `None` means the encoder default.
    pub compression_quality: Option<i64>,
    pub static_dir: PathBuf,
    pub max_concurrency: usize,
    pub store_retries: u32,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Image gallery with lazily cached thumbnails")]
pub struct Args {
    /// Host to bind to (overrides GALLERY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GALLERY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Object-store backend (overrides GALLERY_STORE)
    #[arg(long, value_enum)]
    pub store: Option<StoreBackend>,

    /// Root directory for the local backend (overrides GALLERY_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,

    /// S3-compatible endpoint URL (overrides S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// S3 region (overrides S3_REGION)
    #[arg(long)]
    pub s3_region: Option<String>,

    /// Bucket holding originals and thumbnails (overrides BUCKET_NAME)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Public base URL for image links (overrides IMAGE_BASE_URL)
    #[arg(long)]
    pub image_base_url: Option<String>,

    /// Source image directory inside the bucket (overrides IMAGE_DIR)
    #[arg(long)]
    pub image_dir: Option<String>,

    /// Thumbnail JPEG quality, 0-100 (overrides COMPRESSION_QUALITY)
    #[arg(long, allow_hyphen_values = true)]
    pub compression_quality: Option<String>,

    /// Directory with the landing page and SPA assets (overrides GALLERY_STATIC_DIR)
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Thumbnail resolutions in flight per listing (overrides GALLERY_MAX_CONCURRENCY)
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Retries for store probes and reads (overrides GALLERY_STORE_RETRIES)
    #[arg(long)]
    pub store_retries: Option<u32>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_sources(Args::parse(), |name| env::var(name).ok())
    }

    /// Merge CLI arguments over values looked up through `var`.
    pub fn from_sources(args: Args, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = args
            .host
            .or_else(|| var("GALLERY_HOST"))
            .unwrap_or_else(|| "0.0.0.0".into());
        let port = match args.port {
            Some(port) => port,
            None => parse_var(&var, "GALLERY_PORT")?.unwrap_or(3000),
        };
        let store = match args.store {
            Some(store) => store,
            None => match var("GALLERY_STORE") {
                Some(value) => StoreBackend::from_str(&value, true)
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("parsing GALLERY_STORE value `{}`", value))?,
                None => StoreBackend::S3,
            },
        };
        let storage_dir = args
            .storage_dir
            .or_else(|| var("GALLERY_STORAGE_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("./data/objects"));

        let s3 = S3Settings {
            endpoint: args.s3_endpoint.or_else(|| var("S3_ENDPOINT")),
            region: args
                .s3_region
                .or_else(|| var("S3_REGION"))
                .unwrap_or_else(|| "us-east-1".into()),
            access_key_id: var("S3_ACCESS_KEY"),
            secret_access_key: var("S3_SECRET_KEY"),
        };

        let bucket = args
            .bucket
            .or_else(|| var("BUCKET_NAME"))
            .unwrap_or_else(|| "gallery".into());
        if bucket.trim().is_empty() {
            bail!("bucket name must not be empty");
        }

        let image_base_url = args
            .image_base_url
            .or_else(|| var("IMAGE_BASE_URL"))
            .unwrap_or_else(|| {
                let public_host = if matches!(host.as_str(), "0.0.0.0" | "::") {
                    "localhost"
                } else {
                    host.as_str()
                };
                format!("http://{}:{}/objects", public_host, port)
            });

        let image_dir = args
            .image_dir
            .or_else(|| var("IMAGE_DIR"))
            .unwrap_or_else(|| "images".into());

        let compression_quality =
            parse_quality(args.compression_quality.or_else(|| var("COMPRESSION_QUALITY")));

        let static_dir = args
            .static_dir
            .or_else(|| var("GALLERY_STATIC_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("./public"));
        let max_concurrency = match args.max_concurrency {
            Some(n) => n,
            None => parse_var(&var, "GALLERY_MAX_CONCURRENCY")?.unwrap_or(4),
        }
        .max(1);
        let store_retries = match args.store_retries {
            Some(n) => n,
            None => parse_var(&var, "GALLERY_STORE_RETRIES")?.unwrap_or(2),
        };

        Ok(Self {
            host,
            port,
            store,
            storage_dir,
            s3,
            bucket,
            image_base_url,
            image_dir,
            compression_quality,
            static_dir,
            max_concurrency,
            store_retries,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        None => Ok(None),
    }
}

/// An unset, non-numeric or out-of-range quality means "encoder default".
/// That is not a startup error; it is logged and ignored.
fn parse_quality(raw: Option<String>) -> Option<i64> {
    let raw = raw?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<i64>() {
        Ok(value) if (0..=100).contains(&value) => Some(value),
        Ok(value) => {
            warn!(
                "COMPRESSION_QUALITY {} is outside 0-100, using encoder default",
                value
            );
            None
        }
        Err(_) => {
            warn!(
                "COMPRESSION_QUALITY `{}` is not an integer, using encoder default",
                raw
            );
            None
        }
    }
}
