//! Configuration module
//!
//! Configuration is read once from the environment (after loading `.env`), validated,
//! and shared read-only by every component.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::UrlStrategy;
use crate::storage_types::{StorageBackend, ThumbnailBackend};

// Common constants
const SERVER_PORT: u16 = 8091;
const DB_MAX_CONNECTIONS: u32 = 10;
const SIGNED_URL_TTL_SECS: u64 = 60;
const MAX_VIDEO_SIZE_MB: usize = 1024;
const MAX_THUMBNAIL_SIZE_MB: usize = 10;
const MAX_CONCURRENT_UPLOADS: usize = 8;
const MIN_PRODUCTION_JWT_SECRET_LEN: usize = 32;

/// What to do when the fast-start remux fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemuxFailurePolicy {
    /// Fail the upload; nothing is published.
    Abort,
    /// Publish the staged file as received.
    UploadOriginal,
}

/// Parse a size limit given in MiB; zero and values that overflow `usize` bytes are rejected.
fn size_limit_bytes(
    name: &str,
    value: Option<String>,
    default_mb: usize,
) -> Result<usize, anyhow::Error> {
    let megabytes = match value {
        Some(v) => v
            .trim()
            .parse::<usize>()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", name))?,
        None => default_mb,
    };
    if megabytes == 0 {
        return Err(anyhow::anyhow!("{} must be positive", name));
    }
    megabytes
        .checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("{} is too large: {} MB", name, megabytes))
}

/// Base configuration shared by the HTTP layer
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
    pub jwt_secret: String,
    pub public_base_url: String,
    pub log_format: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
}

/// Upload pipeline configuration
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    // Object storage
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub local_storage_path: PathBuf,
    // URL resolution
    pub url_strategy: String,
    pub storage_host: Option<String>,
    pub cdn_host: Option<String>,
    pub signed_url_ttl_secs: u64,
    // Thumbnails
    pub thumbnail_backend: ThumbnailBackend,
    pub assets_root: PathBuf,
    pub max_thumbnail_size_bytes: usize,
    // Video
    pub max_video_size_bytes: usize,
    pub video_allowed_content_types: Vec<String>,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub staging_dir: PathBuf,
    pub remux_failure_policy: RemuxFailurePolicy,
    pub max_concurrent_uploads: usize,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server_port = match var("PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => SERVER_PORT,
        };

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let jwt_secret = var("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?;

        let public_base_url = var("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", server_port))
            .trim_end_matches('/')
            .to_string();

        let base = BaseConfig {
            server_port,
            environment,
            jwt_secret,
            public_base_url,
            log_format: var("LOG_FORMAT").unwrap_or_else(|| "text".to_string()),
            database_url: var("DATABASE_URL"),
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DB_MAX_CONNECTIONS),
        };

        let storage_backend = match var("STORAGE_BACKEND") {
            Some(backend) => backend.parse()?,
            None => StorageBackend::S3,
        };

        let thumbnail_backend = match var("THUMBNAIL_BACKEND") {
            Some(backend) => backend.parse()?,
            None => ThumbnailBackend::Filesystem,
        };

        let remux_failure_policy = match var("REMUX_FAILURE_POLICY").as_deref() {
            None | Some("abort") => RemuxFailurePolicy::Abort,
            Some("upload_original") => RemuxFailurePolicy::UploadOriginal,
            Some(other) => {
                return Err(anyhow::anyhow!(
                    "Invalid REMUX_FAILURE_POLICY: {} (expected abort or upload_original)",
                    other
                ))
            }
        };

        let max_video_size_bytes =
            size_limit_bytes("MAX_VIDEO_SIZE_MB", var("MAX_VIDEO_SIZE_MB"), MAX_VIDEO_SIZE_MB)?;
        let max_thumbnail_size_bytes = size_limit_bytes(
            "MAX_THUMBNAIL_SIZE_MB",
            var("MAX_THUMBNAIL_SIZE_MB"),
            MAX_THUMBNAIL_SIZE_MB,
        )?;

        let video_allowed_content_types = var("VIDEO_ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|| "video/mp4".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let pipeline = PipelineConfig {
            storage_backend,
            s3_bucket: var("S3_BUCKET"),
            s3_region: var("S3_REGION").or_else(|| var("AWS_REGION")),
            s3_endpoint: var("S3_ENDPOINT"),
            local_storage_path: var("LOCAL_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./objects")),
            url_strategy: var("URL_STRATEGY")
                .map(|s| s.to_lowercase())
                .unwrap_or_else(|| "signed".to_string()),
            storage_host: var("STORAGE_HOST"),
            cdn_host: var("CDN_HOST"),
            signed_url_ttl_secs: var("SIGNED_URL_TTL_SECS")
                .map(|v| {
                    v.parse()
                        .map_err(|_| anyhow::anyhow!("SIGNED_URL_TTL_SECS must be a number"))
                })
                .transpose()?
                .unwrap_or(SIGNED_URL_TTL_SECS),
            thumbnail_backend,
            assets_root: var("ASSETS_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./assets")),
            max_thumbnail_size_bytes,
            max_video_size_bytes,
            video_allowed_content_types,
            ffmpeg_path: var("FFMPEG_PATH").unwrap_or_else(|| "ffmpeg".to_string()),
            ffprobe_path: var("FFPROBE_PATH").unwrap_or_else(|| "ffprobe".to_string()),
            staging_dir: var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            remux_failure_policy,
            max_concurrent_uploads: var("MAX_CONCURRENT_UPLOADS")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(MAX_CONCURRENT_UPLOADS),
        };

        Ok(Config { base, pipeline })
    }

    /// Fail fast on misconfiguration.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.base.jwt_secret.len() < MIN_PRODUCTION_JWT_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least {} bytes in production",
                MIN_PRODUCTION_JWT_SECRET_LEN
            ));
        }

        if self.pipeline.storage_backend == StorageBackend::S3 {
            if self.pipeline.s3_bucket.is_none() {
                return Err(anyhow::anyhow!("S3_BUCKET not configured"));
            }
            if self.pipeline.s3_region.is_none() {
                return Err(anyhow::anyhow!("S3_REGION or AWS_REGION not configured"));
            }
        }

        if self.pipeline.video_allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "VIDEO_ALLOWED_CONTENT_TYPES must list at least one type"
            ));
        }

        self.url_strategy()?;
        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Bucket name used for persisted references (the local root name for the local backend).
    pub fn bucket(&self) -> String {
        match self.pipeline.storage_backend {
            StorageBackend::S3 => self.pipeline.s3_bucket.clone().unwrap_or_default(),
            StorageBackend::Local => "local".to_string(),
        }
    }

    /// URL strategy derived from `URL_STRATEGY` and its companion settings.
    pub fn url_strategy(&self) -> Result<UrlStrategy, anyhow::Error> {
        match self.pipeline.url_strategy.as_str() {
            "direct" => {
                let storage_host = match &self.pipeline.storage_host {
                    Some(host) => host.clone(),
                    None => format!(
                        "s3.{}.amazonaws.com",
                        self.pipeline.s3_region.as_deref().ok_or_else(|| {
                            anyhow::anyhow!("STORAGE_HOST or S3_REGION required for direct URLs")
                        })?
                    ),
                };
                Ok(UrlStrategy::Direct { storage_host })
            }
            "cdn" => {
                let cdn_host = self.pipeline.cdn_host.clone().ok_or_else(|| {
                    anyhow::anyhow!("CDN_HOST must be set when URL_STRATEGY=cdn")
                })?;
                Ok(UrlStrategy::Cdn { cdn_host })
            }
            "signed" => {
                if self.pipeline.signed_url_ttl_secs == 0 {
                    return Err(anyhow::anyhow!("SIGNED_URL_TTL_SECS must be positive"));
                }
                Ok(UrlStrategy::Signed {
                    ttl: Duration::from_secs(self.pipeline.signed_url_ttl_secs),
                })
            }
            other => Err(anyhow::anyhow!(
                "Invalid URL_STRATEGY: {} (expected direct, cdn or signed)",
                other
            )),
        }
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.base.environment
    }

    pub fn jwt_secret(&self) -> &str {
        &self.base.jwt_secret
    }

    pub fn public_base_url(&self) -> &str {
        &self.base.public_base_url
    }

    pub fn database_url(&self) -> Option<&str> {
        self.base.database_url.as_deref()
    }

    pub fn max_video_size_bytes(&self) -> usize {
        self.pipeline.max_video_size_bytes
    }

    pub fn max_thumbnail_size_bytes(&self) -> usize {
        self.pipeline.max_thumbnail_size_bytes
    }

    pub fn video_allowed_content_types(&self) -> &[String] {
        &self.pipeline.video_allowed_content_types
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.pipeline.ffmpeg_path
    }

    pub fn ffprobe_path(&self) -> &str {
        &self.pipeline.ffprobe_path
    }
}
