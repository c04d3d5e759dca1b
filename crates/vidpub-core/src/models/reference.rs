//! Published artifact references and the strategies used to turn them into client URLs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a published object's client-facing URL is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlStrategy {
    /// `https://{bucket}.{storage_host}/{key}`
    Direct { storage_host: String },
    /// `https://{cdn_host}/{key}`
    Cdn { cdn_host: String },
    /// Time-limited signed URL, minted every time the record is read.
    Signed { ttl: Duration },
}

impl UrlStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            UrlStrategy::Direct { .. } => "direct",
            UrlStrategy::Cdn { .. } => "cdn",
            UrlStrategy::Signed { .. } => "signed",
        }
    }
}

/// Durable locator of a published video.
///
/// Only this value is persisted. Signed URLs are never stored because they expire;
/// a `Signed` reference keeps the bucket and key and is resolved at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaReference {
    Direct { url: String },
    CdnKey { key: String },
    Signed { bucket: String, key: String },
}

impl MediaReference {
    /// Build the reference to persist for an object just uploaded under `key`.
    pub fn published(strategy: &UrlStrategy, bucket: &str, key: &str) -> Self {
        match strategy {
            UrlStrategy::Direct { storage_host } => MediaReference::Direct {
                url: direct_url(bucket, storage_host, key),
            },
            UrlStrategy::Cdn { .. } => MediaReference::CdnKey {
                key: key.to_string(),
            },
            UrlStrategy::Signed { .. } => MediaReference::Signed {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
        }
    }

    /// Serialized form stored in the metadata store.
    pub fn encode(&self) -> String {
        // Serializing a plain enum of strings cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse a stored reference. Malformed values yield `None` so that a bad row
    /// reads as "no video" instead of failing the request.
    ///
    /// Besides the tagged JSON form this accepts the older `bucket,key` pair and a
    /// bare `http(s)://` URL.
    pub fn decode(stored: &str) -> Option<Self> {
        let stored = stored.trim();
        if stored.is_empty() {
            return None;
        }

        if stored.starts_with('{') {
            return serde_json::from_str::<MediaReference>(stored)
                .ok()
                .filter(MediaReference::is_well_formed);
        }

        if stored.starts_with("https://") || stored.starts_with("http://") {
            return Some(MediaReference::Direct {
                url: stored.to_string(),
            });
        }

        let (bucket, key) = stored.split_once(',')?;
        let reference = MediaReference::Signed {
            bucket: bucket.trim().to_string(),
            key: key.trim().to_string(),
        };
        reference.is_well_formed().then_some(reference)
    }

    fn is_well_formed(&self) -> bool {
        match self {
            MediaReference::Direct { url } => !url.is_empty(),
            MediaReference::CdnKey { key } => valid_key(key),
            MediaReference::Signed { bucket, key } => {
                !bucket.is_empty() && !bucket.contains(',') && valid_key(key)
            }
        }
    }
}

fn valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(',') && !key.starts_with('/') && !key.contains("..")
}

/// `https://{bucket}.{storage_host}/{key}`
pub fn direct_url(bucket: &str, storage_host: &str, key: &str) -> String {
    format!(
        "https://{}.{}/{}",
        bucket,
        storage_host.trim_end_matches('/'),
        key
    )
}

/// `https://{cdn_host}/{key}`
pub fn cdn_url(cdn_host: &str, key: &str) -> String {
    format!("https://{}/{}", cdn_host.trim_end_matches('/'), key)
}
